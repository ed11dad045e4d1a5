//! Inbound message classification.
//!
//! [`decode`] turns a [`Frame`] from the parser into a typed [`Message`]:
//!
//! | Prefix        | Message                |
//! |---------------|------------------------|
//! | `ACK RS:`     | [`Message::Status`]    |
//! | `ACK RP,1:`   | [`Message::Params`]    |
//! | `ACK <cmd>`   | [`Message::Ack`]       |
//! | `$V1PKF0,`    | [`Message::Event`]     |

use core::fmt;

use crate::command::{decode_command, Command};
use crate::fmt::{parse_u16, trim_spaces};
use crate::frame::Frame;
use crate::params::{ParamBlock, PARAMS_PREFIX};
use crate::status::{decode_status_payload, StatusRecord, STATUS_PREFIX};

/// Prefix of a motor event line.
pub const MOTOR_EVENT_PREFIX: &[u8] = b"$V1PKF0,";

/// Error returned when a frame cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Frame is well formed but not a message this driver understands.
    Unsupported,
    /// Wrong number of tokens.
    Length(usize),
    /// A token failed to parse.
    InvalidField,
    /// Percentage byte outside both the plain and the offset range.
    Percentage(u8),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported => write!(f, "unsupported message"),
            Self::Length(n) => write!(f, "unexpected token count {}", n),
            Self::InvalidField => write!(f, "invalid field"),
            Self::Percentage(raw) => write!(f, "percentage byte 0x{:02X} out of range", raw),
        }
    }
}

/// What the motor reported in an event line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventKind {
    Opening,
    Opened,
    Closing,
    Closed,
    Stopped,
    /// Any other word. Logged, never acted on.
    Unknown,
}

impl EventKind {
    fn from_word(word: &[u8]) -> Self {
        match word {
            b"Opening" => Self::Opening,
            b"Opened" => Self::Opened,
            b"Closing" => Self::Closing,
            b"Closed" => Self::Closed,
            b"Stopped" => Self::Stopped,
            _ => Self::Unknown,
        }
    }
}

/// Unsolicited motor event, e.g. `$V1PKF0,17,Closed;src=0001`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GateEvent {
    /// Sequence number assigned by the controller.
    pub seq: u16,
    pub kind: EventKind,
}

/// A decoded inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Message {
    Status(StatusRecord),
    Params(ParamBlock),
    /// Echo of a command the controller accepted.
    Ack(Command),
    Event(GateEvent),
}

/// Decode a frame into a message.
///
/// # Example
///
/// ```
/// use gatepro_proto::{decode, EventKind, Frame, Message};
///
/// let frame = Frame::new(b"$V1PKF0,17,Closed;src=0001").unwrap();
/// match decode(&frame).unwrap() {
///     Message::Event(event) => assert_eq!(event.kind, EventKind::Closed),
///     other => panic!("unexpected {:?}", other),
/// }
/// ```
pub fn decode(frame: &Frame) -> Result<Message, DecodeError> {
    let line = frame.as_bytes();

    if let Some(payload) = line.strip_prefix(STATUS_PREFIX) {
        return decode_status_payload(payload).map(Message::Status);
    }
    if let Some(payload) = line.strip_prefix(PARAMS_PREFIX) {
        let payload = payload.split(|&b| b == b';').next().unwrap_or(payload);
        // A bare echo of the request carries no values
        if trim_spaces(payload).is_empty() {
            return Ok(Message::Ack(Command::ReadParams));
        }
        return ParamBlock::parse(payload).map(Message::Params);
    }
    if let Some(payload) = line.strip_prefix(MOTOR_EVENT_PREFIX) {
        return decode_event(payload).map(Message::Event);
    }
    if line.starts_with(crate::frame::ACK_MARKER) {
        return decode_command(frame).map(Message::Ack);
    }

    Err(DecodeError::Unsupported)
}

fn decode_event(payload: &[u8]) -> Result<GateEvent, DecodeError> {
    let body = match payload.iter().position(|&b| b == b';') {
        Some(pos) => &payload[..pos],
        None => payload,
    };

    let mut tokens = body.split(|&b| b == b',').map(trim_spaces);
    let seq = tokens
        .next()
        .and_then(parse_u16)
        .ok_or(DecodeError::InvalidField)?;
    let word = tokens.next().ok_or(DecodeError::Length(1))?;

    Ok(GateEvent {
        seq,
        kind: EventKind::from_word(word),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Param;
    use crate::status::MotionCode;

    fn msg(line: &[u8]) -> Result<Message, DecodeError> {
        decode(&Frame::new(line).unwrap())
    }

    #[test]
    fn test_status_reply() {
        match msg(b"ACK RS:00,80,E6,32,02,FF,FF,FF").unwrap() {
            Message::Status(s) => {
                assert_eq!(s.motion, MotionCode::Stopped);
                assert_eq!(s.percentage, 50);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_bad_status_is_an_error_not_an_ack() {
        assert_eq!(msg(b"ACK RS:00,80"), Err(DecodeError::Length(2)));
    }

    #[test]
    fn test_params_reply() {
        match msg(b"ACK RP,1:3,40,2,0;src=0001").unwrap() {
            Message::Params(p) => {
                assert_eq!(p.get(Param::Speed), Some(3));
                assert_eq!(p.get(Param::DecelDistance), Some(40));
            }
            other => panic!("unexpected {:?}", other),
        }
        match msg(b"ACK RP,1:2 30 1").unwrap() {
            Message::Params(p) => assert_eq!(p.values(), &[2, 30, 1]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_command_echo() {
        assert_eq!(msg(b"ACK FULL OPEN"), Ok(Message::Ack(Command::Open)));
        assert_eq!(msg(b"ACK STOP;src=P00287D7"), Ok(Message::Ack(Command::Stop)));
        assert_eq!(msg(b"ACK RP,1:"), Ok(Message::Ack(Command::ReadParams)));
        assert_eq!(msg(b"ACK WHATEVER"), Err(DecodeError::Unsupported));
    }

    #[test]
    fn test_events() {
        let cases: [(&[u8], EventKind); 6] = [
            (b"$V1PKF0,17,Opening;src=0001", EventKind::Opening),
            (b"$V1PKF0,17,Opened;src=0001", EventKind::Opened),
            (b"$V1PKF0,17,Closing;src=0001", EventKind::Closing),
            (b"$V1PKF0,17,Closed;src=0001", EventKind::Closed),
            (b"$V1PKF0,17,Stopped;src=0001", EventKind::Stopped),
            (b"$V1PKF0,17,Jammed;src=0001", EventKind::Unknown),
        ];
        for (line, kind) in cases {
            assert_eq!(
                msg(line),
                Ok(Message::Event(GateEvent { seq: 17, kind }))
            );
        }
    }

    #[test]
    fn test_malformed_event() {
        assert_eq!(msg(b"$V1PKF0,xx,Closed"), Err(DecodeError::InvalidField));
        assert_eq!(msg(b"$V1PKF0,17"), Err(DecodeError::Length(1)));
    }

    #[test]
    fn test_other_event_families_are_unsupported() {
        assert_eq!(msg(b"$V1XYZ,1,2"), Err(DecodeError::Unsupported));
    }
}
