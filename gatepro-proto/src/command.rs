//! Outbound command encoding.
//!
//! Every command is a short ASCII body followed by the sender id:
//!
//! ```text
//! FULL OPEN;src=P00287D7\r\n
//! RS;src=P00287D7\r\n
//! WP,1:0,3;src=P00287D7\r\n      write parameter slot 0 (speed) = 3
//! ```
//!
//! The controller echoes accepted commands as `ACK <body>`;
//! [`decode_command`] reads both forms back.

use core::fmt;

use heapless::Vec;

use crate::fmt::{parse_u8, write_u8};
use crate::frame::{Frame, ACK_MARKER};
use crate::message::DecodeError;
use crate::params::Param;

/// Sender id used by the vendor's own remote module.
pub const DEFAULT_SOURCE_ID: &str = "P00287D7";

/// Longest accepted sender id.
pub const MAX_SOURCE_ID_LEN: usize = 16;

const SOURCE_TAG: &[u8] = b";src=";
const WRITE_PARAM_PREFIX: &[u8] = b"WP,1:";

/// Error returned when a command cannot be encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// Payload outside the range the controller accepts.
    OutOfRange { kind: CommandKind, value: u8 },
    /// Setter value that is not a number in 0-255.
    InvalidValue(CommandKind),
    /// A setter was given no value.
    MissingPayload(CommandKind),
    /// A command without parameters was given a value.
    UnexpectedPayload(CommandKind),
    /// Sender id empty, too long or not alphanumeric.
    InvalidSource,
    /// Encoded command does not fit in a frame.
    BufferTooSmall,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { kind, value } => {
                write!(f, "value {} out of range for {:?}", value, kind)
            }
            Self::InvalidValue(kind) => write!(f, "{:?} needs a value in 0-255", kind),
            Self::MissingPayload(kind) => write!(f, "{:?} needs a value", kind),
            Self::UnexpectedPayload(kind) => write!(f, "{:?} takes no value", kind),
            Self::InvalidSource => write!(f, "invalid source id"),
            Self::BufferTooSmall => write!(f, "buffer too small"),
        }
    }
}

/// Command type without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandKind {
    Open,
    Close,
    Stop,
    ReadStatus,
    ReadParams,
    Learn,
    SetSpeed,
    SetDecelDistance,
    SetDecelSpeed,
}

impl CommandKind {
    /// Every kind, in declaration order.
    pub const ALL: [CommandKind; 9] = [
        Self::Open,
        Self::Close,
        Self::Stop,
        Self::ReadStatus,
        Self::ReadParams,
        Self::Learn,
        Self::SetSpeed,
        Self::SetDecelDistance,
        Self::SetDecelSpeed,
    ];

    /// Parameter written by a setter kind.
    #[must_use]
    pub const fn param(self) -> Option<Param> {
        match self {
            Self::SetSpeed => Some(Param::Speed),
            Self::SetDecelDistance => Some(Param::DecelDistance),
            Self::SetDecelSpeed => Some(Param::DecelSpeed),
            _ => None,
        }
    }

    /// Short lowercase name for logs and status text.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::Stop => "stop",
            Self::ReadStatus => "read status",
            Self::ReadParams => "read params",
            Self::Learn => "learn",
            Self::SetSpeed => "set speed",
            Self::SetDecelDistance => "set decel distance",
            Self::SetDecelSpeed => "set decel speed",
        }
    }

    /// Motion commands change what the gate is doing.
    #[must_use]
    pub const fn is_motion(self) -> bool {
        matches!(self, Self::Open | Self::Close | Self::Stop)
    }
}

/// A command with its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Open,
    Close,
    Stop,
    ReadStatus,
    ReadParams,
    /// Start the travel-limit learning run.
    Learn,
    SetSpeed(u8),
    SetDecelDistance(u8),
    SetDecelSpeed(u8),
}

impl Command {
    /// Build and validate a command from kind and payload.
    pub fn new(kind: CommandKind, payload: Option<u8>) -> Result<Self, EncodeError> {
        let command = match (kind, payload) {
            (CommandKind::Open, None) => Self::Open,
            (CommandKind::Close, None) => Self::Close,
            (CommandKind::Stop, None) => Self::Stop,
            (CommandKind::ReadStatus, None) => Self::ReadStatus,
            (CommandKind::ReadParams, None) => Self::ReadParams,
            (CommandKind::Learn, None) => Self::Learn,
            (CommandKind::SetSpeed, Some(v)) => Self::SetSpeed(v),
            (CommandKind::SetDecelDistance, Some(v)) => Self::SetDecelDistance(v),
            (CommandKind::SetDecelSpeed, Some(v)) => Self::SetDecelSpeed(v),
            (kind, None) => return Err(EncodeError::MissingPayload(kind)),
            (kind, Some(_)) => return Err(EncodeError::UnexpectedPayload(kind)),
        };
        command.validate()?;
        Ok(command)
    }

    /// Setter command for a parameter.
    pub fn write_param(param: Param, value: u8) -> Result<Self, EncodeError> {
        let command = match param {
            Param::Speed => Self::SetSpeed(value),
            Param::DecelDistance => Self::SetDecelDistance(value),
            Param::DecelSpeed => Self::SetDecelSpeed(value),
        };
        command.validate()?;
        Ok(command)
    }

    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        match self {
            Self::Open => CommandKind::Open,
            Self::Close => CommandKind::Close,
            Self::Stop => CommandKind::Stop,
            Self::ReadStatus => CommandKind::ReadStatus,
            Self::ReadParams => CommandKind::ReadParams,
            Self::Learn => CommandKind::Learn,
            Self::SetSpeed(_) => CommandKind::SetSpeed,
            Self::SetDecelDistance(_) => CommandKind::SetDecelDistance,
            Self::SetDecelSpeed(_) => CommandKind::SetDecelSpeed,
        }
    }

    #[must_use]
    pub const fn payload(&self) -> Option<u8> {
        match self {
            Self::SetSpeed(v) | Self::SetDecelDistance(v) | Self::SetDecelSpeed(v) => Some(*v),
            _ => None,
        }
    }

    /// Check the payload against the controller's accepted range.
    pub fn validate(&self) -> Result<(), EncodeError> {
        match (self.kind().param(), self.payload()) {
            (Some(param), Some(value)) if !param.accepts(value) => Err(EncodeError::OutOfRange {
                kind: self.kind(),
                value,
            }),
            _ => Ok(()),
        }
    }

    fn write_body(&self, frame: &mut Frame) -> Result<(), EncodeError> {
        let fixed: &[u8] = match self {
            Self::Open => b"FULL OPEN",
            Self::Close => b"FULL CLOSE",
            Self::Stop => b"STOP",
            Self::ReadStatus => b"RS",
            Self::ReadParams => b"RP,1:",
            Self::Learn => b"AUTO LEARN",
            Self::SetSpeed(_) | Self::SetDecelDistance(_) | Self::SetDecelSpeed(_) => {
                WRITE_PARAM_PREFIX
            }
        };
        extend(frame, fixed)?;

        if let (Some(param), Some(value)) = (self.kind().param(), self.payload()) {
            let mut tmp = [0u8; 3];
            let len = write_u8(&mut tmp, param.index());
            extend(frame, &tmp[..len])?;
            extend(frame, b",")?;
            let len = write_u8(&mut tmp, value);
            extend(frame, &tmp[..len])?;
        }
        Ok(())
    }
}

/// Sender id appended to every command.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SourceId(Vec<u8, MAX_SOURCE_ID_LEN>);

impl SourceId {
    /// Validate and store a sender id (1-16 ASCII alphanumerics).
    pub fn new(id: &str) -> Result<Self, EncodeError> {
        let bytes = id.as_bytes();
        if bytes.is_empty() || !bytes.iter().all(u8::is_ascii_alphanumeric) {
            return Err(EncodeError::InvalidSource);
        }
        Vec::from_slice(bytes)
            .map(Self)
            .map_err(|_| EncodeError::InvalidSource)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Default for SourceId {
    fn default() -> Self {
        let mut id = Vec::new();
        // Default id is 8 bytes, well under capacity
        let _ = id.extend_from_slice(DEFAULT_SOURCE_ID.as_bytes());
        Self(id)
    }
}

/// Encode a command into an outbound frame.
///
/// The frame excludes the `\r\n` terminator, which the transport appends.
///
/// # Example
///
/// ```
/// use gatepro_proto::{encode, Command, SourceId};
///
/// let frame = encode(&Command::SetSpeed(3), &SourceId::default()).unwrap();
/// assert_eq!(frame.as_bytes(), b"WP,1:0,3;src=P00287D7");
///
/// assert!(encode(&Command::SetSpeed(9), &SourceId::default()).is_err());
/// ```
pub fn encode(command: &Command, source: &SourceId) -> Result<Frame, EncodeError> {
    command.validate()?;

    let mut frame = Frame::empty();
    command.write_body(&mut frame)?;
    extend(&mut frame, SOURCE_TAG)?;
    extend(&mut frame, source.as_bytes())?;
    Ok(frame)
}

/// Encode from kind and payload in one step.
pub fn encode_kind(
    kind: CommandKind,
    payload: Option<u8>,
    source: &SourceId,
) -> Result<Frame, EncodeError> {
    encode(&Command::new(kind, payload)?, source)
}

/// Read a command back from an encoded frame or from its `ACK` echo.
///
/// ```
/// use gatepro_proto::{decode_command, Command, Frame};
///
/// let echo = Frame::new(b"ACK FULL CLOSE").unwrap();
/// assert_eq!(decode_command(&echo), Ok(Command::Close));
/// ```
pub fn decode_command(frame: &Frame) -> Result<Command, DecodeError> {
    let line = frame.as_bytes();
    let line = line.strip_prefix(ACK_MARKER).unwrap_or(line);
    let body = match line.windows(SOURCE_TAG.len()).position(|w| w == SOURCE_TAG) {
        Some(pos) => &line[..pos],
        None => line,
    };
    parse_body(body)
}

fn parse_body(body: &[u8]) -> Result<Command, DecodeError> {
    match body {
        b"FULL OPEN" => return Ok(Command::Open),
        b"FULL CLOSE" => return Ok(Command::Close),
        b"STOP" => return Ok(Command::Stop),
        b"RS" => return Ok(Command::ReadStatus),
        b"RP,1:" | b"RP,1" => return Ok(Command::ReadParams),
        b"AUTO LEARN" => return Ok(Command::Learn),
        _ => {}
    }

    let args = body
        .strip_prefix(WRITE_PARAM_PREFIX)
        .ok_or(DecodeError::Unsupported)?;
    let comma = args
        .iter()
        .position(|&b| b == b',')
        .ok_or(DecodeError::InvalidField)?;
    let index = parse_u8(&args[..comma]).ok_or(DecodeError::InvalidField)?;
    let value = parse_u8(&args[comma + 1..]).ok_or(DecodeError::InvalidField)?;
    let param = Param::from_index(index).ok_or(DecodeError::InvalidField)?;

    Command::write_param(param, value).map_err(|_| DecodeError::InvalidField)
}

#[inline]
fn extend(frame: &mut Frame, data: &[u8]) -> Result<(), EncodeError> {
    frame
        .extend_from_slice(data)
        .map_err(|_| EncodeError::BufferTooSmall)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(command: Command) -> Frame {
        encode(&command, &SourceId::default()).unwrap()
    }

    #[test]
    fn test_motion_bodies() {
        assert_eq!(encoded(Command::Open).as_bytes(), b"FULL OPEN;src=P00287D7");
        assert_eq!(encoded(Command::Close).as_bytes(), b"FULL CLOSE;src=P00287D7");
        assert_eq!(encoded(Command::Stop).as_bytes(), b"STOP;src=P00287D7");
    }

    #[test]
    fn test_query_bodies() {
        assert_eq!(encoded(Command::ReadStatus).as_bytes(), b"RS;src=P00287D7");
        assert_eq!(encoded(Command::ReadParams).as_bytes(), b"RP,1:;src=P00287D7");
        assert_eq!(encoded(Command::Learn).as_bytes(), b"AUTO LEARN;src=P00287D7");
    }

    #[test]
    fn test_setter_bodies() {
        assert_eq!(encoded(Command::SetSpeed(4)).as_bytes(), b"WP,1:0,4;src=P00287D7");
        assert_eq!(
            encoded(Command::SetDecelDistance(100)).as_bytes(),
            b"WP,1:1,100;src=P00287D7"
        );
        assert_eq!(
            encoded(Command::SetDecelSpeed(1)).as_bytes(),
            b"WP,1:2,1;src=P00287D7"
        );
    }

    #[test]
    fn test_custom_source() {
        let source = SourceId::new("ESP01").unwrap();
        let frame = encode(&Command::Stop, &source).unwrap();
        assert_eq!(frame.as_bytes(), b"STOP;src=ESP01");
    }

    #[test]
    fn test_invalid_source() {
        assert_eq!(SourceId::new(""), Err(EncodeError::InvalidSource));
        assert_eq!(SourceId::new("a b"), Err(EncodeError::InvalidSource));
        assert_eq!(
            SourceId::new("ABCDEFGHIJKLMNOPQ"),
            Err(EncodeError::InvalidSource)
        );
    }

    #[test]
    fn test_out_of_range_is_rejected_before_encoding() {
        for speed in [0u8, 5, 255] {
            assert_eq!(
                encode(&Command::SetSpeed(speed), &SourceId::default()),
                Err(EncodeError::OutOfRange {
                    kind: CommandKind::SetSpeed,
                    value: speed
                })
            );
        }
        assert!(Command::new(CommandKind::SetDecelDistance, Some(101)).is_err());
        assert!(Command::new(CommandKind::SetDecelSpeed, Some(0)).is_err());
    }

    #[test]
    fn test_payload_shape_is_checked() {
        assert_eq!(
            Command::new(CommandKind::SetSpeed, None),
            Err(EncodeError::MissingPayload(CommandKind::SetSpeed))
        );
        assert_eq!(
            Command::new(CommandKind::Open, Some(1)),
            Err(EncodeError::UnexpectedPayload(CommandKind::Open))
        );
        assert_eq!(
            encode_kind(CommandKind::SetSpeed, Some(2), &SourceId::default())
                .unwrap()
                .as_bytes(),
            b"WP,1:0,2;src=P00287D7"
        );
    }

    #[test]
    fn test_every_kind_decodes_back() {
        for kind in CommandKind::ALL {
            let payload = kind.param().map(|p| p.range().1);
            let command = Command::new(kind, payload).unwrap();
            let frame = encoded(command);
            let decoded = decode_command(&frame).unwrap();
            assert_eq!(decoded.kind(), kind);
            assert_eq!(decoded.payload(), payload);
        }
    }

    #[test]
    fn test_ack_echo_decodes() {
        let echo = Frame::new(b"ACK WP,1:0,3").unwrap();
        assert_eq!(decode_command(&echo), Ok(Command::SetSpeed(3)));
        let echo = Frame::new(b"ACK RP,1").unwrap();
        assert_eq!(decode_command(&echo), Ok(Command::ReadParams));
    }

    #[test]
    fn test_unknown_body() {
        let frame = Frame::new(b"ACK HELLO").unwrap();
        assert_eq!(decode_command(&frame), Err(DecodeError::Unsupported));
        let frame = Frame::new(b"ACK WP,1:9,3").unwrap();
        assert_eq!(decode_command(&frame), Err(DecodeError::InvalidField));
    }
}
