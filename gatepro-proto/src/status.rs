//! Status reply decoding.
//!
//! A read-status reply looks like this:
//!
//! ```text
//! ACK RS:00,80,C4,C6,3E,16,FF,FF,FF
//!        |  |  |  |  |  |  `------- trailer, ignored
//!        |  |  |  |  |  `---------- unknown byte, kept for diagnostics
//!        |  |  |  |  `------------- speed
//!        |  |  |  `---------------- percentage open (see below)
//!        |  |  `------------------- motion code
//!        `--`---------------------- fixed header
//! ```
//!
//! The percentage byte is overloaded. While the gate is closing or standing
//! still it holds the plain percentage (0-100). While opening the device
//! adds 128, so 128-228 means "opening, at `raw - 128` percent".

use crate::fmt::{parse_hex_u8, trim_spaces};
use crate::frame::Frame;
use crate::message::DecodeError;

/// Prefix of a read-status reply.
pub const STATUS_PREFIX: &[u8] = b"ACK RS:";

/// Offset the device adds to the percentage while opening.
pub const OPENING_OFFSET: u8 = 128;

/// Fewest tokens a status reply may carry (header, motion, percentage,
/// speed, unknown).
pub const MIN_STATUS_TOKENS: usize = 6;

/// Most tokens a status reply may carry, trailer included.
pub const MAX_STATUS_TOKENS: usize = 12;

const MOTION_MOVING: u8 = 0xC4;
const MOTION_STOPPED: u8 = 0xE6;
const MOTION_END_STATE: u8 = 0xA2;

/// Motion code reported in a status reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionCode {
    /// 0xC4: motor running.
    Moving,
    /// 0xE6: stopped part-way.
    Stopped,
    /// 0xA2: reached an end stop.
    EndState,
    /// Anything else. Kept so the caller can decide whether to trust it.
    Unknown(u8),
}

impl MotionCode {
    #[must_use]
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            MOTION_MOVING => Self::Moving,
            MOTION_STOPPED => Self::Stopped,
            MOTION_END_STATE => Self::EndState,
            other => Self::Unknown(other),
        }
    }

    #[must_use]
    pub const fn raw(self) -> u8 {
        match self {
            Self::Moving => MOTION_MOVING,
            Self::Stopped => MOTION_STOPPED,
            Self::EndState => MOTION_END_STATE,
            Self::Unknown(raw) => raw,
        }
    }
}

/// Direction implied by the percentage encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DirectionHint {
    /// Percentage carried the +128 offset.
    Opening,
    /// Plain percentage: closing or not moving.
    ClosingOrStationary,
}

/// Undo the opening offset on a raw percentage byte.
///
/// Returns `None` for bytes that are neither a plain percentage nor an
/// offset one (101-127 and 229-255).
///
/// ```
/// use gatepro_proto::{normalize_percentage, DirectionHint};
///
/// assert_eq!(normalize_percentage(50), Some((50, DirectionHint::ClosingOrStationary)));
/// assert_eq!(normalize_percentage(150), Some((22, DirectionHint::Opening)));
/// assert_eq!(normalize_percentage(110), None);
/// ```
#[inline]
#[must_use]
pub const fn normalize_percentage(raw: u8) -> Option<(u8, DirectionHint)> {
    match raw {
        0..=100 => Some((raw, DirectionHint::ClosingOrStationary)),
        128..=228 => Some((raw - OPENING_OFFSET, DirectionHint::Opening)),
        _ => None,
    }
}

/// One decoded status reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusRecord {
    /// Fixed header bytes (`00 80` in every capture so far).
    pub header: [u8; 2],
    pub motion: MotionCode,
    /// Percentage byte as received.
    pub raw_percentage: u8,
    /// Percentage open, offset removed. Always 0-100.
    pub percentage: u8,
    pub direction_hint: DirectionHint,
    /// Speed in device units.
    pub speed: u8,
    /// Meaning not known yet.
    pub unknown: u8,
}

impl StatusRecord {
    /// Build a record from raw field bytes.
    pub fn from_fields(
        header: [u8; 2],
        motion: u8,
        raw_percentage: u8,
        speed: u8,
        unknown: u8,
    ) -> Result<Self, DecodeError> {
        let (percentage, direction_hint) =
            normalize_percentage(raw_percentage).ok_or(DecodeError::Percentage(raw_percentage))?;

        Ok(Self {
            header,
            motion: MotionCode::from_raw(motion),
            raw_percentage,
            percentage,
            direction_hint,
            speed,
            unknown,
        })
    }

    /// Position as a fraction, 1.0 fully open, 0.0 fully closed.
    #[inline]
    #[must_use]
    pub fn position(&self) -> f32 {
        self.percentage as f32 / 100.0
    }

    #[inline]
    #[must_use]
    pub fn is_opening(&self) -> bool {
        self.direction_hint == DirectionHint::Opening
    }
}

/// Decode a read-status reply frame.
///
/// # Example
///
/// ```
/// use gatepro_proto::{decode_status, Frame, MotionCode};
///
/// let frame = Frame::new(b"ACK RS:00,80,C4,32,02,FF,FF,FF").unwrap();
/// let status = decode_status(&frame).unwrap();
/// assert_eq!(status.motion, MotionCode::Moving);
/// assert_eq!(status.percentage, 50);
/// assert_eq!(status.speed, 2);
/// ```
pub fn decode_status(frame: &Frame) -> Result<StatusRecord, DecodeError> {
    let payload = frame
        .as_bytes()
        .strip_prefix(STATUS_PREFIX)
        .ok_or(DecodeError::Unsupported)?;
    decode_status_payload(payload)
}

/// Decode the token list that follows `ACK RS:`.
pub(crate) fn decode_status_payload(payload: &[u8]) -> Result<StatusRecord, DecodeError> {
    let mut fields = [0u8; MIN_STATUS_TOKENS];
    let mut count = 0;

    for token in payload
        .split(|&b| b == b',' || b == b' ')
        .map(trim_spaces)
        .filter(|t| !t.is_empty())
    {
        let value = parse_hex_u8(token).ok_or(DecodeError::InvalidField)?;
        if count < MIN_STATUS_TOKENS {
            fields[count] = value;
        }
        count += 1;
    }

    if !(MIN_STATUS_TOKENS..=MAX_STATUS_TOKENS).contains(&count) {
        return Err(DecodeError::Length(count));
    }

    StatusRecord::from_fields(
        [fields[0], fields[1]],
        fields[2],
        fields[3],
        fields[4],
        fields[5],
    )
}
