//! Device parameter table.
//!
//! `RP,1:` asks the controller for its parameter table. The reply is a list
//! of decimal values:
//!
//! ```text
//! ACK RP,1:2,30,1,0,0,1,0,3
//! ```
//!
//! Only the first three slots are interpreted; the rest are carried as-is.

use core::fmt::Write as _;

use heapless::{String, Vec};

use crate::fmt::{parse_u8, trim_spaces};
use crate::message::DecodeError;

/// Prefix of a read-params reply.
pub const PARAMS_PREFIX: &[u8] = b"ACK RP,1:";

/// Most values a parameter table may carry.
pub const MAX_PARAMS: usize = 32;

/// Parameters the driver knows how to read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Param {
    /// Operating speed, 1 (slowest) to 4.
    Speed,
    /// Distance before the end stop where the motor slows down, percent
    /// of travel.
    DecelDistance,
    /// Speed used inside the deceleration zone, 1 to 4.
    DecelSpeed,
}

impl Param {
    /// Slot in the parameter table.
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::Speed => 0,
            Self::DecelDistance => 1,
            Self::DecelSpeed => 2,
        }
    }

    #[must_use]
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Speed),
            1 => Some(Self::DecelDistance),
            2 => Some(Self::DecelSpeed),
            _ => None,
        }
    }

    /// Inclusive range the controller accepts.
    #[must_use]
    pub const fn range(self) -> (u8, u8) {
        match self {
            Self::Speed | Self::DecelSpeed => (1, 4),
            Self::DecelDistance => (0, 100),
        }
    }

    #[must_use]
    pub const fn accepts(self, value: u8) -> bool {
        let (min, max) = self.range();
        value >= min && value <= max
    }
}

/// Parameter table as returned by the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParamBlock {
    values: Vec<u8, MAX_PARAMS>,
}

impl ParamBlock {
    /// Parse the value list that follows `ACK RP,1:`.
    pub fn parse(payload: &[u8]) -> Result<Self, DecodeError> {
        let mut values = Vec::new();
        for token in payload.split(|&b| b == b',' || b == b' ').map(trim_spaces) {
            if token.is_empty() {
                continue;
            }
            let value = parse_u8(token).ok_or(DecodeError::InvalidField)?;
            values
                .push(value)
                .map_err(|_| DecodeError::Length(MAX_PARAMS + 1))?;
        }

        if values.is_empty() {
            return Err(DecodeError::Length(0));
        }
        Ok(Self { values })
    }

    /// Build a table from raw values, truncating past [`MAX_PARAMS`].
    #[must_use]
    pub fn from_values(values: &[u8]) -> Self {
        let len = values.len().min(MAX_PARAMS);
        let mut block = Self::default();
        // Cannot fail after truncation
        let _ = block.values.extend_from_slice(&values[..len]);
        block
    }

    #[must_use]
    pub fn get(&self, param: Param) -> Option<u8> {
        self.values.get(param.index() as usize).copied()
    }

    /// Update a slot the table already has.
    pub fn set(&mut self, param: Param, value: u8) -> bool {
        match self.values.get_mut(param.index() as usize) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn values(&self) -> &[u8] {
        &self.values
    }

    /// Short human-readable summary for a text output.
    #[must_use]
    pub fn summary(&self) -> String<64> {
        let mut out = String::new();
        // A 64-byte string fits three labelled u8 values
        let _ = write!(out, "speed={}", OptValue(self.get(Param::Speed)));
        let _ = write!(out, " decel_dist={}", OptValue(self.get(Param::DecelDistance)));
        let _ = write!(out, " decel_speed={}", OptValue(self.get(Param::DecelSpeed)));
        out
    }
}

struct OptValue(Option<u8>);

impl core::fmt::Display for OptValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{}", v),
            None => f.write_str("?"),
        }
    }
}
