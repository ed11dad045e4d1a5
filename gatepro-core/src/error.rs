//! Driver error taxonomy and diagnostics counters.

use core::fmt;

use gatepro_proto::{CommandKind, DecodeError, EncodeError, FrameError};

use crate::transport::TransportError;

/// Error type for driver operations.
///
/// Only [`DriverError::CommandTimeout`], [`DriverError::Encode`] and
/// [`DriverError::PositionUnknown`] are returned to the host. The rest are
/// absorbed and counted in [`Diagnostics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverError {
    /// Writing to the serial transport failed.
    Transport(TransportError),
    /// Inbound byte stream lost sync.
    FrameSync(FrameError),
    /// A complete frame did not decode.
    Decode(DecodeError),
    /// Command was not acknowledged after all attempts.
    CommandTimeout(CommandKind),
    /// Command payload rejected before sending.
    Encode(EncodeError),
    /// A target position needs a known current position.
    PositionUnknown,
}

impl From<TransportError> for DriverError {
    fn from(err: TransportError) -> Self {
        DriverError::Transport(err)
    }
}

impl From<FrameError> for DriverError {
    fn from(err: FrameError) -> Self {
        DriverError::FrameSync(err)
    }
}

impl From<DecodeError> for DriverError {
    fn from(err: DecodeError) -> Self {
        DriverError::Decode(err)
    }
}

impl From<EncodeError> for DriverError {
    fn from(err: EncodeError) -> Self {
        DriverError::Encode(err)
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport: {}", e),
            Self::FrameSync(e) => write!(f, "framing: {}", e),
            Self::Decode(e) => write!(f, "decode: {}", e),
            Self::CommandTimeout(kind) => write!(f, "{} not acknowledged", kind.name()),
            Self::Encode(e) => write!(f, "encode: {}", e),
            Self::PositionUnknown => write!(f, "current position unknown"),
        }
    }
}

/// Counters for absorbed errors and anomalies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Diagnostics {
    /// Frames that decoded into a message.
    pub frames: u32,
    /// Garbage runs, overflows and invalid bytes.
    pub frame_errors: u32,
    pub decode_errors: u32,
    /// Failed writes. Each still counts as a transmission attempt.
    pub transport_errors: u32,
    pub retransmissions: u32,
    pub timeouts: u32,
    /// Unknown motion codes and event words.
    pub anomalies: u32,
}

impl Diagnostics {
    /// Count an absorbed error in its bucket.
    pub fn record(&mut self, err: &DriverError) {
        let counter = match err {
            DriverError::Transport(_) => &mut self.transport_errors,
            DriverError::FrameSync(_) => &mut self.frame_errors,
            DriverError::Decode(_) => &mut self.decode_errors,
            DriverError::CommandTimeout(_) => &mut self.timeouts,
            DriverError::Encode(_) | DriverError::PositionUnknown => return,
        };
        *counter = counter.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::string::ToString;

    #[test]
    fn test_record_buckets() {
        let mut diag = Diagnostics::default();
        diag.record(&DriverError::FrameSync(FrameError::Garbage(3)));
        diag.record(&DriverError::Decode(DecodeError::InvalidField));
        diag.record(&DriverError::Decode(DecodeError::Unsupported));
        diag.record(&DriverError::Transport(TransportError::Io));
        diag.record(&DriverError::CommandTimeout(CommandKind::Stop));
        diag.record(&DriverError::PositionUnknown);

        assert_eq!(diag.frame_errors, 1);
        assert_eq!(diag.decode_errors, 2);
        assert_eq!(diag.transport_errors, 1);
        assert_eq!(diag.timeouts, 1);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            DriverError::CommandTimeout(CommandKind::ReadStatus).to_string(),
            "read status not acknowledged"
        );
        assert_eq!(
            DriverError::from(FrameError::Overflow).to_string(),
            "framing: line exceeds 96 bytes"
        );
    }
}
