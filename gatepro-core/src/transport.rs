//! Transport error mapping for the outbound serial writer.
//!
//! The driver writes through any [`embedded_io::Write`]. Errors from the
//! writer are reduced to a small `Copy` enum so they can be stored and
//! logged without knowing the concrete UART type.

use core::fmt;

use embedded_io::ErrorKind;

/// Error type for transport writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// Generic UART/communication I/O error.
    Io,
    /// Peer went away or the line is down.
    Disconnected,
    /// Write timed out.
    Timeout,
    /// Writer accepted zero bytes.
    WriteZero,
    /// Operation interrupted; may succeed on retry.
    Interrupted,
}

impl TransportError {
    /// Reduce any `embedded_io` error to a transport error.
    pub fn from_io<E: embedded_io::Error>(err: &E) -> Self {
        err.kind().into()
    }
}

impl From<ErrorKind> for TransportError {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::TimedOut => TransportError::Timeout,
            ErrorKind::WriteZero => TransportError::WriteZero,
            ErrorKind::Interrupted => TransportError::Interrupted,
            ErrorKind::BrokenPipe
            | ErrorKind::NotConnected
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted => TransportError::Disconnected,
            _ => TransportError::Io,
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io => write!(f, "I/O error"),
            Self::Disconnected => write!(f, "transport disconnected"),
            Self::Timeout => write!(f, "write timed out"),
            Self::WriteZero => write!(f, "write accepted no bytes"),
            Self::Interrupted => write!(f, "write interrupted"),
        }
    }
}
