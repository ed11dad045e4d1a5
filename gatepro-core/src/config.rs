//! Static driver configuration.

use core::fmt;

use embassy_time::Duration;
use gatepro_proto::SourceId;

/// Read-status interval while the gate stands still.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Read-status interval while the gate moves.
pub const DEFAULT_MOVING_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How long to wait for an acknowledgement before retransmitting.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(2);

/// Transmissions per command, the first one included.
pub const DEFAULT_MAX_ATTEMPTS: u8 = 3;

/// Error returned by [`DriverConfig::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// One of the poll intervals is zero.
    ZeroPollInterval,
    /// Acknowledgement timeout is zero.
    ZeroAckTimeout,
    /// At least one transmission per command is required.
    ZeroAttempts,
    /// Sender id is empty, too long or not alphanumeric.
    InvalidSource,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroPollInterval => write!(f, "poll interval must be non-zero"),
            Self::ZeroAckTimeout => write!(f, "ack timeout must be non-zero"),
            Self::ZeroAttempts => write!(f, "max attempts must be at least 1"),
            Self::InvalidSource => write!(f, "invalid source id"),
        }
    }
}

/// Driver configuration.
///
/// # Example
///
/// ```
/// use embassy_time::Duration;
/// use gatepro_core::DriverConfig;
///
/// let config = DriverConfig::default()
///     .with_poll_interval(Duration::from_secs(30))
///     .with_max_attempts(5)
///     .with_source("ESP01")
///     .unwrap();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DriverConfig {
    pub poll_interval: Duration,
    pub moving_poll_interval: Duration,
    pub ack_timeout: Duration,
    pub max_attempts: u8,
    /// Sender id appended to every command.
    pub source: SourceId,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            moving_poll_interval: DEFAULT_MOVING_POLL_INTERVAL,
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            source: SourceId::default(),
        }
    }
}

impl DriverConfig {
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn with_moving_poll_interval(mut self, interval: Duration) -> Self {
        self.moving_poll_interval = interval;
        self
    }

    #[must_use]
    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u8) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Replace the sender id.
    pub fn with_source(mut self, id: &str) -> Result<Self, ConfigError> {
        self.source = SourceId::new(id).map_err(|_| ConfigError::InvalidSource)?;
        Ok(self)
    }

    /// Check the configuration for values the driver cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.as_ticks() == 0 || self.moving_poll_interval.as_ticks() == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.ack_timeout.as_ticks() == 0 {
            return Err(ConfigError::ZeroAckTimeout);
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DriverConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.moving_poll_interval, Duration::from_secs(1));
        assert_eq!(config.ack_timeout, Duration::from_secs(2));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.source.as_bytes(), b"P00287D7");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_values_are_rejected() {
        let zero = Duration::from_ticks(0);
        assert_eq!(
            DriverConfig::default().with_poll_interval(zero).validate(),
            Err(ConfigError::ZeroPollInterval)
        );
        assert_eq!(
            DriverConfig::default()
                .with_moving_poll_interval(zero)
                .validate(),
            Err(ConfigError::ZeroPollInterval)
        );
        assert_eq!(
            DriverConfig::default().with_ack_timeout(zero).validate(),
            Err(ConfigError::ZeroAckTimeout)
        );
        assert_eq!(
            DriverConfig::default().with_max_attempts(0).validate(),
            Err(ConfigError::ZeroAttempts)
        );
    }

    #[test]
    fn test_invalid_source() {
        assert_eq!(
            DriverConfig::default().with_source("not valid"),
            Err(ConfigError::InvalidSource)
        );
    }
}
