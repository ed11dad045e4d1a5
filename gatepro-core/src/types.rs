//! Cover model types: CoverState, CoverOperation, Phase, Direction.

use embassy_time::Instant;

/// Fully open position.
pub const POSITION_OPEN: f32 = 1.0;

/// Fully closed position.
pub const POSITION_CLOSED: f32 = 0.0;

/// Positions closer than this are treated as equal.
pub const POSITION_TOLERANCE: f32 = 0.05;

/// What the cover is doing, as reported to the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CoverOperation {
    #[default]
    Idle,
    Opening,
    Closing,
    /// Stopped part-way.
    Stopped,
    /// Idle, waiting for a status reply.
    ReadStatus,
}

/// Internal state machine phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    #[default]
    Idle,
    Opening,
    Closing,
    Stopped,
    /// A motion command was sent and not yet confirmed.
    AwaitingAck,
}

impl Phase {
    #[inline]
    #[must_use]
    pub const fn is_moving(self) -> bool {
        matches!(self, Self::Opening | Self::Closing)
    }
}

/// Travel direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Opening,
    Closing,
}

impl Direction {
    /// Phase while travelling in this direction.
    #[inline]
    #[must_use]
    pub const fn phase(self) -> Phase {
        match self {
            Self::Opening => Phase::Opening,
            Self::Closing => Phase::Closing,
        }
    }

    /// End stop reached when travel in this direction completes.
    #[inline]
    #[must_use]
    pub const fn boundary(self) -> f32 {
        match self {
            Self::Opening => POSITION_OPEN,
            Self::Closing => POSITION_CLOSED,
        }
    }
}

/// Believed state of the cover.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CoverState {
    /// 1.0 fully open, 0.0 fully closed, `None` until the first status.
    pub position: Option<f32>,
    pub operation: CoverOperation,
    /// Intermediate position to stop at, if any.
    pub target_position: Option<f32>,
    /// When the last status reply arrived.
    pub last_status_at: Option<Instant>,
}

/// Absolute difference between two positions.
#[inline]
#[must_use]
pub fn distance(a: f32, b: f32) -> f32 {
    if a > b {
        a - b
    } else {
        b - a
    }
}

/// Snap a position to the end stop it is within tolerance of.
#[must_use]
pub fn at_boundary(position: f32) -> Option<f32> {
    if position <= POSITION_CLOSED + POSITION_TOLERANCE {
        Some(POSITION_CLOSED)
    } else if position >= POSITION_OPEN - POSITION_TOLERANCE {
        Some(POSITION_OPEN)
    } else {
        None
    }
}
