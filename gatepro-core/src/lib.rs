//! Platform-agnostic GatePro cover driver.
//!
//! This crate turns the wire protocol from [`gatepro_proto`] into a cover
//! model without any platform-specific dependencies. It can be used both in
//! embedded `no_std` environments and on host for testing.
//!
//! # Overview
//!
//! The crate is organized into several modules:
//!
//! - [`types`]: Cover model ([`CoverState`], [`CoverOperation`], [`Phase`])
//! - [`machine`]: State machine fed by decoded messages ([`CoverStateMachine`])
//! - [`scheduler`]: Status polling and command retry ([`PollScheduler`])
//! - [`driver`]: Serial entry points and host API ([`GateProDriver`])
//! - [`controls`]: Buttons, sliders and output handles ([`Controls`])
//! - [`config`]: Static configuration ([`DriverConfig`])
//! - [`error`]: Error taxonomy and counters ([`DriverError`], [`Diagnostics`])
//!
//! # Time
//!
//! The driver never reads a clock. Pass the current
//! [`embassy_time::Instant`] to [`GateProDriver::tick`]; deadlines are
//! checked on later ticks.
//!
//! # Example
//!
//! ```rust
//! use embassy_time::Instant;
//! use gatepro_core::{CoverOperation, DriverConfig, GateProDriver};
//!
//! let mut uart = [0u8; 128];
//! let mut gate = GateProDriver::new(&mut uart[..], DriverConfig::default()).unwrap();
//!
//! gate.tick(Instant::from_secs(0)).unwrap();
//! gate.on_bytes(b"ACK RS:00,80,E6,00,02,FF,FF,FF\r\n");
//! assert_eq!(gate.position(), Some(0.0));
//!
//! assert!(gate.open());
//! gate.tick(Instant::from_secs(1)).unwrap();
//! gate.on_bytes(b"$V1PKF0,17,Opening;src=0001\r\n");
//! assert_eq!(gate.operation(), CoverOperation::Opening);
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Log through defmt and derive `defmt::Format` (for embedded
//!   logging); without it the crate logs through the `log` facade
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` by default and uses no heap allocations,
//! making it suitable for embedded systems with limited resources.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

// Must come first so the logging macros are visible everywhere
mod fmt;

pub mod config;
pub mod controls;
pub mod driver;
pub mod error;
pub mod machine;
pub mod scheduler;
pub mod transport;
pub mod types;

// Re-export main types at crate root
pub use config::{ConfigError, DriverConfig};
pub use controls::{Button, Controls, NumberOutput, Slider, TextOutput, TextSlot};
pub use driver::GateProDriver;
pub use error::{Diagnostics, DriverError};
pub use machine::CoverStateMachine;
pub use scheduler::{PendingCommand, PollScheduler, RetryPolicy, SchedulerAction};
pub use transport::TransportError;
pub use types::{CoverOperation, CoverState, Direction, Phase};

pub use gatepro_proto;
