//! Wire protocol for GatePro sliding-gate controllers.
//!
//! The controller talks line-oriented ASCII over a 9600 baud UART. This
//! crate covers everything that happens on the wire:
//!
//! - **Framing**: split a raw byte stream into lines
//!   - [`FrameParser`] - streaming, resynchronising line parser
//!   - [`Frame`] - one validated line
//!
//! - **Decoding**: classify inbound lines
//!   - [`decode()`] - frame to [`Message`]
//!   - [`decode_status()`] - read-status reply to [`StatusRecord`]
//!   - [`normalize_percentage()`] - undo the opening offset
//!
//! - **Encoding**: build outbound lines
//!   - [`encode()`] / [`encode_kind()`] - [`Command`] to [`Frame`]
//!   - [`SourceId`] - sender id appended to every command
//!
//! # Protocol Format
//!
//! ## Commands (host to controller)
//!
//! ```text
//! <body>;src=<id>\r\n
//! ```
//!
//! | Command           | Body            |
//! |-------------------|-----------------|
//! | open              | `FULL OPEN`     |
//! | close             | `FULL CLOSE`    |
//! | stop              | `STOP`          |
//! | read status       | `RS`            |
//! | read params       | `RP,1:`         |
//! | learn limits      | `AUTO LEARN`    |
//! | write param       | `WP,1:<i>,<v>`  |
//!
//! ## Replies and events (controller to host)
//!
//! ```text
//! ACK RS:00,80,C4,32,02,FF,FF,FF\r\n
//! ACK RP,1:2,30,1,0\r\n
//! ACK FULL OPEN\r\n
//! $V1PKF0,17,Opening;src=0001\r\n
//! ```
//!
//! # Example
//!
//! ```
//! use gatepro_proto::{decode, encode, Command, FrameParser, Message, SourceId};
//!
//! let request = encode(&Command::ReadStatus, &SourceId::default()).unwrap();
//! assert_eq!(request.as_bytes(), b"RS;src=P00287D7");
//!
//! let mut parser = FrameParser::new();
//! for frame in parser.feed(b"ACK RS:00,80,C4,96,02,FF,FF,FF\r\n") {
//!     if let Ok(Message::Status(status)) = decode(&frame.unwrap()) {
//!         assert_eq!(status.percentage, 22);
//!         assert!(status.is_opening());
//!     }
//! }
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)
//! - **`embedded-io`**: Enable [`Frame::write_to`] for I/O peripherals
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` by default and uses no heap allocations,
//! making it suitable for embedded systems with limited resources.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod command;
mod fmt;
pub mod frame;
pub mod message;
pub mod params;
pub mod status;

// Re-export types at crate root for convenience
pub use command::{
    decode_command, encode, encode_kind, Command, CommandKind, EncodeError, SourceId,
    DEFAULT_SOURCE_ID,
};
pub use frame::{
    Escaped, Frame, FrameError, FrameParser, Frames, Marker, ACK_MARKER, EVENT_MARKER,
    MAX_FRAME_LEN,
};
pub use message::{decode, DecodeError, EventKind, GateEvent, Message, MOTOR_EVENT_PREFIX};
pub use params::{Param, ParamBlock, MAX_PARAMS, PARAMS_PREFIX};
pub use status::{
    decode_status, normalize_percentage, DirectionHint, MotionCode, StatusRecord, STATUS_PREFIX,
};
