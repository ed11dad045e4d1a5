//! GatePro gate controller bridge for RP2040.
//!
//! Wires the platform-agnostic [`gatepro_core::GateProDriver`] to an
//! embassy buffered UART. Host requests arrive as [`HostCommand`]s over a
//! channel; driver outputs are logged over defmt.

#![no_std]

use defmt::{info, warn};

// Re-export core types for convenience
pub use gatepro_core::{
    Button, Controls, CoverOperation, DriverConfig, DriverError, GateProDriver, NumberOutput,
    Slider, TextOutput, TextSlot,
};

/// Request from the host side (push button, future network link).
#[derive(Debug, Clone, Copy, PartialEq, defmt::Format)]
pub enum HostCommand {
    Open,
    Close,
    Stop,
    /// Stop if moving, otherwise move the other way.
    Toggle,
    /// Move to a position between 0.0 (closed) and 1.0 (open).
    SetPosition(f32),
    Press(Button),
    SetNumber(Slider, f32),
}

impl HostCommand {
    /// Hand the request to the driver.
    pub fn apply<W: embedded_io::Write>(
        self,
        gate: &mut GateProDriver<'_, W>,
    ) -> Result<(), DriverError> {
        let accepted = match self {
            Self::Open => gate.open(),
            Self::Close => gate.close(),
            Self::Stop => gate.stop(),
            Self::Toggle => gate.toggle(),
            Self::SetPosition(target) => return gate.set_position(target),
            Self::Press(button) => return gate.press(button),
            Self::SetNumber(slider, value) => return gate.set_number(slider, value),
        };
        if !accepted {
            info!("{:?} ignored, gate already {:?}", self, gate.operation());
        }
        Ok(())
    }
}

/// Text and number sink that logs over defmt.
pub struct LogOutput {
    label: &'static str,
}

impl LogOutput {
    pub const fn new(label: &'static str) -> Self {
        Self { label }
    }
}

impl TextOutput for LogOutput {
    fn publish_text(&self, text: &str) {
        info!("{}: {}", self.label, text);
    }
}

impl NumberOutput for LogOutput {
    fn publish_number(&self, value: f32) {
        if value.is_nan() {
            warn!("{}: not a number", self.label);
        } else {
            info!("{}: {}", self.label, value);
        }
    }
}

pub static DEVICE_INFO: LogOutput = LogOutput::new("device info");
pub static LEARN_STATUS: LogOutput = LogOutput::new("learn status");
pub static COMMAND_STATUS: LogOutput = LogOutput::new("command");
pub static SPEED: LogOutput = LogOutput::new("speed");
pub static DECEL_DISTANCE: LogOutput = LogOutput::new("decel distance");
pub static DECEL_SPEED: LogOutput = LogOutput::new("decel speed");

/// Output handles backed by [`LogOutput`].
pub fn log_controls() -> Controls<'static> {
    Controls::new()
        .with_text(TextSlot::DeviceInfo, &DEVICE_INFO)
        .with_text(TextSlot::LearnStatus, &LEARN_STATUS)
        .with_text(TextSlot::CommandStatus, &COMMAND_STATUS)
        .with_number(Slider::Speed, &SPEED)
        .with_number(Slider::DecelDistance, &DECEL_DISTANCE)
        .with_number(Slider::DecelSpeed, &DECEL_SPEED)
}
