//! Auxiliary controls: buttons, sliders and optional output handles.
//!
//! The host attaches whichever outputs it has. Outputs take `&self`, so
//! implementations that need to store values use interior mutability.

use gatepro_proto::{Command, CommandKind, EncodeError, Param};

/// Receives text published by the driver.
pub trait TextOutput {
    fn publish_text(&self, text: &str);
}

/// Receives numbers published by the driver.
pub trait NumberOutput {
    fn publish_number(&self, value: f32);
}

/// Momentary buttons the host can press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    /// Start the travel-limit learning run.
    Learn,
    /// Read the device parameter table.
    ReadParams,
    /// Write a fixed speed (1-4).
    SpeedPreset(u8),
}

impl Button {
    /// Command sent when the button is pressed.
    pub fn command(self) -> Result<Command, EncodeError> {
        match self {
            Self::Learn => Ok(Command::Learn),
            Self::ReadParams => Ok(Command::ReadParams),
            Self::SpeedPreset(speed) => Command::write_param(Param::Speed, speed),
        }
    }
}

/// Numeric settings the host can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Slider {
    Speed,
    DecelDistance,
    DecelSpeed,
}

impl Slider {
    #[must_use]
    pub const fn param(self) -> Param {
        match self {
            Self::Speed => Param::Speed,
            Self::DecelDistance => Param::DecelDistance,
            Self::DecelSpeed => Param::DecelSpeed,
        }
    }

    #[must_use]
    pub const fn from_param(param: Param) -> Self {
        match param {
            Param::Speed => Self::Speed,
            Param::DecelDistance => Self::DecelDistance,
            Param::DecelSpeed => Self::DecelSpeed,
        }
    }

    /// Setter command written by this slider.
    #[must_use]
    pub const fn kind(self) -> CommandKind {
        match self {
            Self::Speed => CommandKind::SetSpeed,
            Self::DecelDistance => CommandKind::SetDecelDistance,
            Self::DecelSpeed => CommandKind::SetDecelSpeed,
        }
    }

    /// Setter command for a slider value. The value is rounded to the
    /// nearest integer first.
    pub fn command(self, value: f32) -> Result<Command, EncodeError> {
        let value = round_to_u8(value).ok_or(EncodeError::InvalidValue(self.kind()))?;
        Command::write_param(self.param(), value)
    }
}

/// Text outputs the driver publishes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TextSlot {
    /// Parameter table summary.
    DeviceInfo,
    LearnStatus,
    /// Outcome of the latest command.
    CommandStatus,
}

/// Optional output handles.
#[derive(Clone, Copy, Default)]
pub struct Controls<'a> {
    pub device_info: Option<&'a dyn TextOutput>,
    pub learn_status: Option<&'a dyn TextOutput>,
    pub command_status: Option<&'a dyn TextOutput>,
    pub speed: Option<&'a dyn NumberOutput>,
    pub decel_distance: Option<&'a dyn NumberOutput>,
    pub decel_speed: Option<&'a dyn NumberOutput>,
}

impl<'a> Controls<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_text(mut self, slot: TextSlot, output: &'a dyn TextOutput) -> Self {
        self.set_text(slot, output);
        self
    }

    #[must_use]
    pub fn with_number(mut self, slider: Slider, output: &'a dyn NumberOutput) -> Self {
        self.set_number(slider, output);
        self
    }

    pub fn set_text(&mut self, slot: TextSlot, output: &'a dyn TextOutput) {
        *self.text_mut(slot) = Some(output);
    }

    pub fn set_number(&mut self, slider: Slider, output: &'a dyn NumberOutput) {
        *self.number_mut(slider) = Some(output);
    }

    /// Publish to a text output if one is attached.
    pub fn publish_text(&self, slot: TextSlot, text: &str) {
        let output = match slot {
            TextSlot::DeviceInfo => self.device_info,
            TextSlot::LearnStatus => self.learn_status,
            TextSlot::CommandStatus => self.command_status,
        };
        if let Some(output) = output {
            output.publish_text(text);
        }
    }

    /// Publish to a number output if one is attached.
    pub fn publish_number(&self, slider: Slider, value: f32) {
        let output = match slider {
            Slider::Speed => self.speed,
            Slider::DecelDistance => self.decel_distance,
            Slider::DecelSpeed => self.decel_speed,
        };
        if let Some(output) = output {
            output.publish_number(value);
        }
    }

    fn text_mut(&mut self, slot: TextSlot) -> &mut Option<&'a dyn TextOutput> {
        match slot {
            TextSlot::DeviceInfo => &mut self.device_info,
            TextSlot::LearnStatus => &mut self.learn_status,
            TextSlot::CommandStatus => &mut self.command_status,
        }
    }

    fn number_mut(&mut self, slider: Slider) -> &mut Option<&'a dyn NumberOutput> {
        match slider {
            Slider::Speed => &mut self.speed,
            Slider::DecelDistance => &mut self.decel_distance,
            Slider::DecelSpeed => &mut self.decel_speed,
        }
    }
}

/// Round half up. `None` for NaN, negative values and anything that
/// rounds past 255.
fn round_to_u8(value: f32) -> Option<u8> {
    if !(0.0..255.5).contains(&value) {
        return None;
    }
    Some((value + 0.5) as u8)
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use core::cell::RefCell;
    use std::string::{String, ToString};
    use std::vec::Vec;

    #[derive(Default)]
    struct Recorder {
        texts: RefCell<Vec<String>>,
        numbers: RefCell<Vec<f32>>,
    }

    impl TextOutput for Recorder {
        fn publish_text(&self, text: &str) {
            self.texts.borrow_mut().push(text.to_string());
        }
    }

    impl NumberOutput for Recorder {
        fn publish_number(&self, value: f32) {
            self.numbers.borrow_mut().push(value);
        }
    }

    #[test]
    fn test_button_commands() {
        assert_eq!(Button::Learn.command(), Ok(Command::Learn));
        assert_eq!(Button::ReadParams.command(), Ok(Command::ReadParams));
        assert_eq!(Button::SpeedPreset(4).command(), Ok(Command::SetSpeed(4)));
        assert!(Button::SpeedPreset(7).command().is_err());
    }

    #[test]
    fn test_slider_rounding() {
        assert_eq!(Slider::DecelDistance.command(29.6), Ok(Command::SetDecelDistance(30)));
        assert_eq!(Slider::Speed.command(2.4), Ok(Command::SetSpeed(2)));
        assert!(Slider::Speed.command(-3.0).is_err());
        assert!(Slider::DecelDistance.command(1000.0).is_err());
        assert!(Slider::DecelSpeed.command(f32::NAN).is_err());
    }

    #[test]
    fn test_slider_rejects_values_outside_u8() {
        assert_eq!(
            Slider::DecelDistance.command(-40.0),
            Err(EncodeError::InvalidValue(CommandKind::SetDecelDistance))
        );
        assert_eq!(
            Slider::DecelDistance.command(f32::NAN),
            Err(EncodeError::InvalidValue(CommandKind::SetDecelDistance))
        );
        assert_eq!(
            Slider::Speed.command(300.0),
            Err(EncodeError::InvalidValue(CommandKind::SetSpeed))
        );
        assert_eq!(Slider::DecelDistance.command(0.0), Ok(Command::SetDecelDistance(0)));
    }

    #[test]
    fn test_publish_only_to_attached_outputs() {
        let recorder = Recorder::default();
        let controls = Controls::new()
            .with_text(TextSlot::CommandStatus, &recorder)
            .with_number(Slider::Speed, &recorder);

        controls.publish_text(TextSlot::CommandStatus, "ok");
        controls.publish_text(TextSlot::DeviceInfo, "dropped");
        controls.publish_number(Slider::Speed, 3.0);
        controls.publish_number(Slider::DecelSpeed, 1.0);

        assert_eq!(*recorder.texts.borrow(), ["ok"]);
        assert_eq!(*recorder.numbers.borrow(), [3.0]);
    }

    #[test]
    fn test_slider_param_mapping() {
        for slider in [Slider::Speed, Slider::DecelDistance, Slider::DecelSpeed] {
            assert_eq!(Slider::from_param(slider.param()), slider);
        }
    }
}
