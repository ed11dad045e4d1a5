//! GateProDriver: connects the serial link to the cover model.

use core::fmt::Write as _;

use embassy_time::Instant;
use embedded_io::Write;
use gatepro_proto::{
    decode, encode, Command, CommandKind, EventKind, Frame, FrameError, FrameParser, Message,
    MotionCode, ParamBlock,
};
use heapless::String;

use crate::config::{ConfigError, DriverConfig};
use crate::controls::{Button, Controls, NumberOutput, Slider, TextOutput, TextSlot};
use crate::error::{Diagnostics, DriverError};
use crate::machine::CoverStateMachine;
use crate::scheduler::{PollScheduler, SchedulerAction};
use crate::transport::TransportError;
use crate::types::{
    at_boundary, distance, CoverOperation, CoverState, Direction, Phase, POSITION_CLOSED, POSITION_OPEN,
    POSITION_TOLERANCE,
};

/// Cover driver for one GatePro controller.
///
/// The driver never blocks. Feed it inbound bytes with
/// [`on_bytes`](Self::on_bytes) and call [`tick`](Self::tick) regularly;
/// outbound commands go straight to the writer.
///
/// # Example
///
/// ```
/// use embassy_time::Instant;
/// use gatepro_core::{CoverOperation, DriverConfig, GateProDriver};
///
/// let mut uart = [0u8; 64];
/// let mut driver = GateProDriver::new(&mut uart[..], DriverConfig::default()).unwrap();
///
/// driver.tick(Instant::from_secs(0)).unwrap();
/// driver.on_bytes(b"ACK RS:00,80,E6,32,02,FF,FF,FF\r\n");
/// assert_eq!(driver.position(), Some(0.5));
/// assert_eq!(driver.operation(), CoverOperation::Stopped);
///
/// drop(driver);
/// assert!(uart.starts_with(b"RS;src=P00287D7\r\n"));
/// ```
pub struct GateProDriver<'a, W: Write> {
    writer: W,
    config: DriverConfig,
    parser: FrameParser,
    machine: CoverStateMachine,
    scheduler: PollScheduler,
    params: Option<ParamBlock>,
    controls: Controls<'a>,
    diagnostics: Diagnostics,
    /// Time of the latest tick; stamps inbound status replies.
    now: Instant,
    learning: bool,
}

impl<'a, W: Write> GateProDriver<'a, W> {
    /// Create a driver and queue the initial status read.
    pub fn new(writer: W, config: DriverConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut machine = CoverStateMachine::new();
        machine.request(Command::ReadStatus);

        Ok(Self {
            writer,
            scheduler: PollScheduler::new(&config),
            config,
            parser: FrameParser::new(),
            machine,
            params: None,
            controls: Controls::new(),
            diagnostics: Diagnostics::default(),
            now: Instant::from_ticks(0),
            learning: false,
        })
    }

    /// Run timers: stop at the target position, send or resend the pending
    /// command, poll status.
    ///
    /// Returns [`DriverError::CommandTimeout`] once for each command that
    /// ran out of attempts.
    pub fn tick(&mut self, now: Instant) -> Result<(), DriverError> {
        self.now = now;

        if self.machine.target_reached() {
            info!("target position reached, stopping");
            self.machine.set_target(None);
            self.machine.request(Command::Stop);
        }

        match self.scheduler.poll(now, &mut self.machine) {
            Some(SchedulerAction::Transmit(command)) => self.transmit(&command),
            Some(SchedulerAction::Retransmit(command)) => {
                let count = &mut self.diagnostics.retransmissions;
                *count = count.saturating_add(1);
                self.transmit(&command)
            }
            Some(SchedulerAction::Abandoned(kind)) => {
                let err = DriverError::CommandTimeout(kind);
                self.diagnostics.record(&err);
                self.publish_command_status(kind, "timeout");
                if kind == CommandKind::Learn {
                    self.set_learning(false, "timeout");
                }
                Err(err)
            }
            None => Ok(()),
        }
    }

    /// Feed bytes received from the controller.
    ///
    /// Returns the number of messages decoded. Framing and decode errors
    /// are logged and counted, never returned.
    ///
    /// Status replies are stamped with the time passed to the latest
    /// [`tick`](Self::tick), so `last_status_at` and the poll interval lag
    /// the real arrival by up to one tick period.
    pub fn on_bytes(&mut self, chunk: &[u8]) -> usize {
        let mut decoded = 0;
        for &byte in chunk {
            match self.parser.push_byte(byte) {
                Some(Ok(frame)) => {
                    if self.handle_frame(&frame) {
                        decoded += 1;
                    }
                }
                Some(Err(err)) => self.frame_error(err),
                None => {}
            }
        }
        decoded
    }

    /// Open fully. Returns `false` if already opening.
    pub fn open(&mut self) -> bool {
        self.machine.set_target(None);
        self.machine.request(Command::Open)
    }

    /// Close fully. Returns `false` if already closing.
    pub fn close(&mut self) -> bool {
        self.machine.set_target(None);
        self.machine.request(Command::Close)
    }

    /// Stop. Returns `false` if the gate is not moving.
    pub fn stop(&mut self) -> bool {
        self.machine.set_target(None);
        self.machine.request(Command::Stop)
    }

    /// Stop if moving, otherwise travel away from the end stop the gate
    /// is at (or away from the direction it last moved in).
    pub fn toggle(&mut self) -> bool {
        if self.machine.is_moving() {
            return self.stop();
        }
        let open = match self.machine.state().position.and_then(at_boundary) {
            Some(boundary) => boundary == POSITION_CLOSED,
            None => self.machine.last_direction() == Direction::Closing,
        };
        if open {
            self.open()
        } else {
            self.close()
        }
    }

    /// Move to a position between 0.0 (closed) and 1.0 (open).
    ///
    /// End positions map to a full open or close. Intermediate targets need
    /// a known current position; the driver stops the gate once it gets
    /// within tolerance.
    pub fn set_position(&mut self, target: f32) -> Result<(), DriverError> {
        if target.is_nan() {
            return Ok(());
        }
        if target >= POSITION_OPEN {
            self.open();
            return Ok(());
        }
        if target <= POSITION_CLOSED {
            self.close();
            return Ok(());
        }

        let position = self
            .machine
            .state()
            .position
            .ok_or(DriverError::PositionUnknown)?;
        if distance(position, target) < POSITION_TOLERANCE {
            return Ok(());
        }

        let command = if target > position {
            Command::Open
        } else {
            Command::Close
        };
        self.machine.set_target(Some(target));
        self.machine.request(command);
        Ok(())
    }

    /// Handle an auxiliary button press.
    pub fn press(&mut self, button: Button) -> Result<(), DriverError> {
        let command = button.command()?;
        self.queue(command)?;
        if button == Button::Learn {
            self.controls.publish_text(TextSlot::LearnStatus, "requested");
        }
        Ok(())
    }

    /// Write a new slider value to the controller.
    pub fn set_number(&mut self, slider: Slider, value: f32) -> Result<(), DriverError> {
        let command = slider.command(value)?;
        self.queue(command)
    }

    /// Replace all output handles.
    pub fn set_controls(&mut self, controls: Controls<'a>) {
        self.controls = controls;
    }

    /// Attach a text output.
    pub fn set_text_output(&mut self, slot: TextSlot, output: &'a dyn TextOutput) {
        self.controls.set_text(slot, output);
    }

    /// Attach a number output.
    pub fn set_number_output(&mut self, slider: Slider, output: &'a dyn NumberOutput) {
        self.controls.set_number(slider, output);
    }

    /// Current position, `None` until the first status reply.
    #[inline]
    #[must_use]
    pub fn position(&self) -> Option<f32> {
        self.machine.state().position
    }

    #[inline]
    #[must_use]
    pub fn operation(&self) -> CoverOperation {
        self.machine.state().operation
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> &CoverState {
        self.machine.state()
    }

    #[inline]
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.machine.phase()
    }

    #[inline]
    #[must_use]
    pub fn machine(&self) -> &CoverStateMachine {
        &self.machine
    }

    /// Latest parameter table read from the controller.
    #[inline]
    #[must_use]
    pub fn params(&self) -> Option<&ParamBlock> {
        self.params.as_ref()
    }

    #[must_use]
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            anomalies: self.machine.anomalies(),
            ..self.diagnostics
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Get a reference to the writer.
    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Get a mutable reference to the writer.
    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Decompose the driver, returning the writer.
    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Validate a command against the wire format, then queue it.
    fn queue(&mut self, command: Command) -> Result<(), DriverError> {
        encode(&command, &self.config.source)?;
        self.machine.request(command);
        Ok(())
    }

    fn transmit(&mut self, command: &Command) -> Result<(), DriverError> {
        let frame = encode(command, &self.config.source)?;
        debug!("tx {}", frame.escaped());

        // The attempt is already counted; a failed write is retried like a
        // lost acknowledgement.
        if let Err(err) = frame.write_to(&mut self.writer) {
            let err = DriverError::Transport(TransportError::from_io(&err));
            warn!("write failed: {:?}", err);
            self.diagnostics.record(&err);
        }
        Ok(())
    }

    fn frame_error(&mut self, err: FrameError) {
        warn!("frame sync: {:?}", err);
        self.diagnostics.record(&DriverError::FrameSync(err));
    }

    fn handle_frame(&mut self, frame: &Frame) -> bool {
        debug!("rx {}", frame.escaped());

        let message = match decode(frame) {
            Ok(message) => message,
            Err(err) => {
                warn!("cannot decode {}: {:?}", frame.escaped(), err);
                self.diagnostics.record(&DriverError::Decode(err));
                return false;
            }
        };
        self.diagnostics.frames = self.diagnostics.frames.saturating_add(1);

        let acked = self.machine.handle(&message, self.now);

        match &message {
            Message::Status(status) => {
                self.scheduler.note_status(self.now);
                if status.motion == MotionCode::EndState && self.learning {
                    self.set_learning(false, "complete");
                }
            }
            Message::Params(block) => self.apply_params(block),
            Message::Event(event) => {
                if self.learning && matches!(event.kind, EventKind::Opened | EventKind::Closed) {
                    self.set_learning(false, "complete");
                }
            }
            Message::Ack(_) => {}
        }

        if let Some(kind) = acked {
            self.acknowledged(kind, &message);
        }
        true
    }

    fn acknowledged(&mut self, kind: CommandKind, message: &Message) {
        self.publish_command_status(kind, "ok");

        if kind == CommandKind::Learn {
            self.set_learning(true, "learning");
        }

        if let (Some(param), Message::Ack(echo)) = (kind.param(), message) {
            if let Some(value) = echo.payload() {
                if let Some(params) = self.params.as_mut() {
                    params.set(param, value);
                }
                self.controls
                    .publish_number(Slider::from_param(param), value as f32);
            }
        }
    }

    fn apply_params(&mut self, block: &ParamBlock) {
        info!("params: {:?}", block.values());
        self.controls
            .publish_text(TextSlot::DeviceInfo, block.summary().as_str());
        for slider in [Slider::Speed, Slider::DecelDistance, Slider::DecelSpeed] {
            if let Some(value) = block.get(slider.param()) {
                self.controls.publish_number(slider, value as f32);
            }
        }
        self.params = Some(block.clone());
    }

    fn set_learning(&mut self, learning: bool, status: &str) {
        self.learning = learning;
        self.controls.publish_text(TextSlot::LearnStatus, status);
    }

    fn publish_command_status(&self, kind: CommandKind, outcome: &str) {
        let mut text: String<48> = String::new();
        // Longest name plus outcome fits in 48 bytes
        let _ = write!(text, "{}: {}", kind.name(), outcome);
        self.controls
            .publish_text(TextSlot::CommandStatus, text.as_str());
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use core::cell::RefCell;
    use embedded_io::ErrorKind;
    use std::string::{String as StdString, ToString};
    use std::vec::Vec;

    /// Writer that records output and can fail the next few writes.
    #[derive(Default)]
    struct MockUart {
        written: Vec<u8>,
        fail_next: usize,
    }

    impl embedded_io::ErrorType for MockUart {
        type Error = ErrorKind;
    }

    impl Write for MockUart {
        fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            if self.fail_next > 0 {
                self.fail_next -= 1;
                return Err(ErrorKind::BrokenPipe);
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct Recorder {
        texts: RefCell<Vec<StdString>>,
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

    type Driver<'a> = GateProDriver<'a, MockUart>;

    fn at(secs: u64) -> Instant {
        Instant::from_secs(secs)
    }

    fn driver<'a>() -> Driver<'a> {
        GateProDriver::new(MockUart::default(), DriverConfig::default()).unwrap()
    }

    /// Driver that has completed the initial status read with the gate
    /// closed.
    fn ready<'a>() -> Driver<'a> {
        let mut d = driver();
        d.tick(at(0)).unwrap();
        d.on_bytes(b"ACK RS:00,80,E6,00,02,FF,FF,FF\r\n");
        assert!(d.machine().pending().is_none());
        d
    }

    fn lines(d: &Driver<'_>) -> Vec<StdString> {
        let text = core::str::from_utf8(&d.writer().written).unwrap();
        text.split_terminator("\r\n").map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_initial_status_read() {
        let mut d = driver();
        assert_eq!(d.operation(), CoverOperation::ReadStatus);
        d.tick(at(0)).unwrap();
        assert_eq!(lines(&d), ["RS;src=P00287D7"]);

        assert_eq!(d.on_bytes(b"ACK RS:00,80,E6,00,02,FF,FF,FF\r\n"), 1);
        assert_eq!(d.position(), Some(0.0));
        assert_eq!(d.operation(), CoverOperation::Idle);
        assert_eq!(d.state().last_status_at, Some(at(0)));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = DriverConfig::default().with_max_attempts(0);
        assert!(matches!(
            GateProDriver::new(MockUart::default(), config),
            Err(ConfigError::ZeroAttempts)
        ));
    }

    #[test]
    fn test_status_timeout_surfaces_once() {
        let mut d = driver();
        assert_eq!(d.tick(at(0)), Ok(()));
        assert_eq!(d.tick(at(2)), Ok(()));
        assert_eq!(d.tick(at(4)), Ok(()));
        assert_eq!(
            d.tick(at(6)),
            Err(DriverError::CommandTimeout(CommandKind::ReadStatus))
        );
        assert_eq!(d.tick(at(7)), Ok(()));
        assert_eq!(d.tick(at(8)), Ok(()));

        assert_eq!(lines(&d).len(), 3);
        assert!(lines(&d).iter().all(|l| l == "RS;src=P00287D7"));
        assert_eq!(d.operation(), CoverOperation::Idle);
        assert_eq!(d.position(), None);
        let diag = d.diagnostics();
        assert_eq!(diag.timeouts, 1);
        assert_eq!(diag.retransmissions, 2);
    }

    #[test]
    fn test_timeout_keeps_last_known_position() {
        let mut d = ready();
        d.on_bytes(b"ACK RS:00,80,E6,32,02,FF,FF,FF\r\n");
        assert!(d.close());
        d.tick(at(1)).unwrap();
        d.tick(at(3)).unwrap();
        d.tick(at(5)).unwrap();
        assert_eq!(
            d.tick(at(7)),
            Err(DriverError::CommandTimeout(CommandKind::Close))
        );
        assert_eq!(d.operation(), CoverOperation::Stopped);
        assert_eq!(d.position(), Some(0.5));
    }

    #[test]
    fn test_open_cycle() {
        let mut d = ready();
        assert!(d.open());
        assert_eq!(d.operation(), CoverOperation::Opening);
        d.tick(at(1)).unwrap();

        d.on_bytes(b"$V1PKF0,1,Opening;src=0001\r\n");
        assert_eq!(d.phase(), Phase::Opening);

        // Moving: poll every second
        d.tick(at(1)).unwrap();
        d.on_bytes(b"ACK RS:00,80,C4,B2,02,FF,FF,FF\r\n");
        assert_eq!(d.position(), Some(0.5));
        assert_eq!(d.operation(), CoverOperation::Opening);

        d.on_bytes(b"$V1PKF0,2,Opened;src=0001\r\n");
        assert_eq!(d.position(), Some(1.0));
        assert_eq!(d.operation(), CoverOperation::Idle);

        assert_eq!(
            lines(&d),
            ["RS;src=P00287D7", "FULL OPEN;src=P00287D7", "RS;src=P00287D7"]
        );
    }

    #[test]
    fn test_chunked_input() {
        let mut d = driver();
        d.tick(at(0)).unwrap();
        assert_eq!(d.on_bytes(b"ACK RS:00,8"), 0);
        assert_eq!(d.on_bytes(b"0,C4,96,02,FF"), 0);
        assert_eq!(d.on_bytes(b",FF,FF\r\n"), 1);
        assert_eq!(d.position(), Some(0.22));
        assert_eq!(d.operation(), CoverOperation::Opening);
    }

    #[test]
    fn test_bad_input_is_counted() {
        let mut d = driver();
        let decoded =
            d.on_bytes(b"\x00\x01zzACK RS:00,80\r\nACK RS:00,80,E6,00,02,FF\r\n$V1PKF0,7,Wobble\r\n");
        assert_eq!(decoded, 2);
        let diag = d.diagnostics();
        assert_eq!(diag.frame_errors, 1);
        assert_eq!(diag.decode_errors, 1);
        assert_eq!(diag.frames, 2);
        assert_eq!(diag.anomalies, 1);
    }

    #[test]
    fn test_set_position_needs_known_position() {
        let mut d = driver();
        assert_eq!(d.set_position(0.5), Err(DriverError::PositionUnknown));
        // End positions do not
        assert_eq!(d.set_position(1.0), Ok(()));
        assert_eq!(d.machine().pending().unwrap().command, Command::Open);
    }

    #[test]
    fn test_stop_at_target() {
        let mut d = ready();
        d.on_bytes(b"ACK RS:00,80,E6,14,02,FF,FF,FF\r\n");
        assert_eq!(d.operation(), CoverOperation::Stopped);

        d.set_position(0.6).unwrap();
        assert_eq!(d.state().target_position, Some(0.6));
        d.tick(at(1)).unwrap();
        d.on_bytes(b"ACK RS:00,80,C4,A8,02,FF,FF,FF\r\n");
        assert_eq!(d.phase(), Phase::Opening);
        d.on_bytes(b"ACK RS:00,80,C4,BA,02,FF,FF,FF\r\n");
        d.tick(at(2)).unwrap();

        assert_eq!(lines(&d).last().unwrap(), "STOP;src=P00287D7");
        assert_eq!(d.state().target_position, None);
    }

    #[test]
    fn test_set_position_within_tolerance_is_noop() {
        let mut d = ready();
        d.on_bytes(b"ACK RS:00,80,E6,32,02,FF,FF,FF\r\n");
        d.set_position(0.52).unwrap();
        assert!(d.machine().pending().is_none());
    }

    #[test]
    fn test_write_failure_counts_as_attempt() {
        let mut d = driver();
        d.writer_mut().fail_next = 1;
        d.tick(at(0)).unwrap();
        assert!(lines(&d).is_empty());
        assert_eq!(d.diagnostics().transport_errors, 1);

        d.tick(at(2)).unwrap();
        d.tick(at(4)).unwrap();
        assert_eq!(lines(&d).len(), 2);
        assert!(d.tick(at(6)).is_err());
    }

    #[test]
    fn test_toggle() {
        let mut d = ready();
        assert!(d.toggle());
        assert_eq!(d.machine().pending().unwrap().command, Command::Open);
        d.tick(at(1)).unwrap();
        d.on_bytes(b"ACK FULL OPEN\r\n");
        assert!(d.toggle());
        assert_eq!(d.machine().pending().unwrap().command, Command::Stop);
    }

    #[test]
    fn test_toggle_from_open_closes() {
        let mut d = ready();
        d.on_bytes(b"$V1PKF0,4,Opened;src=0001\r\n");
        assert!(d.toggle());
        assert_eq!(d.machine().pending().unwrap().command, Command::Close);
    }

    #[test]
    fn test_redundant_stop() {
        let mut d = ready();
        assert!(!d.stop());
    }

    #[test]
    fn test_open_while_opening_with_poll_in_flight() {
        let mut d = ready();
        assert!(d.open());
        d.tick(at(1)).unwrap();
        d.on_bytes(b"$V1PKF0,1,Opening;src=0001\r\n");
        d.tick(at(2)).unwrap();
        assert_eq!(d.machine().pending().unwrap().command, Command::ReadStatus);

        assert!(!d.open());
        assert_eq!(d.phase(), Phase::Opening);
        d.tick(at(3)).unwrap();
        assert_eq!(
            lines(&d),
            ["RS;src=P00287D7", "FULL OPEN;src=P00287D7", "RS;src=P00287D7"]
        );
    }

    #[test]
    fn test_stop_while_idle_with_poll_in_flight() {
        let mut d = ready();
        d.tick(at(61)).unwrap();
        assert_eq!(d.machine().pending().unwrap().command, Command::ReadStatus);

        assert!(!d.stop());
        d.tick(at(62)).unwrap();
        assert_eq!(lines(&d), ["RS;src=P00287D7", "RS;src=P00287D7"]);
    }

    #[test]
    fn test_end_stop_settles_pending_stop() {
        let status = Recorder::default();
        let mut d = ready();
        d.set_text_output(TextSlot::CommandStatus, &status);
        assert!(d.open());
        d.tick(at(1)).unwrap();
        d.on_bytes(b"$V1PKF0,1,Opening;src=0001\r\n");
        d.tick(at(2)).unwrap();
        d.on_bytes(b"ACK RS:00,80,C4,D0,02,FF,FF,FF\r\n");
        assert_eq!(d.position(), Some(0.8));

        assert!(d.stop());
        d.tick(at(3)).unwrap();
        assert_eq!(lines(&d).last().unwrap(), "STOP;src=P00287D7");

        // Reached the end stop before the stop took effect
        d.on_bytes(b"ACK RS:00,80,A2,5D,02,FF,FF,FF\r\n");
        assert_eq!(d.position(), Some(1.0));
        assert_eq!(d.operation(), CoverOperation::Idle);
        assert!(d.machine().pending().is_none());

        for secs in [5, 7, 9, 11] {
            assert_eq!(d.tick(at(secs)), Ok(()));
        }
        assert_eq!(d.diagnostics().timeouts, 0);
        assert_eq!(status.texts.borrow().last().unwrap(), "stop: ok");
    }

    #[test]
    fn test_status_stamped_with_latest_tick() {
        let mut d = ready();
        d.tick(at(61)).unwrap();
        d.on_bytes(b"ACK RS:00,80,E6,00,02,FF,FF,FF\r\n");
        assert_eq!(d.state().last_status_at, Some(at(61)));
    }

    #[test]
    fn test_negative_slider_value_is_rejected() {
        let mut d = ready();
        assert_eq!(
            d.set_number(Slider::DecelDistance, -40.0),
            Err(DriverError::Encode(gatepro_proto::EncodeError::InvalidValue(
                CommandKind::SetDecelDistance
            )))
        );
        assert!(d.machine().pending().is_none());
        d.tick(at(1)).unwrap();
        assert_eq!(lines(&d), ["RS;src=P00287D7"]);
    }

    #[test]
    fn test_slider_writes_parameter() {
        let status = Recorder::default();
        let decel = Recorder::default();
        let mut d = ready();
        d.set_text_output(TextSlot::CommandStatus, &status);
        d.set_number_output(Slider::DecelDistance, &decel);

        assert_eq!(
            d.set_number(Slider::DecelDistance, 130.0),
            Err(DriverError::Encode(gatepro_proto::EncodeError::OutOfRange {
                kind: CommandKind::SetDecelDistance,
                value: 130
            }))
        );
        d.set_number(Slider::DecelDistance, 30.0).unwrap();
        d.tick(at(1)).unwrap();
        assert_eq!(lines(&d).last().unwrap(), "WP,1:1,30;src=P00287D7");

        d.on_bytes(b"ACK WP,1:1,30\r\n");
        assert_eq!(*status.texts.borrow(), ["set decel distance: ok"]);
        assert_eq!(*decel.numbers.borrow(), [30.0]);
    }

    #[test]
    fn test_speed_preset_out_of_range() {
        let mut d = ready();
        assert!(matches!(
            d.press(Button::SpeedPreset(9)),
            Err(DriverError::Encode(_))
        ));
        assert!(d.machine().pending().is_none());
    }

    #[test]
    fn test_read_params_publishes() {
        let info = Recorder::default();
        let speed = Recorder::default();
        let decel_speed = Recorder::default();
        let mut d = ready();
        d.set_controls(
            Controls::new()
                .with_text(TextSlot::DeviceInfo, &info)
                .with_number(Slider::Speed, &speed)
                .with_number(Slider::DecelSpeed, &decel_speed),
        );

        d.press(Button::ReadParams).unwrap();
        d.tick(at(1)).unwrap();
        assert_eq!(lines(&d).last().unwrap(), "RP,1:;src=P00287D7");

        d.on_bytes(b"ACK RP,1:3,40,2,0,0\r\n");
        assert!(d.machine().pending().is_none());
        assert_eq!(*info.texts.borrow(), ["speed=3 decel_dist=40 decel_speed=2"]);
        assert_eq!(*speed.numbers.borrow(), [3.0]);
        assert_eq!(*decel_speed.numbers.borrow(), [2.0]);
        assert_eq!(d.params().unwrap().values(), &[3, 40, 2, 0, 0]);

        // A later write updates the cached table
        d.press(Button::SpeedPreset(4)).unwrap();
        d.tick(at(2)).unwrap();
        d.on_bytes(b"ACK WP,1:0,4\r\n");
        assert_eq!(d.params().unwrap().values()[0], 4);
        assert_eq!(*speed.numbers.borrow(), [3.0, 4.0]);
    }

    #[test]
    fn test_learn_status() {
        let learn = Recorder::default();
        let mut d = ready();
        d.set_text_output(TextSlot::LearnStatus, &learn);

        d.press(Button::Learn).unwrap();
        d.tick(at(1)).unwrap();
        assert_eq!(lines(&d).last().unwrap(), "AUTO LEARN;src=P00287D7");
        d.on_bytes(b"ACK AUTO LEARN\r\n");
        d.on_bytes(b"$V1PKF0,5,Closing;src=0001\r\n");
        d.on_bytes(b"$V1PKF0,6,Closed;src=0001\r\n");

        assert_eq!(*learn.texts.borrow(), ["requested", "learning", "complete"]);
    }

    #[test]
    fn test_superseded_command_is_sent_instead() {
        let mut d = ready();
        d.open();
        d.close();
        d.tick(at(1)).unwrap();
        assert_eq!(lines(&d).last().unwrap(), "FULL CLOSE;src=P00287D7");
        assert_eq!(d.machine().pending().unwrap().resume, Phase::Idle);
    }
}
