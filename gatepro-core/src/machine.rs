//! Cover state machine.
//!
//! Consumes decoded messages and user commands, owns the believed
//! [`CoverState`] and the single [`PendingCommand`].
//!
//! ```text
//!            open/close             ack / Moving status / event
//!   Idle ─────────────► AwaitingAck ──────────────────► Opening | Closing
//!    ▲  ▲                    │                                │
//!    │  │   timeout (resume) │        Stopped status / event  │
//!    │  └────────────────────┘              ┌─────────────────┘
//!    │                                      ▼
//!    └──── EndState / Opened / Closed ── Stopped
//! ```

use embassy_time::Instant;
use gatepro_proto::{
    Command, CommandKind, EventKind, GateEvent, Message, MotionCode, StatusRecord,
};

use crate::scheduler::PendingCommand;
use crate::types::{
    at_boundary, distance, CoverOperation, CoverState, Direction, Phase, POSITION_CLOSED, POSITION_OPEN,
    POSITION_TOLERANCE,
};

/// Cover state machine.
#[derive(Debug, Clone)]
pub struct CoverStateMachine {
    phase: Phase,
    state: CoverState,
    /// Last direction the gate travelled in.
    last_direction: Direction,
    pending: Option<PendingCommand>,
    anomalies: u32,
}

impl Default for CoverStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl CoverStateMachine {
    /// Idle, position unknown, last direction closing.
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            state: CoverState::default(),
            last_direction: Direction::Closing,
            pending: None,
            anomalies: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> &CoverState {
        &self.state
    }

    #[inline]
    #[must_use]
    pub fn last_direction(&self) -> Direction {
        self.last_direction
    }

    #[inline]
    #[must_use]
    pub fn pending(&self) -> Option<&PendingCommand> {
        self.pending.as_ref()
    }

    #[inline]
    pub(crate) fn pending_mut(&mut self) -> Option<&mut PendingCommand> {
        self.pending.as_mut()
    }

    /// Unknown motion codes and event words seen so far.
    #[inline]
    #[must_use]
    pub fn anomalies(&self) -> u32 {
        self.anomalies
    }

    /// Gate is moving or about to.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.phase.is_moving()
            || matches!(
                self.pending.as_ref().map(|p| p.command.kind()),
                Some(CommandKind::Open | CommandKind::Close)
            )
    }

    /// Queue a command.
    ///
    /// Returns `false` when the command is a no-op in the current state.
    /// A queued command replaces any pending one; the replacement keeps the
    /// phase to fall back to from the command it replaced.
    pub fn request(&mut self, command: Command) -> bool {
        if self.is_redundant(&command) {
            debug!("ignoring redundant {:?}", command);
            return false;
        }

        let resume = match self.pending.take() {
            Some(previous) => {
                debug!("{:?} supersedes {:?}", command, previous.command);
                previous.resume
            }
            None => self.phase,
        };

        if command.kind().is_motion() {
            self.phase = Phase::AwaitingAck;
        } else {
            self.phase = resume;
        }
        self.pending = Some(PendingCommand::new(command, resume));
        self.sync_operation();
        true
    }

    fn is_redundant(&self, command: &Command) -> bool {
        if let Some(pending) = self.pending.as_ref() {
            if pending.command == *command {
                return true;
            }
            // A motion command in flight is superseded, not compared
            if self.phase == Phase::AwaitingAck {
                return false;
            }
        }
        match command {
            Command::Open => self.phase == Phase::Opening,
            Command::Close => self.phase == Phase::Closing,
            Command::Stop => matches!(self.phase, Phase::Idle | Phase::Stopped),
            _ => false,
        }
    }

    /// Set or clear the intermediate target position.
    pub fn set_target(&mut self, target: Option<f32>) {
        self.state.target_position = target;
    }

    /// Moving towards an intermediate target and close enough (or past it)
    /// to stop.
    #[must_use]
    pub fn target_reached(&self) -> bool {
        if self.pending.is_some() {
            return false;
        }
        let (Some(target), Some(position)) = (self.state.target_position, self.state.position)
        else {
            return false;
        };
        if target <= POSITION_CLOSED || target >= POSITION_OPEN {
            return false;
        }

        let close = distance(position, target) < POSITION_TOLERANCE;
        match self.phase {
            Phase::Opening => close || position >= target,
            Phase::Closing => close || position <= target,
            _ => false,
        }
    }

    /// Apply an inbound message.
    ///
    /// Returns the kind of the pending command if this message
    /// acknowledged it.
    pub fn handle(&mut self, message: &Message, now: Instant) -> Option<CommandKind> {
        let reached = self.reached_end(message);
        let acked = self.correlate(message, reached);
        if let Some(kind) = acked {
            self.acknowledge(kind);
        }

        match message {
            Message::Status(status) => self.apply_status(status, reached, now),
            Message::Event(event) => self.apply_event(event),
            Message::Params(_) | Message::Ack(_) => {}
        }

        self.sync_operation();
        acked
    }

    /// Give up on the pending command and fall back to the phase held
    /// before it.
    pub fn abandon(&mut self) -> Option<CommandKind> {
        let pending = self.pending.take()?;
        if self.phase == Phase::AwaitingAck {
            self.phase = pending.resume;
        }
        self.sync_operation();
        Some(pending.command.kind())
    }

    /// Gate is travelling, or was when the pending motion command went
    /// out.
    fn travelling(&self) -> bool {
        match self.phase {
            Phase::AwaitingAck => self
                .pending
                .as_ref()
                .is_some_and(|pending| pending.resume.is_moving()),
            phase => phase.is_moving(),
        }
    }

    /// End stop an end-of-travel status or event refers to.
    fn reached_end(&self, message: &Message) -> Option<Direction> {
        match message {
            Message::Status(status) if status.motion == MotionCode::EndState => {
                if self.travelling() {
                    return Some(self.last_direction);
                }
                at_boundary(status.position()).map(|boundary| {
                    if boundary == POSITION_OPEN {
                        Direction::Opening
                    } else {
                        Direction::Closing
                    }
                })
            }
            Message::Event(event) => match event.kind {
                EventKind::Opened => Some(Direction::Opening),
                EventKind::Closed => Some(Direction::Closing),
                _ => None,
            },
            _ => None,
        }
    }

    fn correlate(&self, message: &Message, reached: Option<Direction>) -> Option<CommandKind> {
        let kind = self.pending.as_ref()?.command.kind();
        let acked = match (kind, message) {
            (_, Message::Ack(echo)) => echo.kind() == kind,
            (CommandKind::ReadStatus, Message::Status(_)) => true,
            (CommandKind::ReadParams, Message::Params(_)) => true,
            // Travel already over: the end stop settles Stop and the
            // matching motion command
            (CommandKind::Stop, _) if reached.is_some() => true,
            (CommandKind::Open, _) if reached == Some(Direction::Opening) => true,
            (CommandKind::Close, _) if reached == Some(Direction::Closing) => true,
            (CommandKind::Open, Message::Status(s)) => {
                s.motion == MotionCode::Moving && s.is_opening()
            }
            (CommandKind::Close, Message::Status(s)) => {
                s.motion == MotionCode::Moving && !s.is_opening()
            }
            (CommandKind::Stop, Message::Status(s)) => {
                matches!(s.motion, MotionCode::Stopped | MotionCode::EndState)
            }
            (CommandKind::Open, Message::Event(e)) => e.kind == EventKind::Opening,
            (CommandKind::Close, Message::Event(e)) => e.kind == EventKind::Closing,
            (CommandKind::Stop, Message::Event(e)) => e.kind == EventKind::Stopped,
            _ => false,
        };
        acked.then_some(kind)
    }

    fn acknowledge(&mut self, kind: CommandKind) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        debug!("{:?} acknowledged after {} attempts", kind, pending.attempts);

        match kind {
            CommandKind::Open => self.start_travel(Direction::Opening),
            CommandKind::Close => self.start_travel(Direction::Closing),
            CommandKind::Stop => self.phase = self.settled_phase(),
            _ => {
                if self.phase == Phase::AwaitingAck {
                    self.phase = pending.resume;
                }
            }
        }
    }

    fn start_travel(&mut self, direction: Direction) {
        self.last_direction = direction;
        self.phase = direction.phase();
    }

    /// Stopped part-way, or Idle when stopped at an end stop.
    fn settled_phase(&mut self) -> Phase {
        self.state.target_position = None;
        match self.state.position.and_then(at_boundary) {
            Some(boundary) => {
                self.state.position = Some(boundary);
                Phase::Idle
            }
            None => Phase::Stopped,
        }
    }

    /// Move to `observed`, or record it as the fallback while a motion
    /// command awaits confirmation.
    fn observe(&mut self, observed: Phase) {
        if self.phase == Phase::AwaitingAck {
            if let Some(pending) = self.pending.as_mut() {
                pending.resume = observed;
                return;
            }
        }
        self.phase = observed;
    }

    fn apply_status(&mut self, status: &StatusRecord, reached: Option<Direction>, now: Instant) {
        self.state.last_status_at = Some(now);

        let observed = match status.motion {
            MotionCode::Moving => {
                self.state.position = Some(status.position());
                let direction = if status.is_opening() {
                    Direction::Opening
                } else {
                    Direction::Closing
                };
                if self.phase.is_moving() && self.phase != direction.phase() {
                    info!("gate reversed to {:?}", direction);
                }
                self.last_direction = direction;
                direction.phase()
            }
            MotionCode::Stopped => {
                self.state.position = Some(status.position());
                self.settled_phase()
            }
            MotionCode::EndState => match reached {
                Some(direction) => self.reach(direction),
                None => {
                    self.state.position = Some(status.position());
                    self.state.target_position = None;
                    Phase::Idle
                }
            },
            MotionCode::Unknown(raw) => {
                warn!("unknown motion code {:#x}, state kept", raw);
                self.anomalies = self.anomalies.saturating_add(1);
                return;
            }
        };
        self.observe(observed);
    }

    fn apply_event(&mut self, event: &GateEvent) {
        let observed = match event.kind {
            EventKind::Opening => {
                self.last_direction = Direction::Opening;
                Phase::Opening
            }
            EventKind::Closing => {
                self.last_direction = Direction::Closing;
                Phase::Closing
            }
            EventKind::Opened => self.reach(Direction::Opening),
            EventKind::Closed => self.reach(Direction::Closing),
            EventKind::Stopped => self.settled_phase(),
            EventKind::Unknown => {
                warn!("unknown motor event #{}", event.seq);
                self.anomalies = self.anomalies.saturating_add(1);
                return;
            }
        };
        self.observe(observed);
    }

    fn reach(&mut self, direction: Direction) -> Phase {
        self.last_direction = direction;
        self.state.position = Some(direction.boundary());
        self.state.target_position = None;
        Phase::Idle
    }

    fn sync_operation(&mut self) {
        let pending = self.pending.as_ref().map(|p| (p.command.kind(), p.resume));
        self.state.operation = match (self.phase, pending) {
            (Phase::AwaitingAck, Some((CommandKind::Open, _))) => CoverOperation::Opening,
            (Phase::AwaitingAck, Some((CommandKind::Close, _))) => CoverOperation::Closing,
            (Phase::AwaitingAck, Some((_, resume))) => operation_for(resume),
            (Phase::Idle, Some((CommandKind::ReadStatus, _))) => CoverOperation::ReadStatus,
            (phase, _) => operation_for(phase),
        };
    }
}

fn operation_for(phase: Phase) -> CoverOperation {
    match phase {
        Phase::Idle | Phase::AwaitingAck => CoverOperation::Idle,
        Phase::Opening => CoverOperation::Opening,
        Phase::Closing => CoverOperation::Closing,
        Phase::Stopped => CoverOperation::Stopped,
    }
}
