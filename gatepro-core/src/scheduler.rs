//! Status polling and command retry.

use embassy_time::{Duration, Instant};
use gatepro_proto::{Command, CommandKind};

use crate::config::DriverConfig;
use crate::machine::CoverStateMachine;
use crate::types::Phase;

/// An outbound command waiting for acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PendingCommand {
    pub command: Command,
    /// Time of the latest transmission, `None` until first sent.
    pub sent_at: Option<Instant>,
    /// When the latest transmission times out.
    pub deadline: Option<Instant>,
    /// Transmissions so far.
    pub attempts: u8,
    /// Phase to fall back to if the command is abandoned.
    pub resume: Phase,
}

impl PendingCommand {
    #[must_use]
    pub const fn new(command: Command, resume: Phase) -> Self {
        Self {
            command,
            sent_at: None,
            deadline: None,
            attempts: 0,
            resume,
        }
    }

    fn mark_sent(&mut self, now: Instant, timeout: Duration) {
        self.attempts = self.attempts.saturating_add(1);
        self.sent_at = Some(now);
        self.deadline = Some(now + timeout);
    }
}

/// How often a command is sent and how long each attempt waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RetryPolicy {
    /// Transmissions per command, the first one included.
    pub max_attempts: u8,
    pub ack_timeout: Duration,
}

impl RetryPolicy {
    #[inline]
    #[must_use]
    pub fn can_retry(&self, attempts: u8) -> bool {
        attempts < self.max_attempts
    }
}

/// What the driver should do after a scheduler pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SchedulerAction {
    /// First transmission of a queued command.
    Transmit(Command),
    /// Previous attempt timed out; send again.
    Retransmit(Command),
    /// Attempts exhausted; the command was dropped.
    Abandoned(CommandKind),
}

/// Decides when to send, resend, give up and poll.
#[derive(Debug, Clone)]
pub struct PollScheduler {
    poll_interval: Duration,
    moving_poll_interval: Duration,
    retry: RetryPolicy,
    last_poll: Option<Instant>,
}

impl PollScheduler {
    #[must_use]
    pub fn new(config: &DriverConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            moving_poll_interval: config.moving_poll_interval,
            retry: RetryPolicy {
                max_attempts: config.max_attempts,
                ack_timeout: config.ack_timeout,
            },
            last_poll: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Restart the poll interval; called on every status reply.
    pub fn note_status(&mut self, now: Instant) {
        self.last_poll = Some(now);
    }

    /// Next poll time, `None` if a poll is due right away.
    #[must_use]
    pub fn next_poll_at(&self, machine: &CoverStateMachine) -> Option<Instant> {
        let interval = if machine.is_moving() {
            self.moving_poll_interval
        } else {
            self.poll_interval
        };
        self.last_poll.map(|last| last + interval)
    }

    /// Run one scheduler pass.
    ///
    /// Sends a freshly queued command, retries or abandons a timed-out
    /// one, and queues a status poll when nothing is in flight.
    pub fn poll(
        &mut self,
        now: Instant,
        machine: &mut CoverStateMachine,
    ) -> Option<SchedulerAction> {
        if machine.pending().is_none() {
            let due = self.next_poll_at(machine).map_or(true, |at| now >= at);
            if !due {
                return None;
            }
            debug!("status poll due");
            machine.request(Command::ReadStatus);
        }

        let retry = self.retry;
        let pending = machine.pending_mut()?;

        match pending.deadline {
            None => {
                pending.mark_sent(now, retry.ack_timeout);
                let command = pending.command;
                if command == Command::ReadStatus {
                    self.last_poll = Some(now);
                }
                Some(SchedulerAction::Transmit(command))
            }
            Some(deadline) if now >= deadline => {
                if retry.can_retry(pending.attempts) {
                    pending.mark_sent(now, retry.ack_timeout);
                    debug!(
                        "retrying {:?}, attempt {}",
                        pending.command,
                        pending.attempts
                    );
                    Some(SchedulerAction::Retransmit(pending.command))
                } else {
                    let kind = machine.abandon()?;
                    warn!("{:?} not acknowledged, giving up", kind);
                    Some(SchedulerAction::Abandoned(kind))
                }
            }
            Some(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatepro_proto::{decode, Frame};

    fn at(secs: u64) -> Instant {
        Instant::from_secs(secs)
    }

    fn setup() -> (PollScheduler, CoverStateMachine) {
        (
            PollScheduler::new(&DriverConfig::default()),
            CoverStateMachine::new(),
        )
    }

    fn status_reply(machine: &mut CoverStateMachine, scheduler: &mut PollScheduler, now: Instant) {
        let frame = Frame::new(b"ACK RS:00,80,E6,00,02,FF,FF,FF").unwrap();
        machine.handle(&decode(&frame).unwrap(), now);
        scheduler.note_status(now);
    }

    #[test]
    fn test_first_pass_polls_status() {
        let (mut scheduler, mut machine) = setup();
        assert_eq!(
            scheduler.poll(at(0), &mut machine),
            Some(SchedulerAction::Transmit(Command::ReadStatus))
        );
        let pending = machine.pending().unwrap();
        assert_eq!(pending.attempts, 1);
        assert_eq!(pending.sent_at, Some(at(0)));
        assert_eq!(pending.deadline, Some(at(2)));
    }

    #[test]
    fn test_waits_for_deadline() {
        let (mut scheduler, mut machine) = setup();
        scheduler.poll(at(0), &mut machine);
        assert_eq!(scheduler.poll(at(1), &mut machine), None);
        assert_eq!(
            scheduler.poll(at(2), &mut machine),
            Some(SchedulerAction::Retransmit(Command::ReadStatus))
        );
        assert_eq!(machine.pending().unwrap().attempts, 2);
    }

    #[test]
    fn test_abandons_after_max_attempts() {
        let (mut scheduler, mut machine) = setup();
        scheduler.poll(at(0), &mut machine);
        scheduler.poll(at(2), &mut machine);
        scheduler.poll(at(4), &mut machine);
        assert_eq!(
            scheduler.poll(at(6), &mut machine),
            Some(SchedulerAction::Abandoned(CommandKind::ReadStatus))
        );
        assert!(machine.pending().is_none());
        // Next poll counts from the first transmission
        assert_eq!(scheduler.poll(at(30), &mut machine), None);
        assert_eq!(
            scheduler.poll(at(60), &mut machine),
            Some(SchedulerAction::Transmit(Command::ReadStatus))
        );
    }

    #[test]
    fn test_status_resets_poll_clock() {
        let (mut scheduler, mut machine) = setup();
        scheduler.poll(at(0), &mut machine);
        status_reply(&mut machine, &mut scheduler, at(1));
        assert!(machine.pending().is_none());

        assert_eq!(scheduler.poll(at(60), &mut machine), None);
        assert!(scheduler.poll(at(61), &mut machine).is_some());
    }

    #[test]
    fn test_moving_interval() {
        let (mut scheduler, mut machine) = setup();
        scheduler.poll(at(0), &mut machine);
        status_reply(&mut machine, &mut scheduler, at(0));

        machine.request(Command::Open);
        assert_eq!(
            scheduler.poll(at(1), &mut machine),
            Some(SchedulerAction::Transmit(Command::Open))
        );
        let event = Frame::new(b"$V1PKF0,9,Opening;src=0001").unwrap();
        machine.handle(&decode(&event).unwrap(), at(1));

        assert_eq!(
            scheduler.poll(at(1), &mut machine),
            Some(SchedulerAction::Transmit(Command::ReadStatus))
        );
    }

    #[test]
    fn test_user_command_is_not_replaced_by_poll() {
        let (mut scheduler, mut machine) = setup();
        machine.request(Command::Close);
        assert_eq!(
            scheduler.poll(at(100), &mut machine),
            Some(SchedulerAction::Transmit(Command::Close))
        );
        assert_eq!(machine.pending().unwrap().command, Command::Close);
    }

    #[test]
    fn test_retry_policy() {
        let policy = RetryPolicy {
            max_attempts: 3,
            ack_timeout: Duration::from_secs(2),
        };
        assert!(policy.can_retry(1));
        assert!(policy.can_retry(2));
        assert!(!policy.can_retry(3));
    }
}
