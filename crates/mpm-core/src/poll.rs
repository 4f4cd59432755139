//! Poll scheduling state machine.
//!
//! The scheduler never performs I/O. It hands out [`PollTicket`]s for the
//! caller to attach to snapshot requests and decides, when a response comes
//! back, whether it may still be applied.
//!
//! Every `Stopped`/`Running` transition starts a new generation. A response
//! is accepted only if it was issued in the current generation and is newer
//! than the last response applied, so late answers from a previous cycle
//! (or an older overlapping request) can never overwrite fresher state.

use std::time::Duration;

/// Default interval between scheduled polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollState {
    #[default]
    Stopped,
    Running,
}

/// Why a poll was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollReason {
    /// Interval tick while running.
    Scheduled,
    /// Immediate poll on resume.
    Resumed,
    /// Operator refresh or post-action refresh.
    OutOfCycle,
}

/// Identifies one snapshot request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTicket {
    pub generation: u64,
    pub seq: u64,
    pub reason: PollReason,
}

#[derive(Debug, Clone)]
pub struct PollScheduler {
    state: PollState,
    interval: Duration,
    generation: u64,
    next_seq: u64,
    last_applied_seq: Option<u64>,
    in_flight: usize,
}

impl PollScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            state: PollState::Stopped,
            interval,
            generation: 0,
            next_seq: 0,
            last_applied_seq: None,
            in_flight: 0,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == PollState::Running
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Requests issued but not yet resolved.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// `Stopped → Running`. Returns the ticket for the immediate poll,
    /// or `None` if already running.
    pub fn resume(&mut self) -> Option<PollTicket> {
        if self.is_running() {
            return None;
        }
        self.state = PollState::Running;
        self.new_generation();
        Some(self.issue(PollReason::Resumed))
    }

    /// `Running → Stopped`. Outstanding requests become stale.
    pub fn pause(&mut self) {
        if self.is_running() {
            self.state = PollState::Stopped;
            self.new_generation();
        }
    }

    /// Flips between running and stopped; returns the immediate poll ticket on resume.
    pub fn toggle(&mut self) -> Option<PollTicket> {
        if self.is_running() {
            self.pause();
            None
        } else {
            self.resume()
        }
    }

    /// Interval tick. Issues a ticket only while running.
    pub fn tick(&mut self) -> Option<PollTicket> {
        if self.is_running() {
            Some(self.issue(PollReason::Scheduled))
        } else {
            None
        }
    }

    /// Issues a ticket regardless of state.
    pub fn out_of_cycle(&mut self) -> PollTicket {
        self.issue(PollReason::OutOfCycle)
    }

    /// Decides whether the response for `ticket` may be applied.
    ///
    /// Must be called exactly once per issued ticket, whether the request
    /// succeeded or not; failed requests still resolve their ticket.
    pub fn accept(&mut self, ticket: &PollTicket) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);

        if ticket.generation != self.generation {
            return false;
        }
        if self.last_applied_seq.is_some_and(|last| ticket.seq <= last) {
            return false;
        }
        self.last_applied_seq = Some(ticket.seq);
        true
    }

    fn issue(&mut self, reason: PollReason) -> PollTicket {
        self.next_seq = self.next_seq.wrapping_add(1);
        self.in_flight = self.in_flight.saturating_add(1);
        PollTicket {
            generation: self.generation,
            seq: self.next_seq,
            reason,
        }
    }

    fn new_generation(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.last_applied_seq = None;
    }
}

impl Default for PollScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_stopped() {
        let mut scheduler = PollScheduler::default();
        assert_eq!(scheduler.state(), PollState::Stopped);
        assert_eq!(scheduler.interval(), Duration::from_secs(5));
        assert!(scheduler.tick().is_none());
    }

    #[test]
    fn test_resume_issues_immediate_poll() {
        let mut scheduler = PollScheduler::default();
        let ticket = scheduler.resume().unwrap();
        assert_eq!(ticket.reason, PollReason::Resumed);
        assert!(scheduler.is_running());
        assert!(scheduler.resume().is_none());
    }

    #[test]
    fn test_tick_only_while_running() {
        let mut scheduler = PollScheduler::default();
        scheduler.resume();
        assert!(scheduler.tick().is_some());
        scheduler.pause();
        assert!(scheduler.tick().is_none());
    }

    #[test]
    fn test_response_after_stop_is_discarded() {
        let mut scheduler = PollScheduler::default();
        scheduler.resume();
        let ticket = scheduler.tick().unwrap();
        scheduler.pause();
        assert!(!scheduler.accept(&ticket));
    }

    #[test]
    fn test_response_after_stop_and_restart_is_discarded() {
        let mut scheduler = PollScheduler::default();
        scheduler.resume();
        let old = scheduler.tick().unwrap();
        scheduler.pause();
        let fresh = scheduler.resume().unwrap();

        assert!(scheduler.accept(&fresh));
        assert!(!scheduler.accept(&old));
    }

    #[test]
    fn test_older_overlapping_response_is_discarded() {
        let mut scheduler = PollScheduler::default();
        scheduler.resume();
        let first = scheduler.tick().unwrap();
        let second = scheduler.tick().unwrap();
        assert_eq!(scheduler.in_flight(), 3);

        assert!(scheduler.accept(&second));
        assert!(!scheduler.accept(&first));
    }

    #[test]
    fn test_in_order_responses_accepted() {
        let mut scheduler = PollScheduler::default();
        let resumed = scheduler.resume().unwrap();
        let tick = scheduler.tick().unwrap();
        assert!(scheduler.accept(&resumed));
        assert!(scheduler.accept(&tick));
        assert_eq!(scheduler.in_flight(), 0);
    }

    #[test]
    fn test_out_of_cycle_while_stopped() {
        let mut scheduler = PollScheduler::default();
        let ticket = scheduler.out_of_cycle();
        assert_eq!(ticket.reason, PollReason::OutOfCycle);
        assert!(scheduler.accept(&ticket));
    }

    #[test]
    fn test_toggle() {
        let mut scheduler = PollScheduler::default();
        assert!(scheduler.toggle().is_some());
        assert!(scheduler.is_running());
        assert!(scheduler.toggle().is_none());
        assert!(!scheduler.is_running());
    }

    #[test]
    fn test_pause_when_stopped_keeps_generation() {
        let mut scheduler = PollScheduler::default();
        let generation = scheduler.generation();
        scheduler.pause();
        assert_eq!(scheduler.generation(), generation);
    }
}
