use tracing::{debug, info, warn};

use crate::{config::Config, utils::duration::TrackedDuration};

/// Whether the user is being asked what to do with an idle period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Tracking,
    AwaitingUserDecision,
}

/// Answer to "you were idle, what was that time?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleDecision {
    /// The idle time was work and is tracked.
    CountAsWork,
    /// The idle time was a break.
    DiscardAsBreak,
}

/// Answer to a break reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakResponse {
    /// "I already did!". Resets the working time.
    AlreadyTookBreak,
    /// Closed or timed out. Working time keeps adding up.
    Dismissed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakReminder {
    pub worked_without_break: TrackedDuration,
}

impl BreakReminder {
    pub const TITLE: &'static str = "Take a break!";

    pub fn message(&self) -> String {
        format!(
            "Take a break! You have been working for {} without one. Go away from the computer! \
             Makes you more productive in the long run!",
            self.worked_without_break
        )
    }
}

/// Ephemeral, lives as long as the process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub time_worked_without_break: Option<TrackedDuration>,
}

/// Keeps track of continuous work and decides when to remind about a break.
#[derive(Debug)]
pub struct BreakPolicy {
    is_enabled: bool,
    min_working_time: TrackedDuration,
    min_idle_to_suppress: TrackedDuration,
    session: Session,
    state: SessionState,
    reminders_enabled: bool,
    /// A reminder was raised and hasn't been answered yet.
    reminder_open: bool,
}

impl BreakPolicy {
    pub fn new(config: &Config) -> Self {
        Self {
            is_enabled: config.is_take_a_break_enabled,
            min_working_time: config.take_a_break_min_working_time,
            min_idle_to_suppress: config.min_idle_time_to_suppress_break,
            session: Session::default(),
            state: SessionState::Tracking,
            reminders_enabled: true,
            reminder_open: false,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_awaiting_decision(&self) -> bool {
        self.state == SessionState::AwaitingUserDecision
    }

    /// Adds worked time and returns a reminder if it's time for a break.
    ///
    /// Work only adds up while breaks are enabled. A reminder needs the threshold to be exceeded,
    /// the same event not to be mostly idle, reminders not to be suppressed by an open idle
    /// decision and no earlier reminder to be waiting for an answer.
    pub fn check_take_a_break(
        &mut self,
        time_spent: TrackedDuration,
        idle_time: Option<TrackedDuration>,
    ) -> Option<BreakReminder> {
        if !self.is_enabled {
            return None;
        }

        let worked = self
            .session
            .time_worked_without_break
            .get_or_insert(TrackedDuration::ZERO);
        worked.accumulate(time_spent);
        let worked = *worked;

        if worked.as_seconds() <= self.min_working_time.as_seconds() {
            return None;
        }
        if idle_time.is_some_and(|v| v > self.min_idle_to_suppress) {
            debug!("Skipping break reminder, idle for {idle_time:?}");
            return None;
        }
        if !self.reminders_enabled || self.reminder_open {
            return None;
        }

        info!("Worked for {worked} without a break");
        self.reminder_open = true;
        Some(BreakReminder {
            worked_without_break: worked,
        })
    }

    /// An idle period was detected. Returns `true` if the user should be asked about it, `false`
    /// if a decision is already pending and this event is dropped.
    pub fn on_idle(&mut self) -> bool {
        self.reminders_enabled = false;
        if self.is_awaiting_decision() {
            debug!("Idle decision already pending, dropping idle event");
            return false;
        }
        self.state = SessionState::AwaitingUserDecision;
        true
    }

    pub fn resolve_idle(&mut self, decision: IdleDecision, idle_time: TrackedDuration) {
        if !self.is_awaiting_decision() {
            warn!("Got idle decision {decision:?} without a pending idle period");
            return;
        }
        match decision {
            // still suppressed here, the next tracked event evaluates the reminder
            IdleDecision::CountAsWork => {
                self.check_take_a_break(idle_time, None);
            }
            IdleDecision::DiscardAsBreak => {
                self.session.time_worked_without_break = None;
            }
        }
        self.state = SessionState::Tracking;
        self.reminders_enabled = true;
    }

    pub fn respond_to_reminder(&mut self, response: BreakResponse) {
        if response == BreakResponse::AlreadyTookBreak {
            self.session.time_worked_without_break = None;
        }
        self.reminder_open = false;
    }
}

#[cfg(test)]
mod tests {
    use crate::{config::Config, utils::duration::TrackedDuration};

    use super::{BreakPolicy, BreakResponse, IdleDecision, SessionState};

    fn policy() -> BreakPolicy {
        BreakPolicy::new(&Config {
            is_take_a_break_enabled: true,
            take_a_break_min_working_time: TrackedDuration::from_millis(3_600_000),
            ..Config::default()
        })
    }

    fn ms(v: u64) -> TrackedDuration {
        TrackedDuration::from_millis(v)
    }

    #[test]
    fn test_reminder_fires_once() {
        let mut policy = policy();
        let mut reminders = 0;
        for _ in 0..37 {
            if policy.check_take_a_break(ms(100_000), Some(ms(1000))).is_some() {
                reminders += 1;
            }
        }
        assert_eq!(reminders, 1);
        assert_eq!(
            policy.session().time_worked_without_break,
            Some(ms(3_700_000))
        );
    }

    #[test]
    fn test_dismissed_reminder_fires_again() {
        let mut policy = policy();
        assert!(policy.check_take_a_break(ms(3_700_000), None).is_some());
        policy.respond_to_reminder(BreakResponse::Dismissed);
        assert!(policy.check_take_a_break(ms(1000), None).is_some());

        policy.respond_to_reminder(BreakResponse::AlreadyTookBreak);
        assert_eq!(policy.session().time_worked_without_break, None);
        assert!(policy.check_take_a_break(ms(1000), None).is_none());
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let mut policy = policy();
        assert!(policy.check_take_a_break(ms(3_600_000), None).is_none());
        assert!(policy.check_take_a_break(ms(1000), None).is_some());
    }

    #[test]
    fn test_idle_event_suppresses() {
        let mut policy = policy();
        assert!(policy
            .check_take_a_break(ms(3_700_000), Some(ms(10_000)))
            .is_none());
        assert!(policy.check_take_a_break(ms(1000), Some(ms(9999))).is_some());
    }

    #[test]
    fn test_disabled_does_nothing() {
        let mut policy = BreakPolicy::new(&Config::default());
        assert!(policy.check_take_a_break(ms(10_000_000), None).is_none());
        assert_eq!(policy.session().time_worked_without_break, None);
    }

    #[test]
    fn test_idle_dialog_flow() {
        let mut policy = policy();
        assert!(policy.on_idle());
        assert_eq!(policy.state(), SessionState::AwaitingUserDecision);
        assert!(!policy.on_idle());

        // reminders are held back while the decision is pending
        assert!(policy.check_take_a_break(ms(3_700_000), None).is_none());

        policy.resolve_idle(IdleDecision::CountAsWork, ms(60_000));
        assert_eq!(policy.state(), SessionState::Tracking);
        assert_eq!(
            policy.session().time_worked_without_break,
            Some(ms(3_760_000))
        );
        assert!(policy.check_take_a_break(ms(1000), None).is_some());
    }

    #[test]
    fn test_idle_as_break_resets() {
        let mut policy = policy();
        policy.check_take_a_break(ms(1_000_000), None);
        assert!(policy.on_idle());
        policy.resolve_idle(IdleDecision::DiscardAsBreak, ms(600_000));
        assert_eq!(policy.session().time_worked_without_break, None);
        assert_eq!(policy.state(), SessionState::Tracking);
    }
}
