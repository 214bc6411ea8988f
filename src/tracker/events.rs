use crate::{
    session::breaks::{BreakResponse, IdleDecision},
    utils::duration::TrackedDuration,
};

/// Everything that can happen to a running tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingEvent {
    /// Time passed while the user was at the computer.
    Tick {
        time_spent: TrackedDuration,
        idle_time: TrackedDuration,
    },
    /// The user came back after being idle for `idle_time`.
    Idle { idle_time: TrackedDuration },
    /// The user decided what the last idle period was.
    IdleResolved(IdleDecision),
    BreakResponse(BreakResponse),
}
