//! The session controller owns everything that changes while time is being tracked: the task
//! collections, the current task pointer and the break policy. All changes go through it, one
//! event at a time.

pub mod breaks;

use breaks::{BreakPolicy, BreakReminder, BreakResponse, IdleDecision};
use tracing::{debug, info, instrument, warn};

use crate::{
    config::Config,
    error::{Result, TaskError},
    ids::IdGenerator,
    notify::{Notification, Notifier},
    tasks::{
        attribution::{self, refresh_progress},
        collections::{TaskCollections, TaskList},
        model::{NewTask, Task, TaskId},
    },
    utils::{clock::Clock, duration::TrackedDuration},
    worklog::{get_complete_work_log, WorkLog},
};

pub const IDLE_TITLE: &str = "Idle time detected";

/// What happened to a tracking tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Tracked {
        task: TaskId,
        reminder: Option<BreakReminder>,
    },
    /// Nothing is being worked on.
    NoCurrentTask,
    /// An idle decision is pending, ticks are ignored until it's made.
    Dropped,
}

pub struct SessionController {
    collections: TaskCollections,
    current: Option<TaskId>,
    breaks: BreakPolicy,
    clock: Box<dyn Clock>,
    ids: Box<dyn IdGenerator>,
    notifier: Box<dyn Notifier>,
}

impl SessionController {
    /// Takes over freshly loaded tasks. Duplicate ids are reported to the user but otherwise
    /// tolerated, lookups simply return the first match.
    pub fn new(
        collections: TaskCollections,
        current: Option<TaskId>,
        config: &Config,
        clock: Box<dyn Clock>,
        ids: Box<dyn IdGenerator>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        let mut controller = Self {
            collections,
            current: None,
            breaks: BreakPolicy::new(config),
            clock,
            ids,
            notifier,
        };
        controller.report_duplicates();
        let current = current.filter(|id| {
            let found = controller
                .find_in_today(id)
                .is_some_and(|v| !v.is_parent());
            if !found {
                debug!("Dropping stale current task {id}");
            }
            found
        });
        controller.current = current;
        controller
    }

    fn report_duplicates(&mut self) {
        for (list, report) in self.collections.check_all_dupes() {
            warn!("Duplicate ids in {list:?}: {:?}", report.ids);
            self.notifier.notify(Notification {
                title: "Duplicate tasks detected".into(),
                message: report.message(),
                sound: false,
                wait: true,
            });
        }
    }

    pub fn collections(&self) -> &TaskCollections {
        &self.collections
    }

    pub fn get_today(&self) -> &[Task] {
        self.collections.get_today()
    }

    pub fn get_backlog(&self) -> &[Task] {
        self.collections.get_backlog()
    }

    pub fn get_done_backlog(&self) -> &[Task] {
        self.collections.get_done_backlog()
    }

    pub fn breaks(&self) -> &BreakPolicy {
        &self.breaks
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn current_id(&self) -> Option<&TaskId> {
        self.current.as_ref()
    }

    /// The current task, looked up among today's tasks and their subtasks.
    pub fn get_current(&self) -> Option<&Task> {
        self.current.as_ref().and_then(|id| self.find_in_today(id))
    }

    fn find_in_today(&self, id: &TaskId) -> Option<&Task> {
        self.collections
            .locate(id)
            .filter(|v| v.list == TaskList::Today)
            .map(|v| self.collections.at(v))
    }

    pub fn add_task(&mut self, new_task: NewTask) -> Result<TaskId> {
        self.collections
            .add_today(new_task, self.ids.as_ref(), self.clock.time())
    }

    pub fn add_time_spent(&mut self, id: &TaskId, elapsed: TrackedDuration) -> Result<&Task> {
        attribution::add_time_spent(&mut self.collections, id, elapsed, self.clock.time())
    }

    pub fn remove_time_spent(&mut self, id: &TaskId, elapsed: TrackedDuration) -> Result<&Task> {
        attribution::remove_time_spent(&mut self.collections, id, elapsed, self.clock.time())
    }

    /// Makes the task the one receiving tracked time, refreshing its totals and progress. `None`
    /// stops tracking.
    pub fn update_current(&mut self, id: Option<&TaskId>) -> Result<Option<&Task>> {
        let Some(id) = id else {
            if let Some(previous) = self.current.take() {
                info!("Stopped tracking {previous}");
            }
            return Ok(None);
        };

        let location = self
            .collections
            .locate(id)
            .ok_or_else(|| TaskError::NotFound(id.clone()))?;
        if location.list != TaskList::Today {
            return Err(TaskError::NotPlannedForToday(id.clone()));
        }
        let task = self.collections.at_mut(location);
        if task.is_parent() {
            return Err(TaskError::AttributionToParent(id.clone()));
        }
        refresh_progress(task);
        if self.current.as_ref() != Some(id) {
            info!("Tracking {} ({})", task.title, task.id);
        }
        self.current = Some(id.clone());
        Ok(Some(&*task))
    }

    /// A timer tick: `time_spent` of work on the current task, during which the user was idle
    /// for `idle_time`.
    #[instrument(skip(self))]
    pub fn on_tick(
        &mut self,
        time_spent: TrackedDuration,
        idle_time: TrackedDuration,
    ) -> Result<TickOutcome> {
        if self.breaks.is_awaiting_decision() {
            return Ok(TickOutcome::Dropped);
        }
        let Some(current) = self.current.clone() else {
            return Ok(TickOutcome::NoCurrentTask);
        };

        self.add_time_spent(&current, time_spent)?;
        self.update_current(Some(&current))?;
        let reminder = self.breaks.check_take_a_break(time_spent, Some(idle_time));
        if let Some(reminder) = &reminder {
            self.notifier.notify(Notification {
                title: BreakReminder::TITLE.into(),
                message: reminder.message(),
                sound: true,
                wait: true,
            });
        }
        Ok(TickOutcome::Tracked {
            task: current,
            reminder,
        })
    }

    /// The user went idle. Returns `true` if they need to be asked what the idle time was.
    pub fn on_idle(&mut self, idle_time: TrackedDuration) -> bool {
        debug!("Idle for {idle_time}");
        if !self.breaks.on_idle() {
            return false;
        }
        self.notifier.notify(Notification {
            title: IDLE_TITLE.into(),
            message: format!(
                "You have been idle for {idle_time}. Was that work (work) or a break (break)?"
            ),
            sound: false,
            wait: true,
        });
        true
    }

    /// Applies the user's answer about an idle period. Time counted as work is attributed to the
    /// current task.
    pub fn resolve_idle(&mut self, decision: IdleDecision, idle_time: TrackedDuration) -> Result<()> {
        if !self.breaks.is_awaiting_decision() {
            warn!("No idle period to resolve");
            return Ok(());
        }
        self.breaks.resolve_idle(decision, idle_time);
        if decision == IdleDecision::CountAsWork {
            if let Some(current) = self.current.clone() {
                self.add_time_spent(&current, idle_time)?;
                self.update_current(Some(&current))?;
            }
        }
        Ok(())
    }

    pub fn respond_to_reminder(&mut self, response: BreakResponse) {
        self.breaks.respond_to_reminder(response);
    }

    /// Marks a task done or undone. A finished current task stops being tracked.
    pub fn set_done(&mut self, id: &TaskId, is_done: bool) -> Result<&Task> {
        let task = self
            .collections
            .get_by_id_mut(id)
            .ok_or_else(|| TaskError::NotFound(id.clone()))?;
        task.is_done = is_done;
        if is_done && self.current.as_ref() == Some(id) {
            info!("Finished current task {id}");
            self.current = None;
        }
        Ok(&*task)
    }

    /// Moves done and unfinished tasks out of today and stops tracking.
    pub fn finish_day(&mut self, clear_done_tasks: bool, move_unfinished_to_backlog: bool) {
        self.collections
            .finish_day(clear_done_tasks, move_unfinished_to_backlog);
        self.current = None;
    }

    /// Snapshot of everything tracked so far.
    pub fn work_log(&self) -> WorkLog<'_> {
        get_complete_work_log(self.collections.get_all_tasks(), self.ids.as_ref())
    }

    pub fn into_parts(self) -> (TaskCollections, Option<TaskId>) {
        (self.collections, self.current)
    }
}
