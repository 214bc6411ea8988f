//! Attribution of elapsed work time to tasks.
//!
//! Time is always recorded on the calendar day (local time) of the moment it is attributed. A
//! subtask's time is mirrored into its parent by fully re-merging all of the parent's subtasks
//! after every change, so the parent can never drift from the sum of its children.

use chrono::{DateTime, Local};
use tracing::{debug, instrument};

use crate::{
    error::{Result, TaskError},
    utils::{
        duration::TrackedDuration,
        percentage::duration_percentage,
        time::date_to_day_key,
    },
};

use super::{
    collections::{TaskCollections, TaskLocation},
    model::{Task, TaskId, TimeSpentOnDay},
};

/// Totals below this are considered noise and aren't reported as time spent.
pub const MIN_REPORTED_TIME_SPENT: TrackedDuration = TrackedDuration::from_whole_seconds(60);

/// Records `elapsed` as spent on the task today, updating its parent if it has one.
#[instrument(skip(collections))]
pub fn add_time_spent<'a>(
    collections: &'a mut TaskCollections,
    id: &TaskId,
    elapsed: TrackedDuration,
    now: DateTime<Local>,
) -> Result<&'a Task> {
    let (location, parent_location) = resolve_leaf(collections, id)?;
    let today = date_to_day_key(now.date_naive());

    let task = collections.at_mut(location);
    if task.started.is_none() {
        task.started = Some(now);
    }
    if !elapsed.is_zero() {
        task.time_spent_on_day
            .entry(today)
            .or_default()
            .accumulate(elapsed);
    }
    task.last_worked_on = Some(now);

    if let Some(parent_location) = parent_location {
        let parent = collections.at_mut(parent_location);
        if parent.started.is_none() {
            parent.started = Some(now);
        }
        merge_parent(parent);
        parent.last_worked_on = Some(now);
    }

    let task = collections.at_mut(location);
    task.time_spent = calc_total_time_spent_on_task(task);
    debug!("Task {} now has {:?} spent", task.id, task.time_spent);
    Ok(&*task)
}

/// Takes `elapsed` back from today's entry of the task. An entry that drops to zero is removed.
#[instrument(skip(collections))]
pub fn remove_time_spent<'a>(
    collections: &'a mut TaskCollections,
    id: &TaskId,
    elapsed: TrackedDuration,
    now: DateTime<Local>,
) -> Result<&'a Task> {
    let (location, parent_location) = resolve_leaf(collections, id)?;
    let today = date_to_day_key(now.date_naive());

    let task = collections.at_mut(location);
    if let Some(current) = task.time_spent_on_day.get(&today).copied() {
        match current.subtract(elapsed) {
            Some(left) => {
                task.time_spent_on_day.insert(today, left);
            }
            None => {
                task.time_spent_on_day.remove(&today);
            }
        }
    }

    if let Some(parent_location) = parent_location {
        merge_parent(collections.at_mut(parent_location));
    }

    let task = collections.at_mut(location);
    task.time_spent = calc_total_time_spent_on_task(task);
    Ok(&*task)
}

/// Finds the task and, for subtasks, its parent. Everything is checked before anything gets
/// mutated, so a failed attribution leaves the collections untouched.
fn resolve_leaf(
    collections: &TaskCollections,
    id: &TaskId,
) -> Result<(TaskLocation, Option<TaskLocation>)> {
    let location = collections
        .locate(id)
        .ok_or_else(|| TaskError::NotFound(id.clone()))?;
    let task = collections.at(location);
    if task.is_parent() {
        return Err(TaskError::AttributionToParent(id.clone()));
    }

    let parent_location = match &task.parent_id {
        Some(parent_id) => Some(collections.locate(parent_id).ok_or_else(|| {
            TaskError::InvalidParentReference {
                task: id.clone(),
                parent: parent_id.clone(),
            }
        })?),
        None => None,
    };
    Ok((location, parent_location))
}

fn merge_parent(parent: &mut Task) {
    parent.time_spent_on_day = merge_total_time_spent_on_day_from(&parent.sub_tasks);
    parent.time_spent = calc_total_time_spent_on_task(parent);
}

/// Per-day sum over all given tasks.
pub fn merge_total_time_spent_on_day_from<'a>(
    tasks: impl IntoIterator<Item = &'a Task>,
) -> TimeSpentOnDay {
    let mut merged = TimeSpentOnDay::new();
    for task in tasks {
        for (day, spent) in &task.time_spent_on_day {
            merged.entry(day.clone()).or_default().accumulate(*spent);
        }
    }
    merged
}

/// Sum over every day of the task. `None` when that's less than [MIN_REPORTED_TIME_SPENT].
pub fn calc_total_time_spent_on_task(task: &Task) -> Option<TrackedDuration> {
    let total: TrackedDuration = task.time_spent_on_day.values().sum();
    (total >= MIN_REPORTED_TIME_SPENT).then_some(total)
}

/// Time left on the given tasks according to their estimates. Tasks without an estimate don't
/// count, tasks over their estimate count as zero. `None` for an empty list.
pub fn calc_remaining_time<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Option<TrackedDuration> {
    sum_non_empty(tasks, |task| match (task.time_spent, task.time_estimate) {
        (Some(spent), Some(estimate)) => estimate.saturating_sub(spent),
        (None, Some(estimate)) => estimate,
        (_, None) => TrackedDuration::ZERO,
    })
}

pub fn calc_total_estimate<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Option<TrackedDuration> {
    sum_non_empty(tasks, |task| task.time_estimate.unwrap_or_default())
}

pub fn calc_total_time_spent<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Option<TrackedDuration> {
    sum_non_empty(tasks, |task| task.time_spent.unwrap_or_default())
}

pub fn calc_total_time_spent_on_day<'a>(
    tasks: impl IntoIterator<Item = &'a Task>,
    day: &str,
) -> Option<TrackedDuration> {
    sum_non_empty(tasks, |task| {
        task.time_spent_on_day.get(day).copied().unwrap_or_default()
    })
}

fn sum_non_empty<'a>(
    tasks: impl IntoIterator<Item = &'a Task>,
    value: impl Fn(&Task) -> TrackedDuration,
) -> Option<TrackedDuration> {
    tasks.into_iter().fold(None, |total, task| {
        Some(total.unwrap_or_default() + value(task))
    })
}

/// Refreshes the derived fields of a task that is about to become current: the total time spent
/// first, then progress against the estimate from that total.
pub fn refresh_progress(task: &mut Task) {
    task.time_spent = calc_total_time_spent_on_task(task);
    task.progress = match (task.time_spent, task.time_estimate) {
        (Some(spent), Some(estimate)) => duration_percentage(spent, estimate),
        _ => None,
    };
}
