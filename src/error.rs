//! Errors surfaced by the task engine. Storage has its own error type in
//! [crate::storage::StorageError] and durations in [crate::utils::duration::DurationError].

use thiserror::Error;

use crate::tasks::model::TaskId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("Task {0} not found")]
    NotFound(TaskId),

    #[error("Task {task} points to parent {parent} which doesn't exist")]
    InvalidParentReference { task: TaskId, parent: TaskId },

    #[error("Task {0} isn't planned for today, only today's tasks can be tracked")]
    NotPlannedForToday(TaskId),

    #[error("Task {0} has subtasks, time can only be attributed to its subtasks")]
    AttributionToParent(TaskId),

    #[error("Task title can't be empty")]
    EmptyTitle,
}

pub type Result<T, E = TaskError> = std::result::Result<T, E>;
