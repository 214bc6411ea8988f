use std::{collections::BTreeMap, fmt::Display, sync::Arc};

use chrono::{DateTime, Local};
use serde::{Deserialize, Deserializer, Serialize};

use crate::utils::{duration::TrackedDuration, percentage::Percentage};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Arc<str>);

impl TaskId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}

/// Time spent per calendar day, keyed by `YYYY-MM-DD`. Zero entries are never stored.
pub type TimeSpentOnDay = BTreeMap<String, TrackedDuration>;

/// A task as it's stored and tracked.
///
/// A task with subtasks is a parent. Its `time_spent_on_day` and `time_spent` are never attributed
/// directly and are always the merge of its subtasks' values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Total time spent. `None` while the total is below one minute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_spent: Option<TrackedDuration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_estimate: Option<TrackedDuration>,
    #[serde(default, deserialize_with = "deserialize_time_spent_on_day")]
    pub time_spent_on_day: TimeSpentOnDay,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Local>>,
    /// Set the first time any work is attributed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<DateTime<Local>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_worked_on: Option<DateTime<Local>>,
    #[serde(default)]
    pub is_done: bool,
    #[serde(default, deserialize_with = "deserialize_task_list")]
    pub sub_tasks: Vec<Task>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<Percentage>,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            parent_id: None,
            notes: None,
            time_spent: None,
            time_estimate: None,
            time_spent_on_day: TimeSpentOnDay::new(),
            created: None,
            started: None,
            last_worked_on: None,
            is_done: false,
            sub_tasks: vec![],
            progress: None,
        }
    }

    pub fn with_estimate(self, time_estimate: TrackedDuration) -> Self {
        Self {
            time_estimate: Some(time_estimate),
            ..self
        }
    }

    pub fn with_time_spent(self, time_spent: TrackedDuration) -> Self {
        Self {
            time_spent: Some(time_spent),
            ..self
        }
    }

    pub fn with_parent(self, parent_id: impl Into<TaskId>) -> Self {
        Self {
            parent_id: Some(parent_id.into()),
            ..self
        }
    }

    pub fn with_done(self, is_done: bool) -> Self {
        Self { is_done, ..self }
    }

    /// Adds subtasks, pointing their `parent_id` to this task.
    pub fn with_sub_tasks(self, sub_tasks: impl IntoIterator<Item = Task>) -> Self {
        let id = self.id.clone();
        let sub_tasks = sub_tasks
            .into_iter()
            .map(|v| v.with_parent(id.clone()))
            .collect();
        Self { sub_tasks, ..self }
    }

    pub fn is_parent(&self) -> bool {
        !self.sub_tasks.is_empty()
    }
}

/// Input for creating a task. Everything that gets generated on creation (id, timestamps) is left
/// out.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub notes: Option<String>,
    pub parent_id: Option<TaskId>,
    pub time_estimate: Option<TrackedDuration>,
    pub time_spent: Option<TrackedDuration>,
}

/// Stored task lists can contain `null` holes left over by older versions. They carry no data
/// and are dropped on read.
pub fn deserialize_task_list<'de, D>(deserializer: D) -> Result<Vec<Task>, D::Error>
where
    D: Deserializer<'de>,
{
    let tasks = Option::<Vec<Option<Task>>>::deserialize(deserializer)?;
    Ok(tasks.unwrap_or_default().into_iter().flatten().collect())
}

/// Zero buckets can be written by other clients. They would mark a day as worked on, so they're
/// dropped on read.
pub fn deserialize_time_spent_on_day<'de, D>(deserializer: D) -> Result<TimeSpentOnDay, D::Error>
where
    D: Deserializer<'de>,
{
    let mut days = Option::<TimeSpentOnDay>::deserialize(deserializer)?.unwrap_or_default();
    days.retain(|_, v| !v.is_zero());
    Ok(days)
}
