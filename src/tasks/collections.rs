use std::collections::HashSet;

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::{Result, TaskError},
    ids::IdGenerator,
    utils::{duration::TrackedDuration, time::date_to_day_key},
};

use super::{
    attribution::calc_total_time_spent_on_task,
    model::{deserialize_task_list, NewTask, Task, TaskId},
};

/// The three disjoint top-level task lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskList {
    Today,
    Backlog,
    DoneBacklog,
}

impl TaskList {
    /// Order in which lists are searched when resolving a task by id.
    pub const SEARCH_ORDER: [TaskList; 3] = [TaskList::Today, TaskList::Backlog, TaskList::DoneBacklog];
}

/// Position of a task inside [TaskCollections]. Only valid until the collections are modified
/// structurally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskLocation {
    pub list: TaskList,
    pub index: usize,
    pub sub_index: Option<usize>,
}

/// Result of a duplicate id check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateReport {
    pub ids: Vec<TaskId>,
    pub first_title: String,
}

impl DuplicateReport {
    pub fn message(&self) -> String {
        let ids = self
            .ids
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "!!! Dupes detected in data for the ids: {ids}. First task title is \"{}\" !!!",
            self.first_title
        )
    }
}

/// All tasks known to the tracker. Top-level tasks live in one of three lists, subtasks are
/// nested inside their parent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCollections {
    #[serde(default, deserialize_with = "deserialize_task_list")]
    pub today: Vec<Task>,
    #[serde(default, deserialize_with = "deserialize_task_list")]
    pub backlog_tasks: Vec<Task>,
    #[serde(default, deserialize_with = "deserialize_task_list")]
    pub done_backlog_tasks: Vec<Task>,
}

impl TaskCollections {
    pub fn new(today: Vec<Task>, backlog_tasks: Vec<Task>, done_backlog_tasks: Vec<Task>) -> Self {
        Self {
            today,
            backlog_tasks,
            done_backlog_tasks,
        }
    }

    pub fn list(&self, list: TaskList) -> &[Task] {
        match list {
            TaskList::Today => &self.today,
            TaskList::Backlog => &self.backlog_tasks,
            TaskList::DoneBacklog => &self.done_backlog_tasks,
        }
    }

    fn list_mut(&mut self, list: TaskList) -> &mut Vec<Task> {
        match list {
            TaskList::Today => &mut self.today,
            TaskList::Backlog => &mut self.backlog_tasks,
            TaskList::DoneBacklog => &mut self.done_backlog_tasks,
        }
    }

    pub fn get_today(&self) -> &[Task] {
        &self.today
    }

    pub fn get_backlog(&self) -> &[Task] {
        &self.backlog_tasks
    }

    pub fn get_done_backlog(&self) -> &[Task] {
        &self.done_backlog_tasks
    }

    /// Today, backlog and done backlog concatenated in that order.
    pub fn get_all_tasks(&self) -> impl Iterator<Item = &Task> {
        self.today
            .iter()
            .chain(self.backlog_tasks.iter())
            .chain(self.done_backlog_tasks.iter())
    }

    /// Finds a task searching today, then backlog, then done backlog. Inside a list the first
    /// match wins, with a top-level task checked before its subtasks.
    pub fn locate(&self, id: &TaskId) -> Option<TaskLocation> {
        TaskList::SEARCH_ORDER.into_iter().find_map(|list| {
            self.list(list).iter().enumerate().find_map(|(index, task)| {
                if task.id == *id {
                    return Some(TaskLocation {
                        list,
                        index,
                        sub_index: None,
                    });
                }
                task.sub_tasks
                    .iter()
                    .position(|v| v.id == *id)
                    .map(|sub_index| TaskLocation {
                        list,
                        index,
                        sub_index: Some(sub_index),
                    })
            })
        })
    }

    pub fn at(&self, location: TaskLocation) -> &Task {
        let task = &self.list(location.list)[location.index];
        match location.sub_index {
            Some(i) => &task.sub_tasks[i],
            None => task,
        }
    }

    pub fn at_mut(&mut self, location: TaskLocation) -> &mut Task {
        let task = &mut self.list_mut(location.list)[location.index];
        match location.sub_index {
            Some(i) => &mut task.sub_tasks[i],
            None => task,
        }
    }

    pub fn get_by_id(&self, id: &TaskId) -> Option<&Task> {
        self.locate(id).map(|v| self.at(v))
    }

    pub fn get_by_id_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.locate(id).map(|v| self.at_mut(v))
    }

    /// Returns the parent of a subtask. `Ok(None)` for tasks that don't have a parent, an error if
    /// the task points to a parent that can't be found.
    pub fn get_parent(&self, task: &Task) -> Result<Option<&Task>> {
        let Some(parent_id) = &task.parent_id else {
            return Ok(None);
        };
        self.get_by_id(parent_id)
            .map(Some)
            .ok_or_else(|| TaskError::InvalidParentReference {
                task: task.id.clone(),
                parent: parent_id.clone(),
            })
    }

    pub fn get_undone_today(&self, sub_tasks_instead_of_parent: bool) -> Vec<&Task> {
        if sub_tasks_instead_of_parent {
            flatten_tasks_filtered(&self.today, |v| !v.is_done, |v| !v.is_done)
        } else {
            self.today.iter().filter(|v| !v.is_done).collect()
        }
    }

    pub fn get_done_today(&self) -> Vec<&Task> {
        self.today.iter().filter(|v| v.is_done).collect()
    }

    /// Leaf-level sum of today's work over today's tasks. `None` when there are no tasks at all.
    pub fn get_time_worked_today(&self, today: NaiveDate) -> Option<TrackedDuration> {
        if self.today.is_empty() {
            return None;
        }
        let key = date_to_day_key(today);
        Some(
            flatten_tasks(&self.today)
                .into_iter()
                .filter_map(|v| v.time_spent_on_day.get(&key))
                .sum(),
        )
    }

    /// Sum of the totals of today's top-level tasks, regardless of the day the time was spent on.
    pub fn get_total_time_worked_on_tasks_today(&self) -> TrackedDuration {
        self.today.iter().filter_map(|v| v.time_spent).sum()
    }

    /// Creates a task from user input and adds it to today. A task with a `parent_id` becomes a
    /// subtask of that parent instead.
    pub fn add_today(
        &mut self,
        new_task: NewTask,
        ids: &dyn IdGenerator,
        now: DateTime<Local>,
    ) -> Result<TaskId> {
        let task = create_task(new_task, ids, now)?;
        let id = task.id.clone();

        match task.parent_id.clone() {
            Some(parent_id) => {
                let parent = self
                    .get_by_id_mut(&parent_id)
                    .filter(|v| v.parent_id.is_none())
                    .ok_or_else(|| TaskError::InvalidParentReference {
                        task: id.clone(),
                        parent: parent_id.clone(),
                    })?;
                adopt_sub_task(parent, task);
            }
            None => self.today.push(task),
        }
        debug!("Created task {id}");
        Ok(id)
    }

    pub fn update_today(&mut self, tasks: Vec<Task>) {
        self.today = tasks;
    }

    pub fn update_backlog(&mut self, tasks: Vec<Task>) {
        self.backlog_tasks = tasks;
    }

    pub fn update_done_backlog(&mut self, tasks: Vec<Task>) {
        self.done_backlog_tasks = tasks;
    }

    pub fn add_tasks_to_top_of_backlog(&mut self, tasks: Vec<Task>) {
        self.backlog_tasks.splice(0..0, tasks);
    }

    /// Copies today's done tasks to the top of the done backlog. They stay in today.
    pub fn add_done_tasks_to_done_backlog(&mut self) {
        let done = self
            .get_done_today()
            .into_iter()
            .cloned()
            .collect::<Vec<_>>();
        self.done_backlog_tasks.splice(0..0, done);
    }

    /// End of day housekeeping. Done tasks go to the done backlog, unfinished ones to the top of
    /// the backlog.
    pub fn finish_day(&mut self, clear_done_tasks: bool, move_unfinished_to_backlog: bool) {
        if clear_done_tasks {
            self.add_done_tasks_to_done_backlog();
            self.today.retain(|v| !v.is_done);
        }

        if move_unfinished_to_backlog {
            let (undone, done): (Vec<_>, Vec<_>) =
                std::mem::take(&mut self.today).into_iter().partition(|v| !v.is_done);
            self.add_tasks_to_top_of_backlog(undone);
            self.today = if clear_done_tasks { vec![] } else { done };
        }
    }

    /// Checks every list for duplicate ids, reporting each list that has them.
    pub fn check_all_dupes(&self) -> Vec<(TaskList, DuplicateReport)> {
        TaskList::SEARCH_ORDER
            .into_iter()
            .filter_map(|list| check_dupes(self.list(list)).map(|v| (list, v)))
            .collect()
    }
}

pub fn is_worked_on_today(task: &Task, today: NaiveDate) -> bool {
    task.time_spent_on_day
        .get(&date_to_day_key(today))
        .is_some_and(|v| !v.is_zero())
}

/// Reduces the two level hierarchy into leaf-equivalent tasks. A task with subtasks is replaced by
/// its subtasks, everything else is kept as is.
pub fn flatten_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Vec<&'a Task> {
    flatten_tasks_filtered(tasks, |_| true, |_| true)
}

/// [flatten_tasks] that only keeps top-level tasks passing `parent_filter` and subtasks passing
/// `sub_filter`. The parent filter isn't applied to tasks that have subtasks.
pub fn flatten_tasks_filtered<'a>(
    tasks: impl IntoIterator<Item = &'a Task>,
    parent_filter: impl Fn(&Task) -> bool,
    sub_filter: impl Fn(&Task) -> bool,
) -> Vec<&'a Task> {
    let mut flattened = vec![];
    for task in tasks {
        if task.is_parent() {
            flattened.extend(task.sub_tasks.iter().filter(|v| sub_filter(v)));
        } else if parent_filter(task) {
            flattened.push(task);
        }
    }
    flattened
}

/// Looks for ids used more than once in a list, subtasks included.
pub fn check_dupes(tasks: &[Task]) -> Option<DuplicateReport> {
    let mut seen = HashSet::new();
    let mut dupes = vec![];
    for task in tasks.iter().flat_map(|v| std::iter::once(v).chain(v.sub_tasks.iter())) {
        if !seen.insert(&task.id) && !dupes.contains(&task.id) {
            dupes.push(task.id.clone());
        }
    }

    if dupes.is_empty() {
        return None;
    }

    let first_title = tasks
        .iter()
        .flat_map(|v| std::iter::once(v).chain(v.sub_tasks.iter()))
        .find(|v| dupes.contains(&v.id))
        .map(|v| v.title.clone())
        .unwrap_or_default();
    warn!("Duplicate task ids {dupes:?}");
    Some(DuplicateReport {
        ids: dupes,
        first_title,
    })
}

pub fn create_task(new_task: NewTask, ids: &dyn IdGenerator, now: DateTime<Local>) -> Result<Task> {
    let title = new_task.title.trim();
    if title.is_empty() {
        return Err(TaskError::EmptyTitle);
    }
    Ok(Task {
        notes: new_task.notes,
        parent_id: new_task.parent_id,
        time_estimate: new_task.time_estimate,
        time_spent: new_task.time_spent,
        created: Some(now),
        ..Task::new(ids.next_id(), title)
    })
}

/// A task turning into a parent hands its own tracked time to its first subtask, so the parent
/// keeps being the merge of its subtasks.
fn adopt_sub_task(parent: &mut Task, mut sub_task: Task) {
    if !parent.is_parent() && !parent.time_spent_on_day.is_empty() {
        sub_task.time_spent_on_day = parent.time_spent_on_day.clone();
        sub_task.time_spent = calc_total_time_spent_on_task(&sub_task);
        sub_task.started = parent.started;
        sub_task.last_worked_on = parent.last_worked_on;
    }
    sub_task.parent_id = Some(parent.id.clone());
    parent.sub_tasks.push(sub_task);
}

#[cfg(test)]
mod tests {
    use chrono::{Local, NaiveDate, TimeZone};

    use crate::{
        error::TaskError,
        ids::SequentialIds,
        tasks::model::{NewTask, Task, TaskId},
        utils::duration::TrackedDuration,
    };

    use super::{check_dupes, flatten_tasks, TaskCollections, TaskList};

    fn collections() -> TaskCollections {
        TaskCollections::new(
            vec![
                Task::new("a", "A"),
                Task::new("p", "Parent").with_sub_tasks([Task::new("s1", "Sub 1"), Task::new("s2", "Sub 2").with_done(true)]),
                Task::new("d", "Done").with_done(true),
            ],
            vec![Task::new("b", "Backlog"), Task::new("dup", "Backlog dup")],
            vec![Task::new("dup", "Done dup")],
        )
    }

    #[test]
    fn test_get_by_id_priority() {
        let collections = collections();
        let location = collections.locate(&"dup".into()).unwrap();
        assert_eq!(location.list, TaskList::Backlog);
        assert_eq!(collections.get_by_id(&"dup".into()).unwrap().title, "Backlog dup");
        assert_eq!(collections.get_by_id(&"s2".into()).unwrap().title, "Sub 2");
        assert!(collections.get_by_id(&"missing".into()).is_none());
    }

    #[test]
    fn test_get_parent() {
        let collections = collections();
        let sub = collections.get_by_id(&"s1".into()).unwrap();
        assert_eq!(collections.get_parent(sub).unwrap().unwrap().id, TaskId::from("p"));

        let top = collections.get_by_id(&"a".into()).unwrap();
        assert_eq!(collections.get_parent(top), Ok(None));

        let orphan = Task::new("o", "Orphan").with_parent("gone");
        assert_eq!(
            collections.get_parent(&orphan),
            Err(TaskError::InvalidParentReference {
                task: "o".into(),
                parent: "gone".into()
            })
        );
    }

    #[test]
    fn test_flatten_replaces_parents() {
        let collections = collections();
        let ids = flatten_tasks(collections.get_today())
            .into_iter()
            .map(|v| v.id.to_string())
            .collect::<Vec<_>>();
        assert_eq!(ids, ["a", "s1", "s2", "d"]);
    }

    #[test]
    fn test_undone_today() {
        let collections = collections();
        let ids = |tasks: Vec<&Task>| tasks.into_iter().map(|v| v.id.to_string()).collect::<Vec<_>>();
        assert_eq!(ids(collections.get_undone_today(true)), ["a", "s1"]);
        assert_eq!(ids(collections.get_undone_today(false)), ["a", "p"]);
        assert_eq!(ids(collections.get_done_today()), ["d"]);
    }

    #[test]
    fn test_check_dupes() {
        let tasks = vec![
            Task::new("x", "First"),
            Task::new("y", "Second").with_sub_tasks([Task::new("x", "Nested")]),
        ];
        let report = check_dupes(&tasks).unwrap();
        assert_eq!(report.ids, vec![TaskId::from("x")]);
        assert_eq!(report.first_title, "First");
        assert!(report.message().contains("\"First\""));
        assert!(check_dupes(&collections().today).is_none());
    }

    #[test]
    fn test_add_today_and_subtask() {
        let mut collections = TaskCollections::default();
        let ids = SequentialIds::default();
        let now = Local.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();

        let parent = collections
            .add_today(NewTask { title: "Parent".into(), ..Default::default() }, &ids, now)
            .unwrap();
        collections.get_by_id_mut(&parent).unwrap().time_spent_on_day.insert(
            "2024-01-01".into(),
            TrackedDuration::from_minutes(5),
        );

        let sub = collections
            .add_today(
                NewTask {
                    title: "Sub".into(),
                    parent_id: Some(parent.clone()),
                    ..Default::default()
                },
                &ids,
                now,
            )
            .unwrap();

        assert_eq!(collections.today.len(), 1);
        let sub = collections.get_by_id(&sub).unwrap();
        assert_eq!(sub.parent_id.as_ref(), Some(&parent));
        assert_eq!(sub.time_spent, Some(TrackedDuration::from_minutes(5)));
        assert_eq!(sub.created, Some(now));

        assert_eq!(
            collections.add_today(NewTask { title: "  ".into(), ..Default::default() }, &ids, now),
            Err(TaskError::EmptyTitle)
        );
    }

    #[test]
    fn test_finish_day() {
        let mut moved = collections();
        moved.finish_day(true, true);
        assert!(moved.today.is_empty());
        assert_eq!(moved.backlog_tasks[0].id, TaskId::from("a"));
        assert_eq!(moved.backlog_tasks[1].id, TaskId::from("p"));
        assert_eq!(moved.done_backlog_tasks[0].id, TaskId::from("d"));

        let mut kept = collections();
        kept.finish_day(false, true);
        assert_eq!(kept.today.len(), 1);
        assert_eq!(kept.today[0].id, TaskId::from("d"));
        assert_eq!(kept.done_backlog_tasks.len(), 1);
    }

    #[test]
    fn test_time_worked_today() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut collections = collections();
        for id in ["a", "s1", "p"] {
            collections
                .get_by_id_mut(&id.into())
                .unwrap()
                .time_spent_on_day
                .insert("2024-01-01".into(), TrackedDuration::from_secs(60));
        }
        // the parent's own entry is a rollup and isn't counted again
        assert_eq!(
            collections.get_time_worked_today(day),
            Some(TrackedDuration::from_secs(120))
        );
        assert_eq!(TaskCollections::default().get_time_worked_today(day), None);
    }
}
