//! Persistence of the task lists and the current task pointer.
//!
//! The engine only needs get/set for three task lists and one pointer, which is what
//! [TaskStorage] abstracts. [json_storage::JsonTaskStorage] keeps every one of them in its own json
//! file, [MemoryTaskStorage] keeps them in memory.

pub mod json_storage;

use std::{future::Future, ops::Deref, sync::Mutex};

use futures::try_join;
use thiserror::Error;

use crate::tasks::{
    collections::{TaskCollections, TaskList},
    model::{Task, TaskId},
};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to access storage: {0}")]
    Io(#[from] std::io::Error),

    /// Also covers malformed durations, which fail the whole read.
    #[error("Failed to parse stored data: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = StorageError> = std::result::Result<T, E>;

/// Interface for abstracting storage of tasks.
pub trait TaskStorage {
    fn get_tasks(&self, list: TaskList) -> impl Future<Output = Result<Vec<Task>>>;

    fn set_tasks(&self, list: TaskList, tasks: &[Task]) -> impl Future<Output = Result<()>>;

    fn get_current_task(&self) -> impl Future<Output = Result<Option<TaskId>>>;

    fn set_current_task(&self, id: Option<&TaskId>) -> impl Future<Output = Result<()>>;

    /// Reads all three lists and the current pointer.
    fn load(&self) -> impl Future<Output = Result<(TaskCollections, Option<TaskId>)>> {
        async {
            let (today, backlog, done_backlog, current) = try_join!(
                self.get_tasks(TaskList::Today),
                self.get_tasks(TaskList::Backlog),
                self.get_tasks(TaskList::DoneBacklog),
                self.get_current_task(),
            )?;
            Ok((TaskCollections::new(today, backlog, done_backlog), current))
        }
    }

    fn save(
        &self,
        collections: &TaskCollections,
        current: Option<&TaskId>,
    ) -> impl Future<Output = Result<()>> {
        async move {
            try_join!(
                self.set_tasks(TaskList::Today, collections.list(TaskList::Today)),
                self.set_tasks(TaskList::Backlog, collections.list(TaskList::Backlog)),
                self.set_tasks(TaskList::DoneBacklog, collections.list(TaskList::DoneBacklog)),
                self.set_current_task(current),
            )?;
            Ok(())
        }
    }
}

impl<T: Deref> TaskStorage for T
where
    T::Target: TaskStorage,
{
    fn get_tasks(&self, list: TaskList) -> impl Future<Output = Result<Vec<Task>>> {
        self.deref().get_tasks(list)
    }

    fn set_tasks(&self, list: TaskList, tasks: &[Task]) -> impl Future<Output = Result<()>> {
        self.deref().set_tasks(list, tasks)
    }

    fn get_current_task(&self) -> impl Future<Output = Result<Option<TaskId>>> {
        self.deref().get_current_task()
    }

    fn set_current_task(&self, id: Option<&TaskId>) -> impl Future<Output = Result<()>> {
        self.deref().set_current_task(id)
    }
}

/// Keeps everything in memory. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryTaskStorage {
    state: Mutex<(TaskCollections, Option<TaskId>)>,
}

impl MemoryTaskStorage {
    pub fn new(collections: TaskCollections, current: Option<TaskId>) -> Self {
        Self {
            state: Mutex::new((collections, current)),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut (TaskCollections, Option<TaskId>)) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }
}

impl TaskStorage for MemoryTaskStorage {
    async fn get_tasks(&self, list: TaskList) -> Result<Vec<Task>> {
        Ok(self.with_state(|(collections, _)| collections.list(list).to_vec()))
    }

    async fn set_tasks(&self, list: TaskList, tasks: &[Task]) -> Result<()> {
        self.with_state(|(collections, _)| match list {
            TaskList::Today => collections.update_today(tasks.to_vec()),
            TaskList::Backlog => collections.update_backlog(tasks.to_vec()),
            TaskList::DoneBacklog => collections.update_done_backlog(tasks.to_vec()),
        });
        Ok(())
    }

    async fn get_current_task(&self) -> Result<Option<TaskId>> {
        Ok(self.with_state(|(_, current)| current.clone()))
    }

    async fn set_current_task(&self, id: Option<&TaskId>) -> Result<()> {
        self.with_state(|(_, current)| *current = id.cloned());
        Ok(())
    }
}
