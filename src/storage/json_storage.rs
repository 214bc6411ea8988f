use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use fs4::tokio::AsyncFileExt;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::debug;

use crate::tasks::{
    collections::TaskList,
    model::{Task, TaskId},
};

use super::{Result, TaskStorage};

const CURRENT_TASK_FILE: &str = "currentTask.json";

fn list_file(list: TaskList) -> &'static str {
    match list {
        TaskList::Today => "today.json",
        TaskList::Backlog => "backlogTasks.json",
        TaskList::DoneBacklog => "doneBacklogTasks.json",
    }
}

/// Older data stores the whole current task instead of just its id.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredPointer {
    Id(TaskId),
    Task { id: TaskId },
}

/// The main realization of [TaskStorage]. Every list lives in its own json file inside
/// `task_dir`, guarded by file locks so the cli and a running tracker don't step on each other.
pub struct JsonTaskStorage {
    task_dir: PathBuf,
}

impl JsonTaskStorage {
    pub fn new(task_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&task_dir)?;

        Ok(Self { task_dir })
    }

    async fn read<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T> {
        async fn extract(path: &Path) -> std::result::Result<Vec<u8>, std::io::Error> {
            let mut file = File::open(path).await?;
            file.lock_shared()?;
            let mut content = vec![];
            let result = file.read_to_end(&mut content).await;
            file.unlock_async().await?;
            result?;
            Ok(content)
        }

        let path = self.task_dir.join(name);
        debug!("Reading {path:?}");
        let content = match extract(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(T::default()),
            Err(e) => Err(e)?,
        };

        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }
        Ok(serde_json::from_slice(&content)?)
    }

    async fn write<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        // Serialized up front so a failure never leaves a truncated file behind.
        let buffer = serde_json::to_vec_pretty(value)?;

        let path = self.task_dir.join(name);
        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .await?;

        file.lock_exclusive()?;
        let result = Self::replace_content(&mut file, &buffer).await;
        file.unlock_async().await?;
        result?;
        debug!("Saved {path:?}");
        Ok(())
    }

    async fn replace_content(file: &mut File, buffer: &[u8]) -> std::io::Result<()> {
        file.set_len(0).await?;
        file.write_all(buffer).await?;
        file.flush().await?;
        file.sync_data().await
    }
}

impl TaskStorage for JsonTaskStorage {
    async fn get_tasks(&self, list: TaskList) -> Result<Vec<Task>> {
        let tasks: Vec<Option<Task>> = self.read(list_file(list)).await?;
        Ok(tasks.into_iter().flatten().collect())
    }

    async fn set_tasks(&self, list: TaskList, tasks: &[Task]) -> Result<()> {
        self.write(list_file(list), tasks).await
    }

    async fn get_current_task(&self) -> Result<Option<TaskId>> {
        let pointer: Option<StoredPointer> = self.read(CURRENT_TASK_FILE).await?;
        Ok(pointer.map(|v| match v {
            StoredPointer::Id(id) | StoredPointer::Task { id } => id,
        }))
    }

    async fn set_current_task(&self, id: Option<&TaskId>) -> Result<()> {
        self.write(CURRENT_TASK_FILE, &id).await
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use crate::{
        storage::{StorageError, TaskStorage},
        tasks::{
            collections::{TaskCollections, TaskList},
            model::{Task, TaskId},
        },
        utils::duration::TrackedDuration,
    };

    use super::JsonTaskStorage;

    #[tokio::test]
    async fn test_empty_storage() -> Result<()> {
        let dir = tempdir()?;
        let storage = JsonTaskStorage::new(dir.path().to_owned())?;
        let (collections, current) = storage.load().await?;
        assert_eq!(collections, TaskCollections::default());
        assert_eq!(current, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_and_load() -> Result<()> {
        let dir = tempdir()?;
        let storage = JsonTaskStorage::new(dir.path().to_owned())?;

        let mut task = Task::new("a", "A").with_estimate(TrackedDuration::from_minutes(30));
        task.time_spent_on_day
            .insert("2024-01-01".into(), TrackedDuration::from_millis(90_500));
        let collections = TaskCollections::new(
            vec![task],
            vec![Task::new("p", "P").with_sub_tasks([Task::new("s", "S")])],
            vec![],
        );
        storage.save(&collections, Some(&"a".into())).await?;

        // shrinking a list must not leave old bytes behind
        storage.set_tasks(TaskList::DoneBacklog, &[]).await?;

        let (loaded, current) = storage.load().await?;
        assert_eq!(loaded, collections);
        assert_eq!(current, Some(TaskId::from("a")));
        Ok(())
    }

    #[tokio::test]
    async fn test_tolerated_legacy_values() -> Result<()> {
        let dir = tempdir()?;
        tokio::fs::write(
            dir.path().join("today.json"),
            r#"[null, { "id": "a", "title": "A", "timeSpentOnDay": { "2024-01-01": 60000 } }]"#,
        )
        .await?;
        tokio::fs::write(
            dir.path().join("currentTask.json"),
            r#"{ "id": "a", "title": "A" }"#,
        )
        .await?;

        let storage = JsonTaskStorage::new(dir.path().to_owned())?;
        let (loaded, current) = storage.load().await?;
        assert_eq!(loaded.today.len(), 1);
        assert_eq!(
            loaded.today[0].time_spent_on_day["2024-01-01"],
            TrackedDuration::from_minutes(1)
        );
        assert_eq!(current, Some(TaskId::from("a")));
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_duration_fails() -> Result<()> {
        let dir = tempdir()?;
        tokio::fs::write(
            dir.path().join("backlogTasks.json"),
            r#"[{ "id": "a", "title": "A", "timeEstimate": "two hours" }]"#,
        )
        .await?;

        let storage = JsonTaskStorage::new(dir.path().to_owned())?;
        let result = storage.load().await;
        assert!(matches!(result, Err(StorageError::Json(_))));
        Ok(())
    }
}
