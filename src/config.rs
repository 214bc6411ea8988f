use std::{io::ErrorKind, path::Path};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{storage::StorageError, utils::duration::TrackedDuration};

pub const CONFIG_FILE_NAME: &str = "config.json";

/// User configuration. Stored as camelCase json, every field is optional on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub is_take_a_break_enabled: bool,
    /// Continuous work after which a break reminder is shown.
    pub take_a_break_min_working_time: TrackedDuration,
    /// A tracked event idle for longer than this doesn't raise a break reminder.
    pub min_idle_time_to_suppress_break: TrackedDuration,
    /// Idle time after which the user is asked whether they were working.
    pub idle_threshold: TrackedDuration,
    /// How often time is attributed to the current task.
    pub tracking_interval: TrackedDuration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            is_take_a_break_enabled: false,
            take_a_break_min_working_time: TrackedDuration::from_minutes(60),
            min_idle_time_to_suppress_break: TrackedDuration::from_millis(9999),
            idle_threshold: TrackedDuration::from_minutes(2),
            tracking_interval: TrackedDuration::from_secs(1),
        }
    }
}

/// Reads the config, falling back to defaults when the file doesn't exist.
pub async fn load_config(path: &Path) -> Result<Config, StorageError> {
    match tokio::fs::read(path).await {
        Ok(content) => Ok(serde_json::from_slice(&content)?),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No config at {path:?}, using defaults");
            Ok(Config::default())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use crate::utils::duration::TrackedDuration;

    use super::{load_config, Config};

    #[tokio::test]
    async fn test_missing_config_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = load_config(&dir.path().join("config.json")).await?;
        assert_eq!(config, Config::default());
        Ok(())
    }

    #[tokio::test]
    async fn test_partial_config() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.json");
        tokio::fs::write(
            &path,
            r#"{ "isTakeABreakEnabled": true, "takeABreakMinWorkingTime": "PT45M" }"#,
        )
        .await?;

        let config = load_config(&path).await?;
        assert!(config.is_take_a_break_enabled);
        assert_eq!(
            config.take_a_break_min_working_time,
            TrackedDuration::from_minutes(45)
        );
        assert_eq!(config.idle_threshold, TrackedDuration::from_minutes(2));
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_config_fails() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.json");
        tokio::fs::write(&path, r#"{ "takeABreakMinWorkingTime": "an hour" }"#).await?;
        assert!(load_config(&path).await.is_err());
        Ok(())
    }
}
