//! Run journal
//!
//! Appends JSON lines to `<state dir>/buildchain/journal.log`, one per package
//! state transition plus run start and finish. Every line carries the run id
//! so interleaved runs on a shared runner can be told apart.

use crate::config::{schema::Config, ConfigManager};
use chrono::Utc;
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::warn;
use uuid::Uuid;

/// File-based journal that appends JSON lines
pub struct RunJournal {
    enabled: bool,
    path: PathBuf,
    run_id: Uuid,
}

impl RunJournal {
    /// Create a journal for a new run from config
    pub fn new(config: &Config) -> Self {
        Self {
            enabled: config.general.journal,
            path: ConfigManager::journal_path(),
            run_id: Uuid::new_v4(),
        }
    }

    /// Journal writing to an explicit file
    pub fn at(path: PathBuf) -> Self {
        Self {
            enabled: true,
            path,
            run_id: Uuid::new_v4(),
        }
    }

    /// Journal that records nothing
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            path: PathBuf::new(),
            run_id: Uuid::new_v4(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Record an event; write failures are logged and otherwise ignored
    pub async fn record(&self, event: &str, data: &serde_json::Value) {
        if !self.enabled {
            return;
        }

        let entry = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "run": self.run_id,
            "event": event,
            "data": data,
        });

        let mut line = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize journal event: {}", e);
                return;
            }
        };
        line.push('\n');

        if let Err(e) = self.append(&line).await {
            warn!("Failed to write run journal: {}", e);
        }
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn writes_json_line() {
        let dir = TempDir::new().unwrap();
        let journal = RunJournal::at(dir.path().join("journal.log"));

        journal
            .record("package.state", &serde_json::json!({"package": "eckit"}))
            .await;

        let content = tokio::fs::read_to_string(&journal.path).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(content.trim()).unwrap();

        assert_eq!(parsed["event"], "package.state");
        assert_eq!(parsed["data"]["package"], "eckit");
        assert_eq!(parsed["run"], journal.run_id().to_string());
        assert!(parsed["timestamp"].is_string());
    }

    #[tokio::test]
    async fn appends_multiple_lines() {
        let dir = TempDir::new().unwrap();
        let journal = RunJournal::at(dir.path().join("nested/journal.log"));

        journal.record("run.started", &serde_json::json!({})).await;
        journal.record("run.finished", &serde_json::json!({})).await;

        let content = tokio::fs::read_to_string(&journal.path).await.unwrap();
        assert_eq!(content.trim().lines().count(), 2);
    }

    #[tokio::test]
    async fn skips_when_disabled() {
        let dir = TempDir::new().unwrap();
        let journal = RunJournal {
            enabled: false,
            path: dir.path().join("journal.log"),
            run_id: Uuid::new_v4(),
        };

        journal.record("should.not.appear", &serde_json::json!({})).await;

        assert!(!journal.path.exists());
    }

    #[tokio::test]
    async fn unwritable_path_does_not_panic() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let journal = RunJournal::at(blocker.join("journal.log"));

        journal.record("run.started", &serde_json::json!({})).await;
    }
}
