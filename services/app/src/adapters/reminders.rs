//! services/app/src/adapters/reminders.rs
//!
//! A file-backed implementation of the local reminder gateway. The JSON
//! registry plays the role of the OS scheduler's pending-notification table:
//! it is the persisted record of what this device has already scheduled, so
//! reconciliation can diff against it across process restarts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scholarlink_core::ports::{PortError, PortResult, ReminderGateway};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct FileReminderGateway {
    path: PathBuf,
}

/// On-disk shape of one scheduled reminder.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReminderEntry {
    id: String,
    fire_at: DateTime<Utc>,
    title: String,
    body: String,
}

impl FileReminderGateway {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn load_entries(&self) -> PortResult<Vec<ReminderEntry>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PortError::Unexpected(e.to_string())),
        };
        serde_json::from_str(&raw).map_err(|e| PortError::Unexpected(e.to_string()))
    }

    /// Writes to a sibling temp file, then renames over the registry so a
    /// crash mid-write cannot leave a half-written file behind.
    fn store_entries(&self, entries: &[ReminderEntry]) -> PortResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| PortError::Unexpected(e.to_string()))?;
        }
        let raw = serde_json::to_string_pretty(entries)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw).map_err(|e| PortError::Unexpected(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ReminderGateway for FileReminderGateway {
    async fn request_authorization(&self) -> PortResult<()> {
        // The file registry needs no permission; a real OS-backed gateway
        // prompts here on first run only.
        Ok(())
    }

    async fn schedule(
        &self,
        id: &str,
        fire_at: DateTime<Utc>,
        title: &str,
        body: &str,
    ) -> PortResult<()> {
        let mut entries = self.load_entries()?;
        // Re-scheduling an identifier replaces the previous entry.
        entries.retain(|e| e.id != id);
        entries.push(ReminderEntry {
            id: id.to_string(),
            fire_at,
            title: title.to_string(),
            body: body.to_string(),
        });
        self.store_entries(&entries)?;
        debug!("Scheduled reminder {} for {}", id, fire_at);
        Ok(())
    }

    async fn cancel(&self, ids: &HashSet<String>) -> PortResult<()> {
        let mut entries = self.load_entries()?;
        let before = entries.len();
        entries.retain(|e| !ids.contains(&e.id));
        if entries.len() != before {
            self.store_entries(&entries)?;
            debug!("Cancelled {} reminders", before - entries.len());
        }
        Ok(())
    }

    async fn pending_ids(&self) -> PortResult<HashSet<String>> {
        Ok(self.load_entries()?.into_iter().map(|e| e.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn gateway(dir: &tempfile::TempDir) -> FileReminderGateway {
        FileReminderGateway::new(dir.path().join("reminders.json"))
    }

    #[tokio::test]
    async fn registry_round_trip_and_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(&dir);
        let fire_at = Utc::now() + Duration::hours(5);

        gw.schedule("a-3600", fire_at, "t", "b").await.unwrap();
        gw.schedule("a-86400", fire_at, "t", "b").await.unwrap();
        assert_eq!(gw.pending_ids().await.unwrap().len(), 2);

        let mut to_cancel = HashSet::new();
        to_cancel.insert("a-3600".to_string());
        gw.cancel(&to_cancel).await.unwrap();

        let pending = gw.pending_ids().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert!(pending.contains("a-86400"));
    }

    #[tokio::test]
    async fn registry_survives_a_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let fire_at = Utc::now() + Duration::hours(5);
        gateway(&dir)
            .schedule("a-3600", fire_at, "t", "b")
            .await
            .unwrap();

        // A fresh gateway over the same file sees yesterday's schedule.
        let pending = gateway(&dir).pending_ids().await.unwrap();
        assert!(pending.contains("a-3600"));
    }

    #[tokio::test]
    async fn rescheduling_the_same_id_does_not_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(&dir);
        let fire_at = Utc::now() + Duration::hours(5);

        gw.schedule("a-3600", fire_at, "t", "b").await.unwrap();
        gw.schedule("a-3600", fire_at + Duration::hours(1), "t", "b")
            .await
            .unwrap();
        assert_eq!(gw.pending_ids().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(gateway(&dir).pending_ids().await.unwrap().is_empty());
    }
}
