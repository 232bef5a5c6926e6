//! JSON-file performance store.
//!
//! Layout under the root directory:
//!
//! ```text
//! users/<user_id>/records.json
//! users/<user_id>/history.json
//! users/<user_id>/activities.json
//! ```
//!
//! Every write replaces the whole document through a temporary file and a
//! rename, so readers never observe a half-written document.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use adaptilearn_core::analytics::Activity;
use adaptilearn_core::error::StoreError;
use adaptilearn_core::model::{HistoryEntry, PerformanceRecord};
use adaptilearn_core::traits::PerformanceStore;

const RECORDS_FILE: &str = "records.json";
const HISTORY_FILE: &str = "history.json";
const ACTIVITIES_FILE: &str = "activities.json";

/// Reject ids that could escape the store directory or collide on
/// case-insensitive filesystems in surprising ways.
fn validate_user_id(user_id: &str) -> Result<(), StoreError> {
    let valid = !user_id.is_empty()
        && user_id.len() <= 128
        && !user_id.starts_with('.')
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(format!("user id '{user_id}'")))
    }
}

/// Performance store backed by JSON files.
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn user_dir(&self, user_id: &str) -> Result<PathBuf, StoreError> {
        validate_user_id(user_id)?;
        Ok(self.root.join("users").join(user_id))
    }

    /// Users with a directory in the store, sorted.
    pub async fn list_users(&self) -> Result<Vec<String>, StoreError> {
        let users_dir = self.root.join("users");
        let mut entries = match tokio::fs::read_dir(&users_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut users = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    if validate_user_id(name).is_ok() {
                        users.push(name.to_string());
                    }
                }
            }
        }
        users.sort();
        Ok(users)
    }

    async fn read_doc<T: DeserializeOwned>(
        &self,
        user_id: &str,
        file: &str,
    ) -> Result<Vec<T>, StoreError> {
        let path = self.user_dir(user_id)?.join(file);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content)
            .map_err(|e| StoreError::Serialization(format!("{}: {e}", path.display())))
    }

    async fn write_doc<T: Serialize>(
        &self,
        user_id: &str,
        file: &str,
        items: &[T],
    ) -> Result<(), StoreError> {
        let dir = self.user_dir(user_id)?;
        tokio::fs::create_dir_all(&dir).await?;

        let json = serde_json::to_vec_pretty(items)?;
        let path = dir.join(file);
        let tmp = dir.join(format!(".{file}.tmp"));
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        tracing::debug!("wrote {} item(s) to {}", items.len(), path.display());
        Ok(())
    }
}

#[async_trait]
impl PerformanceStore for JsonFileStore {
    fn name(&self) -> &str {
        "json"
    }

    async fn load_records(&self, user_id: &str) -> Result<Vec<PerformanceRecord>, StoreError> {
        self.read_doc(user_id, RECORDS_FILE).await
    }

    async fn save_records(
        &self,
        user_id: &str,
        records: &[PerformanceRecord],
    ) -> Result<(), StoreError> {
        self.write_doc(user_id, RECORDS_FILE, records).await
    }

    async fn load_history(&self, user_id: &str) -> Result<Vec<HistoryEntry>, StoreError> {
        self.read_doc(user_id, HISTORY_FILE).await
    }

    async fn append_history(&self, user_id: &str, entry: &HistoryEntry) -> Result<(), StoreError> {
        let mut history: Vec<HistoryEntry> = self.read_doc(user_id, HISTORY_FILE).await?;
        history.retain(|e| e.result.session_id != entry.result.session_id);
        history.push(entry.clone());
        history.sort_by_key(|e| e.completed_at);
        self.write_doc(user_id, HISTORY_FILE, &history).await
    }

    async fn load_activities(&self, user_id: &str) -> Result<Vec<Activity>, StoreError> {
        self.read_doc(user_id, ACTIVITIES_FILE).await
    }

    async fn record_activity(&self, user_id: &str, activity: &Activity) -> Result<(), StoreError> {
        let mut activities: Vec<Activity> = self.read_doc(user_id, ACTIVITIES_FILE).await?;
        if activities.contains(activity) {
            return Ok(());
        }
        activities.push(activity.clone());
        activities.sort_by_key(|a| a.timestamp);
        self.write_doc(user_id, ACTIVITIES_FILE, &activities).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use adaptilearn_core::analytics::ActivityKind;
    use adaptilearn_core::model::{Difficulty, TestResult};
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn entry(session_id: Uuid, score: u32, day: u32) -> HistoryEntry {
        HistoryEntry {
            result: TestResult {
                session_id,
                overall_score: score,
                correct_count: 0,
                total_questions: 1,
                subject_scores: BTreeMap::new(),
                difficulty_scores: BTreeMap::new(),
                insights: vec![],
                time_spent_seconds: 0,
            },
            completed_at: Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn unknown_user_has_empty_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(store.load_records("alice").await.unwrap().is_empty());
        assert!(store.load_history("alice").await.unwrap().is_empty());
        assert!(store.load_activities("alice").await.unwrap().is_empty());
        assert!(store.list_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn records_roundtrip_and_replace() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let mut records = vec![PerformanceRecord::new("alice", "DS", Difficulty::Easy)];
        records[0].attempts = 4;
        records[0].correct = 3;

        store.save_records("alice", &records).await.unwrap();
        assert_eq!(store.load_records("alice").await.unwrap(), records);

        store.save_records("alice", &[]).await.unwrap();
        assert!(store.load_records("alice").await.unwrap().is_empty());
        assert_eq!(store.list_users().await.unwrap(), vec!["alice"]);
        assert!(!dir.path().join("users/alice/.records.json.tmp").exists());
    }

    #[tokio::test]
    async fn history_upserts_by_session_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        store.append_history("alice", &entry(a, 50, 5)).await.unwrap();
        store.append_history("alice", &entry(b, 70, 2)).await.unwrap();
        store.append_history("alice", &entry(a, 55, 5)).await.unwrap();

        let history = store.load_history("alice").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].result.session_id, b);
        assert_eq!(history[1].result.overall_score, 55);
    }

    #[tokio::test]
    async fn identical_activities_are_kept_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let activity = Activity::new(ActivityKind::PracticeSession, ts);

        store.record_activity("alice", &activity).await.unwrap();
        store.record_activity("alice", &activity).await.unwrap();
        let earlier = Activity::new(ActivityKind::PracticeSession, ts - Duration::days(1));
        store.record_activity("alice", &earlier).await.unwrap();

        let log = store.load_activities("alice").await.unwrap();
        assert_eq!(log.len(), 2);
        assert!(log[0].timestamp < log[1].timestamp);
    }

    #[tokio::test]
    async fn path_like_user_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        for bad in ["", "../etc", "a/b", ".hidden"] {
            let err = store.load_records(bad).await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidKey(_)), "{bad:?} accepted");
            assert!(err.is_permanent());
        }
    }

    #[tokio::test]
    async fn corrupt_documents_are_permanent_errors() {
        let dir = tempfile::tempdir().unwrap();
        let user_dir = dir.path().join("users/alice");
        std::fs::create_dir_all(&user_dir).unwrap();
        std::fs::write(user_dir.join(RECORDS_FILE), "{ not json").unwrap();

        let store = JsonFileStore::new(dir.path());
        let err = store.load_records("alice").await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
        assert!(err.is_permanent());
    }
}
