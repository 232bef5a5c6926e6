//! In-memory performance store and a fixed question source.
//!
//! Used by tests and by the `memory` backend.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use adaptilearn_core::analytics::Activity;
use adaptilearn_core::error::StoreError;
use adaptilearn_core::model::{HistoryEntry, PerformanceRecord, Question};
use adaptilearn_core::traits::{PerformanceStore, QuestionSource};

#[derive(Default)]
struct UserData {
    records: Vec<PerformanceRecord>,
    history: Vec<HistoryEntry>,
    activities: Vec<Activity>,
}

/// A process-local store with optional transient failure injection.
#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<String, UserData>>,
    pending_failures: AtomicU32,
    call_count: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` operations fail with [`StoreError::Unavailable`].
    pub fn fail_next(&self, n: u32) {
        self.pending_failures.store(n, Ordering::SeqCst);
    }

    /// Number of store operations attempted, failed ones included.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    fn begin(&self) -> Result<MutexGuard<'_, HashMap<String, UserData>>, StoreError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Unavailable("injected failure".into()));
        }
        self.users
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl PerformanceStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load_records(&self, user_id: &str) -> Result<Vec<PerformanceRecord>, StoreError> {
        let users = self.begin()?;
        Ok(users.get(user_id).map(|u| u.records.clone()).unwrap_or_default())
    }

    async fn save_records(
        &self,
        user_id: &str,
        records: &[PerformanceRecord],
    ) -> Result<(), StoreError> {
        let mut users = self.begin()?;
        users.entry(user_id.to_string()).or_default().records = records.to_vec();
        Ok(())
    }

    async fn load_history(&self, user_id: &str) -> Result<Vec<HistoryEntry>, StoreError> {
        let users = self.begin()?;
        Ok(users.get(user_id).map(|u| u.history.clone()).unwrap_or_default())
    }

    async fn append_history(&self, user_id: &str, entry: &HistoryEntry) -> Result<(), StoreError> {
        let mut users = self.begin()?;
        let history = &mut users.entry(user_id.to_string()).or_default().history;
        history.retain(|e| e.result.session_id != entry.result.session_id);
        history.push(entry.clone());
        history.sort_by_key(|e| e.completed_at);
        Ok(())
    }

    async fn load_activities(&self, user_id: &str) -> Result<Vec<Activity>, StoreError> {
        let users = self.begin()?;
        Ok(users.get(user_id).map(|u| u.activities.clone()).unwrap_or_default())
    }

    async fn record_activity(&self, user_id: &str, activity: &Activity) -> Result<(), StoreError> {
        let mut users = self.begin()?;
        let activities = &mut users.entry(user_id.to_string()).or_default().activities;
        if !activities.contains(activity) {
            activities.push(activity.clone());
            activities.sort_by_key(|a| a.timestamp);
        }
        Ok(())
    }
}

/// A question source over a fixed list.
pub struct StaticSource {
    questions: Vec<Question>,
}

impl StaticSource {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }
}

#[async_trait]
impl QuestionSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_pool(&self, subjects: &BTreeSet<String>) -> Result<Vec<Question>, StoreError> {
        Ok(self
            .questions
            .iter()
            .filter(|q| subjects.is_empty() || subjects.contains(&q.subject))
            .cloned()
            .collect())
    }
}
