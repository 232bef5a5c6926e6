//! Async seams to persistence and question supply.
//!
//! Implemented by the `adaptilearn-store` crate. All writes replace or
//! upsert whole documents, so repeating one is harmless and the retry
//! wrapper may call them again after a transient failure.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::analytics::Activity;
use crate::error::StoreError;
use crate::model::{HistoryEntry, PerformanceRecord, Question};

/// Per-user performance history, result history and activity log.
#[async_trait]
pub trait PerformanceStore: Send + Sync {
    /// Human-readable backend name (e.g. "json").
    fn name(&self) -> &str;

    /// All performance records of `user_id`. Empty for unknown users.
    async fn load_records(&self, user_id: &str) -> Result<Vec<PerformanceRecord>, StoreError>;

    /// Replace all performance records of `user_id`. Last write wins.
    async fn save_records(
        &self,
        user_id: &str,
        records: &[PerformanceRecord],
    ) -> Result<(), StoreError>;

    /// Completed results of `user_id`, oldest first.
    async fn load_history(&self, user_id: &str) -> Result<Vec<HistoryEntry>, StoreError>;

    /// Add a result, replacing any earlier entry for the same session.
    async fn append_history(&self, user_id: &str, entry: &HistoryEntry) -> Result<(), StoreError>;

    /// Activity log of `user_id`, oldest first.
    async fn load_activities(&self, user_id: &str) -> Result<Vec<Activity>, StoreError>;

    /// Log an activity. Logging an identical activity twice keeps one copy.
    async fn record_activity(&self, user_id: &str, activity: &Activity) -> Result<(), StoreError>;
}

/// Supplier of candidate questions.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Human-readable source name.
    fn name(&self) -> &str;

    /// Questions in pool order. An empty `subjects` set means every subject.
    async fn fetch_pool(&self, subjects: &BTreeSet<String>) -> Result<Vec<Question>, StoreError>;
}
