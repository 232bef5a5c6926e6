//! Adaptive test orchestrator.
//!
//! Wires the pure pipeline (classify → select → score → analyze) to a
//! performance store and a question source, with retries on every store
//! call and bounded concurrency for bulk analytics refreshes.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{Mutex, Semaphore};

use crate::analytics::{summarize, Activity, ActivityKind, AnalyticsSummary};
use crate::classifier::{classify_areas, AreaClassification};
use crate::error::CoreError;
use crate::model::{HistoryEntry, SelectionPolicy, TestConfiguration, TestResult, TestSession};
use crate::progress::merge_session;
use crate::rate_limit::RateLimiterState;
use crate::retry::{retry_idempotent, RetryPolicy};
use crate::selector::{pre_shuffle, select_questions};
use crate::traits::{PerformanceStore, QuestionSource};

/// Rate-limiter key for question pool fetches.
pub const QUESTION_BANK_API: &str = "question_bank";

/// Configuration for the adaptive engine.
#[derive(Debug, Clone)]
pub struct AdaptiveEngineConfig {
    /// Retry policy for every store and source call.
    pub retry: RetryPolicy,
    /// Maximum concurrent users in [`AdaptiveEngine::refresh_analytics`].
    pub parallelism: usize,
    /// Shrink the test to the available questions instead of failing on
    /// pool exhaustion.
    pub shrink_on_exhaustion: bool,
}

impl Default for AdaptiveEngineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            parallelism: 4,
            shrink_on_exhaustion: false,
        }
    }
}

/// Progress reporting for bulk analytics refreshes.
pub trait ProgressReporter: Send + Sync {
    fn on_user_start(&self, user_id: &str);
    fn on_user_complete(&self, user_id: &str, summary: &AnalyticsSummary);
    fn on_user_error(&self, user_id: &str, error: &str);
    fn on_refresh_complete(&self, total: usize, completed: usize, failed: usize, elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_user_start(&self, _: &str) {}
    fn on_user_complete(&self, _: &str, _: &AnalyticsSummary) {}
    fn on_user_error(&self, _: &str, _: &str) {}
    fn on_refresh_complete(&self, _: usize, _: usize, _: usize, _: Duration) {}
}

/// A freshly started test.
#[derive(Debug, Clone)]
pub struct StartedTest {
    pub session: TestSession,
    /// The classification the selection was based on.
    pub classification: AreaClassification,
    /// Originally requested count when the test was shrunk.
    pub shrunk_from: Option<usize>,
}

/// Outcome of [`AdaptiveEngine::refresh_analytics`].
#[derive(Debug, Default)]
pub struct AnalyticsRefresh {
    pub summaries: BTreeMap<String, AnalyticsSummary>,
    /// User id → error message.
    pub failures: BTreeMap<String, String>,
    pub duration_ms: u64,
}

/// The adaptive testing engine.
pub struct AdaptiveEngine {
    store: Arc<dyn PerformanceStore>,
    source: Arc<dyn QuestionSource>,
    limiter: Mutex<RateLimiterState>,
    config: AdaptiveEngineConfig,
}

impl AdaptiveEngine {
    pub fn new(
        store: Arc<dyn PerformanceStore>,
        source: Arc<dyn QuestionSource>,
        limiter: RateLimiterState,
        config: AdaptiveEngineConfig,
    ) -> Self {
        Self {
            store,
            source,
            limiter: Mutex::new(limiter),
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn PerformanceStore> {
        &self.store
    }

    pub fn config(&self) -> &AdaptiveEngineConfig {
        &self.config
    }

    /// Classify `user_id` from their stored performance records.
    pub async fn classify_user(&self, user_id: &str) -> Result<AreaClassification> {
        let records = retry_idempotent("load performance records", self.config.retry, || {
            self.store.load_records(user_id)
        })
        .await
        .with_context(|| format!("failed to load performance records for '{user_id}'"))?;
        Ok(classify_areas(&records))
    }

    /// Assemble a test for `user_id`.
    ///
    /// Users without history get a non-adaptive test. Fails with
    /// [`CoreError::PoolExhausted`] (inside the `anyhow` error) when the
    /// pool is too small, unless `shrink_on_exhaustion` is set.
    pub async fn start_test(
        &self,
        user_id: &str,
        mut config: TestConfiguration,
    ) -> Result<StartedTest> {
        self.limiter
            .lock()
            .await
            .acquire(QUESTION_BANK_API, Instant::now())?;

        let pool = retry_idempotent("fetch question pool", self.config.retry, || {
            self.source.fetch_pool(&config.subjects)
        })
        .await
        .with_context(|| format!("failed to fetch questions from '{}'", self.source.name()))?;

        let classification = self.classify_user(user_id).await?;
        let weak = if classification.is_insufficient() {
            tracing::info!("no history for '{user_id}', selecting without adaptation");
            Vec::new()
        } else {
            classification.weak.clone()
        };

        let pool = match config.policy {
            SelectionPolicy::Deterministic => pool,
            SelectionPolicy::PreShuffled { seed } => pre_shuffle(&pool, seed),
        };

        let mut shrunk_from = None;
        let selected = match select_questions(&pool, &weak, &config) {
            Ok(selected) => selected,
            Err(CoreError::PoolExhausted {
                requested,
                selected,
            }) if self.config.shrink_on_exhaustion && !selected.is_empty() => {
                tracing::warn!(
                    "shrinking test for '{user_id}' from {requested} to {} questions",
                    selected.len()
                );
                config.question_count = selected.len();
                shrunk_from = Some(requested);
                selected
            }
            Err(e) => return Err(e.into()),
        };

        let session = TestSession::start(user_id, config, selected, Utc::now())?;
        tracing::info!(
            "started session {} for '{user_id}' with {} questions",
            session.id(),
            session.questions().len()
        );

        Ok(StartedTest {
            session,
            classification,
            shrunk_from,
        })
    }

    /// Seal, score and persist a session.
    ///
    /// An expired session is sealed at its deadline. Each performance record
    /// remembers the sessions merged into it and is saved in the same write
    /// as its counts, so submitting a session again (including after a failed
    /// history write) re-scores it without counting its answers twice.
    pub async fn submit_test(
        &self,
        session: &mut TestSession,
        now: DateTime<Utc>,
    ) -> Result<TestResult> {
        if !session.is_submitted() && !session.submit_if_expired(now) {
            session.submit(now)?;
        }
        let result = session.score()?;
        let user_id = session.user_id().to_string();
        let completed_at = session.submitted_at().unwrap_or(now);
        let retry = self.config.retry;

        let mut records = retry_idempotent("load performance records", retry, || {
            self.store.load_records(&user_id)
        })
        .await
        .context("failed to load performance records")?;
        let updated = merge_session(
            &mut records,
            &user_id,
            session.id(),
            session.questions(),
            session.answers(),
        );
        if updated == 0 {
            tracing::info!("session {} already merged, skipping progress update", session.id());
        } else {
            retry_idempotent("save performance records", retry, || {
                self.store.save_records(&user_id, &records)
            })
            .await
            .context("failed to save performance records")?;
        }

        let entry = HistoryEntry {
            result: result.clone(),
            completed_at,
        };
        retry_idempotent("append history", retry, || self.store.append_history(&user_id, &entry))
            .await
            .context("failed to persist result")?;

        let activity = Activity {
            kind: ActivityKind::AssessmentCompleted,
            timestamp: completed_at,
            session_id: Some(session.id()),
        };
        retry_idempotent("record activity", retry, || {
            self.store.record_activity(&user_id, &activity)
        })
        .await
        .context("failed to record activity")?;

        tracing::info!(
            "persisted result for session {}: {}% ({}/{})",
            session.id(),
            result.overall_score,
            result.correct_count,
            result.total_questions
        );

        Ok(result)
    }

    /// Record an answer and log it as study activity.
    ///
    /// A session past its deadline is sealed instead and the answer is
    /// rejected with [`CoreError::SessionSealed`].
    pub async fn answer_question(
        &self,
        session: &mut TestSession,
        question_id: &str,
        option: usize,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if session.submit_if_expired(now) {
            return Err(anyhow::Error::new(CoreError::SessionSealed)
                .context("time limit expired; the session was submitted"));
        }
        session.answer(question_id, option)?;

        let activity = Activity {
            kind: ActivityKind::QuestionAnswered,
            timestamp: now,
            session_id: Some(session.id()),
        };
        retry_idempotent("record activity", self.config.retry, || {
            self.store.record_activity(session.user_id(), &activity)
        })
        .await
        .context("failed to record activity")?;
        Ok(())
    }

    /// Analytics summary of one user as of `now`.
    pub async fn user_analytics<Tz: TimeZone>(
        &self,
        user_id: &str,
        now: &DateTime<Tz>,
    ) -> Result<AnalyticsSummary> {
        let retry = self.config.retry;
        let history = retry_idempotent("load history", retry, || self.store.load_history(user_id))
            .await
            .with_context(|| format!("failed to load history for '{user_id}'"))?;
        let activities =
            retry_idempotent("load activities", retry, || self.store.load_activities(user_id))
                .await
                .with_context(|| format!("failed to load activities for '{user_id}'"))?;
        let records = retry_idempotent("load performance records", retry, || {
            self.store.load_records(user_id)
        })
        .await
        .with_context(|| format!("failed to load performance records for '{user_id}'"))?;

        Ok(summarize(&history, &activities, &records, now))
    }

    /// Recompute analytics for many users concurrently.
    ///
    /// Users are independent: one failing does not affect the others.
    pub async fn refresh_analytics<Tz: TimeZone>(
        &self,
        user_ids: &[String],
        now: &DateTime<Tz>,
        progress: &dyn ProgressReporter,
    ) -> AnalyticsRefresh {
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.config.parallelism.max(1)));
        let mut futures = FuturesUnordered::new();

        for user_id in user_ids {
            let semaphore = Arc::clone(&semaphore);
            futures.push(async move {
                let inner = async {
                    let _permit = semaphore
                        .clone()
                        .acquire_owned()
                        .await
                        .map_err(|_| anyhow::anyhow!("semaphore closed"))?;
                    progress.on_user_start(user_id);
                    self.user_analytics(user_id, now).await
                };
                (user_id, inner.await)
            });
        }

        let total = futures.len();
        let mut outcome = AnalyticsRefresh::default();
        while let Some((user_id, result)) = futures.next().await {
            match result {
                Ok(summary) => {
                    progress.on_user_complete(user_id, &summary);
                    outcome.summaries.insert(user_id.clone(), summary);
                }
                Err(e) => {
                    tracing::error!("analytics refresh failed for '{user_id}': {e:#}");
                    progress.on_user_error(user_id, &format!("{e:#}"));
                    outcome.failures.insert(user_id.clone(), format!("{e:#}"));
                }
            }
        }

        let elapsed = start.elapsed();
        progress.on_refresh_complete(
            total,
            outcome.summaries.len(),
            outcome.failures.len(),
            elapsed,
        );
        outcome.duration_ms = elapsed.as_millis() as u64;
        outcome
    }
}
