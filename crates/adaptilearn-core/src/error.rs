//! Error types for the adaptive-testing pipeline.
//!
//! `CoreError` covers programming errors and caller-visible conditions in the
//! pure pipeline. `StoreError` is defined here rather than in the store crate
//! so the retry wrapper can classify failures without string matching.

use std::time::Duration;

use thiserror::Error;

use crate::selector::SelectedQuestion;

/// Errors raised by the selection, session and scoring logic.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Scoring was attempted on a session with no questions.
    #[error("invalid session: cannot score an empty question set")]
    InvalidSession,

    /// The question pool could not fill the requested count.
    ///
    /// `selected` holds every question that could be selected, in order.
    #[error("question pool exhausted: requested {requested}, only {} available", .selected.len())]
    PoolExhausted {
        requested: usize,
        selected: Vec<SelectedQuestion>,
    },

    /// An answer referenced a question that is not part of the session.
    #[error("question '{0}' is not part of this session")]
    UnknownQuestion(String),

    /// An answer used an option index outside the question's options.
    #[error("option {option} is out of range for question '{question_id}'")]
    InvalidOption { question_id: String, option: usize },

    /// The same question id appeared twice in a session.
    #[error("duplicate question '{0}' in session")]
    DuplicateQuestion(String),

    /// The session was already submitted and is immutable.
    #[error("session already submitted")]
    SessionSealed,

    /// The session has not been submitted yet.
    #[error("session has not been submitted")]
    SessionNotSubmitted,

    /// `question_count` disagrees with the number of questions supplied.
    #[error("question count mismatch: configured {configured}, got {actual}")]
    QuestionCountMismatch { configured: usize, actual: usize },

    /// An external API budget is spent for the current window.
    #[error("rate limited on '{api}', retry after {}s", .retry_after.as_secs())]
    RateLimited { api: String, retry_after: Duration },
}

/// Errors reported by a performance store or question source.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The backend is temporarily unreachable.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A filesystem or transport failure.
    #[error("I/O error: {0}")]
    Io(String),

    /// A stored document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The requested document does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A key (user id, bank id) is not usable by this backend.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

impl StoreError {
    /// Returns `true` if retrying cannot succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            StoreError::Serialization(_) | StoreError::NotFound(_) | StoreError::InvalidKey(_)
        )
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Structured failure surfaced by the retry wrapper.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Every attempt failed with a transient error.
    #[error("{operation} failed after {attempts} attempts: {source}")]
    Exhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: StoreError,
    },

    /// The first failure was permanent; no retry was made.
    #[error("{operation} failed permanently: {source}")]
    Permanent {
        operation: String,
        #[source]
        source: StoreError,
    },
}

impl PersistenceError {
    /// The store error that ended the attempts.
    pub fn store_error(&self) -> &StoreError {
        match self {
            PersistenceError::Exhausted { source, .. }
            | PersistenceError::Permanent { source, .. } => source,
        }
    }
}
