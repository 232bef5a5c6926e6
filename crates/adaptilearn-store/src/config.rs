//! Configuration and backend factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use adaptilearn_core::engine::AdaptiveEngineConfig;
use adaptilearn_core::model::TestConfiguration;
use adaptilearn_core::rate_limit::{RateLimit, RateLimiterState};
use adaptilearn_core::retry::RetryPolicy;
use adaptilearn_core::traits::{PerformanceStore, QuestionSource};

use crate::bank_source::TomlBankSource;
use crate::json_store::JsonFileStore;
use crate::memory::MemoryStore;

/// Environment variable overriding `data_dir`.
pub const DATA_DIR_ENV: &str = "ADAPTILEARN_DATA_DIR";

/// Which performance store to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// One JSON document per user and collection under `data_dir`.
    #[default]
    Json,
    /// Process-local; nothing survives a restart.
    Memory,
}

/// Per-API request budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub requests: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_window_secs() -> u64 {
    3600
}

/// Defaults for new tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestDefaults {
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: u32,
    #[serde(default = "default_question_count")]
    pub question_count: usize,
    #[serde(default = "default_true")]
    pub focus_weak_areas: bool,
}

fn default_duration_minutes() -> u32 {
    30
}
fn default_question_count() -> usize {
    8
}
fn default_true() -> bool {
    true
}

impl Default for TestDefaults {
    fn default() -> Self {
        Self {
            duration_minutes: default_duration_minutes(),
            question_count: default_question_count(),
            focus_weak_areas: true,
        }
    }
}

/// Top-level adaptilearn configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptilearnConfig {
    /// Performance store backend.
    #[serde(default)]
    pub store: StoreBackend,
    /// Root directory of the JSON store.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Question bank files or directories, in pool order.
    #[serde(default = "default_question_banks")]
    pub question_banks: Vec<PathBuf>,
    /// Attempts per store operation, including the first.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Fixed delay between attempts in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Max users analyzed concurrently.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Shrink tests to the available questions instead of failing.
    #[serde(default)]
    pub shrink_on_exhaustion: bool,
    #[serde(default)]
    pub test: TestDefaults,
    /// Overrides and additions to the built-in API budgets. Enforced by the
    /// engine that owns the limiter, for as long as it lives.
    #[serde(default)]
    pub rate_limits: HashMap<String, RateLimitConfig>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./adaptilearn-data")
}
fn default_question_banks() -> Vec<PathBuf> {
    vec![PathBuf::from("question-banks")]
}
fn default_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    1000
}
fn default_parallelism() -> usize {
    4
}

impl Default for AdaptilearnConfig {
    fn default() -> Self {
        Self {
            store: StoreBackend::default(),
            data_dir: default_data_dir(),
            question_banks: default_question_banks(),
            max_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            parallelism: default_parallelism(),
            shrink_on_exhaustion: false,
            test: TestDefaults::default(),
            rate_limits: HashMap::new(),
        }
    }
}

impl AdaptilearnConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.retry_delay_ms))
    }

    pub fn engine_config(&self) -> AdaptiveEngineConfig {
        AdaptiveEngineConfig {
            retry: self.retry_policy(),
            parallelism: self.parallelism,
            shrink_on_exhaustion: self.shrink_on_exhaustion,
        }
    }

    /// Built-in budgets with the configured overrides applied.
    pub fn rate_limiter(&self) -> RateLimiterState {
        self.rate_limits
            .iter()
            .fold(RateLimiterState::with_defaults(), |state, (api, limit)| {
                state.with_limit(
                    api,
                    RateLimit {
                        requests: limit.requests,
                        window: Duration::from_secs(limit.window_secs),
                    },
                )
            })
    }

    /// A test configuration seeded from the `[test]` defaults.
    pub fn test_configuration(&self) -> TestConfiguration {
        TestConfiguration {
            duration_minutes: self.test.duration_minutes,
            question_count: self.test.question_count,
            focus_weak_areas: self.test.focus_weak_areas,
            ..Default::default()
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
/// Unset variables resolve to the empty string.
pub fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_path(path: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy()))
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `adaptilearn.toml` in the current directory
/// 2. `~/.config/adaptilearn/config.toml`
///
/// `ADAPTILEARN_DATA_DIR` overrides `data_dir`.
pub fn load_config() -> Result<AdaptilearnConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<AdaptilearnConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("adaptilearn.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match &config_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config_str(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => AdaptilearnConfig::default(),
    };

    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            config.data_dir = PathBuf::from(dir);
        }
    }

    tracing::debug!(
        "loaded config from {}",
        config_path
            .as_deref()
            .map_or_else(|| "defaults".to_string(), |p| p.display().to_string())
    );

    Ok(config)
}

/// Parse a config document and resolve `${VAR}` references in its paths.
pub fn parse_config_str(content: &str) -> Result<AdaptilearnConfig> {
    let mut config: AdaptilearnConfig = toml::from_str(content)?;
    config.data_dir = resolve_path(&config.data_dir);
    config.question_banks = config.question_banks.iter().map(|p| resolve_path(p)).collect();
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("adaptilearn"))
}

/// Create the configured performance store.
pub fn create_store(config: &AdaptilearnConfig) -> Arc<dyn PerformanceStore> {
    match config.store {
        StoreBackend::Json => Arc::new(JsonFileStore::new(&config.data_dir)),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    }
}

/// Create the question source over the configured banks.
pub fn create_source(config: &AdaptilearnConfig) -> Arc<dyn QuestionSource> {
    Arc::new(TomlBankSource::new(config.question_banks.clone()))
}
