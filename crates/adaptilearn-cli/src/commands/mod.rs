//! Subcommand implementations.

pub mod analyze;
pub mod answer;
pub mod classify;
pub mod init;
pub mod report;
pub mod select;
pub mod submit;
pub mod validate;

use std::path::Path;

use anyhow::Result;

use adaptilearn_core::engine::AdaptiveEngine;
use adaptilearn_store::config::{
    create_source, create_store, load_config_from, AdaptilearnConfig,
};

/// Load the config and wire an engine over its store and question source.
///
/// The rate limiter is created here, so `[rate_limits]` budgets apply per
/// invocation and are not shared between runs.
pub fn build_engine(config_path: Option<&Path>) -> Result<(AdaptilearnConfig, AdaptiveEngine)> {
    let config = load_config_from(config_path)?;
    let engine = AdaptiveEngine::new(
        create_store(&config),
        create_source(&config),
        config.rate_limiter(),
        config.engine_config(),
    );
    Ok((config, engine))
}
