//! adaptilearn-core: adaptive test assembly, scoring, insights and analytics.
//!
//! This crate defines the data model, the pure selection/scoring/analytics
//! functions, and the async seams (stores, question sources) that the rest
//! of adaptilearn builds on.

pub mod analytics;
pub mod classifier;
pub mod engine;
pub mod error;
pub mod insights;
pub mod model;
pub mod parser;
pub mod progress;
pub mod rate_limit;
pub mod report;
pub mod retry;
pub mod scorer;
pub mod selector;
pub mod traits;
