//! Persistence backends, question sources and configuration for adaptilearn.

pub mod bank_source;
pub mod config;
pub mod json_store;
pub mod memory;

pub use bank_source::TomlBankSource;
pub use config::{create_source, create_store, load_config, load_config_from, AdaptilearnConfig};
pub use json_store::JsonFileStore;
pub use memory::{MemoryStore, StaticSource};
