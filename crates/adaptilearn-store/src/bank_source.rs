//! Question source over TOML question bank files.

use std::collections::BTreeSet;
use std::path::PathBuf;

use async_trait::async_trait;

use adaptilearn_core::error::StoreError;
use adaptilearn_core::model::Question;
use adaptilearn_core::parser::{load_banks, QuestionBank};
use adaptilearn_core::traits::QuestionSource;

/// Reads every configured bank on each fetch, so edits to the bank files
/// are picked up without a restart.
pub struct TomlBankSource {
    paths: Vec<PathBuf>,
}

impl TomlBankSource {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Load all banks in configured order.
    pub fn load(&self) -> Result<Vec<QuestionBank>, StoreError> {
        let mut banks = Vec::new();
        for path in &self.paths {
            if !path.exists() {
                return Err(StoreError::NotFound(format!(
                    "question bank path {}",
                    path.display()
                )));
            }
            let loaded = load_banks(path).map_err(|e| StoreError::Io(format!("{e:#}")))?;
            tracing::debug!("loaded {} bank(s) from {}", loaded.len(), path.display());
            banks.extend(loaded);
        }
        Ok(banks)
    }
}

#[async_trait]
impl QuestionSource for TomlBankSource {
    fn name(&self) -> &str {
        "toml"
    }

    async fn fetch_pool(&self, subjects: &BTreeSet<String>) -> Result<Vec<Question>, StoreError> {
        let pool: Vec<Question> = self
            .load()?
            .into_iter()
            .flat_map(|bank| bank.questions)
            .filter(|q| subjects.is_empty() || subjects.contains(&q.subject))
            .collect();
        tracing::debug!("question pool has {} question(s)", pool.len());
        Ok(pool)
    }
}
