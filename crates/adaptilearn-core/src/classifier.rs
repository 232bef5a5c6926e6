//! Weak/strong area classification.
//!
//! Pools every historical record of a subject (all difficulties, all past
//! tests) into one average and buckets it against fixed thresholds. The
//! comparisons are done on integer counts so boundary averages land exactly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{normalize_subject, PerformanceRecord};

/// Classification of one subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectArea {
    Strong,
    Moderate,
    Weak,
}

/// Disjoint subject lists, each sorted by subject name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaClassification {
    /// Average ≥ 0.80.
    pub strong: Vec<String>,
    /// Everything in between, plus subjects with no attempts.
    pub moderate: Vec<String>,
    /// Average < 0.60.
    pub weak: Vec<String>,
    /// Pooled `correct / attempts` per subject with at least one attempt.
    pub averages: BTreeMap<String, f64>,
}

impl AreaClassification {
    /// No history at all: callers should fall back to non-adaptive selection.
    pub fn is_insufficient(&self) -> bool {
        self.strong.is_empty() && self.moderate.is_empty() && self.weak.is_empty()
    }

    /// Which bucket `subject` landed in, if it appeared in the history.
    pub fn area_of(&self, subject: &str) -> Option<SubjectArea> {
        let subject = normalize_subject(subject);
        if self.strong.contains(&subject) {
            Some(SubjectArea::Strong)
        } else if self.weak.contains(&subject) {
            Some(SubjectArea::Weak)
        } else if self.moderate.contains(&subject) {
            Some(SubjectArea::Moderate)
        } else {
            None
        }
    }
}

fn classify_counts(correct: u64, attempts: u64) -> SubjectArea {
    if attempts == 0 {
        return SubjectArea::Moderate;
    }
    // correct/attempts >= 0.8  <=>  5c >= 4a ; correct/attempts < 0.6  <=>  5c < 3a
    if correct * 5 >= attempts * 4 {
        SubjectArea::Strong
    } else if correct * 5 < attempts * 3 {
        SubjectArea::Weak
    } else {
        SubjectArea::Moderate
    }
}

/// Classify the subjects present in `records`.
pub fn classify_areas(records: &[PerformanceRecord]) -> AreaClassification {
    let mut totals: BTreeMap<String, (u64, u64)> = BTreeMap::new();
    for record in records {
        let entry = totals.entry(normalize_subject(&record.subject)).or_default();
        entry.0 += u64::from(record.correct);
        entry.1 += u64::from(record.attempts);
    }

    let mut classification = AreaClassification::default();
    for (subject, (correct, attempts)) in totals {
        if attempts > 0 {
            classification
                .averages
                .insert(subject.clone(), correct as f64 / attempts as f64);
        }
        match classify_counts(correct, attempts) {
            SubjectArea::Strong => classification.strong.push(subject),
            SubjectArea::Moderate => classification.moderate.push(subject),
            SubjectArea::Weak => classification.weak.push(subject),
        }
    }

    tracing::debug!(
        "classified {} subjects: {} strong, {} moderate, {} weak",
        classification.averages.len(),
        classification.strong.len(),
        classification.moderate.len(),
        classification.weak.len()
    );

    classification
}
