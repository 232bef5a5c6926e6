//! Adaptive question selection.
//!
//! Selection is deterministic and order-preserving: the same pool, weak
//! subjects and configuration always yield the same test. Callers wanting a
//! randomized test shuffle the pool first with [`pre_shuffle`].

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::model::{normalize_subject, Question, TestConfiguration};

/// A question chosen for a test, with the reason it was picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedQuestion {
    pub question: Question,
    /// Set for questions filling a weak-area slot. Display only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Slots reserved for weak subjects: `floor(question_count * 0.6)`.
pub fn weak_slot_count(question_count: usize) -> usize {
    question_count * 3 / 5
}

fn weak_area_reason(subject: &str) -> String {
    format!("Selected because {subject} is identified as a weak area")
}

/// Shuffle a copy of `pool` with a seeded RNG. The same seed gives the same order.
pub fn pre_shuffle(pool: &[Question], seed: u64) -> Vec<Question> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut shuffled = pool.to_vec();
    shuffled.shuffle(&mut rng);
    shuffled
}

/// Select `config.question_count` questions from `pool`.
///
/// The pool is first narrowed by `config.subjects` and
/// `config.performance_level`, and repeated ids are dropped. With
/// `focus_weak_areas` and a non-empty `weak_subjects`, the first
/// [`weak_slot_count`] weak-subject questions are taken in pool order, then
/// the rest is filled, in pool order, from every eligible question not
/// already picked. Remainder picks may include further weak-subject
/// questions; only the reserved slots carry a reason. Otherwise the first
/// `question_count` eligible questions are taken.
///
/// When the pool cannot fill the test, returns
/// [`CoreError::PoolExhausted`] carrying everything that was selected.
pub fn select_questions(
    pool: &[Question],
    weak_subjects: &[String],
    config: &TestConfiguration,
) -> Result<Vec<SelectedQuestion>, CoreError> {
    let requested = config.question_count;

    let mut seen_ids = HashSet::new();
    let eligible: Vec<&Question> = pool
        .iter()
        .filter(|q| {
            config.subjects.is_empty() || config.subjects.contains(&normalize_subject(&q.subject))
        })
        .filter(|q| {
            config
                .performance_level
                .map_or(true, |level| level.allows(q.difficulty))
        })
        .filter(|q| seen_ids.insert(q.id.as_str()))
        .collect();

    let weak: HashSet<String> = weak_subjects.iter().map(|s| normalize_subject(s)).collect();
    let mut selected: Vec<SelectedQuestion> = Vec::with_capacity(requested);

    if config.focus_weak_areas && !weak.is_empty() {
        let weak_slots = weak_slot_count(requested);
        let is_weak = |q: &Question| weak.contains(&normalize_subject(&q.subject));

        selected.extend(
            eligible
                .iter()
                .filter(|q| is_weak(q))
                .take(weak_slots)
                .map(|q| SelectedQuestion {
                    question: (*q).clone(),
                    reason: Some(weak_area_reason(&normalize_subject(&q.subject))),
                }),
        );
        let weak_taken = selected.len();
        let picked: HashSet<String> = selected.iter().map(|s| s.question.id.clone()).collect();

        let remaining = requested - weak_taken;
        selected.extend(
            eligible
                .iter()
                .filter(|q| !picked.contains(&q.id))
                .take(remaining)
                .map(|q| SelectedQuestion {
                    question: (*q).clone(),
                    reason: None,
                }),
        );

        tracing::debug!(
            "adaptive selection: {weak_taken}/{weak_slots} weak-area slots filled, {} general",
            selected.len() - weak_taken
        );
    } else {
        selected.extend(eligible.iter().take(requested).map(|q| SelectedQuestion {
            question: (*q).clone(),
            reason: None,
        }));
        tracing::debug!("non-adaptive selection: {} questions", selected.len());
    }

    if selected.len() < requested {
        tracing::warn!(
            "question pool exhausted: requested {requested}, selected {}",
            selected.len()
        );
        return Err(CoreError::PoolExhausted {
            requested,
            selected,
        });
    }

    Ok(selected)
}
