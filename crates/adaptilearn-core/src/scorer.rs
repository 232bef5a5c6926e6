//! Result scoring.
//!
//! Compares submitted answers against the answer key and produces overall,
//! per-subject and per-difficulty percentages. All percentages use integer
//! round-half-up arithmetic so the same inputs always score identically.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::error::CoreError;
use crate::insights::generate_insights;
use crate::model::{normalize_subject, Difficulty, DifficultyScore, Question, TestResult};

/// Correct/total counter for one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub correct: usize,
    pub total: usize,
}

impl Tally {
    fn add(&mut self, correct: bool) {
        self.total += 1;
        if correct {
            self.correct += 1;
        }
    }

    pub fn percentage(&self) -> Option<u32> {
        percentage(self.correct, self.total)
    }
}

/// `round(100 * correct / total)` with halves rounded up. `None` when `total` is 0.
pub fn percentage(correct: usize, total: usize) -> Option<u32> {
    if total == 0 {
        return None;
    }
    // floor((100c/t) + 1/2) == floor((200c + t) / 2t)
    let value = (200 * correct as u64 + total as u64) / (2 * total as u64);
    Some(value as u32)
}

/// Tally answers per (subject, difficulty). Unanswered questions count as incorrect.
pub fn tally_by_bucket(
    questions: &[Question],
    answers: &BTreeMap<String, usize>,
) -> BTreeMap<(String, Difficulty), Tally> {
    let mut buckets: BTreeMap<(String, Difficulty), Tally> = BTreeMap::new();
    for q in questions {
        let correct = q.is_correct(answers.get(&q.id).copied());
        buckets
            .entry((normalize_subject(&q.subject), q.difficulty))
            .or_default()
            .add(correct);
    }
    buckets
}

/// Score answers against the questions of a session.
///
/// Answers for ids outside `questions` are ignored. Fails with
/// [`CoreError::InvalidSession`] when `questions` is empty.
pub fn score_answers(
    session_id: Uuid,
    questions: &[Question],
    answers: &BTreeMap<String, usize>,
    time_spent_seconds: u64,
) -> Result<TestResult, CoreError> {
    let mut overall = Tally::default();
    let mut by_subject: BTreeMap<String, Tally> = BTreeMap::new();
    let mut by_difficulty: BTreeMap<Difficulty, Tally> = BTreeMap::new();

    for q in questions {
        let correct = q.is_correct(answers.get(&q.id).copied());
        overall.add(correct);
        by_subject
            .entry(normalize_subject(&q.subject))
            .or_default()
            .add(correct);
        by_difficulty.entry(q.difficulty).or_default().add(correct);
    }

    let Some(overall_score) = overall.percentage() else {
        return Err(CoreError::InvalidSession);
    };

    let subject_scores: BTreeMap<String, u32> = by_subject
        .into_iter()
        .filter_map(|(subject, tally)| tally.percentage().map(|p| (subject, p)))
        .collect();

    let difficulty_scores: BTreeMap<Difficulty, DifficultyScore> = by_difficulty
        .into_iter()
        .filter_map(|(difficulty, tally)| {
            tally.percentage().map(|percentage| {
                (
                    difficulty,
                    DifficultyScore {
                        correct: tally.correct,
                        total: tally.total,
                        percentage,
                    },
                )
            })
        })
        .collect();

    let insights = generate_insights(&subject_scores, &difficulty_scores);

    tracing::debug!(
        "scored session {session_id}: {}/{} correct ({overall_score}%)",
        overall.correct,
        overall.total
    );

    Ok(TestResult {
        session_id,
        overall_score,
        correct_count: overall.correct,
        total_questions: overall.total,
        subject_scores,
        difficulty_scores,
        insights,
        time_spent_seconds,
    })
}
