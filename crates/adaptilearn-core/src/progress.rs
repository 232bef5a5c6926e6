//! Folding scored sessions back into performance history.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::model::{normalize_subject, PerformanceRecord, Question};
use crate::scorer::tally_by_bucket;

/// Add one session's answers to `records`, one bucket per (subject, difficulty).
///
/// Existing records for `user_id` are incremented in place; buckets seen for
/// the first time are appended. A bucket that already lists `session_id` in
/// its `merged_sessions` is left alone, so merging the same session twice
/// counts it once. Returns the number of buckets updated.
pub fn merge_session(
    records: &mut Vec<PerformanceRecord>,
    user_id: &str,
    session_id: Uuid,
    questions: &[Question],
    answers: &BTreeMap<String, usize>,
) -> usize {
    let buckets = tally_by_bucket(questions, answers);
    let mut updated = 0;

    for ((subject, difficulty), tally) in &buckets {
        let existing = records.iter().position(|r| {
            r.user_id == user_id
                && r.difficulty == *difficulty
                && normalize_subject(&r.subject) == *subject
        });
        let idx = match existing {
            Some(idx) => idx,
            None => {
                records.push(PerformanceRecord::new(user_id, subject, *difficulty));
                records.len() - 1
            }
        };
        let record = &mut records[idx];
        if !record.merged_sessions.insert(session_id) {
            continue;
        }
        record.attempts = record.attempts.saturating_add(tally.total as u32);
        record.correct = record.correct.saturating_add(tally.correct as u32);
        updated += 1;
    }

    tracing::debug!(
        "merged session {session_id} into {updated}/{} bucket(s) for {user_id}",
        buckets.len()
    );

    updated
}
