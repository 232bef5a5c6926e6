//! Insight generation from subject and difficulty breakdowns.
//!
//! Rules are applied in a fixed order and are not mutually exclusive:
//! per-subject weaknesses, per-subject strengths, an easy-question concern,
//! then a hard-question achievement.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{Difficulty, DifficultyScore, Insight, InsightKind};

/// Subject percentages below this are weaknesses.
pub const WEAK_SUBJECT_THRESHOLD: u32 = 60;
/// Subject percentages at or above this are strengths.
pub const STRONG_SUBJECT_THRESHOLD: u32 = 80;
/// Easy-question percentages below this raise a concern.
pub const EASY_CONCERN_THRESHOLD: u32 = 80;
/// Hard-question percentages above this are an achievement.
pub const HARD_ACHIEVEMENT_THRESHOLD: u32 = 70;

/// Mastery label attached to strength insights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MasteryLevel {
    Proficient,
    Advanced,
    Expert,
}

impl MasteryLevel {
    /// Mastery for a strong subject; `None` below the strength threshold.
    pub fn from_score(score: u32) -> Option<Self> {
        match score {
            s if s >= 95 => Some(MasteryLevel::Expert),
            s if s >= 85 => Some(MasteryLevel::Advanced),
            s if s >= STRONG_SUBJECT_THRESHOLD => Some(MasteryLevel::Proficient),
            _ => None,
        }
    }
}

impl fmt::Display for MasteryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MasteryLevel::Proficient => write!(f, "proficient"),
            MasteryLevel::Advanced => write!(f, "advanced"),
            MasteryLevel::Expert => write!(f, "expert"),
        }
    }
}

/// Difficulty to aim the next test at, given an overall score.
pub fn next_difficulty(overall_score: u32) -> Difficulty {
    if overall_score >= 80 {
        Difficulty::Hard
    } else if overall_score >= 60 {
        Difficulty::Medium
    } else {
        Difficulty::Easy
    }
}

/// Derive insights from a scored result's breakdowns.
pub fn generate_insights(
    subject_scores: &BTreeMap<String, u32>,
    difficulty_scores: &BTreeMap<Difficulty, DifficultyScore>,
) -> Vec<Insight> {
    let mut insights = Vec::new();

    for (subject, &score) in subject_scores {
        if score < WEAK_SUBJECT_THRESHOLD {
            insights.push(Insight {
                kind: InsightKind::Weakness,
                subject: Some(subject.clone()),
                message: format!("{subject} needs attention ({score}%)"),
                recommendation: format!("Review the fundamentals of {subject}"),
            });
        }
    }

    for (subject, &score) in subject_scores {
        if let Some(mastery) = MasteryLevel::from_score(score) {
            insights.push(Insight {
                kind: InsightKind::Strength,
                subject: Some(subject.clone()),
                message: format!("Strong performance in {subject} ({score}%, {mastery})"),
                recommendation: format!("Move on to advanced practice in {subject}"),
            });
        }
    }

    // Buckets with zero attempts never reach the map, but guard anyway.
    if let Some(easy) = difficulty_scores
        .get(&Difficulty::Easy)
        .filter(|s| s.total > 0)
    {
        if easy.percentage < EASY_CONCERN_THRESHOLD {
            insights.push(Insight {
                kind: InsightKind::Concern,
                subject: None,
                message: format!(
                    "Struggling with basic concepts ({}% on easy questions)",
                    easy.percentage
                ),
                recommendation: "Revisit core concepts before attempting harder material".into(),
            });
        }
    }

    if let Some(hard) = difficulty_scores
        .get(&Difficulty::Hard)
        .filter(|s| s.total > 0)
    {
        if hard.percentage > HARD_ACHIEVEMENT_THRESHOLD {
            insights.push(Insight {
                kind: InsightKind::Achievement,
                subject: None,
                message: format!(
                    "Ready for advanced practice ({}% on hard questions)",
                    hard.percentage
                ),
                recommendation: "Attempt more hard-level questions".into(),
            });
        }
    }

    insights
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subjects(pairs: &[(&str, u32)]) -> BTreeMap<String, u32> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn difficulty(
        entries: &[(Difficulty, usize, usize, u32)],
    ) -> BTreeMap<Difficulty, DifficultyScore> {
        entries
            .iter()
            .map(|&(d, correct, total, percentage)| {
                (
                    d,
                    DifficultyScore {
                        correct,
                        total,
                        percentage,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn weakness_and_strength_per_subject() {
        let insights = generate_insights(
            &subjects(&[("Algorithms", 85), ("Networks", 40), ("OS", 70)]),
            &BTreeMap::new(),
        );
        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].kind, InsightKind::Weakness);
        assert_eq!(insights[0].subject.as_deref(), Some("Networks"));
        assert!(insights[0].recommendation.contains("fundamentals"));
        assert_eq!(insights[1].kind, InsightKind::Strength);
        assert_eq!(insights[1].subject.as_deref(), Some("Algorithms"));
    }

    #[test]
    fn thresholds_are_inclusive_for_strength_only() {
        let insights = generate_insights(&subjects(&[("A", 60), ("B", 80)]), &BTreeMap::new());
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].kind, InsightKind::Strength);
        assert_eq!(insights[0].subject.as_deref(), Some("B"));
    }

    #[test]
    fn easy_concern_and_hard_achievement() {
        let insights = generate_insights(
            &BTreeMap::new(),
            &difficulty(&[
                (Difficulty::Easy, 3, 4, 75),
                (Difficulty::Hard, 3, 4, 75),
            ]),
        );
        let kinds: Vec<InsightKind> = insights.iter().map(|i| i.kind).collect();
        assert_eq!(kinds, vec![InsightKind::Concern, InsightKind::Achievement]);
    }

    #[test]
    fn hard_at_threshold_is_not_an_achievement() {
        let insights =
            generate_insights(&BTreeMap::new(), &difficulty(&[(Difficulty::Hard, 7, 10, 70)]));
        assert!(insights.is_empty());
    }

    #[test]
    fn zero_attempt_buckets_are_ignored() {
        let insights = generate_insights(
            &BTreeMap::new(),
            &difficulty(&[(Difficulty::Easy, 0, 0, 0), (Difficulty::Hard, 0, 0, 100)]),
        );
        assert!(insights.is_empty());
    }

    #[test]
    fn rule_order_is_fixed() {
        let insights = generate_insights(
            &subjects(&[("A", 100), ("B", 10)]),
            &difficulty(&[(Difficulty::Easy, 1, 2, 50), (Difficulty::Hard, 1, 1, 100)]),
        );
        let kinds: Vec<InsightKind> = insights.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                InsightKind::Weakness,
                InsightKind::Strength,
                InsightKind::Concern,
                InsightKind::Achievement
            ]
        );
    }

    #[test]
    fn mastery_levels() {
        assert_eq!(MasteryLevel::from_score(79), None);
        assert_eq!(MasteryLevel::from_score(80), Some(MasteryLevel::Proficient));
        assert_eq!(MasteryLevel::from_score(85), Some(MasteryLevel::Advanced));
        assert_eq!(MasteryLevel::from_score(95), Some(MasteryLevel::Expert));
    }

    #[test]
    fn next_difficulty_bands() {
        assert_eq!(next_difficulty(59), Difficulty::Easy);
        assert_eq!(next_difficulty(60), Difficulty::Medium);
        assert_eq!(next_difficulty(80), Difficulty::Hard);
    }
}
