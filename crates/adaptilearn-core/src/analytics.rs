//! Longitudinal analytics over a user's history.
//!
//! Everything here works on a snapshot already loaded from the store and
//! never fails: sparse input yields the neutral defaults (`Stable` trend,
//! zero streak, no preferred time).
//!
//! Scores are on the 0–100 integer scale throughout.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Days, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classifier::classify_areas;
use crate::model::{normalize_subject, Difficulty, HistoryEntry, PerformanceRecord};
use crate::scorer::percentage;

/// Number of samples in each half of the trend comparison.
pub const TREND_WINDOW: usize = 3;
/// Mean difference, in percentage points, that must be exceeded to leave `Stable`.
pub const TREND_MARGIN_POINTS: f64 = 5.0;
/// Days looked back for streaks and study frequency.
pub const STREAK_LOOKBACK_DAYS: u32 = 30;
/// Maximum number of recommendations returned.
pub const MAX_RECOMMENDATIONS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    #[default]
    Stable,
    Declining,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Improving => write!(f, "improving"),
            Trend::Stable => write!(f, "stable"),
            Trend::Declining => write!(f, "declining"),
        }
    }
}

/// One scored data point for trend analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSample {
    pub score: u32,
    pub timestamp: DateTime<Utc>,
    pub subject: String,
}

fn mean(scores: &[u32]) -> f64 {
    scores.iter().map(|&s| f64::from(s)).sum::<f64>() / scores.len() as f64
}

/// Trend of chronologically ordered scores (oldest first).
///
/// The last [`TREND_WINDOW`] scores are compared with up to
/// [`TREND_WINDOW`] scores before them. With no older scores to compare
/// against the trend is `Stable`, so a history needs at least
/// `TREND_WINDOW + 1` scores before it can move off `Stable`; two or three
/// scores all fall in the recent window.
pub fn improvement_trend(scores: &[u32]) -> Trend {
    if scores.len() < 2 {
        return Trend::Stable;
    }
    let split = scores.len().saturating_sub(TREND_WINDOW);
    let (before, recent) = scores.split_at(split);
    let older = &before[before.len().saturating_sub(TREND_WINDOW)..];
    if older.is_empty() {
        return Trend::Stable;
    }

    let diff = mean(recent) - mean(older);
    if diff > TREND_MARGIN_POINTS {
        Trend::Improving
    } else if diff < -TREND_MARGIN_POINTS {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

/// Trend of the overall score across a history, ordered by completion time.
pub fn overall_trend(history: &[HistoryEntry]) -> Trend {
    let mut entries: Vec<&HistoryEntry> = history.iter().collect();
    entries.sort_by_key(|e| e.completed_at);
    let scores: Vec<u32> = entries.iter().map(|e| e.result.overall_score).collect();
    improvement_trend(&scores)
}

/// Per-subject trend. Samples need not be sorted.
pub fn subject_trends(samples: &[ScoreSample]) -> BTreeMap<String, Trend> {
    let mut by_subject: BTreeMap<String, Vec<&ScoreSample>> = BTreeMap::new();
    for sample in samples {
        by_subject
            .entry(normalize_subject(&sample.subject))
            .or_default()
            .push(sample);
    }

    by_subject
        .into_iter()
        .map(|(subject, mut samples)| {
            samples.sort_by_key(|s| s.timestamp);
            let scores: Vec<u32> = samples.iter().map(|s| s.score).collect();
            (subject, improvement_trend(&scores))
        })
        .collect()
}

/// What a user did. Only study activities count toward streaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    AssessmentCompleted,
    PracticeSession,
    QuestionAnswered,
    SyllabusProcessed,
    QuestionsGenerated,
}

impl ActivityKind {
    pub fn counts_toward_streak(self) -> bool {
        matches!(
            self,
            ActivityKind::AssessmentCompleted
                | ActivityKind::PracticeSession
                | ActivityKind::QuestionAnswered
        )
    }
}

/// A timestamped activity record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub kind: ActivityKind,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
}

impl Activity {
    pub fn new(kind: ActivityKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            timestamp,
            session_id: None,
        }
    }
}

/// Local calendar days (in `tz`) with at least one study activity.
fn study_days<Tz: TimeZone>(activities: &[Activity], tz: &Tz) -> BTreeSet<NaiveDate> {
    activities
        .iter()
        .filter(|a| a.kind.counts_toward_streak())
        .map(|a| a.timestamp.with_timezone(tz).date_naive())
        .collect()
}

/// Consecutive active days counting back from `now`'s local date, capped at
/// [`STREAK_LOOKBACK_DAYS`].
///
/// Today is still in progress, so a missing today is skipped and the count
/// starts from yesterday. Any other missing day is a gap and ends the
/// streak: with no activity today or yesterday the streak is 0, however
/// long the run before that was.
pub fn study_streak<Tz: TimeZone>(activities: &[Activity], now: &DateTime<Tz>) -> u32 {
    let days = study_days(activities, &now.timezone());
    if days.is_empty() {
        return 0;
    }

    let today = now.date_naive();
    let mut streak = 0;
    for offset in 0..STREAK_LOOKBACK_DAYS {
        let Some(day) = today.checked_sub_days(Days::new(u64::from(offset))) else {
            break;
        };
        if days.contains(&day) {
            streak += 1;
        } else if streak > 0 || offset > 0 {
            break;
        }
    }
    streak
}

/// Distinct active days within the lookback window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyFrequency {
    pub active_days: u32,
    pub window_days: u32,
    /// `active_days / window_days` as a rounded percentage.
    pub percentage: u32,
}

impl Default for StudyFrequency {
    fn default() -> Self {
        Self {
            active_days: 0,
            window_days: STREAK_LOOKBACK_DAYS,
            percentage: 0,
        }
    }
}

pub fn study_frequency<Tz: TimeZone>(
    activities: &[Activity],
    now: &DateTime<Tz>,
) -> StudyFrequency {
    let today = now.date_naive();
    let Some(window_start) =
        today.checked_sub_days(Days::new(u64::from(STREAK_LOOKBACK_DAYS - 1)))
    else {
        return StudyFrequency::default();
    };

    let active_days = study_days(activities, &now.timezone())
        .range(window_start..=today)
        .count() as u32;

    StudyFrequency {
        active_days,
        window_days: STREAK_LOOKBACK_DAYS,
        percentage: percentage(active_days as usize, STREAK_LOOKBACK_DAYS as usize).unwrap_or(0),
    }
}

/// Time-of-day bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudyTime {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl StudyTime {
    /// Tie-break order.
    pub const ALL: [StudyTime; 4] = [
        StudyTime::Morning,
        StudyTime::Afternoon,
        StudyTime::Evening,
        StudyTime::Night,
    ];

    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => StudyTime::Morning,
            12..=17 => StudyTime::Afternoon,
            18..=21 => StudyTime::Evening,
            _ => StudyTime::Night,
        }
    }
}

impl fmt::Display for StudyTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StudyTime::Morning => write!(f, "morning"),
            StudyTime::Afternoon => write!(f, "afternoon"),
            StudyTime::Evening => write!(f, "evening"),
            StudyTime::Night => write!(f, "night"),
        }
    }
}

/// Bucket with the most activity in local time. `None` without activity.
pub fn preferred_study_time<Tz: TimeZone>(activities: &[Activity], tz: &Tz) -> Option<StudyTime> {
    if activities.is_empty() {
        return None;
    }
    let mut counts = [0usize; 4];
    for activity in activities {
        let hour = activity.timestamp.with_timezone(tz).hour();
        let bucket = StudyTime::from_hour(hour);
        if let Some(idx) = StudyTime::ALL.iter().position(|b| *b == bucket) {
            counts[idx] += 1;
        }
    }

    let mut best = 0;
    for idx in 1..counts.len() {
        if counts[idx] > counts[best] {
            best = idx;
        }
    }
    Some(StudyTime::ALL[best])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationKind {
    Practice,
    Challenge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
}

/// Suggested next step for the learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub message: String,
    pub priority: Priority,
}

/// Practice the weakest subjects first, then one challenge step up from the
/// first difficulty mastered beyond 80%.
pub fn next_recommendations(records: &[PerformanceRecord]) -> Vec<Recommendation> {
    let classification = classify_areas(records);

    let mut weak: Vec<(&String, f64)> = classification
        .weak
        .iter()
        .filter_map(|s| classification.averages.get(s).map(|&avg| (s, avg)))
        .collect();
    weak.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));

    let mut recommendations: Vec<Recommendation> = weak
        .into_iter()
        .take(MAX_RECOMMENDATIONS)
        .map(|(subject, _)| Recommendation {
            kind: RecommendationKind::Practice,
            message: format!("Practice more questions on {subject}"),
            priority: Priority::High,
        })
        .collect();

    let mut by_difficulty: BTreeMap<Difficulty, (u64, u64)> = BTreeMap::new();
    for record in records {
        let entry = by_difficulty.entry(record.difficulty).or_default();
        entry.0 += u64::from(record.correct);
        entry.1 += u64::from(record.attempts);
    }
    let mastered = by_difficulty
        .iter()
        .find(|(_, &(correct, attempts))| attempts > 0 && correct * 5 > attempts * 4)
        .map(|(d, _)| *d);
    if let Some(difficulty) = mastered {
        let next = match difficulty {
            Difficulty::Easy => Difficulty::Medium,
            _ => Difficulty::Hard,
        };
        recommendations.push(Recommendation {
            kind: RecommendationKind::Challenge,
            message: format!("Try {next} level questions"),
            priority: Priority::Medium,
        });
    }

    recommendations.truncate(MAX_RECOMMENDATIONS);
    recommendations
}

/// Combined analytics for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub total_tests: usize,
    /// Rounded mean of overall scores; 0 without history.
    pub average_score: u32,
    pub trend: Trend,
    pub subject_trends: BTreeMap<String, Trend>,
    pub study_streak: u32,
    pub preferred_study_time: Option<StudyTime>,
    pub study_frequency: StudyFrequency,
    pub recommendations: Vec<Recommendation>,
    pub generated_at: DateTime<Utc>,
}

fn rounded_mean(scores: impl Iterator<Item = u32>) -> u32 {
    let (sum, count) = scores.fold((0u64, 0u64), |(s, c), v| (s + u64::from(v), c + 1));
    if count == 0 {
        0
    } else {
        ((2 * sum + count) / (2 * count)) as u32
    }
}

/// Summarize a user's history, activity log and performance records as of `now`.
pub fn summarize<Tz: TimeZone>(
    history: &[HistoryEntry],
    activities: &[Activity],
    records: &[PerformanceRecord],
    now: &DateTime<Tz>,
) -> AnalyticsSummary {
    let samples: Vec<ScoreSample> = history.iter().flat_map(|e| e.subject_samples()).collect();

    let summary = AnalyticsSummary {
        total_tests: history.len(),
        average_score: rounded_mean(history.iter().map(|e| e.result.overall_score)),
        trend: overall_trend(history),
        subject_trends: subject_trends(&samples),
        study_streak: study_streak(activities, now),
        preferred_study_time: preferred_study_time(activities, &now.timezone()),
        study_frequency: study_frequency(activities, now),
        recommendations: next_recommendations(records),
        generated_at: now.with_timezone(&Utc),
    };

    tracing::debug!(
        "analytics: {} tests, trend {}, streak {}",
        summary.total_tests,
        summary.trend,
        summary.study_streak
    );

    summary
}
