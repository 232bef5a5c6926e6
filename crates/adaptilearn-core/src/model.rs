//! Core data model types for adaptilearn.
//!
//! Questions, performance history, test configuration and the test session
//! lifecycle that the selector, scorer and analytics modules operate on.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analytics::ScoreSample;
use crate::error::CoreError;
use crate::selector::SelectedQuestion;

/// Bucket used for questions and records with a blank subject.
pub const GENERAL_SUBJECT: &str = "General";

/// Number of answer options every question carries.
pub const OPTION_COUNT: usize = 4;

/// Canonical form of a subject name: trimmed, blank becomes [`GENERAL_SUBJECT`].
pub fn normalize_subject(subject: &str) -> String {
    let trimmed = subject.trim();
    if trimmed.is_empty() {
        GENERAL_SUBJECT.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Question difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// A multiple-choice question. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier within a question pool.
    pub id: String,
    /// Subject the question belongs to.
    pub subject: String,
    /// Difficulty band.
    pub difficulty: Difficulty,
    /// The question text.
    pub prompt: String,
    /// Exactly four answer options.
    pub options: [String; OPTION_COUNT],
    /// Index into `options` of the correct answer.
    pub correct_answer: usize,
    /// Explanation shown after the test.
    #[serde(default)]
    pub explanation: String,
}

impl Question {
    /// Whether `answer` (None when unanswered) is the correct option.
    pub fn is_correct(&self, answer: Option<usize>) -> bool {
        answer == Some(self.correct_answer)
    }
}

/// Historical performance of one user in one (subject, difficulty) bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub user_id: String,
    pub subject: String,
    pub difficulty: Difficulty,
    /// Questions attempted in this bucket.
    pub attempts: u32,
    /// Questions answered correctly in this bucket.
    pub correct: u32,
    /// Sessions already counted into this bucket.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub merged_sessions: BTreeSet<Uuid>,
}

impl PerformanceRecord {
    pub fn new(user_id: &str, subject: &str, difficulty: Difficulty) -> Self {
        Self {
            user_id: user_id.to_string(),
            subject: normalize_subject(subject),
            difficulty,
            attempts: 0,
            correct: 0,
            merged_sessions: BTreeSet::new(),
        }
    }

    /// `correct / attempts`, unrounded. `None` before the first attempt.
    pub fn average_score(&self) -> Option<f64> {
        if self.attempts == 0 {
            None
        } else {
            Some(self.correct as f64 / self.attempts as f64)
        }
    }
}

/// Self-reported or inferred proficiency, used to narrow the difficulty band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl PerformanceLevel {
    /// Whether questions of `difficulty` suit this level.
    pub fn allows(self, difficulty: Difficulty) -> bool {
        match self {
            PerformanceLevel::Beginner => difficulty != Difficulty::Hard,
            PerformanceLevel::Intermediate => true,
            PerformanceLevel::Advanced => difficulty != Difficulty::Easy,
        }
    }
}

impl fmt::Display for PerformanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerformanceLevel::Beginner => write!(f, "beginner"),
            PerformanceLevel::Intermediate => write!(f, "intermediate"),
            PerformanceLevel::Advanced => write!(f, "advanced"),
        }
    }
}

impl FromStr for PerformanceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(PerformanceLevel::Beginner),
            "intermediate" => Ok(PerformanceLevel::Intermediate),
            "advanced" => Ok(PerformanceLevel::Advanced),
            other => Err(format!("unknown performance level: {other}")),
        }
    }
}

/// How the question pool is ordered before selection.
///
/// The selector itself always preserves pool order; `PreShuffled` asks the
/// caller to run [`crate::selector::pre_shuffle`] with the given seed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SelectionPolicy {
    #[default]
    Deterministic,
    PreShuffled {
        seed: u64,
    },
}

/// Parameters of one test session. Immutable once the session starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestConfiguration {
    /// Wall-clock limit; answers are submitted automatically when it expires.
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: u32,
    /// Number of questions in the test.
    #[serde(default = "default_question_count")]
    pub question_count: usize,
    /// Reserve part of the test for the user's weak subjects.
    #[serde(default = "default_true")]
    pub focus_weak_areas: bool,
    /// Restrict the pool to these subjects. Empty means all subjects.
    #[serde(default)]
    pub subjects: BTreeSet<String>,
    /// Narrow the difficulty band.
    #[serde(default)]
    pub performance_level: Option<PerformanceLevel>,
    /// Pool ordering policy.
    #[serde(default)]
    pub policy: SelectionPolicy,
}

fn default_duration_minutes() -> u32 {
    30
}

fn default_question_count() -> usize {
    8
}

fn default_true() -> bool {
    true
}

impl Default for TestConfiguration {
    fn default() -> Self {
        Self {
            duration_minutes: default_duration_minutes(),
            question_count: default_question_count(),
            focus_weak_areas: true,
            subjects: BTreeSet::new(),
            performance_level: None,
            policy: SelectionPolicy::Deterministic,
        }
    }
}

/// A test being taken by a user.
///
/// Created at test start, mutated by [`TestSession::answer`], sealed by
/// [`TestSession::submit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSession {
    id: Uuid,
    user_id: String,
    config: TestConfiguration,
    questions: Vec<Question>,
    /// Question id → justification for weak-area picks.
    #[serde(default)]
    selection_reasons: BTreeMap<String, String>,
    #[serde(default)]
    answers: BTreeMap<String, usize>,
    started_at: DateTime<Utc>,
    #[serde(default)]
    submitted_at: Option<DateTime<Utc>>,
}

impl TestSession {
    /// Start a session from a selector result.
    pub fn start(
        user_id: &str,
        config: TestConfiguration,
        selected: Vec<SelectedQuestion>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        if selected.is_empty() {
            return Err(CoreError::InvalidSession);
        }
        if selected.len() != config.question_count {
            return Err(CoreError::QuestionCountMismatch {
                configured: config.question_count,
                actual: selected.len(),
            });
        }

        let mut seen = HashSet::new();
        let mut questions = Vec::with_capacity(selected.len());
        let mut selection_reasons = BTreeMap::new();
        for item in selected {
            if !seen.insert(item.question.id.clone()) {
                return Err(CoreError::DuplicateQuestion(item.question.id));
            }
            if let Some(reason) = item.reason {
                selection_reasons.insert(item.question.id.clone(), reason);
            }
            questions.push(item.question);
        }

        Ok(Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            config,
            questions,
            selection_reasons,
            answers: BTreeMap::new(),
            started_at,
            submitted_at: None,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn config(&self) -> &TestConfiguration {
        &self.config
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answers(&self) -> &BTreeMap<String, usize> {
        &self.answers
    }

    /// Justification attached to a weak-area pick, if any.
    pub fn selection_reason(&self, question_id: &str) -> Option<&str> {
        self.selection_reasons.get(question_id).map(String::as_str)
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted_at.is_some()
    }

    /// When the configured duration runs out.
    pub fn deadline(&self) -> DateTime<Utc> {
        self.started_at + Duration::minutes(i64::from(self.config.duration_minutes))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline()
    }

    /// Record (or replace) the answer to one question.
    pub fn answer(&mut self, question_id: &str, option: usize) -> Result<(), CoreError> {
        if self.is_submitted() {
            return Err(CoreError::SessionSealed);
        }
        let Some(question) = self.questions.iter().find(|q| q.id == question_id) else {
            return Err(CoreError::UnknownQuestion(question_id.to_string()));
        };
        if option >= question.options.len() {
            return Err(CoreError::InvalidOption {
                question_id: question_id.to_string(),
                option,
            });
        }
        self.answers.insert(question_id.to_string(), option);
        Ok(())
    }

    /// Seal the session. Further answers are rejected.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<(), CoreError> {
        if self.is_submitted() {
            return Err(CoreError::SessionSealed);
        }
        self.submitted_at = Some(now);
        Ok(())
    }

    /// Submit whatever answers exist once the deadline has passed.
    ///
    /// Returns `true` if this call sealed the session.
    pub fn submit_if_expired(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_submitted() || !self.is_expired(now) {
            return false;
        }
        self.submitted_at = Some(self.deadline());
        true
    }

    /// Seconds between start and submission, capped at the configured duration.
    pub fn time_spent_seconds(&self) -> Option<u64> {
        let submitted = self.submitted_at?;
        let limit = i64::from(self.config.duration_minutes) * 60;
        let spent = (submitted - self.started_at).num_seconds().clamp(0, limit);
        Some(spent as u64)
    }

    /// Score a submitted session.
    pub fn score(&self) -> Result<TestResult, CoreError> {
        let time_spent = self
            .time_spent_seconds()
            .ok_or(CoreError::SessionNotSubmitted)?;
        crate::scorer::score_answers(self.id, &self.questions, &self.answers, time_spent)
    }
}

/// Correct/total tally and rounded percentage for one difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyScore {
    pub correct: usize,
    pub total: usize,
    pub percentage: u32,
}

/// Category of a generated insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Strength,
    Weakness,
    Achievement,
    Concern,
}

impl fmt::Display for InsightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsightKind::Strength => write!(f, "strength"),
            InsightKind::Weakness => write!(f, "weakness"),
            InsightKind::Achievement => write!(f, "achievement"),
            InsightKind::Concern => write!(f, "concern"),
        }
    }
}

/// A structured observation about a test result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    /// Subject the insight refers to, for per-subject rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub message: String,
    pub recommendation: String,
}

/// The scored outcome of a session. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub session_id: Uuid,
    /// Rounded-half-up percentage of correct answers.
    pub overall_score: u32,
    pub correct_count: usize,
    pub total_questions: usize,
    /// Subject → percentage. Subjects with no questions are absent.
    pub subject_scores: BTreeMap<String, u32>,
    /// Difficulty → tally. Difficulties with no questions are absent.
    pub difficulty_scores: BTreeMap<Difficulty, DifficultyScore>,
    pub insights: Vec<Insight>,
    pub time_spent_seconds: u64,
}

/// A persisted result together with its completion time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub result: TestResult,
    pub completed_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// One sample per subject scored in this result.
    pub fn subject_samples(&self) -> impl Iterator<Item = ScoreSample> + '_ {
        self.result
            .subject_scores
            .iter()
            .map(move |(subject, &score)| ScoreSample {
                score,
                timestamp: self.completed_at,
                subject: subject.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn question(id: &str) -> Question {
        Question {
            id: id.into(),
            subject: "Data Structures".into(),
            difficulty: Difficulty::Easy,
            prompt: "Which structure is LIFO?".into(),
            options: [
                "Queue".into(),
                "Stack".into(),
                "Heap".into(),
                "Tree".into(),
            ],
            correct_answer: 1,
            explanation: String::new(),
        }
    }

    fn session(count: usize) -> TestSession {
        let selected = (0..count)
            .map(|i| SelectedQuestion {
                question: question(&format!("q{i}")),
                reason: None,
            })
            .collect();
        let config = TestConfiguration {
            question_count: count,
            ..Default::default()
        };
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        TestSession::start("alice", config, selected, start).unwrap()
    }

    #[test]
    fn difficulty_display_and_parse() {
        assert_eq!(Difficulty::Hard.to_string(), "hard");
        assert_eq!("Easy".parse::<Difficulty>().unwrap(), Difficulty::Easy);
        assert!("extreme".parse::<Difficulty>().is_err());
        assert!(Difficulty::Easy < Difficulty::Hard);
    }

    #[test]
    fn normalize_blank_subject() {
        assert_eq!(normalize_subject("  "), GENERAL_SUBJECT);
        assert_eq!(normalize_subject(" OS "), "OS");
    }

    #[test]
    fn performance_level_bands() {
        assert!(PerformanceLevel::Beginner.allows(Difficulty::Medium));
        assert!(!PerformanceLevel::Beginner.allows(Difficulty::Hard));
        assert!(!PerformanceLevel::Advanced.allows(Difficulty::Easy));
        assert!(PerformanceLevel::Intermediate.allows(Difficulty::Hard));
    }

    #[test]
    fn average_score_is_unrounded() {
        let mut record = PerformanceRecord::new("alice", "OS", Difficulty::Medium);
        assert_eq!(record.average_score(), None);
        record.attempts = 3;
        record.correct = 2;
        assert!((record.average_score().unwrap() - 2.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn start_rejects_count_mismatch() {
        let config = TestConfiguration {
            question_count: 3,
            ..Default::default()
        };
        let selected = vec![SelectedQuestion {
            question: question("q0"),
            reason: None,
        }];
        let err = TestSession::start("alice", config, selected, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::QuestionCountMismatch {
                configured: 3,
                actual: 1
            }
        ));
    }

    #[test]
    fn start_rejects_duplicates() {
        let config = TestConfiguration {
            question_count: 2,
            ..Default::default()
        };
        let selected = vec![
            SelectedQuestion {
                question: question("q0"),
                reason: None,
            },
            SelectedQuestion {
                question: question("q0"),
                reason: None,
            },
        ];
        let err = TestSession::start("alice", config, selected, Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateQuestion(id) if id == "q0"));
    }

    #[test]
    fn answers_must_reference_session_questions() {
        let mut s = session(2);
        s.answer("q0", 1).unwrap();
        assert!(matches!(
            s.answer("nope", 0),
            Err(CoreError::UnknownQuestion(_))
        ));
        assert!(matches!(
            s.answer("q1", 4),
            Err(CoreError::InvalidOption { option: 4, .. })
        ));
        assert_eq!(s.answers().len(), 1);
    }

    #[test]
    fn submitted_session_is_sealed() {
        let mut s = session(1);
        let now = s.started_at() + Duration::minutes(5);
        s.submit(now).unwrap();
        assert!(matches!(s.answer("q0", 1), Err(CoreError::SessionSealed)));
        assert!(matches!(s.submit(now), Err(CoreError::SessionSealed)));
        assert_eq!(s.time_spent_seconds(), Some(300));
    }

    #[test]
    fn expiry_auto_submits_at_deadline() {
        let mut s = session(1);
        s.answer("q0", 1).unwrap();
        let before = s.started_at() + Duration::minutes(29);
        assert!(!s.submit_if_expired(before));

        let late = s.started_at() + Duration::minutes(45);
        assert!(s.submit_if_expired(late));
        assert_eq!(s.submitted_at(), Some(s.deadline()));
        assert_eq!(s.time_spent_seconds(), Some(30 * 60));
        assert!(!s.submit_if_expired(late));
    }

    #[test]
    fn scoring_requires_submission() {
        let s = session(1);
        assert!(matches!(s.score(), Err(CoreError::SessionNotSubmitted)));
    }

    #[test]
    fn session_serde_roundtrip() {
        let mut s = session(2);
        s.answer("q1", 1).unwrap();
        let json = serde_json::to_string(&s).unwrap();
        let back: TestSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn selection_policy_serde_shape() {
        let json = serde_json::to_string(&SelectionPolicy::PreShuffled { seed: 7 }).unwrap();
        assert_eq!(json, r#"{"policy":"pre_shuffled","seed":7}"#);
    }
}
