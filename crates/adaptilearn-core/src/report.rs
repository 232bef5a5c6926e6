//! Report types with JSON persistence and markdown rendering.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::analytics::AnalyticsSummary;
use crate::model::{TestResult, TestSession};

fn write_json<T: Serialize>(value: &T, path: &Path, what: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("failed to serialize {what}"))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)
        .with_context(|| format!("failed to write {what} to {}", path.display()))?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {what} from {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {what} JSON"))
}

/// Save an in-progress or submitted session.
pub fn save_session(session: &TestSession, path: &Path) -> Result<()> {
    write_json(session, path, "session")
}

/// Load a session saved with [`save_session`].
pub fn load_session(path: &Path) -> Result<TestSession> {
    read_json(path, "session")
}

/// A scored session together with the questions and answers it was scored on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub created_at: DateTime<Utc>,
    pub session: TestSession,
    pub result: TestResult,
}

impl SessionReport {
    pub fn new(session: TestSession, result: TestResult) -> Self {
        Self {
            created_at: Utc::now(),
            session,
            result,
        }
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        write_json(self, path, "report")
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        read_json(path, "report")
    }

    /// Format the result as markdown.
    pub fn to_markdown(&self) -> String {
        let r = &self.result;
        let mut md = String::new();

        md.push_str(&format!("## Test result for {}\n\n", self.session.user_id()));
        md.push_str(&format!(
            "**Score:** {}% ({}/{} correct) in {}m {}s\n\n",
            r.overall_score,
            r.correct_count,
            r.total_questions,
            r.time_spent_seconds / 60,
            r.time_spent_seconds % 60
        ));

        if !r.subject_scores.is_empty() {
            md.push_str("### By subject\n\n");
            md.push_str("| Subject | Score |\n");
            md.push_str("|---------|-------|\n");
            for (subject, score) in &r.subject_scores {
                md.push_str(&format!("| {subject} | {score}% |\n"));
            }
            md.push('\n');
        }

        if !r.difficulty_scores.is_empty() {
            md.push_str("### By difficulty\n\n");
            md.push_str("| Difficulty | Correct | Total | Score |\n");
            md.push_str("|------------|---------|-------|-------|\n");
            for (difficulty, s) in &r.difficulty_scores {
                md.push_str(&format!(
                    "| {difficulty} | {} | {} | {}% |\n",
                    s.correct, s.total, s.percentage
                ));
            }
            md.push('\n');
        }

        if !r.insights.is_empty() {
            md.push_str("### Insights\n\n");
            for insight in &r.insights {
                md.push_str(&format!(
                    "- **{}**: {} _{}_\n",
                    insight.kind, insight.message, insight.recommendation
                ));
            }
            md.push('\n');
        }

        md.push_str("### Questions\n\n");
        for (i, q) in self.session.questions().iter().enumerate() {
            let given = self.session.answers().get(&q.id).copied();
            let mark = if q.is_correct(given) { "✓" } else { "✗" };
            md.push_str(&format!(
                "{}. {mark} {} ({}, {})\n",
                i + 1,
                q.prompt,
                q.subject,
                q.difficulty
            ));
            if let Some(reason) = self.session.selection_reason(&q.id) {
                md.push_str(&format!("   - _{reason}_\n"));
            }
            if !q.explanation.is_empty() {
                md.push_str(&format!("   - {}\n", q.explanation));
            }
        }

        md
    }
}

/// An analytics summary persisted for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub user_id: String,
    pub summary: AnalyticsSummary,
}

impl AnalyticsReport {
    pub fn save_json(&self, path: &Path) -> Result<()> {
        write_json(self, path, "analytics report")
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        read_json(path, "analytics report")
    }

    pub fn to_markdown(&self) -> String {
        let s = &self.summary;
        let mut md = String::new();

        md.push_str(&format!("## Analytics for {}\n\n", self.user_id));
        md.push_str(&format!(
            "**Tests:** {} | **Average:** {}% | **Trend:** {}\n\n",
            s.total_tests, s.average_score, s.trend
        ));
        md.push_str(&format!(
            "**Streak:** {} day(s) | **Active days:** {}/{} ({}%)",
            s.study_streak,
            s.study_frequency.active_days,
            s.study_frequency.window_days,
            s.study_frequency.percentage
        ));
        if let Some(time) = s.preferred_study_time {
            md.push_str(&format!(" | **Preferred time:** {time}"));
        }
        md.push_str("\n\n");

        if !s.subject_trends.is_empty() {
            md.push_str("| Subject | Trend |\n");
            md.push_str("|---------|-------|\n");
            for (subject, trend) in &s.subject_trends {
                md.push_str(&format!("| {subject} | {trend} |\n"));
            }
            md.push('\n');
        }

        for rec in &s.recommendations {
            md.push_str(&format!("- {}\n", rec.message));
        }

        md
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::summarize;
    use crate::model::{Difficulty, Question, TestConfiguration};
    use crate::selector::SelectedQuestion;
    use chrono::Duration;

    fn scored_session() -> (TestSession, TestResult) {
        let questions = ["q1", "q2"].map(|id| SelectedQuestion {
            question: Question {
                id: id.into(),
                subject: "DS".into(),
                difficulty: Difficulty::Easy,
                prompt: format!("Prompt {id}"),
                options: ["a".into(), "b".into(), "c".into(), "d".into()],
                correct_answer: 0,
                explanation: "Because.".into(),
            },
            reason: Some("Selected because DS is identified as a weak area".into()),
        });
        let config = TestConfiguration {
            question_count: 2,
            ..Default::default()
        };
        let mut session =
            TestSession::start("alice", config, questions.to_vec(), Utc::now()).unwrap();
        session.answer("q1", 0).unwrap();
        session.submit(session.started_at() + Duration::seconds(95)).unwrap();
        let result = session.score().unwrap();
        (session, result)
    }

    #[test]
    fn session_report_roundtrip() {
        let (session, result) = scored_session();
        let report = SessionReport::new(session, result);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/report.json");
        report.save_json(&path).unwrap();
        assert_eq!(SessionReport::load_json(&path).unwrap(), report);
    }

    #[test]
    fn markdown_lists_scores_and_reasons() {
        let (session, result) = scored_session();
        let md = SessionReport::new(session, result).to_markdown();
        assert!(md.contains("**Score:** 50% (1/2 correct) in 1m 35s"));
        assert!(md.contains("| DS | 50% |"));
        assert!(md.contains("| easy | 1 | 2 | 50% |"));
        assert!(md.contains("weak area"));
        assert!(md.contains("**weakness**"));
    }

    #[test]
    fn session_file_roundtrip() {
        let (session, _) = scored_session();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        save_session(&session, &path).unwrap();
        assert_eq!(load_session(&path).unwrap(), session);
    }

    #[test]
    fn load_missing_file_fails_with_context() {
        let err = SessionReport::load_json(Path::new("/nonexistent/report.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read report"));
    }

    #[test]
    fn analytics_markdown() {
        let report = AnalyticsReport {
            user_id: "alice".into(),
            summary: summarize(&[], &[], &[], &Utc::now()),
        };
        let md = report.to_markdown();
        assert!(md.contains("## Analytics for alice"));
        assert!(md.contains("**Trend:** stable"));
    }
}
