//! HTML report generator.
//!
//! Produces self-contained HTML files with all CSS inlined.

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use adaptilearn_core::report::{AnalyticsReport, SessionReport};

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn page_start(html: &mut String, title: &str) {
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!("<title>adaptilearn: {}</title>\n", html_escape(title)));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");
}

fn raw_json<T: Serialize>(html: &mut String, value: &T) {
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(value).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");
}

/// Generate an HTML page for a scored test session.
pub fn generate_session_html(report: &SessionReport) -> String {
    let r = &report.result;
    let session = &report.session;
    let mut html = String::new();

    page_start(&mut html, &format!("test result for {}", session.user_id()));

    html.push_str("<header>\n");
    html.push_str("<h1>Test result</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta\">User: <strong>{}</strong> | {} questions | {}m {}s | {}</p>\n",
        html_escape(session.user_id()),
        r.total_questions,
        r.time_spent_seconds / 60,
        r.time_spent_seconds % 60,
        report.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str(&format!(
        "<p class=\"score {}\">{}% ({}/{} correct)</p>\n",
        score_class(r.overall_score),
        r.overall_score,
        r.correct_count,
        r.total_questions
    ));
    html.push_str("</header>\n");

    html.push_str("<section class=\"dashboard\">\n");
    html.push_str("<h2>By subject</h2>\n");
    if !r.subject_scores.is_empty() {
        html.push_str(&generate_bar_chart(&r.subject_scores));
    }

    html.push_str("<h2>By difficulty</h2>\n");
    html.push_str("<table class=\"summary\">\n");
    html.push_str("<thead><tr><th>Difficulty</th><th>Correct</th><th>Total</th><th>Score</th></tr></thead>\n<tbody>\n");
    for (difficulty, s) in &r.difficulty_scores {
        html.push_str(&format!(
            "<tr><td>{difficulty}</td><td>{}</td><td>{}</td><td>{}%</td></tr>\n",
            s.correct, s.total, s.percentage
        ));
    }
    html.push_str("</tbody></table>\n");
    html.push_str("</section>\n");

    if !r.insights.is_empty() {
        html.push_str("<section class=\"insights\">\n<h2>Insights</h2>\n<ul>\n");
        for insight in &r.insights {
            html.push_str(&format!(
                "<li class=\"{kind}\"><strong>{kind}</strong>: {} <em>{}</em></li>\n",
                html_escape(&insight.message),
                html_escape(&insight.recommendation),
                kind = insight.kind,
            ));
        }
        html.push_str("</ul>\n</section>\n");
    }

    html.push_str("<section class=\"results\">\n<h2>Questions</h2>\n");
    html.push_str("<table class=\"results-table\">\n");
    html.push_str("<thead><tr><th>#</th><th>Question</th><th>Subject</th><th>Difficulty</th><th>Answer</th><th>Correct</th></tr></thead>\n<tbody>\n");
    for (i, q) in session.questions().iter().enumerate() {
        let given = session.answers().get(&q.id).copied();
        let class = if q.is_correct(given) { "pass" } else { "fail" };
        let answer_text = given
            .and_then(|idx| q.options.get(idx))
            .map_or_else(|| "-".to_string(), |o| html_escape(o));
        let mut prompt = html_escape(&q.prompt);
        if let Some(reason) = session.selection_reason(&q.id) {
            prompt.push_str(&format!("<br><small>{}</small>", html_escape(reason)));
        }
        let correct_text = q
            .options
            .get(q.correct_answer)
            .map_or_else(String::new, |o| html_escape(o));
        html.push_str(&format!(
            "<tr class=\"{class}\"><td>{}</td><td>{prompt}</td><td>{}</td><td>{}</td><td>{answer_text}</td><td>{correct_text}</td></tr>\n",
            i + 1,
            html_escape(&q.subject),
            q.difficulty,
        ));
    }
    html.push_str("</tbody></table>\n</section>\n");

    raw_json(&mut html, report);

    html.push_str("</body>\n</html>");
    html
}

/// Generate an HTML page for a user's analytics summary.
pub fn generate_analytics_html(report: &AnalyticsReport) -> String {
    let s = &report.summary;
    let mut html = String::new();

    page_start(&mut html, &format!("analytics for {}", report.user_id));

    html.push_str("<header>\n");
    html.push_str(&format!("<h1>Analytics for {}</h1>\n", html_escape(&report.user_id)));
    html.push_str(&format!(
        "<p class=\"meta\">Generated {}</p>\n",
        s.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</header>\n");

    html.push_str("<section class=\"dashboard\">\n<table class=\"summary\">\n<tbody>\n");
    html.push_str(&format!("<tr><th>Tests taken</th><td>{}</td></tr>\n", s.total_tests));
    html.push_str(&format!("<tr><th>Average score</th><td>{}%</td></tr>\n", s.average_score));
    html.push_str(&format!("<tr><th>Trend</th><td class=\"{0}\">{0}</td></tr>\n", s.trend));
    html.push_str(&format!("<tr><th>Study streak</th><td>{} day(s)</td></tr>\n", s.study_streak));
    html.push_str(&format!(
        "<tr><th>Active days</th><td>{}/{} ({}%)</td></tr>\n",
        s.study_frequency.active_days, s.study_frequency.window_days, s.study_frequency.percentage
    ));
    let preferred = s
        .preferred_study_time
        .map_or_else(|| "-".to_string(), |t| t.to_string());
    html.push_str(&format!("<tr><th>Preferred time</th><td>{preferred}</td></tr>\n"));
    html.push_str("</tbody></table>\n</section>\n");

    if !s.subject_trends.is_empty() {
        html.push_str("<section class=\"trends\">\n<h2>Subject trends</h2>\n<table>\n");
        html.push_str("<thead><tr><th>Subject</th><th>Trend</th></tr></thead>\n<tbody>\n");
        for (subject, trend) in &s.subject_trends {
            html.push_str(&format!(
                "<tr><td>{}</td><td class=\"{trend}\">{trend}</td></tr>\n",
                html_escape(subject)
            ));
        }
        html.push_str("</tbody></table>\n</section>\n");
    }

    if !s.recommendations.is_empty() {
        html.push_str("<section class=\"recommendations\">\n<h2>Recommendations</h2>\n<ul>\n");
        for rec in &s.recommendations {
            html.push_str(&format!("<li>{}</li>\n", html_escape(&rec.message)));
        }
        html.push_str("</ul>\n</section>\n");
    }

    raw_json(&mut html, report);

    html.push_str("</body>\n</html>");
    html
}

/// Write an HTML page to a file, creating parent directories.
pub fn write_html_report(html: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)?;
    Ok(())
}

fn score_class(score: u32) -> &'static str {
    if score >= 80 {
        "good"
    } else if score >= 60 {
        "fair"
    } else {
        "poor"
    }
}

fn generate_bar_chart(scores: &BTreeMap<String, u32>) -> String {
    let bar_height = 30;
    let max_width = 400;
    let padding = 10;
    let label_width = 200;

    let total_height = scores.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 60,
        total_height
    );

    for (i, (subject, score)) in scores.iter().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let width = (*score).min(100) as usize * max_width / 100;

        let color = match score_class(*score) {
            "good" => "#22c55e",
            "fair" => "#eab308",
            _ => "#ef4444",
        };

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"14\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            html_escape(subject)
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"4\"/>\n",
            label_width, y, width, bar_height, color
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{}%</text>\n",
            label_width + width + 8,
            y + bar_height / 2,
            score
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --pass: #dcfce7; --fail: #fde2e2; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --pass: #064e3b; --fail: #7f1d1d; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
.score { font-size: 2rem; font-weight: bold; }
.good, .improving { color: #16a34a; }
.fair, .stable { color: #ca8a04; }
.poor, .declining { color: #dc2626; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); }
.pass { background: var(--pass); }
.fail { background: var(--fail); }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; }
"#;
