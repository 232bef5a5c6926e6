//! The `adaptilearn submit` command.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use comfy_table::{Cell, Table};

use adaptilearn_core::model::TestResult;
use adaptilearn_core::report::{load_session, save_session, SessionReport};

use super::build_engine;

pub async fn execute(
    session_path: PathBuf,
    format: String,
    out: PathBuf,
    config_path: Option<PathBuf>,
) -> Result<()> {
    anyhow::ensure!(
        matches!(format.as_str(), "text" | "json" | "markdown"),
        "unknown format: {format}"
    );

    let (_, engine) = build_engine(config_path.as_deref())?;
    let mut session = load_session(&session_path)?;

    let result = engine.submit_test(&mut session, Utc::now()).await?;
    save_session(&session, &session_path)?;

    let report = SessionReport::new(session, result);
    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report.result)?),
        "markdown" => print!("{}", report.to_markdown()),
        _ => print_summary(&report.result),
    }

    std::fs::create_dir_all(&out)?;
    let path = out.join(format!("session-{}.json", report.session.id()));
    report.save_json(&path)?;
    eprintln!("Report saved to: {}", path.display());

    Ok(())
}

fn print_summary(result: &TestResult) {
    println!(
        "Score: {}% ({}/{} correct) in {}m {}s",
        result.overall_score,
        result.correct_count,
        result.total_questions,
        result.time_spent_seconds / 60,
        result.time_spent_seconds % 60
    );

    let mut table = Table::new();
    table.set_header(vec!["Subject", "Score"]);
    for (subject, score) in &result.subject_scores {
        table.add_row(vec![Cell::new(subject), Cell::new(format!("{score}%"))]);
    }
    println!("{table}");

    for insight in &result.insights {
        println!("- {}: {} {}", insight.kind, insight.message, insight.recommendation);
    }
}
