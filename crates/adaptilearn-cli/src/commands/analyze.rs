//! The `adaptilearn analyze` command.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use comfy_table::{Cell, Table};

use adaptilearn_core::analytics::AnalyticsSummary;
use adaptilearn_core::engine::ProgressReporter;
use adaptilearn_core::report::AnalyticsReport;
use adaptilearn_store::config::StoreBackend;
use adaptilearn_store::JsonFileStore;

use super::build_engine;

/// Console progress reporter.
struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_user_start(&self, user_id: &str) {
        tracing::debug!("analyzing {user_id}");
    }

    fn on_user_complete(&self, user_id: &str, summary: &AnalyticsSummary) {
        eprintln!("  Done: {user_id} ({} tests)", summary.total_tests);
    }

    fn on_user_error(&self, user_id: &str, error: &str) {
        eprintln!("  ERROR: {user_id}: {error}");
    }

    fn on_refresh_complete(
        &self,
        total: usize,
        completed: usize,
        failed: usize,
        elapsed: Duration,
    ) {
        eprintln!(
            "\nComplete: {completed}/{total} succeeded, {failed} failed ({:.1}s)",
            elapsed.as_secs_f64()
        );
    }
}

pub async fn execute(
    mut users: Vec<String>,
    all: bool,
    format: String,
    out: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    anyhow::ensure!(
        matches!(format.as_str(), "text" | "json"),
        "unknown format: {format}"
    );

    let (config, engine) = build_engine(config_path.as_deref())?;

    if all {
        anyhow::ensure!(
            config.store == StoreBackend::Json,
            "--all needs the json store backend"
        );
        users.extend(JsonFileStore::new(&config.data_dir).list_users().await?);
    }
    users.retain(|u| !u.trim().is_empty());
    users.sort();
    users.dedup();
    anyhow::ensure!(!users.is_empty(), "no users to analyze; pass --user or --all");

    let refresh = engine
        .refresh_analytics(&users, &Local::now(), &ConsoleReporter)
        .await;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&refresh.summaries)?);
    } else {
        print_summary(&refresh.summaries);
    }

    if let Some(out) = &out {
        std::fs::create_dir_all(out)?;
        for (user_id, summary) in &refresh.summaries {
            let report = AnalyticsReport {
                user_id: user_id.clone(),
                summary: summary.clone(),
            };
            let path = out.join(format!("analytics-{user_id}.json"));
            report.save_json(&path)?;
            eprintln!("Analytics saved to: {}", path.display());
        }
    }

    anyhow::ensure!(
        refresh.failures.is_empty(),
        "analytics failed for {} user(s)",
        refresh.failures.len()
    );

    Ok(())
}

fn print_summary(summaries: &BTreeMap<String, AnalyticsSummary>) {
    let mut table = Table::new();
    table.set_header(vec![
        "User", "Tests", "Average", "Trend", "Streak", "Active days", "Preferred time",
    ]);

    for (user_id, s) in summaries {
        table.add_row(vec![
            Cell::new(user_id),
            Cell::new(s.total_tests),
            Cell::new(format!("{}%", s.average_score)),
            Cell::new(s.trend),
            Cell::new(format!("{}d", s.study_streak)),
            Cell::new(format!(
                "{}/{}",
                s.study_frequency.active_days, s.study_frequency.window_days
            )),
            Cell::new(
                s.preferred_study_time
                    .map_or_else(|| "-".to_string(), |t| t.to_string()),
            ),
        ]);
    }
    println!("{table}");

    for (user_id, s) in summaries {
        for rec in &s.recommendations {
            println!("{user_id}: {}", rec.message);
        }
    }
}
