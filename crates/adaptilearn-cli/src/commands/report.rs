//! The `adaptilearn report` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use adaptilearn_core::report::{AnalyticsReport, SessionReport};
use adaptilearn_report::html::{generate_analytics_html, generate_session_html, write_html_report};

enum Loaded {
    Session(SessionReport),
    Analytics(AnalyticsReport),
}

pub fn execute(input: PathBuf, format: String, out: Option<PathBuf>) -> Result<()> {
    let loaded = match SessionReport::load_json(&input) {
        Ok(report) => Loaded::Session(report),
        Err(session_err) => AnalyticsReport::load_json(&input)
            .map(Loaded::Analytics)
            .map_err(|_| session_err)
            .with_context(|| format!("not a session or analytics report: {}", input.display()))?,
    };

    match format.as_str() {
        "html" => {
            let path = out.context("--out is required for html reports")?;
            let html = match &loaded {
                Loaded::Session(r) => generate_session_html(r),
                Loaded::Analytics(r) => generate_analytics_html(r),
            };
            write_html_report(&html, &path)?;
            eprintln!("HTML report: {}", path.display());
        }
        "markdown" | "md" => {
            let md = match &loaded {
                Loaded::Session(r) => r.to_markdown(),
                Loaded::Analytics(r) => r.to_markdown(),
            };
            match out {
                Some(path) => {
                    std::fs::write(&path, md)?;
                    eprintln!("Markdown report: {}", path.display());
                }
                None => print!("{md}"),
            }
        }
        other => anyhow::bail!("unknown format: {other}"),
    }

    Ok(())
}
