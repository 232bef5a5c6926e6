//! The `adaptilearn select` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use adaptilearn_core::model::{normalize_subject, PerformanceLevel, SelectionPolicy};
use adaptilearn_core::report::save_session;

use super::build_engine;

#[allow(clippy::too_many_arguments)]
pub async fn execute(
    user: String,
    count: Option<usize>,
    duration: Option<u32>,
    subjects: Option<String>,
    level: Option<String>,
    seed: Option<u64>,
    no_focus: bool,
    out: PathBuf,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let (config, engine) = build_engine(config_path.as_deref())?;

    let mut test_config = config.test_configuration();
    if let Some(count) = count {
        test_config.question_count = count;
    }
    if let Some(duration) = duration {
        test_config.duration_minutes = duration;
    }
    anyhow::ensure!(test_config.question_count >= 1, "question count must be at least 1");
    anyhow::ensure!(test_config.duration_minutes >= 1, "duration must be at least 1 minute");

    if let Some(subjects) = &subjects {
        test_config.subjects = subjects
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(normalize_subject)
            .collect();
    }
    if let Some(level) = &level {
        let level: PerformanceLevel = level.parse().map_err(anyhow::Error::msg)?;
        test_config.performance_level = Some(level);
    }
    if let Some(seed) = seed {
        test_config.policy = SelectionPolicy::PreShuffled { seed };
    }
    if no_focus {
        test_config.focus_weak_areas = false;
    }

    let started = engine
        .start_test(&user, test_config)
        .await
        .with_context(|| format!("failed to start a test for {user}"))?;

    if let Some(requested) = started.shrunk_from {
        eprintln!(
            "Warning: only {} of {requested} questions available.",
            started.session.questions().len()
        );
    }
    if !started.classification.weak.is_empty() {
        eprintln!("Weak areas: {}", started.classification.weak.join(", "));
    }

    let session = &started.session;
    save_session(session, &out)?;

    println!(
        "Session {} for {user}: {} questions, {} minutes",
        session.id(),
        session.questions().len(),
        session.config().duration_minutes
    );
    for (i, q) in session.questions().iter().enumerate() {
        println!("\n{}. [{}] {} ({}, {})", i + 1, q.id, q.prompt, q.subject, q.difficulty);
        if let Some(reason) = session.selection_reason(&q.id) {
            println!("   {reason}");
        }
        for (idx, option) in q.options.iter().enumerate() {
            println!("   {idx}) {option}");
        }
    }
    println!("\nSession saved to: {}", out.display());

    Ok(())
}
