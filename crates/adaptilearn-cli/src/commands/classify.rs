//! The `adaptilearn classify` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use adaptilearn_core::classifier::SubjectArea;

use super::build_engine;

pub async fn execute(user: String, config_path: Option<PathBuf>) -> Result<()> {
    let (_, engine) = build_engine(config_path.as_deref())?;
    let classification = engine.classify_user(&user).await?;

    if classification.is_insufficient() {
        println!("No performance history for {user}.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Subject", "Accuracy", "Area"]);
    for (subject, average) in &classification.averages {
        let area = match classification.area_of(subject) {
            Some(SubjectArea::Strong) => "strong",
            Some(SubjectArea::Weak) => "weak",
            _ => "moderate",
        };
        table.add_row(vec![
            Cell::new(subject),
            Cell::new(format!("{:.1}%", average * 100.0)),
            Cell::new(area),
        ]);
    }

    println!("Subjects for {user}:\n{table}");
    if !classification.weak.is_empty() {
        println!("Weak areas: {}", classification.weak.join(", "));
    }

    Ok(())
}
