//! The `adaptilearn answer` command.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;

use adaptilearn_core::report::{load_session, save_session};

use super::build_engine;

pub async fn execute(
    session_path: PathBuf,
    question: String,
    option: usize,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let (_, engine) = build_engine(config_path.as_deref())?;
    let mut session = load_session(&session_path)?;

    let outcome = engine
        .answer_question(&mut session, &question, option, Utc::now())
        .await;
    // An expired session comes back sealed; keep that on disk either way.
    save_session(&session, &session_path)?;
    outcome?;

    println!(
        "Answered {question} ({}/{} answered)",
        session.answers().len(),
        session.questions().len()
    );

    Ok(())
}
