//! CLI integration tests using assert_cmd.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn adaptilearn() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("adaptilearn").unwrap();
    cmd.env_remove("ADAPTILEARN_DATA_DIR");
    cmd
}

/// Config pointing at a data dir inside `dir` and the repository's sample bank.
fn write_config(dir: &Path) -> PathBuf {
    let banks = std::fs::canonicalize("../../question-banks").unwrap();
    let config = format!(
        "data_dir = {:?}\nquestion_banks = [{:?}]\nretry_delay_ms = 10\n",
        dir.join("data"),
        banks
    );
    let path = dir.join("adaptilearn.toml");
    std::fs::write(&path, config).unwrap();
    path
}

fn find_file(dir: &Path, ext: &str) -> PathBuf {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .find(|p| p.extension().is_some_and(|e| e == ext))
        .unwrap()
}

#[test]
fn help_lists_commands() {
    adaptilearn()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("select"))
        .stdout(predicate::str::contains("submit"))
        .stdout(predicate::str::contains("analyze"));
}

#[test]
fn version_flag() {
    adaptilearn()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("adaptilearn"));
}

#[test]
fn validate_sample_bank() {
    adaptilearn()
        .arg("validate")
        .arg("--bank")
        .arg("../../question-banks/cs-fundamentals.toml")
        .assert()
        .success()
        .stdout(predicate::str::contains("16 questions"))
        .stdout(predicate::str::contains("All question banks valid"));
}

#[test]
fn validate_reports_warnings() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("bank.toml"),
        r#"
[bank]
id = "dup"
name = "Dup"

[[questions]]
id = "q1"
subject = "DS"
difficulty = "easy"
prompt = "Pick"
options = ["a", "b", "c", "d"]
answer = 0
explanation = "a"

[[questions]]
id = "q1"
subject = "DS"
difficulty = "easy"
prompt = "Pick again"
options = ["a", "b", "c", "d"]
answer = 0
explanation = "a"
"#,
    )
    .unwrap();

    adaptilearn()
        .arg("validate")
        .arg("--bank")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("[q1] WARNING: duplicate question ID"))
        .stdout(predicate::str::contains("1 warning(s) found"));
}

#[test]
fn validate_nonexistent_file() {
    adaptilearn()
        .arg("validate")
        .arg("--bank")
        .arg("nonexistent.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    adaptilearn()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created adaptilearn.toml"))
        .stdout(predicate::str::contains("Created question-banks/example.toml"));

    assert!(dir.path().join("adaptilearn.toml").exists());
    assert!(dir.path().join("question-banks/example.toml").exists());

    adaptilearn()
        .current_dir(dir.path())
        .arg("validate")
        .arg("--bank")
        .arg("question-banks")
        .assert()
        .success()
        .stdout(predicate::str::contains("All question banks valid"));
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    adaptilearn()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    adaptilearn()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn init_config_drives_a_test() {
    let dir = TempDir::new().unwrap();
    adaptilearn().current_dir(dir.path()).arg("init").assert().success();

    adaptilearn()
        .current_dir(dir.path())
        .args(["select", "--user", "alice", "--count", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[ds-stack]"));

    assert!(dir.path().join("session.json").exists());
}

#[test]
fn data_dir_env_overrides_config() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    let elsewhere = dir.path().join("elsewhere");

    adaptilearn()
        .env("ADAPTILEARN_DATA_DIR", &elsewhere)
        .args(["select", "--user", "carol", "--count", "1", "--out"])
        .arg(dir.path().join("s.json"))
        .arg("--config")
        .arg(&config)
        .assert()
        .success();

    adaptilearn()
        .env("ADAPTILEARN_DATA_DIR", &elsewhere)
        .args(["answer", "--question", "ds-stack-lifo", "--option", "1", "--session"])
        .arg(dir.path().join("s.json"))
        .arg("--config")
        .arg(&config)
        .assert()
        .success();

    assert!(elsewhere.join("users/carol/activities.json").exists());
    assert!(!dir.path().join("data").exists());
}

#[test]
fn full_session_flow() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    let session = dir.path().join("session.json");
    let results = dir.path().join("results");

    adaptilearn()
        .args(["select", "--user", "alice", "--count", "5", "--out"])
        .arg(&session)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("5 questions"))
        .stdout(predicate::str::contains("[ds-stack-lifo]"))
        .stdout(predicate::str::contains("[algo-binary-search]"));

    for (question, option, progress) in [
        ("ds-stack-lifo", "1", "1/5 answered"),
        ("ds-hash-lookup", "0", "2/5 answered"),
    ] {
        adaptilearn()
            .args(["answer", "--question", question, "--option", option, "--session"])
            .arg(&session)
            .arg("--config")
            .arg(&config)
            .assert()
            .success()
            .stdout(predicate::str::contains(progress));
    }

    adaptilearn()
        .args(["answer", "--question", "net-dns", "--option", "1", "--session"])
        .arg(&session)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not part of this session"));

    adaptilearn()
        .args(["submit", "--session"])
        .arg(&session)
        .arg("--out")
        .arg(&results)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Score: 40% (2/5 correct)"));

    let report_json = find_file(&results, "json");

    // Sealed after submission.
    adaptilearn()
        .args(["answer", "--question", "ds-heap-top", "--option", "1", "--session"])
        .arg(&session)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already submitted"));

    adaptilearn()
        .args(["classify", "--user", "alice", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Data Structures"))
        .stdout(predicate::str::contains("Weak areas: Algorithms, Data Structures"));

    let analytics = dir.path().join("analytics");
    adaptilearn()
        .args(["analyze", "--user", "alice", "--out"])
        .arg(&analytics)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("alice"))
        .stdout(predicate::str::contains("Practice more questions on Algorithms"));

    let saved = std::fs::read_to_string(analytics.join("analytics-alice.json")).unwrap();
    let saved: serde_json::Value = serde_json::from_str(&saved).unwrap();
    assert_eq!(saved["summary"]["total_tests"], 1);
    assert_eq!(saved["summary"]["average_score"], 40);

    adaptilearn()
        .args(["report", "--format", "markdown", "--session-report"])
        .arg(&report_json)
        .assert()
        .success()
        .stdout(predicate::str::contains("**Score:** 40% (2/5 correct)"));

    let html = dir.path().join("report.html");
    adaptilearn()
        .args(["report", "--session-report"])
        .arg(&report_json)
        .arg("--out")
        .arg(&html)
        .assert()
        .success();
    assert!(std::fs::read_to_string(&html).unwrap().contains("<html"));

    adaptilearn()
        .args(["report", "--session-report"])
        .arg(&report_json)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--out is required"));

    adaptilearn()
        .args(["analyze", "--all", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("alice"));
}

#[test]
fn second_test_targets_weak_subjects() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    let session = dir.path().join("session.json");

    adaptilearn()
        .args(["select", "--user", "dave", "--count", "2", "--subjects", "Networks", "--out"])
        .arg(&session)
        .arg("--config")
        .arg(&config)
        .assert()
        .success();

    adaptilearn()
        .args(["submit", "--format", "json", "--session"])
        .arg(&session)
        .arg("--out")
        .arg(dir.path().join("results"))
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"overall_score\": 0"));

    adaptilearn()
        .args(["select", "--user", "dave", "--count", "5", "--out"])
        .arg(&session)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Networks is identified as a weak area"))
        .stderr(predicate::str::contains("Weak areas: Networks"));
}

#[test]
fn start_rejects_bad_input() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    adaptilearn()
        .args(["select", "--user", "alice", "--level", "expert", "--config"])
        .arg(&config)
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown performance level"));

    adaptilearn()
        .args(["select", "--user", "alice", "--count", "50", "--config"])
        .arg(&config)
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("exhausted"));
}

#[test]
fn rate_limit_budget_is_per_invocation() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    let mut content = std::fs::read_to_string(&config).unwrap();
    content.push_str("\n[rate_limits.question_bank]\nrequests = 1\n");
    std::fs::write(&config, content).unwrap();

    for _ in 0..2 {
        adaptilearn()
            .args(["select", "--user", "erin", "--count", "1", "--out"])
            .arg(dir.path().join("s.json"))
            .arg("--config")
            .arg(&config)
            .assert()
            .success();
    }
}

#[test]
fn analyze_without_users_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    adaptilearn()
        .args(["analyze", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no users to analyze"));
}
