//! The `adaptilearn init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("adaptilearn.toml").exists() {
        println!("adaptilearn.toml already exists, skipping.");
    } else {
        std::fs::write("adaptilearn.toml", SAMPLE_CONFIG)?;
        println!("Created adaptilearn.toml");
    }

    std::fs::create_dir_all("question-banks")?;
    let example_path = std::path::Path::new("question-banks/example.toml");
    if example_path.exists() {
        println!("question-banks/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_BANK)?;
        println!("Created question-banks/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Add questions under question-banks/");
    println!("  2. Run: adaptilearn validate --bank question-banks");
    println!("  3. Run: adaptilearn select --user <name>");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# adaptilearn configuration

store = "json"
data_dir = "./adaptilearn-data"
question_banks = ["question-banks"]
max_retries = 3
retry_delay_ms = 1000
parallelism = 4
shrink_on_exhaustion = false

[test]
duration_minutes = 30
question_count = 8
focus_weak_areas = true

# Requests per window for each external API. Budgets are held in memory,
# so each adaptilearn invocation starts with a full budget.
[rate_limits.question_bank]
requests = 100
window_secs = 3600
"#;

const EXAMPLE_BANK: &str = r#"[bank]
id = "example"
name = "Example Bank"
description = "A few questions to get started"

[[questions]]
id = "ds-stack"
subject = "Data Structures"
difficulty = "easy"
prompt = "Which data structure is last-in, first-out?"
options = ["Queue", "Stack", "Heap", "Graph"]
answer = 1
explanation = "A stack pops the most recently pushed item first."

[[questions]]
id = "ds-heap"
subject = "Data Structures"
difficulty = "medium"
prompt = "What is the cost of removing the top of a binary heap?"
options = ["O(1)", "O(log n)", "O(n)", "O(n log n)"]
answer = 1
explanation = "The replacement root sifts down at most the tree height."

[[questions]]
id = "algo-search"
subject = "Algorithms"
difficulty = "easy"
prompt = "What does binary search require of its input?"
options = ["Sorted order", "No duplicates", "Fixed size", "Linked storage"]
answer = 0
explanation = "Order tells the search which half holds the target."

[[questions]]
id = "os-deadlock"
subject = "Operating Systems"
difficulty = "hard"
prompt = "Which condition is NOT required for deadlock?"
options = ["Mutual exclusion", "Hold and wait", "Preemption", "Circular wait"]
answer = 2
explanation = "Deadlock requires no preemption."

[[questions]]
id = "net-handshake"
subject = "Networks"
difficulty = "easy"
prompt = "How many segments does the TCP handshake use?"
options = ["One", "Two", "Three", "Four"]
answer = 2
explanation = "SYN, SYN-ACK, ACK."
"#;
