//! adaptilearn CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "adaptilearn",
    version,
    about = "Adaptive question selection and learning analytics"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter config and example question bank
    Init,

    /// Validate question bank TOML files
    Validate {
        /// Path to a question bank file or directory
        #[arg(long)]
        bank: PathBuf,
    },

    /// Show a user's strong, moderate and weak subjects
    Classify {
        /// User to classify
        #[arg(long)]
        user: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Select questions for a new test and save the session
    Select {
        /// User taking the test
        #[arg(long)]
        user: String,

        /// Number of questions (default from config)
        #[arg(long)]
        count: Option<usize>,

        /// Time limit in minutes (default from config)
        #[arg(long)]
        duration: Option<u32>,

        /// Restrict to these subjects (comma-separated)
        #[arg(long)]
        subjects: Option<String>,

        /// Performance level: beginner, intermediate, advanced
        #[arg(long)]
        level: Option<String>,

        /// Shuffle the pool with this seed before selecting
        #[arg(long)]
        seed: Option<u64>,

        /// Do not reserve slots for weak subjects
        #[arg(long)]
        no_focus: bool,

        /// Where to save the session
        #[arg(long, default_value = "session.json")]
        out: PathBuf,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Answer one question of a saved session
    Answer {
        /// Saved session file
        #[arg(long)]
        session: PathBuf,

        /// Question ID
        #[arg(long)]
        question: String,

        /// Zero-based option index
        #[arg(long)]
        option: usize,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Submit a saved session and record the result
    Submit {
        /// Saved session file
        #[arg(long)]
        session: PathBuf,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,

        /// Directory for the session report JSON
        #[arg(long, default_value = "./adaptilearn-results")]
        out: PathBuf,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Compute learning analytics for one or more users
    Analyze {
        /// Users to analyze (comma-separated or repeated)
        #[arg(long = "user", value_delimiter = ',')]
        users: Vec<String>,

        /// Analyze every user in the JSON store
        #[arg(long)]
        all: bool,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Directory to save per-user analytics reports to
        #[arg(long)]
        out: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Render a saved session or analytics report
    Report {
        /// Report JSON written by `submit` or `analyze --out`
        #[arg(long = "session-report", alias = "input")]
        input: PathBuf,

        /// Output format: html, markdown
        #[arg(long, default_value = "html")]
        format: String,

        /// Output file (required for html; markdown goes to stdout if omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("adaptilearn=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Validate { bank } => commands::validate::execute(bank),
        Commands::Classify { user, config } => commands::classify::execute(user, config).await,
        Commands::Select {
            user,
            count,
            duration,
            subjects,
            level,
            seed,
            no_focus,
            out,
            config,
        } => {
            commands::select::execute(
                user, count, duration, subjects, level, seed, no_focus, out, config,
            )
            .await
        }
        Commands::Answer {
            session,
            question,
            option,
            config,
        } => commands::answer::execute(session, question, option, config).await,
        Commands::Submit {
            session,
            format,
            out,
            config,
        } => commands::submit::execute(session, format, out, config).await,
        Commands::Analyze {
            users,
            all,
            format,
            out,
            config,
        } => commands::analyze::execute(users, all, format, out, config).await,
        Commands::Report { input, format, out } => commands::report::execute(input, format, out),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
