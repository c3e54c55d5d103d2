//! CLI argument definitions (clap)

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// moot - synthetic moot-court case generation
#[derive(Parser, Debug)]
#[command(name = "moot")]
#[command(about = "Generate synthetic moot-court cases and verdicts with rate-limited LLM providers")]
#[command(long_about = r#"
moot builds a corpus of synthetic criminal cases per statute section. Each case
runs through eight argument stages and is checkpointed after every stage, so an
interrupted run resumes where it stopped.

EXAMPLES:
  # Bring every catalog section up to three resolved cases
  moot run --sections-file sections.json --target 3

  # Only one section, two retries per failing case
  moot run --section 302 --case-retries 2

  # Create and argue a single new case
  moot case 420

  # Judge up to ten resolved cases with every configured model
  moot verdict --limit 10

  # Case counts, as a table or as CSV files
  moot report
  moot report --csv reports/

  # Effective configuration, lock holder and credential pool
  moot status --json

CONFIGURATION:
  Precedence: CLI flags > environment > .moot/config.toml > defaults
  The config file is discovered by searching upward from CWD for .moot/config.toml
  API keys are read from GROQ_API_KEYS (comma-separated), models from GROQ_MODELS
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// State directory holding cases, verdicts and the lock file
    #[arg(long, global = true)]
    pub state_dir: Option<String>,

    /// Model to rotate through; repeat for several, in order
    #[arg(long = "model", global = true)]
    pub models: Vec<String>,

    /// Attempts per generation call before it fails
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log line format on stderr (compact or json)
    #[arg(long, global = true, default_value = "compact")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resume unfinished cases and top every section up to its target
    Run {
        /// Only process this section
        #[arg(long)]
        section: Option<String>,

        /// Resolved cases wanted per section
        #[arg(long)]
        target: Option<usize>,

        /// Immediate re-runs of a failing case before it is left for the next run
        #[arg(long)]
        case_retries: Option<u32>,

        /// JSON catalog of sections (`[{"Section": "302"}, ...]`)
        #[arg(long)]
        sections_file: Option<String>,

        /// Replace a lock left behind by a dead process
        #[arg(long)]
        force: bool,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create one new case in a section and argue it
    Case {
        /// Statute section, e.g. 302
        section: String,

        /// Replace a lock left behind by a dead process
        #[arg(long)]
        force: bool,

        /// Print the case as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate verdicts for resolved cases, one per model
    Verdict {
        /// Judge at most this many cases
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Judge only this case id
        #[arg(long = "case")]
        case_id: Option<String>,

        /// Replace a lock left behind by a dead process
        #[arg(long)]
        force: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Case counts by section, by status, and by both
    Report {
        /// Print the counts as JSON
        #[arg(long, conflicts_with = "csv")]
        json: bool,

        /// Write the three CSV files into this directory
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Effective configuration, store totals, lock holder and credential pool
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Build the clap command (used by tests and shell completion generators)
#[must_use]
pub fn build_cli() -> clap::Command {
    <Cli as clap::CommandFactory>::command()
}

impl Commands {
    /// Name used in lock files and error reports
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Run { .. } => "run",
            Self::Case { .. } => "case",
            Self::Verdict { .. } => "verdict",
            Self::Report { .. } => "report",
            Self::Status { .. } => "status",
        }
    }
}
