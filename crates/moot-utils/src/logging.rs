//! Structured logging setup and helpers
//!
//! All diagnostics go through `tracing`. [`init_tracing`] installs the
//! subscriber once per process; the helpers below keep field names uniform
//! (`case_id`, `section`, `stage`, `model`, `key`) so runs can be filtered
//! and resumed from the log alone.

use std::fmt;
use std::str::FromStr;
use tracing::{Level, error, info, span, warn};
use tracing_subscriber::{EnvFilter, fmt as sub_fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::redaction::redact_secrets;
use crate::types::{SectionCode, Stage};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Compact human-readable lines
    #[default]
    Compact,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" | "text" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "Unknown log format '{other}'. Available formats: compact, json"
            )),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compact => write!(f, "compact"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise verbose mode logs `moot=debug,info`
/// and normal mode `moot=info,warn`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(verbose: bool, format: LogFormat) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("moot=debug,info")
            } else {
                EnvFilter::try_new("moot=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    sub_fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
        LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    sub_fmt::layer()
                        .with_target(verbose)
                        .with_thread_ids(false)
                        .with_thread_names(false)
                        .with_line_number(false)
                        .with_file(false)
                        .with_writer(std::io::stderr)
                        .compact(),
                )
                .try_init()?;
        }
    }

    Ok(())
}

/// Span covering all stages of one case.
pub fn case_span(case_id: &str, section: &SectionCode) -> tracing::Span {
    span!(
        Level::INFO,
        "case",
        case_id = %case_id,
        section = %section,
    )
}

/// Span covering one section pass of the scheduler.
pub fn section_span(section: &SectionCode) -> tracing::Span {
    span!(Level::INFO, "section", section = %section)
}

pub fn log_stage_accepted(case_id: &str, stage: Stage, attempts: u32, chars: usize) {
    info!(
        case_id = %case_id,
        stage = %stage,
        attempts,
        chars,
        "Stage output accepted"
    );
}

/// Log a stage failure. The message is redacted before it is emitted.
pub fn log_stage_failed(case_id: &str, stage: Stage, model: &str, key_prefix: &str, err: &str) {
    error!(
        case_id = %case_id,
        stage = %stage,
        model = %model,
        key = %key_prefix,
        error = %redact_secrets(err),
        "Stage failed; case left incomplete"
    );
}

/// Log a checkpoint that could not be persisted. The run continues.
pub fn log_checkpoint_failed(case_id: &str, stage: Option<Stage>, err: &str) {
    match stage {
        Some(stage) => warn!(
            case_id = %case_id,
            stage = %stage,
            error = %redact_secrets(err),
            "Checkpoint not persisted; continuing with in-memory progress"
        ),
        None => warn!(
            case_id = %case_id,
            error = %redact_secrets(err),
            "Checkpoint not persisted; continuing with in-memory progress"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("yaml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_helpers_do_not_panic_without_subscriber() {
        let section = SectionCode::new("302");
        let _span = case_span("case-1", &section).entered();
        log_stage_accepted("case-1", Stage::PlaintiffOpening, 1, 120);
        log_stage_failed("case-1", Stage::DefendantRound(2), "m", "gsk_1234", "boom");
        log_checkpoint_failed("case-1", Some(Stage::PlaintiffClosing), "disk full");
        log_checkpoint_failed("case-1", None, "disk full");
    }
}
