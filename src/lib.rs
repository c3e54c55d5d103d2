//! moot - resumable synthetic moot-court case generation
//!
//! moot builds a corpus of synthetic criminal cases, one statute section at a
//! time. Every case runs through eight argument stages (opening, three
//! rebuttal rounds and closing, for each side) against an OpenAI-compatible
//! chat completions endpoint. Progress is checkpointed after each stage, so a
//! run interrupted by rate limits or exhausted quotas resumes exactly where it
//! stopped.
//!
//! # Quick Start (CLI)
//!
//! ```bash
//! export GROQ_API_KEYS=key-one,key-two
//! export GROQ_MODELS=llama-3.3-70b-versatile,llama-3.1-8b-instant
//!
//! # Bring every section in the catalog up to three resolved cases
//! moot run --sections-file sections.json --target 3
//!
//! # Judge resolved cases with every configured model
//! moot verdict --limit 10
//!
//! # Case counts per section and status
//! moot report --csv out/
//! ```
//!
//! # Library use
//!
//! [`MootRuntime`] wires a [`Config`] into the engine. Tests and embedders
//! can swap the HTTP backend and the case store through
//! [`MootRuntime::with_parts`].
//!
//! # Stable Public API
//!
//! - [`Config`], [`ConfigBuilder`] and [`CliArgs`]
//! - [`MootError`] and [`ExitCode`]
//! - [`MootRuntime`]
//! - [`RunSummary`], [`HaltReason`], [`SectionReport`] and [`VerdictReport`]

// ============================================================================
// Stable Public API
// ============================================================================

/// Configuration for moot operations.
///
/// Precedence: CLI arguments > environment > `.moot/config.toml` > defaults.
pub use moot_config::Config;

/// Builder for programmatic configuration; consults no files or variables.
pub use moot_config::ConfigBuilder;

/// Command-line overrides fed into [`Config::discover()`].
pub use moot_config::CliArgs;

/// Library-level error type.
///
/// Library code returns `MootError` and never calls `std::process::exit()`.
/// Use [`display_for_user()`](MootError::display_for_user) for terminal
/// output and [`to_exit_code()`](MootError::to_exit_code) for the exit status.
pub use moot_utils::error::MootError;

pub use moot_utils::error::{ErrorCategory, UserFriendlyError};

/// Exit codes of the `moot` binary.
pub use moot_utils::exit_codes::ExitCode;

pub use moot_engine::{HaltReason, RunSummary, SectionReport, VerdictReport, VerdictRequest};

pub use runtime::MootRuntime;

// ============================================================================
// Internal modules - accessible but not stable
// ============================================================================

#[doc(hidden)]
pub use moot_config as config;
#[doc(hidden)]
pub use moot_engine as engine;
#[doc(hidden)]
pub use moot_llm as llm;
#[doc(hidden)]
pub use moot_lock as lock;
#[doc(hidden)]
pub use moot_store as store;
#[doc(hidden)]
pub use moot_utils::{error, exit_codes, logging, redaction, types};

#[doc(hidden)]
pub mod cli;
pub mod runtime;

/// Returns the moot version.
#[must_use]
pub fn moot_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
