use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub use moot_lock::LockError;

use crate::types::{SectionCode, Stage};

/// Library-level error type with user-facing rendering.
///
/// `MootError` aggregates the per-concern errors returned by the moot crates.
/// Library code returns it (or one of its parts) and never calls
/// `std::process::exit()`; the binary maps it through
/// [`to_exit_code()`](Self::to_exit_code).
///
/// | Exit Code | Error Type |
/// |-----------|------------|
/// | 3 | Configuration errors |
/// | 9 | Lock held |
/// | 70 | Generation failed for a case |
/// | 74 | Persistence failures |
/// | 75 | Credential pool exhausted |
/// | 1 | Other errors |
///
/// ```rust
/// use moot_utils::error::{MootError, PoolExhausted};
/// use moot_utils::exit_codes::ExitCode;
///
/// let err = MootError::from(PoolExhausted { models: 2, rotations: 6 });
/// assert_eq!(err.to_exit_code(), ExitCode::POOL_EXHAUSTED);
/// ```
#[derive(Error, Debug)]
pub enum MootError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM backend error: {0}")]
    Llm(#[from] LlmError),

    #[error("Case store error: {0}")]
    Store(#[from] StoreError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("File lock error: {0}")]
    Lock(#[from] LockError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PoolExhausted> for MootError {
    fn from(err: PoolExhausted) -> Self {
        Self::Pipeline(PipelineError::PoolExhausted(err))
    }
}

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Generation,
    Credentials,
    Persistence,
    Concurrency,
    Validation,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::Generation => write!(f, "Generation"),
            Self::Credentials => write!(f, "Credentials"),
            Self::Persistence => write!(f, "Persistence"),
            Self::Concurrency => write!(f, "Concurrency"),
            Self::Validation => write!(f, "Validation"),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },

    #[error("Configuration discovery failed: {reason}")]
    DiscoveryFailed { reason: String },

    #[error("Configuration validation failed: {error_count} errors")]
    ValidationFailed {
        errors: Vec<String>,
        error_count: usize,
    },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(reason) => {
                format!("Configuration file has invalid format: {reason}")
            }
            Self::MissingRequired(key) => format!("Required configuration '{key}' is missing"),
            Self::InvalidValue { key, value } => {
                format!("Configuration '{key}' has invalid value: {value}")
            }
            Self::NotFound { path } => format!("Configuration file not found: {path}"),
            Self::DiscoveryFailed { reason } => {
                format!("Failed to discover configuration: {reason}")
            }
            Self::ValidationFailed { errors, .. } => format!(
                "Configuration validation failed with {} errors: {}",
                errors.len(),
                errors.join(", ")
            ),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidFile(_) => Some(
                "Configuration files must be valid TOML with optional [llm], [recovery], [pipeline] and [store] sections."
                    .to_string(),
            ),
            Self::MissingRequired(_) => Some(
                "API keys and model names must be available before the pipeline can start."
                    .to_string(),
            ),
            Self::InvalidValue { key, .. } => Some(format!(
                "The '{key}' configuration option has specific format requirements."
            )),
            Self::NotFound { .. } | Self::DiscoveryFailed { .. } => Some(
                "moot searches for .moot/config.toml starting from the current directory upward."
                    .to_string(),
            ),
            Self::ValidationFailed { .. } => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check the TOML syntax using a TOML validator".to_string(),
                "Run 'moot status' to see which configuration file was loaded".to_string(),
            ],
            Self::MissingRequired(key) => vec![
                format!("Set '{key}' in the environment or in .moot/config.toml"),
                "Keys are read as a comma-separated list, e.g. GROQ_API_KEYS=key1,key2"
                    .to_string(),
            ],
            Self::InvalidValue { key, .. } => match key.as_str() {
                "recovery.max_attempts" | "pipeline.target_resolved" => {
                    vec!["Use a positive integer value".to_string()]
                }
                "llm.temperature" => vec!["Use a value between 0.0 and 2.0".to_string()],
                _ => vec![
                    "Check the documentation for valid values for this option".to_string(),
                    "Remove the option to use the default value".to_string(),
                ],
            },
            Self::NotFound { .. } => vec![
                "Create .moot/config.toml in your project root".to_string(),
                "Use --config <path> to point at a configuration file".to_string(),
            ],
            Self::DiscoveryFailed { .. } => vec![
                "Check file permissions in the current and parent directories".to_string(),
                "Use --config <path> to specify configuration file explicitly".to_string(),
            ],
            Self::ValidationFailed { .. } => {
                vec!["Fix the listed values and run the command again".to_string()]
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

/// Failures of a single generation call.
///
/// The HTTP backend fills in the structured kind whenever the provider's
/// response makes it clear; opaque upstream failures end up as `Transport`
/// and are classified from their message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// Transport-level failure (HTTP connectivity, unexpected status)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider authentication failure (401, 403, missing API key)
    #[error("Provider authentication error: {0}")]
    ProviderAuth(String),

    /// Short-term rate limit (429 without a per-day ceiling)
    #[error("Provider quota exceeded: {0}")]
    ProviderQuota(String),

    /// Per-day token or request ceiling reached for the current model
    #[error("Daily quota exhausted: {0}")]
    DailyQuota(String),

    /// Provider overloaded or temporarily unavailable (5xx)
    #[error("Provider outage: {0}")]
    ProviderOutage(String),

    /// Invocation timed out
    #[error("Timeout after {duration:?}")]
    Timeout { duration: Duration },

    /// Configuration error
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),

    /// Provider answered but the body could not be used
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

impl UserFriendlyError for LlmError {
    fn user_message(&self) -> String {
        match self {
            Self::Transport(msg) => format!("LLM transport error: {msg}"),
            Self::ProviderAuth(msg) => format!("LLM provider authentication failed: {msg}"),
            Self::ProviderQuota(msg) => format!("LLM provider rate limit hit: {msg}"),
            Self::DailyQuota(msg) => format!("LLM daily quota exhausted: {msg}"),
            Self::ProviderOutage(msg) => format!("LLM provider unavailable: {msg}"),
            Self::Timeout { duration } => format!("LLM invocation timed out after {duration:?}"),
            Self::Misconfiguration(msg) => format!("LLM configuration error: {msg}"),
            Self::InvalidResponse(msg) => format!("LLM returned an unusable response: {msg}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::ProviderQuota(_) | Self::DailyQuota(_) => Some(
                "Rate limits are tracked per model and key; exhausted credentials are rotated out."
                    .to_string(),
            ),
            Self::ProviderOutage(_) => {
                Some("Provider outages are temporary service disruptions.".to_string())
            }
            Self::ProviderAuth(_) => Some(
                "Authentication errors indicate missing or invalid API keys.".to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::ProviderAuth(_) => vec![
                "Check the keys listed in the configured API key variable".to_string(),
                "Remove revoked keys from the list".to_string(),
            ],
            Self::ProviderQuota(_) | Self::DailyQuota(_) => vec![
                "Add more keys or models to spread the load".to_string(),
                "Wait for the provider's quota window to reset".to_string(),
            ],
            Self::ProviderOutage(_) | Self::Timeout { .. } | Self::Transport(_) => vec![
                "Wait a few minutes and try again".to_string(),
                "Run with --verbose to see each attempt".to_string(),
            ],
            Self::Misconfiguration(_) => {
                vec!["Check the [llm] section of .moot/config.toml".to_string()]
            }
            Self::InvalidResponse(_) => vec!["Try a different model".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::ProviderAuth(_) | Self::ProviderQuota(_) | Self::DailyQuota(_) => {
                ErrorCategory::Credentials
            }
            Self::Misconfiguration(_) => ErrorCategory::Configuration,
            _ => ErrorCategory::Generation,
        }
    }
}

/// No usable (model, key) pair remains. Fatal to the whole run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Credential pool exhausted: all {models} model(s) used up after {rotations} rotation(s)")]
pub struct PoolExhausted {
    /// Number of models the pool started with
    pub models: usize,
    /// Rotation counter at the time of exhaustion
    pub rotations: u64,
}

/// Persistence errors.
///
/// Checkpoint failures are logged and the run continues; these only abort
/// commands that cannot proceed without the store (loading, reporting).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Store file {path} is corrupted: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("Case {id} not found")]
    CaseNotFound { id: String },

    #[error("Failed to write {path}: {reason}")]
    WriteFailed { path: String, reason: String },
}

impl UserFriendlyError for StoreError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Corrupt { .. } => Some(
                "Case documents are stored as JSON under the state directory.".to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Io { .. } | Self::WriteFailed { .. } => vec![
                "Check permissions on the state directory".to_string(),
                "Use --state-dir to point at a writable location".to_string(),
            ],
            Self::Corrupt { .. } => vec![
                "Restore the file from a backup or move it aside to start fresh".to_string(),
            ],
            Self::CaseNotFound { .. } => {
                vec!["Run 'moot report' to list known cases per section".to_string()]
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Persistence
    }
}

/// Errors raised while driving cases through the pipeline.
///
/// Only [`PipelineError::PoolExhausted`] is fatal; everything else is a
/// case-level failure that the section scheduler absorbs.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    PoolExhausted(#[from] PoolExhausted),

    #[error("Stage {stage} of case {case_id} failed after {attempts} attempt(s): {source}")]
    GenerationFailed {
        case_id: String,
        stage: Stage,
        attempts: u32,
        #[source]
        source: LlmError,
    },

    #[error("Stage {stage} of case {case_id} kept producing invalid output ({attempts} attempt(s))")]
    InvalidResponse {
        case_id: String,
        stage: Stage,
        attempts: u32,
    },

    #[error("Could not generate case content for section {section}: {reason}")]
    CaseContent { section: SectionCode, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PipelineError {
    /// Fatal errors abort the whole run instead of abandoning one case.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::PoolExhausted(_))
    }
}

impl UserFriendlyError for PipelineError {
    fn user_message(&self) -> String {
        match self {
            Self::PoolExhausted(inner) => format!(
                "Every configured model ran out of usable keys ({} rotations)",
                inner.rotations
            ),
            other => other.to_string(),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::PoolExhausted(_) => Some(
                "Progress is checkpointed after every stage; the next run resumes unfinished cases."
                    .to_string(),
            ),
            Self::GenerationFailed { source, .. } => source.context(),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::PoolExhausted(_) => vec![
                "Wait for provider quotas to reset and run again".to_string(),
                "Add keys or models to the configuration".to_string(),
            ],
            Self::GenerationFailed { source, .. } => source.suggestions(),
            Self::Store(inner) => inner.suggestions(),
            _ => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::PoolExhausted(_) => ErrorCategory::Credentials,
            Self::InvalidResponse { .. } => ErrorCategory::Validation,
            Self::Store(_) => ErrorCategory::Persistence,
            _ => ErrorCategory::Generation,
        }
    }
}

impl UserFriendlyError for LockError {
    fn user_message(&self) -> String {
        match self {
            Self::ConcurrentExecution { pid, .. } => {
                format!("Another moot process (PID {pid}) is using this state directory")
            }
            other => other.to_string(),
        }
    }

    fn context(&self) -> Option<String> {
        Some("Only one process may write to a state directory at a time.".to_string())
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::StaleLock { .. } | Self::CorruptedLock { .. } => {
                vec!["Re-run with --force to replace the lock".to_string()]
            }
            _ => vec!["Wait for the other run to finish".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Concurrency
    }
}

impl UserFriendlyError for MootError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(e) => e.user_message(),
            Self::Llm(e) => e.user_message(),
            Self::Store(e) => e.user_message(),
            Self::Pipeline(e) => e.user_message(),
            Self::Lock(e) => e.user_message(),
            Self::Io(e) => format!("File system error: {e}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(e) => e.context(),
            Self::Llm(e) => e.context(),
            Self::Store(e) => e.context(),
            Self::Pipeline(e) => e.context(),
            Self::Lock(e) => e.context(),
            Self::Io(_) => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(e) => e.suggestions(),
            Self::Llm(e) => e.suggestions(),
            Self::Store(e) => e.suggestions(),
            Self::Pipeline(e) => e.suggestions(),
            Self::Lock(e) => e.suggestions(),
            Self::Io(_) => vec!["Check file permissions and available disk space".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(e) => e.category(),
            Self::Llm(e) => e.category(),
            Self::Store(e) => e.category(),
            Self::Pipeline(e) => e.category(),
            Self::Lock(e) => e.category(),
            Self::Io(_) => ErrorCategory::Persistence,
        }
    }
}

impl MootError {
    /// Render the error with context and suggestions for terminal output.
    ///
    /// The result passes through [`redact_secrets`](crate::redaction::redact_secrets)
    /// so provider messages that echo a key never reach the terminal.
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut output = format!("Error: {}\n", self.user_message());

        if let Some(ctx) = self.context() {
            output.push_str(&format!("\nContext: {ctx}\n"));
        }

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for suggestion in suggestions {
                output.push_str(&format!("  • {suggestion}\n"));
            }
        }

        crate::redaction::redact_secrets(&output)
    }

    /// Map this error to the CLI exit code.
    #[must_use]
    pub fn to_exit_code(&self) -> crate::exit_codes::ExitCode {
        use crate::exit_codes::ExitCode;

        match self {
            Self::Config(_) => ExitCode::CONFIG,
            Self::Lock(_) => ExitCode::LOCK_HELD,
            Self::Store(_) => ExitCode::STORE_FAILURE,
            Self::Pipeline(PipelineError::PoolExhausted(_)) => ExitCode::POOL_EXHAUSTED,
            Self::Pipeline(PipelineError::Store(_)) => ExitCode::STORE_FAILURE,
            Self::Pipeline(_) => ExitCode::GENERATION_FAILURE,
            Self::Llm(LlmError::Misconfiguration(_)) => ExitCode::CONFIG,
            Self::Llm(_) => ExitCode::GENERATION_FAILURE,
            Self::Io(_) => ExitCode::INTERNAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::ExitCode;

    #[test]
    fn test_only_pool_exhaustion_is_fatal() {
        let fatal = PipelineError::from(PoolExhausted {
            models: 1,
            rotations: 3,
        });
        assert!(fatal.is_fatal());

        let case_level = PipelineError::GenerationFailed {
            case_id: "c1".to_string(),
            stage: Stage::DefendantOpening,
            attempts: 5,
            source: LlmError::ProviderOutage("503".to_string()),
        };
        assert!(!case_level.is_fatal());

        let invalid = PipelineError::InvalidResponse {
            case_id: "c1".to_string(),
            stage: Stage::PlaintiffClosing,
            attempts: 3,
        };
        assert!(!invalid.is_fatal());
    }

    #[test]
    fn test_exit_code_mapping() {
        let cases: Vec<(MootError, ExitCode)> = vec![
            (
                ConfigError::MissingRequired("GROQ_API_KEYS".to_string()).into(),
                ExitCode::CONFIG,
            ),
            (
                PoolExhausted {
                    models: 2,
                    rotations: 4,
                }
                .into(),
                ExitCode::POOL_EXHAUSTED,
            ),
            (
                StoreError::CaseNotFound {
                    id: "x".to_string(),
                }
                .into(),
                ExitCode::STORE_FAILURE,
            ),
            (
                LlmError::Misconfiguration("no url".to_string()).into(),
                ExitCode::CONFIG,
            ),
            (
                LlmError::ProviderOutage("down".to_string()).into(),
                ExitCode::GENERATION_FAILURE,
            ),
            (
                LockError::ConcurrentExecution {
                    state_dir: ".moot".to_string(),
                    pid: 42,
                    created_ago: "1m".to_string(),
                }
                .into(),
                ExitCode::LOCK_HELD,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.to_exit_code(), expected, "wrong exit code for {err}");
        }
    }

    #[test]
    fn test_display_for_user_includes_suggestions() {
        let err = MootError::from(PoolExhausted {
            models: 2,
            rotations: 7,
        });
        let rendered = err.display_for_user();
        assert!(rendered.starts_with("Error: "));
        assert!(rendered.contains("7 rotations"));
        assert!(rendered.contains("Suggestions:"));
    }

    #[test]
    fn test_display_for_user_redacts_keys() {
        let err = MootError::from(LlmError::ProviderAuth(
            "invalid key gsk_abcdefghijklmnopqrstuvwxyz0123456789ABCD".to_string(),
        ));
        let rendered = err.display_for_user();
        assert!(!rendered.contains("gsk_abcdefghijklmnopqrstuvwxyz0123456789ABCD"));
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(
            LlmError::DailyQuota("TPD".to_string()).category(),
            ErrorCategory::Credentials
        );
        assert_eq!(
            LlmError::Timeout {
                duration: Duration::from_secs(1)
            }
            .category(),
            ErrorCategory::Generation
        );
        assert_eq!(ErrorCategory::Persistence.to_string(), "Persistence");
    }
}
