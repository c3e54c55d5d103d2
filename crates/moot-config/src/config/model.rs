use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Groq's OpenAI-compatible chat completions endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_API_KEYS_ENV: &str = "GROQ_API_KEYS";
pub const DEFAULT_MODELS_ENV: &str = "GROQ_MODELS";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_STATE_DIR: &str = ".moot";
/// Environment variable overriding the state directory
pub const MOOT_HOME_ENV: &str = "MOOT_HOME";

/// Source of a configuration value.
///
/// Serializes to lowercase strings: `"cli"`, `"config"`, `"env"`,
/// `"programmatic"`, `"default"`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Cli,
    Config,
    Env,
    Programmatic,
    Default,
}

/// Settings for the generation backend.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub base_url: String,
    /// Name of the variable holding comma-separated API keys
    pub api_keys_env: String,
    /// Name of the variable holding comma-separated model names
    pub models_env: String,
    /// Models used when the models variable is unset
    pub models: Vec<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_keys_env: DEFAULT_API_KEYS_ENV.to_string(),
            models_env: DEFAULT_MODELS_ENV.to_string(),
            models: vec![DEFAULT_MODEL.to_string()],
            max_tokens: 2048,
            temperature: 0.1,
            timeout_secs: 120,
        }
    }
}

/// Retry and backoff settings for generation calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoverySettings {
    pub max_attempts: u32,
    pub daily_quota_pause_secs: u64,
    pub rate_limit_pause_secs: u64,
    pub transient_base_delay_secs: u64,
    pub transient_max_delay_secs: u64,
    pub unknown_pause_secs: u64,
}

impl Default for RecoverySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            daily_quota_pause_secs: 20,
            rate_limit_pause_secs: 10,
            transient_base_delay_secs: 2,
            transient_max_delay_secs: 60,
            unknown_pause_secs: 2,
        }
    }
}

/// Scheduling settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Resolved cases wanted per section
    pub target_resolved: usize,
    /// Immediate re-runs of a failing case before it is abandoned for the pass
    pub case_retries: u32,
    /// Re-generations allowed when a stage keeps returning unusable text
    pub invalid_output_retries: u32,
    /// Transcript length (chars) above which closing prompts are condensed
    pub closing_history_limit: usize,
    /// Inline section list; used when no sections file is configured
    pub sections: Vec<String>,
    /// JSON catalog of sections (`[{"Section": "302"}, ...]`)
    pub sections_file: Option<Utf8PathBuf>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            target_resolved: 3,
            case_retries: 2,
            invalid_output_retries: 3,
            closing_history_limit: 15_000,
            sections: Vec::new(),
            sections_file: None,
        }
    }
}

/// Persistence settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    pub state_dir: Utf8PathBuf,
    pub lock_ttl_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            state_dir: Utf8PathBuf::from(DEFAULT_STATE_DIR),
            lock_ttl_secs: 3600,
        }
    }
}

/// Effective configuration for a moot run.
///
/// Built by [`Config::discover`] (CLI > environment > config file > defaults)
/// or by [`Config::builder`] for programmatic use. Every key that was set
/// from somewhere other than the defaults is recorded in
/// `source_attribution`.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmSettings,
    pub recovery: RecoverySettings,
    pub pipeline: PipelineSettings,
    pub store: StoreSettings,
    /// File the configuration was loaded from, if any
    pub config_path: Option<PathBuf>,
    pub source_attribution: HashMap<String, ConfigSource>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmSettings::default(),
            recovery: RecoverySettings::default(),
            pipeline: PipelineSettings::default(),
            store: StoreSettings::default(),
            config_path: None,
            source_attribution: HashMap::new(),
        }
    }
}

/// `[llm]` table as written in `config.toml`
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TomlLlm {
    pub base_url: Option<String>,
    pub api_keys_env: Option<String>,
    pub models_env: Option<String>,
    pub models: Option<Vec<String>>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,
}

/// `[recovery]` table
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TomlRecovery {
    pub max_attempts: Option<u32>,
    pub daily_quota_pause_secs: Option<u64>,
    pub rate_limit_pause_secs: Option<u64>,
    pub transient_base_delay_secs: Option<u64>,
    pub transient_max_delay_secs: Option<u64>,
    pub unknown_pause_secs: Option<u64>,
}

/// `[pipeline]` table
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TomlPipeline {
    pub target_resolved: Option<usize>,
    pub case_retries: Option<u32>,
    pub invalid_output_retries: Option<u32>,
    pub closing_history_limit: Option<usize>,
    pub sections: Option<Vec<String>>,
    pub sections_file: Option<String>,
}

/// `[store]` table
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TomlStore {
    pub state_dir: Option<String>,
    pub lock_ttl_secs: Option<u64>,
}

/// Whole `config.toml` file
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TomlConfig {
    pub llm: Option<TomlLlm>,
    pub recovery: Option<TomlRecovery>,
    pub pipeline: Option<TomlPipeline>,
    pub store: Option<TomlStore>,
}
