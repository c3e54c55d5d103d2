//! Configuration management for moot
//!
//! Hierarchical configuration with discovery and precedence:
//! CLI > environment > `.moot/config.toml` > defaults. Credentials are never
//! stored in the file; the file only names the variables that hold them.

mod builder;
mod cli_args;
mod discovery;
mod model;
mod sources;
mod validation;

pub use builder::ConfigBuilder;
pub use cli_args::CliArgs;
pub use discovery::split_list;
pub use model::*;

use std::env;

use moot_utils::error::ConfigError;

/// Model names and API keys resolved from the environment.
#[derive(Clone)]
pub struct Credentials {
    pub models: Vec<String>,
    pub keys: Vec<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("models", &self.models)
            .field("keys", &format_args!("[{} redacted]", self.keys.len()))
            .finish()
    }
}

impl Config {
    /// Resolve models and keys from the process environment.
    pub fn resolve_credentials(&self) -> Result<Credentials, ConfigError> {
        self.resolve_credentials_with(|name| env::var(name).ok())
    }

    /// Resolve credentials through `lookup`.
    ///
    /// Keys come from `llm.api_keys_env` and must contain at least one entry.
    /// Models were already merged from `llm.models_env` during discovery.
    pub fn resolve_credentials_with<F>(&self, lookup: F) -> Result<Credentials, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let keys = lookup(&self.llm.api_keys_env)
            .map(|raw| split_list(&raw))
            .unwrap_or_default();
        if keys.is_empty() {
            return Err(ConfigError::MissingRequired(format!(
                "{} (comma-separated API keys)",
                self.llm.api_keys_env
            )));
        }
        if self.llm.models.is_empty() {
            return Err(ConfigError::MissingRequired(format!(
                "{} or llm.models",
                self.llm.models_env
            )));
        }
        Ok(Credentials {
            models: self.llm.models.clone(),
            keys,
        })
    }
}
