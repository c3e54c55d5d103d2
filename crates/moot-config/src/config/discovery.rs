use camino::Utf8PathBuf;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use moot_utils::error::ConfigError;

use super::model::{MOOT_HOME_ENV, TomlConfig};
use super::{CliArgs, Config, ConfigSource};

/// Set `slot` to `value` when present and record where it came from.
fn apply<T>(
    slot: &mut T,
    value: Option<T>,
    key: &str,
    source: ConfigSource,
    attribution: &mut HashMap<String, ConfigSource>,
) {
    if let Some(v) = value {
        *slot = v;
        attribution.insert(key.to_string(), source);
    }
}

/// Split a comma-separated variable into trimmed, non-empty entries.
#[must_use]
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Discover and load configuration with precedence: CLI > env > file > defaults
    ///
    /// Uses the current working directory for config file discovery when no
    /// explicit path is given in `cli_args`.
    pub fn discover(cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let start_dir = env::current_dir().map_err(|e| ConfigError::DiscoveryFailed {
            reason: format!("Failed to get current directory: {e}"),
        })?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover configuration starting from a specific directory, reading the
    /// process environment.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self, ConfigError> {
        Self::discover_with_env(start_dir, cli_args, |name| env::var(name).ok())
    }

    /// Path- and environment-driven variant used by tests to avoid
    /// process-global state.
    pub fn discover_with_env<F>(
        start_dir: &Path,
        cli_args: &CliArgs,
        env_lookup: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        let attribution = &mut config.source_attribution;

        let config_path = match &cli_args.config_path {
            Some(explicit) => {
                if !explicit.exists() {
                    return Err(ConfigError::NotFound {
                        path: explicit.display().to_string(),
                    });
                }
                Some(explicit.clone())
            }
            None => Self::discover_config_file_from(start_dir)?,
        };

        if let Some(path) = &config_path {
            let file = Self::load_config_file(path)?;
            let src = ConfigSource::Config;

            if let Some(llm) = file.llm {
                apply(&mut config.llm.base_url, llm.base_url, "llm.base_url", src, attribution);
                apply(
                    &mut config.llm.api_keys_env,
                    llm.api_keys_env,
                    "llm.api_keys_env",
                    src,
                    attribution,
                );
                apply(
                    &mut config.llm.models_env,
                    llm.models_env,
                    "llm.models_env",
                    src,
                    attribution,
                );
                apply(&mut config.llm.models, llm.models, "llm.models", src, attribution);
                apply(
                    &mut config.llm.max_tokens,
                    llm.max_tokens,
                    "llm.max_tokens",
                    src,
                    attribution,
                );
                apply(
                    &mut config.llm.temperature,
                    llm.temperature,
                    "llm.temperature",
                    src,
                    attribution,
                );
                apply(
                    &mut config.llm.timeout_secs,
                    llm.timeout_secs,
                    "llm.timeout_secs",
                    src,
                    attribution,
                );
            }

            if let Some(recovery) = file.recovery {
                let r = &mut config.recovery;
                apply(
                    &mut r.max_attempts,
                    recovery.max_attempts,
                    "recovery.max_attempts",
                    src,
                    attribution,
                );
                apply(
                    &mut r.daily_quota_pause_secs,
                    recovery.daily_quota_pause_secs,
                    "recovery.daily_quota_pause_secs",
                    src,
                    attribution,
                );
                apply(
                    &mut r.rate_limit_pause_secs,
                    recovery.rate_limit_pause_secs,
                    "recovery.rate_limit_pause_secs",
                    src,
                    attribution,
                );
                apply(
                    &mut r.transient_base_delay_secs,
                    recovery.transient_base_delay_secs,
                    "recovery.transient_base_delay_secs",
                    src,
                    attribution,
                );
                apply(
                    &mut r.transient_max_delay_secs,
                    recovery.transient_max_delay_secs,
                    "recovery.transient_max_delay_secs",
                    src,
                    attribution,
                );
                apply(
                    &mut r.unknown_pause_secs,
                    recovery.unknown_pause_secs,
                    "recovery.unknown_pause_secs",
                    src,
                    attribution,
                );
            }

            if let Some(pipeline) = file.pipeline {
                let p = &mut config.pipeline;
                apply(
                    &mut p.target_resolved,
                    pipeline.target_resolved,
                    "pipeline.target_resolved",
                    src,
                    attribution,
                );
                apply(
                    &mut p.case_retries,
                    pipeline.case_retries,
                    "pipeline.case_retries",
                    src,
                    attribution,
                );
                apply(
                    &mut p.invalid_output_retries,
                    pipeline.invalid_output_retries,
                    "pipeline.invalid_output_retries",
                    src,
                    attribution,
                );
                apply(
                    &mut p.closing_history_limit,
                    pipeline.closing_history_limit,
                    "pipeline.closing_history_limit",
                    src,
                    attribution,
                );
                apply(
                    &mut p.sections,
                    pipeline.sections,
                    "pipeline.sections",
                    src,
                    attribution,
                );
                // Relative catalog paths are resolved against the project root
                // (the directory holding `.moot/`).
                let sections_file = pipeline
                    .sections_file
                    .map(|f| Some(resolve_relative(path, &f)));
                apply(
                    &mut p.sections_file,
                    sections_file,
                    "pipeline.sections_file",
                    src,
                    attribution,
                );
            }

            if let Some(store) = file.store {
                let state_dir = store.state_dir.map(|d| resolve_relative(path, &d));
                apply(
                    &mut config.store.state_dir,
                    state_dir,
                    "store.state_dir",
                    src,
                    attribution,
                );
                apply(
                    &mut config.store.lock_ttl_secs,
                    store.lock_ttl_secs,
                    "store.lock_ttl_secs",
                    src,
                    attribution,
                );
            }

            config.config_path = Some(path.clone());
        }

        // Environment overrides the file.
        let home = env_lookup(MOOT_HOME_ENV)
            .filter(|v| !v.trim().is_empty())
            .map(Utf8PathBuf::from);
        apply(
            &mut config.store.state_dir,
            home,
            "store.state_dir",
            ConfigSource::Env,
            attribution,
        );

        let env_models = env_lookup(&config.llm.models_env)
            .map(|raw| split_list(&raw))
            .filter(|models| !models.is_empty());
        apply(
            &mut config.llm.models,
            env_models,
            "llm.models",
            ConfigSource::Env,
            attribution,
        );

        // CLI flags override everything.
        let cli = ConfigSource::Cli;
        apply(
            &mut config.store.state_dir,
            cli_args.state_dir.as_deref().map(Utf8PathBuf::from),
            "store.state_dir",
            cli,
            attribution,
        );
        apply(
            &mut config.llm.models,
            cli_args.models.clone().filter(|m| !m.is_empty()),
            "llm.models",
            cli,
            attribution,
        );
        apply(
            &mut config.recovery.max_attempts,
            cli_args.max_attempts,
            "recovery.max_attempts",
            cli,
            attribution,
        );
        apply(
            &mut config.pipeline.target_resolved,
            cli_args.target_resolved,
            "pipeline.target_resolved",
            cli,
            attribution,
        );
        apply(
            &mut config.pipeline.case_retries,
            cli_args.case_retries,
            "pipeline.case_retries",
            cli,
            attribution,
        );
        apply(
            &mut config.pipeline.sections_file,
            cli_args
                .sections_file
                .as_deref()
                .map(|f| Some(Utf8PathBuf::from(f))),
            "pipeline.sections_file",
            cli,
            attribution,
        );

        config.validate()?;
        Ok(config)
    }

    /// Walk up from `start_dir` looking for `.moot/config.toml`, stopping at
    /// repository root markers (`.git`, `.hg`, `.svn`) or the filesystem root.
    pub fn discover_config_file_from(start_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
        let mut current_dir = start_dir.to_path_buf();

        loop {
            let config_path = current_dir.join(".moot").join("config.toml");
            if config_path.is_file() {
                return Ok(Some(config_path));
            }

            if current_dir.join(".git").exists()
                || current_dir.join(".hg").exists()
                || current_dir.join(".svn").exists()
            {
                break;
            }

            match current_dir.parent() {
                Some(parent) => current_dir = parent.to_path_buf(),
                None => break,
            }
        }

        Ok(None)
    }

    fn load_config_file(path: &Path) -> Result<TomlConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::DiscoveryFailed {
            reason: format!("Failed to read config file {}: {e}", path.display()),
        })?;
        toml::from_str(&content).map_err(|e| {
            ConfigError::InvalidFile(format!("{}: {e}", path.display()))
        })
    }
}

/// Resolve `value` relative to the project root of `config_path`
/// (`<root>/.moot/config.toml`). Absolute values are kept as-is.
fn resolve_relative(config_path: &Path, value: &str) -> Utf8PathBuf {
    let candidate = Utf8PathBuf::from(value);
    if candidate.is_absolute() {
        return candidate;
    }
    let root = config_path
        .parent()
        .and_then(Path::parent)
        .and_then(|p| Utf8PathBuf::from_path_buf(p.to_path_buf()).ok());
    match root {
        Some(root) if !root.as_str().is_empty() => root.join(candidate),
        _ => candidate,
    }
}
