use camino::Utf8PathBuf;

use moot_utils::error::ConfigError;

use super::{Config, ConfigSource};

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// No environment variables or config files are consulted.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use moot_config::Config;
    ///
    /// let config = Config::builder()
    ///     .state_dir("/tmp/moot-state")
    ///     .models(["llama-3.3-70b-versatile"])
    ///     .target_resolved(5)
    ///     .build()
    ///     .expect("Failed to build config");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for [`Config`].
///
/// All values set via the builder are attributed to
/// `ConfigSource::Programmatic`.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    state_dir: Option<Utf8PathBuf>,
    base_url: Option<String>,
    api_keys_env: Option<String>,
    models: Option<Vec<String>>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    max_attempts: Option<u32>,
    no_pauses: bool,
    target_resolved: Option<usize>,
    case_retries: Option<u32>,
    invalid_output_retries: Option<u32>,
    sections: Option<Vec<String>>,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state_dir(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.state_dir = Some(path.into());
        self
    }

    /// Chat completions endpoint. Mostly useful for pointing at a mock server.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn api_keys_env(mut self, var: impl Into<String>) -> Self {
        self.api_keys_env = Some(var.into());
        self
    }

    #[must_use]
    pub fn models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = Some(models.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Zero every recovery pause. Intended for tests.
    #[must_use]
    pub fn no_pauses(mut self) -> Self {
        self.no_pauses = true;
        self
    }

    #[must_use]
    pub fn target_resolved(mut self, target: usize) -> Self {
        self.target_resolved = Some(target);
        self
    }

    #[must_use]
    pub fn case_retries(mut self, retries: u32) -> Self {
        self.case_retries = Some(retries);
        self
    }

    #[must_use]
    pub fn invalid_output_retries(mut self, retries: u32) -> Self {
        self.invalid_output_retries = Some(retries);
        self
    }

    #[must_use]
    pub fn sections<I, S>(mut self, sections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sections = Some(sections.into_iter().map(Into::into).collect());
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<Config, ConfigError> {
        let mut config = Config::default();
        let attribution = &mut config.source_attribution;
        let src = ConfigSource::Programmatic;

        macro_rules! set {
            ($field:expr, $value:expr, $key:literal) => {
                if let Some(v) = $value {
                    $field = v;
                    attribution.insert($key.to_string(), src);
                }
            };
        }

        set!(config.store.state_dir, self.state_dir, "store.state_dir");
        set!(config.llm.base_url, self.base_url, "llm.base_url");
        set!(config.llm.api_keys_env, self.api_keys_env, "llm.api_keys_env");
        set!(config.llm.models, self.models, "llm.models");
        set!(config.llm.max_tokens, self.max_tokens, "llm.max_tokens");
        set!(config.llm.temperature, self.temperature, "llm.temperature");
        set!(
            config.recovery.max_attempts,
            self.max_attempts,
            "recovery.max_attempts"
        );
        set!(
            config.pipeline.target_resolved,
            self.target_resolved,
            "pipeline.target_resolved"
        );
        set!(
            config.pipeline.case_retries,
            self.case_retries,
            "pipeline.case_retries"
        );
        set!(
            config.pipeline.invalid_output_retries,
            self.invalid_output_retries,
            "pipeline.invalid_output_retries"
        );
        set!(config.pipeline.sections, self.sections, "pipeline.sections");

        if self.no_pauses {
            let r = &mut config.recovery;
            r.daily_quota_pause_secs = 0;
            r.rate_limit_pause_secs = 0;
            r.transient_base_delay_secs = 0;
            r.transient_max_delay_secs = 0;
            r.unknown_pause_secs = 0;
            for key in [
                "recovery.daily_quota_pause_secs",
                "recovery.rate_limit_pause_secs",
                "recovery.transient_base_delay_secs",
                "recovery.transient_max_delay_secs",
                "recovery.unknown_pause_secs",
            ] {
                attribution.insert(key.to_string(), src);
            }
        }

        config.validate()?;
        Ok(config)
    }
}
