use std::collections::BTreeMap;

use super::{Config, ConfigSource};

fn source_label(source: Option<&ConfigSource>) -> &'static str {
    match source {
        Some(ConfigSource::Cli) => "cli",
        Some(ConfigSource::Config) => "config",
        Some(ConfigSource::Env) => "env",
        Some(ConfigSource::Programmatic) => "programmatic",
        Some(ConfigSource::Default) | None => "default",
    }
}

impl Config {
    /// Effective configuration as `key -> (value, source)`, sorted by key.
    ///
    /// Credentials are never included; only the names of the variables that
    /// hold them.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut out = BTreeMap::new();
        let mut add = |key: &str, value: String| {
            let source = source_label(self.source_attribution.get(key)).to_string();
            out.insert(key.to_string(), (value, source));
        };

        add("llm.base_url", self.llm.base_url.clone());
        add("llm.api_keys_env", self.llm.api_keys_env.clone());
        add("llm.models_env", self.llm.models_env.clone());
        add("llm.models", self.llm.models.join(", "));
        add("llm.max_tokens", self.llm.max_tokens.to_string());
        add("llm.temperature", self.llm.temperature.to_string());
        add("llm.timeout_secs", self.llm.timeout_secs.to_string());

        let r = &self.recovery;
        add("recovery.max_attempts", r.max_attempts.to_string());
        add(
            "recovery.daily_quota_pause_secs",
            r.daily_quota_pause_secs.to_string(),
        );
        add(
            "recovery.rate_limit_pause_secs",
            r.rate_limit_pause_secs.to_string(),
        );
        add(
            "recovery.transient_base_delay_secs",
            r.transient_base_delay_secs.to_string(),
        );
        add(
            "recovery.transient_max_delay_secs",
            r.transient_max_delay_secs.to_string(),
        );
        add("recovery.unknown_pause_secs", r.unknown_pause_secs.to_string());

        let p = &self.pipeline;
        add("pipeline.target_resolved", p.target_resolved.to_string());
        add("pipeline.case_retries", p.case_retries.to_string());
        add(
            "pipeline.invalid_output_retries",
            p.invalid_output_retries.to_string(),
        );
        add(
            "pipeline.closing_history_limit",
            p.closing_history_limit.to_string(),
        );
        add("pipeline.sections", p.sections.join(", "));
        add(
            "pipeline.sections_file",
            p.sections_file
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        );

        add("store.state_dir", self.store.state_dir.to_string());
        add("store.lock_ttl_secs", self.store.lock_ttl_secs.to_string());

        out
    }
}
