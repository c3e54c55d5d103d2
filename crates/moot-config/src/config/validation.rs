use moot_utils::error::ConfigError;

use super::Config;

fn invalid(key: &str, value: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.into(),
    }
}

impl Config {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.base_url.trim().is_empty() {
            return Err(invalid("llm.base_url", "must not be empty"));
        }
        if self.llm.max_tokens == 0 {
            return Err(invalid("llm.max_tokens", "must be greater than 0"));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(invalid(
                "llm.temperature",
                format!("{} is outside 0.0..=2.0", self.llm.temperature),
            ));
        }
        if self.llm.timeout_secs == 0 {
            return Err(invalid("llm.timeout_secs", "must be greater than 0"));
        }
        if self.llm.models.iter().any(|m| m.trim().is_empty()) {
            return Err(invalid("llm.models", "model names must not be empty"));
        }

        if self.recovery.max_attempts == 0 {
            return Err(invalid("recovery.max_attempts", "must be greater than 0"));
        }
        if self.recovery.max_attempts > 50 {
            return Err(invalid(
                "recovery.max_attempts",
                "exceeds maximum limit of 50",
            ));
        }
        if self.recovery.transient_max_delay_secs < self.recovery.transient_base_delay_secs {
            return Err(invalid(
                "recovery.transient_max_delay_secs",
                "must not be smaller than recovery.transient_base_delay_secs",
            ));
        }

        if self.pipeline.target_resolved == 0 {
            return Err(invalid("pipeline.target_resolved", "must be greater than 0"));
        }
        if self.pipeline.closing_history_limit < 1000 {
            return Err(invalid(
                "pipeline.closing_history_limit",
                "must be at least 1000 characters",
            ));
        }

        if self.store.state_dir.as_str().trim().is_empty() {
            return Err(invalid("store.state_dir", "must not be empty"));
        }

        Ok(())
    }
}
