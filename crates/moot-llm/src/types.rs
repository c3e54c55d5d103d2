//! Core types for the generation collaborator

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::credential_pool::ApiKey;
use moot_utils::error::LlmError;

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// Sampling parameters shared by every call of a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvocationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for InvocationParams {
    fn default() -> Self {
        Self {
            max_tokens: 2048,
            temperature: 0.1,
            timeout: Duration::from_secs(120),
        }
    }
}

impl From<&moot_config::LlmSettings> for InvocationParams {
    fn from(settings: &moot_config::LlmSettings) -> Self {
        Self {
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }
}

/// Input to one backend call
#[derive(Debug, Clone)]
pub struct LlmInvocation {
    /// Model to use for this invocation
    pub model: String,
    /// Credential for this invocation
    pub api_key: ApiKey,
    /// Ordered list of messages in the conversation
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl LlmInvocation {
    #[must_use]
    pub fn new(
        model: impl Into<String>,
        api_key: ApiKey,
        messages: Vec<Message>,
        params: InvocationParams,
    ) -> Self {
        Self {
            model: model.into(),
            api_key,
            messages,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            timeout: params.timeout,
        }
    }

    /// All message contents joined, mainly for assertions in tests.
    #[must_use]
    pub fn prompt_text(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Result from a backend call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResult {
    /// Raw response text, before any cleanup
    pub raw_response: String,
    /// Provider name (e.g. "groq")
    pub provider: String,
    /// Model that was actually used
    pub model_used: String,
    pub tokens_input: Option<u64>,
    pub tokens_output: Option<u64>,
}

impl LlmResult {
    #[must_use]
    pub fn new(
        raw_response: impl Into<String>,
        provider: impl Into<String>,
        model_used: impl Into<String>,
    ) -> Self {
        Self {
            raw_response: raw_response.into(),
            provider: provider.into(),
            model_used: model_used.into(),
            tokens_input: None,
            tokens_output: None,
        }
    }

    #[must_use]
    pub fn with_tokens(mut self, input: u64, output: u64) -> Self {
        self.tokens_input = Some(input);
        self.tokens_output = Some(output);
        self
    }
}

/// The generation collaborator.
///
/// A backend makes exactly one attempt per call and reports failures as
/// structured [`LlmError`] kinds; retries and credential rotation belong to
/// the [`RecoveryClassifier`](crate::RecoveryClassifier).
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// # Errors
    ///
    /// Returns `LlmError` for transport failures, provider errors (auth,
    /// quota, outages), timeouts, and unusable responses.
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError>;
}
