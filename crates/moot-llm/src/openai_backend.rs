//! OpenAI-compatible chat completions backend (Groq by default)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http_client::HttpClient;
use crate::types::{LlmBackend, LlmInvocation, LlmResult, Message};
use moot_config::LlmSettings;
use moot_utils::error::LlmError;

/// HTTP backend for any endpoint speaking the OpenAI chat completions
/// protocol. The credential comes with each invocation.
#[derive(Clone)]
pub struct OpenAiCompatibleBackend {
    client: HttpClient,
    base_url: String,
    provider: String,
}

impl OpenAiCompatibleBackend {
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the URL is empty or the HTTP
    /// client cannot be constructed
    pub fn new(base_url: impl Into<String>) -> Result<Self, LlmError> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(LlmError::Misconfiguration(
                "chat completions URL must not be empty".to_string(),
            ));
        }
        let provider = provider_name(&base_url);
        Ok(Self {
            client: HttpClient::new()?,
            base_url,
            provider,
        })
    }

    pub fn from_settings(settings: &LlmSettings) -> Result<Self, LlmError> {
        Self::new(settings.base_url.clone())
    }

    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    fn convert_messages(messages: &[Message]) -> Vec<ChatMessage<'_>> {
        messages
            .iter()
            .map(|msg| ChatMessage {
                role: msg.role.as_str(),
                content: &msg.content,
            })
            .collect()
    }
}

/// Short provider label from the endpoint host ("api.groq.com" -> "groq").
fn provider_name(base_url: &str) -> String {
    let host = base_url
        .split("://")
        .nth(1)
        .unwrap_or(base_url)
        .split(['/', ':'])
        .next()
        .unwrap_or_default();
    if host.parse::<std::net::IpAddr>().is_ok() {
        return "openai-compatible".to_string();
    }
    let labels: Vec<&str> = host.split('.').collect();
    match labels.as_slice() {
        [.., name, _tld] => (*name).to_string(),
        [single] if !single.is_empty() => (*single).to_string(),
        _ => "openai-compatible".to_string(),
    }
}

#[async_trait]
impl LlmBackend for OpenAiCompatibleBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        debug!(
            provider = %self.provider,
            model = %inv.model,
            key = %inv.api_key,
            max_tokens = inv.max_tokens,
            temperature = inv.temperature,
            timeout_secs = inv.timeout.as_secs(),
            "Invoking chat completions backend"
        );

        let body = ChatRequest {
            model: &inv.model,
            messages: Self::convert_messages(&inv.messages),
            max_tokens: inv.max_tokens,
            temperature: inv.temperature,
            stream: false,
        };

        let request = self
            .client
            .inner()
            .post(&self.base_url)
            .bearer_auth(inv.api_key.expose())
            .json(&body);

        let response = self
            .client
            .execute(request, inv.timeout, &self.provider)
            .await?;

        let response_body: ChatResponse = response.json().await.map_err(|e| {
            LlmError::InvalidResponse(format!("Failed to parse {} response: {e}", self.provider))
        })?;

        let content = response_body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                LlmError::InvalidResponse(format!(
                    "{} response missing content in choices[0]",
                    self.provider
                ))
            })?;

        let mut result = LlmResult::new(content, self.provider.clone(), inv.model);
        if let Some(usage) = response_body.usage {
            result = result.with_tokens(usage.prompt_tokens, usage.completion_tokens);
        }

        debug!(
            provider = %self.provider,
            tokens_input = ?result.tokens_input,
            tokens_output = ?result.tokens_output,
            "Chat completion received"
        );

        Ok(result)
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}
