//! Shared HTTP client for the chat-completions backend
//!
//! One `reqwest::Client` per backend, configured once. Each call makes a
//! single attempt and maps the outcome to a structured [`LlmError`]; retries
//! are the recovery classifier's job.

use reqwest::{Client, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::classify::mentions_daily_ceiling;
use moot_utils::error::LlmError;
use moot_utils::redaction::redact_secrets;

/// Upper bound on any single request
const DEFAULT_MAX_HTTP_TIMEOUT: Duration = Duration::from_secs(300);

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest error body excerpt carried into an error message
const MAX_ERROR_BODY_CHARS: usize = 500;

#[derive(Clone)]
pub(crate) struct HttpClient {
    client: Arc<Client>,
    max_timeout: Duration,
}

impl HttpClient {
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the client cannot be constructed
    pub fn new() -> Result<Self, LlmError> {
        Self::with_max_timeout(DEFAULT_MAX_HTTP_TIMEOUT)
    }

    pub fn with_max_timeout(max_timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .use_rustls_tls()
            .build()
            .map_err(|e| LlmError::Misconfiguration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client: Arc::new(client),
            max_timeout,
        })
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Execute one request with timeout `min(request_timeout, max_timeout)`.
    ///
    /// # Errors
    ///
    /// - `ProviderAuth` for 401/403
    /// - `DailyQuota` for 429 whose body names a per-day ceiling
    /// - `ProviderQuota` for any other 429
    /// - `ProviderOutage` for 5xx
    /// - `Timeout` when the request times out
    /// - `Transport` for network errors and other statuses
    pub async fn execute(
        &self,
        request_builder: reqwest::RequestBuilder,
        request_timeout: Duration,
        provider_name: &str,
    ) -> Result<Response, LlmError> {
        let effective_timeout = request_timeout.min(self.max_timeout);

        let request = request_builder
            .timeout(effective_timeout)
            .build()
            .map_err(|e| LlmError::Transport(format!("Failed to build request: {e}")))?;

        debug!(
            provider = provider_name,
            timeout_secs = effective_timeout.as_secs(),
            "Executing HTTP request"
        );

        match self.client.execute(request).await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }
                let body = response.text().await.unwrap_or_default();
                Err(map_error_status(status, &body, provider_name))
            }
            Err(e) if e.is_timeout() => Err(LlmError::Timeout {
                duration: effective_timeout,
            }),
            Err(e) => Err(LlmError::Transport(format!(
                "{provider_name} request failed: {}",
                redact_secrets(&e.to_string())
            ))),
        }
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    let cut: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
    redact_secrets(&cut)
}

/// Map a non-success status (and its body) to an `LlmError` kind.
pub(crate) fn map_error_status(status: StatusCode, body: &str, provider_name: &str) -> LlmError {
    let detail = excerpt(body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::ProviderAuth(format!(
            "{provider_name} authentication failed: {status} {detail}"
        )),
        StatusCode::TOO_MANY_REQUESTS if mentions_daily_ceiling(body) => LlmError::DailyQuota(
            format!("{provider_name} daily limit reached: {status} {detail}"),
        ),
        StatusCode::TOO_MANY_REQUESTS => LlmError::ProviderQuota(format!(
            "{provider_name} rate limit exceeded: {status} {detail}"
        )),
        s if s.is_server_error() => {
            LlmError::ProviderOutage(format!("{provider_name} returned server error: {status} {detail}"))
        }
        _ => LlmError::Transport(format!(
            "{provider_name} returned client error: {status} {detail}"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_client_construction() {
        let client = HttpClient::with_max_timeout(Duration::from_secs(60)).unwrap();
        assert_eq!(client.max_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_map_auth_statuses() {
        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            match map_error_status(status, "", "groq") {
                LlmError::ProviderAuth(msg) => assert!(msg.contains("groq")),
                other => panic!("expected ProviderAuth, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_map_429_daily_versus_short_term() {
        let daily = map_error_status(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"message":"Rate limit reached on tokens per day (TPD)"}}"#,
            "groq",
        );
        assert!(matches!(daily, LlmError::DailyQuota(_)));

        let short = map_error_status(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"message":"Rate limit reached on requests per minute (RPM)"}}"#,
            "groq",
        );
        assert!(matches!(short, LlmError::ProviderQuota(_)));
    }

    #[test]
    fn test_map_server_and_other_errors() {
        assert!(matches!(
            map_error_status(StatusCode::SERVICE_UNAVAILABLE, "over capacity", "groq"),
            LlmError::ProviderOutage(_)
        ));
        assert!(matches!(
            map_error_status(StatusCode::BAD_REQUEST, "bad", "groq"),
            LlmError::Transport(_)
        ));
    }

    #[test]
    fn test_error_body_is_redacted() {
        let err = map_error_status(
            StatusCode::UNAUTHORIZED,
            "Invalid API Key gsk_0123456789abcdefghijklmn",
            "groq",
        );
        assert!(!err.to_string().contains("gsk_0123456789"));
    }
}
