//! Mapping from generation failures to recovery classes.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use moot_utils::error::LlmError;

/// Per-day ceilings as providers phrase them ("tokens per day (TPD)", "RPD")
static DAILY_CEILING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(per[ _-]day|\btpd\b|\brpd\b|\bdaily\b)").unwrap()
});

static RATE_LIMIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(rate[ _-]?limit|too many requests|\b429\b|quota)").unwrap()
});

static TRANSIENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(\b50[234]\b|over capacity|overloaded|temporarily unavailable|service unavailable|timed out|timeout)",
    )
    .unwrap()
});

/// Whether a provider message describes a per-day token or request ceiling.
#[must_use]
pub fn mentions_daily_ceiling(message: &str) -> bool {
    DAILY_CEILING.is_match(message)
}

/// Recovery class of a failed generation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Per-day ceiling for the current model; move to another model
    DailyQuotaExhausted,
    /// Short-term rate limit; move to another key
    ShortTermRateLimit,
    /// Upstream overloaded; retry the same credential after a backoff
    TransientCapacity,
    /// Anything else; move to another key
    Unknown,
}

impl ErrorClass {
    /// Classify a structured backend error. Opaque transport failures fall
    /// back to [`ErrorClass::from_message`].
    #[must_use]
    pub fn classify(err: &LlmError) -> Self {
        match err {
            LlmError::DailyQuota(_) => Self::DailyQuotaExhausted,
            LlmError::ProviderQuota(msg) if mentions_daily_ceiling(msg) => {
                Self::DailyQuotaExhausted
            }
            LlmError::ProviderQuota(_) => Self::ShortTermRateLimit,
            LlmError::ProviderOutage(_) | LlmError::Timeout { .. } => Self::TransientCapacity,
            LlmError::Transport(msg) => Self::from_message(msg),
            LlmError::ProviderAuth(_)
            | LlmError::Misconfiguration(_)
            | LlmError::InvalidResponse(_) => Self::Unknown,
        }
    }

    /// Substring classification for errors that only carry a message.
    #[must_use]
    pub fn from_message(message: &str) -> Self {
        let rate_limited = RATE_LIMIT.is_match(message);
        if rate_limited && mentions_daily_ceiling(message) {
            Self::DailyQuotaExhausted
        } else if rate_limited {
            Self::ShortTermRateLimit
        } else if TRANSIENT.is_match(message) {
            Self::TransientCapacity
        } else {
            Self::Unknown
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DailyQuotaExhausted => "daily-quota",
            Self::ShortTermRateLimit => "rate-limit",
            Self::TransientCapacity => "transient",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
