//! Bounded retry around the generation collaborator.
//!
//! Each failed attempt is classified, the matching rotation is applied to the
//! shared [`CredentialPool`](crate::CredentialPool), the policy's pause is
//! awaited, and the same messages are sent again with whatever credential is
//! current by then.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::classify::ErrorClass;
use crate::credential_pool::{Credential, SharedPool, lock_pool};
use crate::types::{InvocationParams, LlmBackend, LlmInvocation, Message};
use moot_config::RecoverySettings;
use moot_utils::error::{LlmError, PoolExhausted};

/// What the classifier does to the pool before the next attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    RotateModel,
    RotateKey,
    SameCredential,
}

impl ErrorClass {
    #[must_use]
    pub fn action(self) -> RecoveryAction {
        match self {
            Self::DailyQuotaExhausted => RecoveryAction::RotateModel,
            Self::ShortTermRateLimit | Self::Unknown => RecoveryAction::RotateKey,
            Self::TransientCapacity => RecoveryAction::SameCredential,
        }
    }
}

/// Attempt bound and per-class pauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryPolicy {
    pub max_attempts: u32,
    pub daily_quota_pause: Duration,
    pub rate_limit_pause: Duration,
    pub transient_base_delay: Duration,
    pub transient_max_delay: Duration,
    pub unknown_pause: Duration,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self::from(&RecoverySettings::default())
    }
}

impl From<&RecoverySettings> for RecoveryPolicy {
    fn from(settings: &RecoverySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            daily_quota_pause: Duration::from_secs(settings.daily_quota_pause_secs),
            rate_limit_pause: Duration::from_secs(settings.rate_limit_pause_secs),
            transient_base_delay: Duration::from_secs(settings.transient_base_delay_secs),
            transient_max_delay: Duration::from_secs(settings.transient_max_delay_secs),
            unknown_pause: Duration::from_secs(settings.unknown_pause_secs),
        }
    }
}

impl RecoveryPolicy {
    /// Same attempt bound as the default, no pauses at all.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            max_attempts: RecoverySettings::default().max_attempts,
            daily_quota_pause: Duration::ZERO,
            rate_limit_pause: Duration::ZERO,
            transient_base_delay: Duration::ZERO,
            transient_max_delay: Duration::ZERO,
            unknown_pause: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// `base * 2^(attempt - 1)`, capped at `transient_max_delay`.
    #[must_use]
    pub fn transient_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.transient_base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.transient_max_delay)
            .min(self.transient_max_delay)
    }

    #[must_use]
    pub fn pause_for(&self, class: ErrorClass, attempt: u32) -> Duration {
        match class {
            ErrorClass::DailyQuotaExhausted => self.daily_quota_pause,
            ErrorClass::ShortTermRateLimit => self.rate_limit_pause,
            ErrorClass::TransientCapacity => self.transient_delay(attempt),
            ErrorClass::Unknown => self.unknown_pause,
        }
    }
}

#[derive(Debug, Error)]
pub enum RecoveryError {
    /// Fatal: no usable credential remains
    #[error(transparent)]
    PoolExhausted(#[from] PoolExhausted),

    #[error("Generation failed after {attempts} attempt(s): {last}")]
    AttemptsExhausted { attempts: u32, last: LlmError },
}

/// Text produced by a successful attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub model: String,
    /// 1-based attempt that succeeded
    pub attempts: u32,
}

/// Wraps the generation collaborator with classification, rotation and
/// backoff.
#[derive(Clone)]
pub struct RecoveryClassifier {
    backend: Arc<dyn LlmBackend>,
    pool: SharedPool,
    policy: RecoveryPolicy,
    params: InvocationParams,
}

impl RecoveryClassifier {
    #[must_use]
    pub fn new(
        backend: Arc<dyn LlmBackend>,
        pool: SharedPool,
        policy: RecoveryPolicy,
        params: InvocationParams,
    ) -> Self {
        Self {
            backend,
            pool,
            policy,
            params,
        }
    }

    #[must_use]
    pub fn pool(&self) -> &SharedPool {
        &self.pool
    }

    #[must_use]
    pub fn policy(&self) -> &RecoveryPolicy {
        &self.policy
    }

    fn current(&self) -> Result<Credential, PoolExhausted> {
        lock_pool(&self.pool).current()
    }

    fn apply(&self, action: RecoveryAction) -> Result<(), PoolExhausted> {
        let mut pool = lock_pool(&self.pool);
        match action {
            RecoveryAction::RotateModel => pool.rotate_model().map(drop),
            RecoveryAction::RotateKey => pool.rotate_key().map(drop),
            RecoveryAction::SameCredential => Ok(()),
        }
    }

    /// Send `messages` until one attempt succeeds or the attempt bound is
    /// reached.
    ///
    /// # Errors
    ///
    /// - [`RecoveryError::PoolExhausted`] as soon as the pool runs dry; the
    ///   caller must not retry.
    /// - [`RecoveryError::AttemptsExhausted`] with the last backend error.
    pub async fn generate(&self, messages: &[Message]) -> Result<Generation, RecoveryError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = LlmError::Misconfiguration("no attempt was made".to_string());

        for attempt in 1..=max_attempts {
            let credential = self.current()?;
            let invocation = LlmInvocation::new(
                credential.model.clone(),
                credential.key.clone(),
                messages.to_vec(),
                self.params,
            );

            match self.backend.invoke(invocation).await {
                Ok(result) => {
                    debug!(
                        model = %credential.model,
                        key = %credential.key,
                        attempt,
                        "Generation succeeded"
                    );
                    return Ok(Generation {
                        text: result.raw_response,
                        model: credential.model,
                        attempts: attempt,
                    });
                }
                Err(err) => {
                    let class = ErrorClass::classify(&err);
                    let pause = self.policy.pause_for(class, attempt);
                    warn!(
                        model = %credential.model,
                        key = %credential.key,
                        attempt,
                        max_attempts,
                        class = %class,
                        pause_ms = pause.as_millis() as u64,
                        error = %err,
                        "Generation attempt failed"
                    );

                    self.apply(class.action())?;
                    last_error = err;

                    if attempt < max_attempts && !pause.is_zero() {
                        tokio::time::sleep(pause).await;
                    }
                }
            }
        }

        Err(RecoveryError::AttemptsExhausted {
            attempts: max_attempts,
            last: last_error,
        })
    }
}
