//! Generation collaborator for moot
//!
//! The [`LlmBackend`] trait is the black-box `generate` call. Around it sit
//! the [`CredentialPool`] (model and key rotation) and the
//! [`RecoveryClassifier`] (classification, rotation, backoff).

mod classify;
mod credential_pool;
mod http_client;
mod openai_backend;
mod recovery;
mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use classify::{ErrorClass, mentions_daily_ceiling};
pub use credential_pool::{
    ApiKey, Credential, CredentialPool, ModelUsage, RotationStats, SharedPool, lock_pool,
};
pub use openai_backend::OpenAiCompatibleBackend;
pub use recovery::{Generation, RecoveryAction, RecoveryClassifier, RecoveryError, RecoveryPolicy};
pub use types::{InvocationParams, LlmBackend, LlmInvocation, LlmResult, Message, Role};

pub use moot_utils::error::{LlmError, PoolExhausted};
