//! Scripted backend for tests.
//!
//! Queued results are returned in order. Once the queue is empty the
//! responder (if any) answers; otherwise the call fails with
//! `LlmError::Misconfiguration`.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::types::{LlmBackend, LlmInvocation, LlmResult};
use moot_utils::error::LlmError;

type Responder = Box<dyn Fn(&LlmInvocation) -> Result<String, LlmError> + Send + Sync>;

/// One recorded call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub model: String,
    pub api_key: String,
    pub prompt: String,
}

#[derive(Default)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    responder: Option<Responder>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call with `text` once the queue is empty.
    #[must_use]
    pub fn always(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::with_responder(move |_| Ok(text.clone()))
    }

    #[must_use]
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&LlmInvocation) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        Self {
            responder: Some(Box::new(responder)),
            ..Self::default()
        }
    }

    pub fn push_ok(&self, text: impl Into<String>) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Ok(text.into()));
    }

    pub fn push_err(&self, err: LlmError) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Err(err));
    }

    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                model: inv.model.clone(),
                api_key: inv.api_key.expose().to_string(),
                prompt: inv.prompt_text(),
            });

        let scripted = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        let outcome = match scripted {
            Some(outcome) => outcome,
            None => match &self.responder {
                Some(responder) => responder(&inv),
                None => Err(LlmError::Misconfiguration(
                    "scripted backend has no response left".to_string(),
                )),
            },
        };

        outcome.map(|text| LlmResult::new(text, "scripted", inv.model))
    }
}
