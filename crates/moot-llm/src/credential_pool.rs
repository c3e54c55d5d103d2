//! Rotation state over (model, key) pairs.
//!
//! Keys are tracked per model: a key that hit a limit on one model stays
//! usable for every other model. A model whose keys are all used up is
//! removed for the lifetime of the pool, and only [`CredentialPool::reset`]
//! brings it back. Rotation follows insertion order.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

use moot_utils::error::{LlmError, PoolExhausted};
use moot_utils::redaction::key_prefix;

/// An API key. `Debug` and `Display` only ever show its 8-character prefix.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ApiKey(String);

impl ApiKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The full secret, for building the `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn prefix(&self) -> String {
        key_prefix(&self.0)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({}...)", self.prefix())
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}...", self.prefix())
    }
}

/// The active (model, key) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub model: String,
    pub key: ApiKey,
}

/// Per-model rotation counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModelUsage {
    pub total_keys: usize,
    pub keys_used: usize,
    pub rotations: u64,
}

/// Snapshot of the pool for status output and exhaustion reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RotationStats {
    pub total_keys: usize,
    pub keys_remaining: usize,
    pub total_models: usize,
    pub models_remaining: usize,
    pub rotation_count: u64,
    pub current_model: String,
    pub current_key_prefix: Option<String>,
    pub model_key_usage: BTreeMap<String, ModelUsage>,
}

/// Rotation state over an ordered set of models and an ordered set of keys.
///
/// Invariant: unless the pool is exhausted, the current key is a member of
/// the current model's usable-key subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPool {
    models: Vec<String>,
    keys: Vec<ApiKey>,
    /// Models not yet removed, by index into `models`
    model_usable: Vec<bool>,
    /// Usable key indices per model; `None` until the model is first visited
    usable_keys: Vec<Option<Vec<usize>>>,
    current_model: usize,
    current_key: usize,
    rotation_count: u64,
    usage: Vec<ModelUsage>,
    exhausted: bool,
}

/// Pool shared between the classifier and administrative commands.
///
/// The mutex is only held around single pool operations, never across an
/// `.await`.
pub type SharedPool = Arc<Mutex<CredentialPool>>;

/// Lock a shared pool. A poisoned lock still holds consistent state since
/// every pool operation completes before it can panic.
pub fn lock_pool(pool: &SharedPool) -> MutexGuard<'_, CredentialPool> {
    pool.lock().unwrap_or_else(PoisonError::into_inner)
}

fn dedup_preserving_order(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        let value = value.trim().to_string();
        if !value.is_empty() && !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

impl CredentialPool {
    /// Build a pool. Duplicate and blank entries are dropped; insertion order
    /// is kept.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` when no model or no key remains.
    pub fn new<M, K>(models: M, keys: K) -> Result<Self, LlmError>
    where
        M: IntoIterator,
        M::Item: Into<String>,
        K: IntoIterator,
        K::Item: Into<String>,
    {
        let models = dedup_preserving_order(models.into_iter().map(Into::into));
        let keys: Vec<ApiKey> = dedup_preserving_order(keys.into_iter().map(Into::into))
            .into_iter()
            .map(ApiKey::new)
            .collect();

        if models.is_empty() {
            return Err(LlmError::Misconfiguration(
                "credential pool needs at least one model".to_string(),
            ));
        }
        if keys.is_empty() {
            return Err(LlmError::Misconfiguration(
                "credential pool needs at least one API key".to_string(),
            ));
        }

        Ok(Self::fresh(models, keys))
    }

    fn fresh(models: Vec<String>, keys: Vec<ApiKey>) -> Self {
        let model_count = models.len();
        let key_count = keys.len();
        let mut usable_keys = vec![None; model_count];
        usable_keys[0] = Some((0..key_count).collect());

        Self {
            model_usable: vec![true; model_count],
            usable_keys,
            current_model: 0,
            current_key: 0,
            rotation_count: 0,
            usage: vec![
                ModelUsage {
                    total_keys: key_count,
                    ..ModelUsage::default()
                };
                model_count
            ],
            exhausted: false,
            models,
            keys,
        }
    }

    /// Wrap the pool for sharing.
    #[must_use]
    pub fn shared(self) -> SharedPool {
        Arc::new(Mutex::new(self))
    }

    /// The active pair.
    ///
    /// # Errors
    ///
    /// Fails only once every model has been removed.
    pub fn current(&self) -> Result<Credential, PoolExhausted> {
        if self.exhausted {
            return Err(self.exhausted_error());
        }
        Ok(Credential {
            model: self.models[self.current_model].clone(),
            key: self.keys[self.current_key].clone(),
        })
    }

    /// Retire the current key for the current model and move to the next
    /// usable key. Falls through to [`rotate_model`](Self::rotate_model)
    /// when the model has no keys left.
    pub fn rotate_key(&mut self) -> Result<ApiKey, PoolExhausted> {
        if self.exhausted {
            return Err(self.exhausted_error());
        }

        self.rotation_count += 1;
        let model = self.current_model;
        let exhausted_key = self.current_key;
        let key_count = self.keys.len();

        let subset = self.usable_keys[model].get_or_insert_with(|| (0..key_count).collect());
        subset.retain(|&k| k != exhausted_key);
        let next = subset
            .iter()
            .copied()
            .find(|&k| k > exhausted_key)
            .or_else(|| subset.first().copied());
        let remaining = subset.len();

        let usage = &mut self.usage[model];
        usage.keys_used += 1;
        usage.rotations += 1;

        match next {
            Some(next) => {
                self.current_key = next;
                info!(
                    model = %self.models[model],
                    from = %self.keys[exhausted_key],
                    to = %self.keys[next],
                    keys_remaining = remaining,
                    rotation = self.rotation_count,
                    "Rotated API key"
                );
                Ok(self.keys[next].clone())
            }
            None => {
                warn!(
                    model = %self.models[model],
                    rotation = self.rotation_count,
                    "All API keys exhausted for model; rotating model"
                );
                self.rotate_model()?;
                Ok(self.keys[self.current_key].clone())
            }
        }
    }

    /// Remove the current model for the rest of the pool's lifetime and move
    /// to the next usable model, reusing its tracked keys if it was visited
    /// before.
    ///
    /// # Errors
    ///
    /// Returns [`PoolExhausted`] when no usable model remains. The pool stays
    /// exhausted until [`reset`](Self::reset).
    pub fn rotate_model(&mut self) -> Result<String, PoolExhausted> {
        if self.exhausted {
            return Err(self.exhausted_error());
        }

        self.rotation_count += 1;
        let retired = self.current_model;
        self.model_usable[retired] = false;
        self.usage[retired].keys_used = self.keys.len();

        let count = self.models.len();
        let next = (1..=count)
            .map(|offset| (retired + offset) % count)
            .find(|&m| self.model_usable[m] && self.keys_left_for(m) > 0);

        let Some(next) = next else {
            self.exhausted = true;
            warn!(
                models = ?self.models,
                rotation = self.rotation_count,
                "All models exhausted"
            );
            return Err(self.exhausted_error());
        };

        self.enter_model(next);
        info!(
            from = %self.models[retired],
            to = %self.models[next],
            keys_remaining = self.keys_left_for(next),
            models_remaining = self.models_remaining(),
            rotation = self.rotation_count,
            "Rotated model"
        );
        Ok(self.models[next].clone())
    }

    /// Point the pool at a named, still-usable model. Used to run the same
    /// prompt against each configured model.
    ///
    /// # Errors
    ///
    /// `LlmError::Misconfiguration` for an unknown or already removed model.
    pub fn select_model(&mut self, name: &str) -> Result<(), LlmError> {
        let index = self
            .models
            .iter()
            .position(|m| m == name)
            .ok_or_else(|| LlmError::Misconfiguration(format!("unknown model '{name}'")))?;

        if self.exhausted || !self.model_usable[index] || self.keys_left_for(index) == 0 {
            return Err(LlmError::Misconfiguration(format!(
                "model '{name}' has no usable keys left"
            )));
        }

        self.enter_model(index);
        Ok(())
    }

    fn enter_model(&mut self, model: usize) {
        let key_count = self.keys.len();
        let subset = self.usable_keys[model].get_or_insert_with(|| (0..key_count).collect());
        self.current_key = subset[0];
        self.current_model = model;
    }

    fn keys_left_for(&self, model: usize) -> usize {
        self.usable_keys[model]
            .as_ref()
            .map_or(self.keys.len(), Vec::len)
    }

    fn models_remaining(&self) -> usize {
        self.model_usable.iter().filter(|&&u| u).count()
    }

    fn exhausted_error(&self) -> PoolExhausted {
        PoolExhausted {
            models: self.models.len(),
            rotations: self.rotation_count,
        }
    }

    /// Restore every model and key and zero the counters. Administrative and
    /// test use only.
    pub fn reset(&mut self) {
        let models = std::mem::take(&mut self.models);
        let keys = std::mem::take(&mut self.keys);
        *self = Self::fresh(models, keys);
        info!("Credential pool reset; all models and keys restored");
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    #[must_use]
    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Models that have not been removed, in insertion order.
    #[must_use]
    pub fn usable_models(&self) -> Vec<String> {
        self.models
            .iter()
            .zip(&self.model_usable)
            .filter(|(_, usable)| **usable)
            .map(|(m, _)| m.clone())
            .collect()
    }

    #[must_use]
    pub fn rotation_count(&self) -> u64 {
        self.rotation_count
    }

    #[must_use]
    pub fn stats(&self) -> RotationStats {
        RotationStats {
            total_keys: self.keys.len(),
            keys_remaining: if self.exhausted {
                0
            } else {
                self.keys_left_for(self.current_model)
            },
            total_models: self.models.len(),
            models_remaining: self.models_remaining(),
            rotation_count: self.rotation_count,
            current_model: self.models[self.current_model].clone(),
            current_key_prefix: (!self.exhausted).then(|| self.keys[self.current_key].prefix()),
            model_key_usage: self
                .models
                .iter()
                .cloned()
                .zip(self.usage.iter().cloned())
                .collect(),
        }
    }
}
