//! Wiring of configuration, backend, credential pool and stores
//!
//! [`MootRuntime`] owns one credential pool for the lifetime of a command so
//! the engine, the scheduler and the verdict generator all rotate the same
//! keys.

use std::sync::Arc;

use moot_config::{Config, Credentials};
use moot_engine::{
    LlmCaseContent, PipelineDriver, SchedulerSettings, SectionScheduler, StageEngine,
    StageSettings, VerdictGenerator,
};
use moot_llm::{
    CredentialPool, InvocationParams, LlmBackend, OpenAiCompatibleBackend, RecoveryClassifier,
    RecoveryPolicy, SharedPool,
};
use moot_store::{CaseStore, JsonCaseStore, VerdictStore};
use moot_utils::error::MootError;

/// Everything a command needs to drive generation against one state directory.
pub struct MootRuntime {
    config: Config,
    cases: Arc<dyn CaseStore>,
    classifier: RecoveryClassifier,
}

impl MootRuntime {
    /// Build the production runtime: credentials from the environment, the
    /// configured HTTP endpoint and the JSON case store under `store.state_dir`.
    ///
    /// # Errors
    ///
    /// Missing credentials, an unusable endpoint, or an unreadable case file.
    pub fn from_config(config: Config) -> Result<Self, MootError> {
        let credentials = config.resolve_credentials()?;
        let backend = OpenAiCompatibleBackend::from_settings(&config.llm)?;
        let cases = JsonCaseStore::open(&config.store.state_dir)?;
        Self::with_parts(config, Arc::new(backend), Arc::new(cases), credentials)
    }

    /// Build a runtime from explicit parts.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` when the credentials hold no
    /// model or no key.
    pub fn with_parts(
        config: Config,
        backend: Arc<dyn LlmBackend>,
        cases: Arc<dyn CaseStore>,
        credentials: Credentials,
    ) -> Result<Self, MootError> {
        let pool = CredentialPool::new(credentials.models, credentials.keys)?.shared();
        let classifier = RecoveryClassifier::new(
            backend,
            pool,
            RecoveryPolicy::from(&config.recovery),
            InvocationParams::from(&config.llm),
        );
        Ok(Self {
            config,
            cases,
            classifier,
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn cases(&self) -> Arc<dyn CaseStore> {
        Arc::clone(&self.cases)
    }

    #[must_use]
    pub fn pool(&self) -> &SharedPool {
        self.classifier.pool()
    }

    #[must_use]
    pub fn stage_engine(&self) -> StageEngine {
        StageEngine::new(
            self.classifier.clone(),
            self.cases(),
            StageSettings::from(&self.config.pipeline),
        )
    }

    #[must_use]
    pub fn scheduler(&self) -> SectionScheduler {
        SectionScheduler::new(
            self.stage_engine(),
            self.cases(),
            Arc::new(LlmCaseContent::new(self.classifier.clone())),
            SchedulerSettings::from(&self.config.pipeline),
        )
    }

    #[must_use]
    pub fn driver(&self) -> PipelineDriver {
        PipelineDriver::new(self.scheduler(), self.cases())
    }

    #[must_use]
    pub fn verdict_generator(&self, verdicts: Arc<dyn VerdictStore>) -> VerdictGenerator {
        VerdictGenerator::new(self.classifier.clone(), self.cases(), verdicts)
    }
}

impl std::fmt::Debug for MootRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MootRuntime")
            .field("state_dir", &self.config.store.state_dir)
            .finish_non_exhaustive()
    }
}
