//! Judgments for resolved cases, one per configured model.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use moot_llm::{RecoveryClassifier, RecoveryError, lock_pool};
use moot_store::{
    CaseId, CaseQuery, CaseRecord, CaseStore, CaseUpdate, VerdictRecord, VerdictStore,
};
use moot_utils::error::{PipelineError, StoreError};
use moot_utils::types::CaseStatus;

use crate::prompts::{self, VerdictContext};
use crate::transcript::Transcript;
use crate::validation::{is_valid_response, strip_think};

const NO_CLOSING: &str = "No closing statement provided";

/// Which cases to judge.
#[derive(Debug, Clone, Default)]
pub struct VerdictRequest {
    /// Only this case
    pub case_id: Option<CaseId>,
    /// At most this many cases
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerdictReport {
    pub cases: usize,
    pub generated: usize,
    pub skipped_existing: usize,
    pub failed: usize,
}

pub struct VerdictGenerator {
    classifier: RecoveryClassifier,
    cases: Arc<dyn CaseStore>,
    verdicts: Arc<dyn VerdictStore>,
}

impl VerdictGenerator {
    #[must_use]
    pub fn new(
        classifier: RecoveryClassifier,
        cases: Arc<dyn CaseStore>,
        verdicts: Arc<dyn VerdictStore>,
    ) -> Self {
        Self {
            classifier,
            cases,
            verdicts,
        }
    }

    /// Resolved cases still missing a verdict from at least one model.
    ///
    /// # Errors
    ///
    /// Store read failures, or `CaseNotFound` for an unknown requested id.
    pub fn pending(&self, request: &VerdictRequest) -> Result<Vec<CaseRecord>, PipelineError> {
        let models = self.models();
        let candidates = match &request.case_id {
            Some(id) => {
                let case = self
                    .cases
                    .find_by_id(id)?
                    .ok_or_else(|| StoreError::CaseNotFound { id: id.to_string() })?;
                if case.status != CaseStatus::Resolved {
                    warn!(case_id = %id, status = %case.status, "Case is not resolved; no verdict");
                    return Ok(Vec::new());
                }
                vec![case]
            }
            None => {
                let resolved = CaseQuery::all().status(CaseStatus::Resolved);
                self.cases
                    .all()?
                    .into_iter()
                    .filter(|c| resolved.matches(c))
                    .collect()
            }
        };

        let mut pending = Vec::new();
        for case in candidates {
            let mut missing = false;
            for model in &models {
                if self.verdicts.find_verdict(&case.id, model)?.is_none() {
                    missing = true;
                    break;
                }
            }
            if missing {
                pending.push(case);
            }
        }

        if let Some(limit) = request.limit {
            pending.truncate(limit);
        }
        Ok(pending)
    }

    /// Generate the missing verdicts for the requested cases.
    ///
    /// # Errors
    ///
    /// [`PipelineError::PoolExhausted`] stops the run; verdicts stored before
    /// it are kept. Store read failures while selecting cases.
    pub async fn run(&self, request: &VerdictRequest) -> Result<VerdictReport, PipelineError> {
        let cases = self.pending(request)?;
        let models = self.models();
        let mut report = VerdictReport {
            cases: cases.len(),
            ..VerdictReport::default()
        };
        if cases.is_empty() {
            info!("No cases need verdicts");
            return Ok(report);
        }
        info!(cases = cases.len(), models = models.len(), "Generating verdicts");

        for case in &cases {
            for model in &models {
                if self.verdicts.find_verdict(&case.id, model)?.is_some() {
                    debug!(case_id = %case.id, model = %model, "Verdict already exists");
                    report.skipped_existing += 1;
                    continue;
                }
                if self.judge(case, model).await? {
                    report.generated += 1;
                } else {
                    report.failed += 1;
                }
            }

            if let Err(err) = self.cases.update_fields(&case.id, CaseUpdate::verdict_generated()) {
                warn!(case_id = %case.id, error = %err, "Could not flag case as judged");
            }
        }

        info!(
            generated = report.generated,
            skipped = report.skipped_existing,
            failed = report.failed,
            "Verdict generation finished"
        );
        Ok(report)
    }

    /// One verdict from `model`. `Ok(false)` when it failed without being
    /// fatal.
    async fn judge(&self, case: &CaseRecord, model: &str) -> Result<bool, PipelineError> {
        if let Err(err) = lock_pool(self.classifier.pool()).select_model(model) {
            warn!(case_id = %case.id, model = %model, error = %err, "Model unavailable for verdict");
            return Ok(false);
        }

        let history =
            Transcript::from_arguments(&case.plaintiff_arguments, &case.defendant_arguments)
                .render();
        let messages = prompts::verdict(&VerdictContext {
            title: &case.title,
            details: &case.details,
            history: &history,
            plaintiff_closing: case.plaintiff_arguments.last().map_or(NO_CLOSING, String::as_str),
            defendant_closing: case.defendant_arguments.last().map_or(NO_CLOSING, String::as_str),
        });

        let generation = match self.classifier.generate(&messages).await {
            Ok(generation) => generation,
            Err(RecoveryError::PoolExhausted(exhausted)) => return Err(exhausted.into()),
            Err(err) => {
                warn!(case_id = %case.id, model = %model, error = %err, "Verdict generation failed");
                return Ok(false);
            }
        };

        let verdict = strip_think(&generation.text);
        if !is_valid_response(&verdict) {
            warn!(case_id = %case.id, model = %generation.model, "Rejected unusable verdict");
            return Ok(false);
        }
        if generation.model != model {
            warn!(
                case_id = %case.id,
                requested = %model,
                used = %generation.model,
                "Verdict produced by a rotated model"
            );
        }

        let record = VerdictRecord {
            id: VerdictRecord::record_id(&case.id, &generation.model),
            case_ref: case.id.clone(),
            case_title: case.title.clone(),
            section: case.section.clone(),
            case_details: case.details.clone(),
            verdict,
            model_name: generation.model,
            created_at: Utc::now(),
        };
        match self.verdicts.insert_verdict(record) {
            Ok(()) => {
                info!(case_id = %case.id, model = %model, "Verdict stored");
                Ok(true)
            }
            Err(err) => {
                warn!(case_id = %case.id, model = %model, error = %err, "Could not store verdict");
                Ok(false)
            }
        }
    }

    fn models(&self) -> Vec<String> {
        lock_pool(self.classifier.pool()).models().to_vec()
    }
}
