//! Per-case stage state machine.
//!
//! A case moves through the eight stages of [`Stage::ORDER`]. Each stage is
//! run only when its slot in the side's statement list is still empty, so
//! resuming a half-finished case never repeats work. Every accepted statement
//! is checkpointed to the store before the next stage starts.

use std::sync::Arc;
use tracing::{Instrument, debug, warn};

use moot_config::PipelineSettings;
use moot_llm::{Message, RecoveryClassifier, RecoveryError, lock_pool};
use moot_store::{CaseRecord, CaseStore, CaseUpdate};
use moot_utils::error::PipelineError;
use moot_utils::logging::{case_span, log_checkpoint_failed, log_stage_accepted, log_stage_failed};
use moot_utils::types::{CaseStatus, STATEMENTS_PER_SIDE, Side, Stage, StageKind};

use crate::prompts;
use crate::transcript::Transcript;
use crate::validation::{is_valid_closing, is_valid_response, strip_think};

/// Result of advancing one case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseOutcome {
    /// Both sides hold all four statements
    Resolved,
    /// The case cannot be finished as stored and was left untouched
    Incomplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageSettings {
    /// Extra generations allowed per stage when output is rejected
    pub invalid_output_retries: u32,
    /// Transcript length (chars) above which closing prompts are condensed
    pub closing_history_limit: usize,
}

impl Default for StageSettings {
    fn default() -> Self {
        Self::from(&PipelineSettings::default())
    }
}

impl From<&PipelineSettings> for StageSettings {
    fn from(settings: &PipelineSettings) -> Self {
        Self {
            invalid_output_retries: settings.invalid_output_retries,
            closing_history_limit: settings.closing_history_limit,
        }
    }
}

pub struct StageEngine {
    classifier: RecoveryClassifier,
    store: Arc<dyn CaseStore>,
    settings: StageSettings,
}

impl StageEngine {
    #[must_use]
    pub fn new(
        classifier: RecoveryClassifier,
        store: Arc<dyn CaseStore>,
        settings: StageSettings,
    ) -> Self {
        Self {
            classifier,
            store,
            settings,
        }
    }

    #[must_use]
    pub fn classifier(&self) -> &RecoveryClassifier {
        &self.classifier
    }

    /// First stage whose slot is still empty, if any.
    #[must_use]
    pub fn next_stage(case: &CaseRecord) -> Option<Stage> {
        Stage::ORDER.into_iter().find(|s| !is_satisfied(case, *s))
    }

    /// Run every unsatisfied stage of `case`, updating it in place.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::PoolExhausted`] is fatal and must abort the run.
    /// - [`PipelineError::GenerationFailed`] and
    ///   [`PipelineError::InvalidResponse`] leave the case `in-progress`
    ///   with every earlier stage already checkpointed.
    pub async fn advance(&self, case: &mut CaseRecord) -> Result<CaseOutcome, PipelineError> {
        let span = case_span(case.id.as_str(), &case.section);
        self.advance_inner(case).instrument(span).await
    }

    async fn advance_inner(&self, case: &mut CaseRecord) -> Result<CaseOutcome, PipelineError> {
        let plaintiff = case.plaintiff_arguments.len();
        let defendant = case.defendant_arguments.len();
        if plaintiff > STATEMENTS_PER_SIDE || defendant > STATEMENTS_PER_SIDE {
            warn!(
                plaintiff,
                defendant, "Case holds more statements than stages; leaving it incomplete"
            );
            return Ok(CaseOutcome::Incomplete);
        }

        for stage in Stage::ORDER {
            if is_satisfied(case, stage) {
                debug!(stage = %stage, "Stage already satisfied");
                continue;
            }

            let text = self.run_stage(case, stage).await?;
            arguments_mut(case, stage.side()).push(text);
            case.status = derived_status(case);
            self.checkpoint(case, Some(stage));
        }

        // Statements may already have been complete under a stale status.
        if case.status != CaseStatus::Resolved {
            case.status = CaseStatus::Resolved;
            self.checkpoint(case, None);
        }
        Ok(CaseOutcome::Resolved)
    }

    async fn run_stage(&self, case: &CaseRecord, stage: Stage) -> Result<String, PipelineError> {
        let messages = self.prompt_for(case, stage);
        let accept: fn(&str) -> bool = match stage.kind() {
            StageKind::Closing => is_valid_closing,
            StageKind::Opening | StageKind::Round => is_valid_response,
        };
        let tries = self.settings.invalid_output_retries.saturating_add(1);

        for attempt in 1..=tries {
            let generation = match self.classifier.generate(&messages).await {
                Ok(generation) => generation,
                Err(RecoveryError::PoolExhausted(exhausted)) => {
                    self.log_failure(case, stage, &exhausted.to_string());
                    return Err(PipelineError::PoolExhausted(exhausted));
                }
                Err(RecoveryError::AttemptsExhausted { attempts, last }) => {
                    self.log_failure(case, stage, &last.to_string());
                    return Err(PipelineError::GenerationFailed {
                        case_id: case.id.to_string(),
                        stage,
                        attempts,
                        source: last,
                    });
                }
            };

            let text = strip_think(&generation.text);
            if accept(&text) {
                log_stage_accepted(case.id.as_str(), stage, attempt, text.chars().count());
                return Ok(text);
            }

            warn!(
                stage = %stage,
                model = %generation.model,
                attempt,
                tries,
                excerpt = %excerpt(&text),
                "Rejected unusable stage output"
            );
        }

        self.log_failure(case, stage, "output kept failing validation");
        Err(PipelineError::InvalidResponse {
            case_id: case.id.to_string(),
            stage,
            attempts: tries,
        })
    }

    fn prompt_for(&self, case: &CaseRecord, stage: Stage) -> Vec<Message> {
        let side = stage.side();
        let transcript =
            Transcript::from_arguments(&case.plaintiff_arguments, &case.defendant_arguments);

        match stage.kind() {
            StageKind::Opening => prompts::opening(side, &case.details),
            StageKind::Round => {
                let round = stage.slot();
                let last_argument = match side {
                    Side::Plaintiff => prompts::plaintiff_round_instruction(round),
                    Side::Defendant => case
                        .plaintiff_arguments
                        .get(round)
                        .or(case.plaintiff_arguments.last())
                        .cloned()
                        .unwrap_or_else(|| prompts::plaintiff_round_instruction(round)),
                };
                prompts::round(side, &case.details, &transcript.render(), &last_argument)
            }
            StageKind::Closing => prompts::closing(
                side,
                &transcript.render_condensed(self.settings.closing_history_limit),
            ),
        }
    }

    fn checkpoint(&self, case: &CaseRecord, stage: Option<Stage>) {
        let update = CaseUpdate::progress(
            &case.plaintiff_arguments,
            &case.defendant_arguments,
            case.status,
        );
        match self.store.update_fields(&case.id, update) {
            Ok(()) => debug!(status = %case.status, "Checkpoint saved"),
            Err(err) => log_checkpoint_failed(case.id.as_str(), stage, &err.to_string()),
        }
    }

    fn log_failure(&self, case: &CaseRecord, stage: Stage, err: &str) {
        let stats = lock_pool(self.classifier.pool()).stats();
        let key = stats.current_key_prefix.as_deref().unwrap_or("-");
        log_stage_failed(case.id.as_str(), stage, &stats.current_model, key, err);
    }
}

fn is_satisfied(case: &CaseRecord, stage: Stage) -> bool {
    case.arguments(stage.side()).len() > stage.slot()
}

fn arguments_mut(case: &mut CaseRecord, side: Side) -> &mut Vec<String> {
    match side {
        Side::Plaintiff => &mut case.plaintiff_arguments,
        Side::Defendant => &mut case.defendant_arguments,
    }
}

fn derived_status(case: &CaseRecord) -> CaseStatus {
    if case.is_complete() {
        CaseStatus::Resolved
    } else if case.plaintiff_arguments.is_empty() && case.defendant_arguments.is_empty() {
        CaseStatus::DetailsOnly
    } else {
        CaseStatus::InProgress
    }
}

fn excerpt(text: &str) -> String {
    text.chars().take(60).collect()
}
