//! Per-section scheduling: resume unfinished cases, then top up to target.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{Instrument, debug, info, warn};

use moot_config::PipelineSettings;
use moot_store::{CaseQuery, CaseRecord, CaseStore};
use moot_utils::error::PipelineError;
use moot_utils::logging::section_span;
use moot_utils::types::{CaseStatus, SectionCode};

use crate::case_content::CaseContentGenerator;
use crate::stage::{CaseOutcome, StageEngine};

/// What one pass over a section did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SectionReport {
    pub section: SectionCode,
    /// Existing unfinished cases picked up
    pub resumed: usize,
    /// New cases stored
    pub created: usize,
    /// Cases left unfinished after their retries, or that could not be created
    pub abandoned: usize,
    pub resolved_before: usize,
    pub resolved_after: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub target_resolved: usize,
    /// Immediate re-runs of a failing case after its first attempt
    pub case_retries: u32,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self::from(&PipelineSettings::default())
    }
}

impl From<&PipelineSettings> for SchedulerSettings {
    fn from(settings: &PipelineSettings) -> Self {
        Self {
            target_resolved: settings.target_resolved,
            case_retries: settings.case_retries,
        }
    }
}

pub struct SectionScheduler {
    engine: StageEngine,
    store: Arc<dyn CaseStore>,
    content: Arc<dyn CaseContentGenerator>,
    settings: SchedulerSettings,
}

impl SectionScheduler {
    #[must_use]
    pub fn new(
        engine: StageEngine,
        store: Arc<dyn CaseStore>,
        content: Arc<dyn CaseContentGenerator>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            engine,
            store,
            content,
            settings,
        }
    }

    #[must_use]
    pub fn engine(&self) -> &StageEngine {
        &self.engine
    }

    #[must_use]
    pub fn settings(&self) -> SchedulerSettings {
        self.settings
    }

    /// One pass over `section`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::PoolExhausted`] from any case, or a store error when
    /// the section's cases cannot be loaded. Per-case failures are absorbed
    /// and counted as abandoned.
    pub async fn run_section(&self, section: &SectionCode) -> Result<SectionReport, PipelineError> {
        let span = section_span(section);
        self.run_section_inner(section).instrument(span).await
    }

    async fn run_section_inner(
        &self,
        section: &SectionCode,
    ) -> Result<SectionReport, PipelineError> {
        let cases = self.store.find_by_section(section)?;
        let (resolved, mut unfinished): (Vec<CaseRecord>, Vec<CaseRecord>) = cases
            .into_iter()
            .partition(|c| c.status == CaseStatus::Resolved);
        // details-only first, then in-progress; stable within each group
        unfinished.sort_by_key(|c| c.status != CaseStatus::DetailsOnly);

        let mut report = SectionReport {
            section: section.clone(),
            resolved_before: resolved.len(),
            ..SectionReport::default()
        };
        info!(
            resolved = resolved.len(),
            unfinished = unfinished.len(),
            target = self.settings.target_resolved,
            "Section loaded"
        );

        let mut newly_resolved = 0;
        for mut case in unfinished {
            report.resumed += 1;
            if self.process_case(&mut case).await? {
                newly_resolved += 1;
            } else {
                report.abandoned += 1;
            }
        }

        let resolved_now = self.resolved_count(section, report.resolved_before + newly_resolved);
        let to_create = self.settings.target_resolved.saturating_sub(resolved_now);
        if to_create > 0 {
            info!(resolved = resolved_now, to_create, "Creating new cases");
        }

        for index in 1..=to_create {
            debug!(index, to_create, "Generating new case");
            let Some(mut case) = self.create_case(section).await? else {
                report.abandoned += 1;
                continue;
            };
            report.created += 1;
            if self.process_case(&mut case).await? {
                newly_resolved += 1;
            } else {
                report.abandoned += 1;
            }
        }

        report.resolved_after =
            self.resolved_count(section, report.resolved_before + newly_resolved);
        info!(
            resumed = report.resumed,
            created = report.created,
            abandoned = report.abandoned,
            resolved = report.resolved_after,
            "Section pass finished"
        );
        Ok(report)
    }

    /// Create one new case in `section` and drive it as far as it goes.
    ///
    /// Returns `None` when the case content could not be generated or stored.
    ///
    /// # Errors
    ///
    /// [`PipelineError::PoolExhausted`] when no credential is left.
    pub async fn generate_case(
        &self,
        section: &SectionCode,
    ) -> Result<Option<CaseRecord>, PipelineError> {
        let span = section_span(section);
        async {
            let Some(mut case) = self.create_case(section).await? else {
                return Ok(None);
            };
            self.process_case(&mut case).await?;
            Ok(Some(case))
        }
        .instrument(span)
        .await
    }

    /// Run the case through the engine with bounded immediate retries.
    ///
    /// Returns whether the case ended up resolved.
    async fn process_case(&self, case: &mut CaseRecord) -> Result<bool, PipelineError> {
        let attempts = self.settings.case_retries.saturating_add(1);
        for attempt in 1..=attempts {
            match self.engine.advance(case).await {
                Ok(CaseOutcome::Resolved) => return Ok(true),
                Ok(CaseOutcome::Incomplete) => return Ok(false),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(
                        case_id = %case.id,
                        attempt,
                        attempts,
                        error = %err,
                        "Case attempt failed"
                    );
                }
            }
        }
        warn!(case_id = %case.id, "Case left incomplete for this pass");
        Ok(false)
    }

    /// Generate and store a new case. `None` when this case is skipped.
    async fn create_case(&self, section: &SectionCode) -> Result<Option<CaseRecord>, PipelineError> {
        let content = match self.content.new_case_content(section).await {
            Ok(content) => content,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!(error = %err, "Case content generation failed; skipping");
                return Ok(None);
            }
        };

        match self.store.insert(content.clone()) {
            Ok(id) => {
                info!(case_id = %id, cnr = %content.cnr, title = %content.title, "Inserted new case");
                Ok(Some(content.into_record(id, Utc::now())))
            }
            Err(err) => {
                warn!(error = %err, "Could not store new case; skipping");
                Ok(None)
            }
        }
    }

    fn resolved_count(&self, section: &SectionCode, fallback: usize) -> usize {
        let query = CaseQuery::all()
            .section(section.clone())
            .status(CaseStatus::Resolved);
        self.store.count_where(&query).unwrap_or_else(|err| {
            warn!(error = %err, fallback, "Could not count resolved cases; using in-memory tally");
            fallback
        })
    }
}
