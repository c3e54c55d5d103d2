//! Top-level loop over the sections catalog.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{error, info, warn};

use moot_llm::{RotationStats, lock_pool};
use moot_store::CaseStore;
use moot_utils::error::{PipelineError, PoolExhausted};
use moot_utils::types::{CaseStatus, SectionCode};

use crate::scheduler::{SectionReport, SectionScheduler};

/// Why a run stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum HaltReason {
    AllSectionsProcessed,
    NoMatchingSections,
    PoolExhausted { models: usize, rotations: u64 },
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub sections: Vec<SectionReport>,
    /// Sections skipped because their cases could not be loaded
    pub failed_sections: Vec<SectionCode>,
    pub halt_reason: HaltReason,
    pub rotation_stats: RotationStats,
}

impl RunSummary {
    #[must_use]
    pub fn cases_created(&self) -> usize {
        self.sections.iter().map(|s| s.created).sum()
    }

    #[must_use]
    pub fn cases_abandoned(&self) -> usize {
        self.sections.iter().map(|s| s.abandoned).sum()
    }

    #[must_use]
    pub fn pool_exhausted(&self) -> bool {
        matches!(self.halt_reason, HaltReason::PoolExhausted { .. })
    }
}

pub struct PipelineDriver {
    scheduler: SectionScheduler,
    store: Arc<dyn CaseStore>,
}

impl PipelineDriver {
    #[must_use]
    pub fn new(scheduler: SectionScheduler, store: Arc<dyn CaseStore>) -> Self {
        Self { scheduler, store }
    }

    /// Processing order for `catalog`.
    ///
    /// Sections with unfinished cases come first, most unfinished first;
    /// the rest keep catalog order. Duplicates are dropped and `only`
    /// restricts the plan to one section.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot be read.
    pub fn plan(
        &self,
        catalog: &[SectionCode],
        only: Option<&SectionCode>,
    ) -> Result<Vec<SectionCode>, PipelineError> {
        let mut incomplete: BTreeMap<SectionCode, usize> = BTreeMap::new();
        for case in self.store.all()? {
            if case.status != CaseStatus::Resolved {
                *incomplete.entry(case.section).or_default() += 1;
            }
        }

        let mut seen = HashSet::new();
        let sections: Vec<SectionCode> = catalog
            .iter()
            .filter(|s| only.is_none_or(|o| o == *s))
            .filter(|s| seen.insert((*s).clone()))
            .cloned()
            .collect();

        let (mut with_work, fresh): (Vec<SectionCode>, Vec<SectionCode>) = sections
            .into_iter()
            .partition(|s| incomplete.get(s).copied().unwrap_or(0) > 0);
        with_work.sort_by_key(|s| std::cmp::Reverse(incomplete.get(s).copied().unwrap_or(0)));

        with_work.extend(fresh);
        Ok(with_work)
    }

    /// Run every planned section until done or the pool is exhausted.
    ///
    /// Pool exhaustion stops the run and is reported through
    /// [`RunSummary::halt_reason`]; everything processed before it stays
    /// checkpointed.
    ///
    /// # Errors
    ///
    /// Only when the plan cannot be computed.
    pub async fn run(
        &self,
        catalog: &[SectionCode],
        only: Option<&SectionCode>,
    ) -> Result<RunSummary, PipelineError> {
        let plan = self.plan(catalog, only)?;
        let mut summary = RunSummary {
            sections: Vec::with_capacity(plan.len()),
            failed_sections: Vec::new(),
            halt_reason: HaltReason::AllSectionsProcessed,
            rotation_stats: self.rotation_stats(),
        };

        if plan.is_empty() {
            warn!(catalog = catalog.len(), "No sections to process");
            summary.halt_reason = HaltReason::NoMatchingSections;
            return Ok(summary);
        }
        info!(sections = plan.len(), "Starting pipeline run");

        for section in &plan {
            match self.scheduler.run_section(section).await {
                Ok(report) => summary.sections.push(report),
                Err(PipelineError::PoolExhausted(exhausted)) => {
                    summary.halt_reason = self.halt_on_exhaustion(section, &exhausted);
                    break;
                }
                Err(err) => {
                    warn!(section = %section, error = %err, "Section skipped");
                    summary.failed_sections.push(section.clone());
                }
            }
        }

        summary.rotation_stats = self.rotation_stats();
        info!(
            sections = summary.sections.len(),
            created = summary.cases_created(),
            abandoned = summary.cases_abandoned(),
            rotations = summary.rotation_stats.rotation_count,
            "Pipeline run finished"
        );
        Ok(summary)
    }

    fn halt_on_exhaustion(&self, section: &SectionCode, exhausted: &PoolExhausted) -> HaltReason {
        let stats = self.rotation_stats();
        error!(
            section = %section,
            models = exhausted.models,
            rotations = exhausted.rotations,
            keys_total = stats.total_keys,
            "Credential pool exhausted; aborting run"
        );
        for (model, usage) in &stats.model_key_usage {
            info!(
                model = %model,
                keys_used = usage.keys_used,
                total_keys = usage.total_keys,
                rotations = usage.rotations,
                "Model key usage"
            );
        }
        HaltReason::PoolExhausted {
            models: exhausted.models,
            rotations: exhausted.rotations,
        }
    }

    fn rotation_stats(&self) -> RotationStats {
        lock_pool(self.scheduler.engine().classifier().pool()).stats()
    }
}
