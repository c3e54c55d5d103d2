//! Orchestration core for moot
//!
//! [`StageEngine`] drives one case through its eight stages,
//! [`SectionScheduler`] decides which cases to resume or create for a
//! section, and [`PipelineDriver`] walks the sections catalog. Generation
//! goes through `moot_llm::RecoveryClassifier`, persistence through
//! `moot_store::CaseStore`.

mod case_content;
mod driver;
pub mod prompts;
mod scheduler;
mod sections;
mod stage;
mod transcript;
pub mod validation;
mod verdict;

pub use case_content::{CaseContentGenerator, LlmCaseContent, parse_case_content};
pub use driver::{HaltReason, PipelineDriver, RunSummary};
pub use scheduler::{SchedulerSettings, SectionReport, SectionScheduler};
pub use sections::{load_catalog, parse_catalog, resolve_sections};
pub use stage::{CaseOutcome, StageEngine, StageSettings};
pub use transcript::Transcript;
pub use verdict::{VerdictGenerator, VerdictReport, VerdictRequest};
