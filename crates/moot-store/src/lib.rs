//! Persistence for moot: cases, verdicts, and count reports
//!
//! Documents live as JSON arrays under the state directory and are rewritten
//! atomically on every mutation.

mod case;
mod document;
mod report;
mod store;
mod verdict;

pub use case::{CaseId, CaseQuery, CaseRecord, CaseUpdate, NewCase};
pub use report::{
    CaseCounts, SECTION_CSV, SECTION_STATUS_CSV, STATUS_CSV, SectionCount, SectionStatusCount,
    StatusCount,
};
pub use store::{CASES_FILE, CaseStore, JsonCaseStore, MemoryCaseStore};
pub use verdict::{JsonVerdictStore, VERDICTS_FILE, VerdictRecord, VerdictStore};

pub use moot_utils::error::StoreError;
