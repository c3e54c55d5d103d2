use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;

use moot_utils::error::StoreError;
use moot_utils::types::SectionCode;

use crate::case::{CaseId, CaseQuery, CaseRecord, CaseUpdate, NewCase};
use crate::document::Document;

/// File name of the case document inside the state directory
pub const CASES_FILE: &str = "cases.json";

/// The persistence collaborator: a document store keyed by case id.
///
/// Every update is a single-record field replace, so no transactions are
/// needed.
pub trait CaseStore: Send + Sync {
    fn find_by_id(&self, id: &CaseId) -> Result<Option<CaseRecord>, StoreError>;

    /// Cases of one section in insertion order.
    fn find_by_section(&self, section: &SectionCode) -> Result<Vec<CaseRecord>, StoreError>;

    /// Store a new `details-only` case and return its id.
    fn insert(&self, case: NewCase) -> Result<CaseId, StoreError>;

    /// # Errors
    ///
    /// `StoreError::CaseNotFound` for an unknown id.
    fn update_fields(&self, id: &CaseId, update: CaseUpdate) -> Result<(), StoreError>;

    fn count_where(&self, query: &CaseQuery) -> Result<usize, StoreError>;

    fn all(&self) -> Result<Vec<CaseRecord>, StoreError>;
}

fn find_by_id(doc: &Document<CaseRecord>, id: &CaseId) -> Option<CaseRecord> {
    doc.read(|cases| cases.iter().find(|c| &c.id == id).cloned())
}

fn find_by_section(doc: &Document<CaseRecord>, section: &SectionCode) -> Vec<CaseRecord> {
    doc.read(|cases| {
        cases
            .iter()
            .filter(|c| &c.section == section)
            .cloned()
            .collect()
    })
}

fn insert(doc: &Document<CaseRecord>, case: NewCase) -> Result<CaseId, StoreError> {
    let id = CaseId::generate();
    let record = case.into_record(id.clone(), Utc::now());
    doc.mutate(|cases| {
        cases.push(record);
        Ok(())
    })?;
    Ok(id)
}

fn update_fields(
    doc: &Document<CaseRecord>,
    id: &CaseId,
    update: CaseUpdate,
) -> Result<(), StoreError> {
    doc.mutate(|cases| {
        let record = cases
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| StoreError::CaseNotFound { id: id.to_string() })?;
        update.apply(record, Utc::now());
        Ok(())
    })
}

fn count_where(doc: &Document<CaseRecord>, query: &CaseQuery) -> usize {
    doc.read(|cases| cases.iter().filter(|c| query.matches(c)).count())
}

/// Cases stored as one JSON array in `<state_dir>/cases.json`.
pub struct JsonCaseStore {
    doc: Document<CaseRecord>,
}

impl JsonCaseStore {
    /// # Errors
    ///
    /// `StoreError::Corrupt` when the existing file is not a case array.
    pub fn open(state_dir: &Utf8Path) -> Result<Self, StoreError> {
        Ok(Self {
            doc: Document::open(state_dir.join(CASES_FILE))?,
        })
    }

    #[must_use]
    pub fn path(&self) -> Utf8PathBuf {
        self.doc
            .path()
            .map(Utf8Path::to_path_buf)
            .unwrap_or_default()
    }
}

impl CaseStore for JsonCaseStore {
    fn find_by_id(&self, id: &CaseId) -> Result<Option<CaseRecord>, StoreError> {
        Ok(find_by_id(&self.doc, id))
    }

    fn find_by_section(&self, section: &SectionCode) -> Result<Vec<CaseRecord>, StoreError> {
        Ok(find_by_section(&self.doc, section))
    }

    fn insert(&self, case: NewCase) -> Result<CaseId, StoreError> {
        insert(&self.doc, case)
    }

    fn update_fields(&self, id: &CaseId, update: CaseUpdate) -> Result<(), StoreError> {
        update_fields(&self.doc, id, update)
    }

    fn count_where(&self, query: &CaseQuery) -> Result<usize, StoreError> {
        Ok(count_where(&self.doc, query))
    }

    fn all(&self) -> Result<Vec<CaseRecord>, StoreError> {
        Ok(self.doc.read(<[CaseRecord]>::to_vec))
    }
}

/// Same contract as [`JsonCaseStore`], kept in memory only.
pub struct MemoryCaseStore {
    doc: Document<CaseRecord>,
}

impl Default for MemoryCaseStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCaseStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            doc: Document::memory(),
        }
    }

    /// Make every following insert and update fail with
    /// `StoreError::WriteFailed`.
    pub fn fail_writes(&self, fail: bool) {
        self.doc.set_fail_writes(fail);
    }

    /// Store a record exactly as given, bypassing `insert`. Test setup only.
    pub fn seed(&self, record: CaseRecord) -> Result<(), StoreError> {
        self.doc.mutate(|cases| {
            cases.push(record);
            Ok(())
        })
    }
}

impl CaseStore for MemoryCaseStore {
    fn find_by_id(&self, id: &CaseId) -> Result<Option<CaseRecord>, StoreError> {
        Ok(find_by_id(&self.doc, id))
    }

    fn find_by_section(&self, section: &SectionCode) -> Result<Vec<CaseRecord>, StoreError> {
        Ok(find_by_section(&self.doc, section))
    }

    fn insert(&self, case: NewCase) -> Result<CaseId, StoreError> {
        insert(&self.doc, case)
    }

    fn update_fields(&self, id: &CaseId, update: CaseUpdate) -> Result<(), StoreError> {
        update_fields(&self.doc, id, update)
    }

    fn count_where(&self, query: &CaseQuery) -> Result<usize, StoreError> {
        Ok(count_where(&self.doc, query))
    }

    fn all(&self) -> Result<Vec<CaseRecord>, StoreError> {
        Ok(self.doc.read(<[CaseRecord]>::to_vec))
    }
}
