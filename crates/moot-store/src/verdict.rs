use camino::Utf8Path;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use moot_utils::error::StoreError;
use moot_utils::types::SectionCode;

use crate::case::CaseId;
use crate::document::Document;

pub const VERDICTS_FILE: &str = "verdicts.json";

/// A judgment generated by one model for one resolved case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictRecord {
    /// `<case id>_<model>` with `/` in the model name replaced by `_`
    pub id: String,
    pub case_ref: CaseId,
    pub case_title: String,
    pub section: SectionCode,
    pub case_details: String,
    pub verdict: String,
    pub model_name: String,
    pub created_at: DateTime<Utc>,
}

impl VerdictRecord {
    #[must_use]
    pub fn record_id(case_id: &CaseId, model: &str) -> String {
        format!("{case_id}_{}", model.replace('/', "_"))
    }
}

/// Verdicts keyed by `(case id, model)`.
pub trait VerdictStore: Send + Sync {
    fn find_verdict(&self, case_id: &CaseId, model: &str)
    -> Result<Option<VerdictRecord>, StoreError>;

    /// Store a verdict, replacing any earlier one for the same key.
    fn insert_verdict(&self, verdict: VerdictRecord) -> Result<(), StoreError>;

    fn all_verdicts(&self) -> Result<Vec<VerdictRecord>, StoreError>;
}

/// Verdicts in `<state_dir>/verdicts.json`, or in memory.
pub struct JsonVerdictStore {
    doc: Document<VerdictRecord>,
}

impl JsonVerdictStore {
    pub fn open(state_dir: &Utf8Path) -> Result<Self, StoreError> {
        Ok(Self {
            doc: Document::open(state_dir.join(VERDICTS_FILE))?,
        })
    }

    #[must_use]
    pub fn memory() -> Self {
        Self {
            doc: Document::memory(),
        }
    }
}

impl VerdictStore for JsonVerdictStore {
    fn find_verdict(
        &self,
        case_id: &CaseId,
        model: &str,
    ) -> Result<Option<VerdictRecord>, StoreError> {
        let id = VerdictRecord::record_id(case_id, model);
        Ok(self
            .doc
            .read(|verdicts| verdicts.iter().find(|v| v.id == id).cloned()))
    }

    fn insert_verdict(&self, verdict: VerdictRecord) -> Result<(), StoreError> {
        self.doc.mutate(|verdicts| {
            verdicts.retain(|v| v.id != verdict.id);
            verdicts.push(verdict);
            Ok(())
        })
    }

    fn all_verdicts(&self) -> Result<Vec<VerdictRecord>, StoreError> {
        Ok(self.doc.read(<[VerdictRecord]>::to_vec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn verdict(case: &str, model: &str, text: &str) -> VerdictRecord {
        let case_ref = CaseId::new(case);
        VerdictRecord {
            id: VerdictRecord::record_id(&case_ref, model),
            case_ref,
            case_title: "State v. Rao".to_string(),
            section: SectionCode::new("379"),
            case_details: "Theft of a bicycle.".to_string(),
            verdict: text.to_string(),
            model_name: model.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_record_id_sanitizes_model() {
        assert_eq!(
            VerdictRecord::record_id(&CaseId::new("c1"), "meta-llama/llama-4-scout"),
            "c1_meta-llama_llama-4-scout"
        );
    }

    #[test]
    fn test_keyed_by_case_and_model() {
        let store = JsonVerdictStore::memory();
        store.insert_verdict(verdict("c1", "a", "first")).unwrap();
        store.insert_verdict(verdict("c1", "b", "second")).unwrap();
        store.insert_verdict(verdict("c1", "a", "replaced")).unwrap();

        assert_eq!(store.all_verdicts().unwrap().len(), 2);
        let found = store.find_verdict(&CaseId::new("c1"), "a").unwrap().unwrap();
        assert_eq!(found.verdict, "replaced");
        assert!(store.find_verdict(&CaseId::new("c2"), "a").unwrap().is_none());
    }

    #[test]
    fn test_persists_to_state_dir() {
        let temp = TempDir::new().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        JsonVerdictStore::open(&dir)
            .unwrap()
            .insert_verdict(verdict("c1", "a", "text"))
            .unwrap();

        assert!(dir.join(VERDICTS_FILE).exists());
        let reopened = JsonVerdictStore::open(&dir).unwrap();
        assert!(reopened.find_verdict(&CaseId::new("c1"), "a").unwrap().is_some());
    }
}
