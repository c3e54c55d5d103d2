//! Case records and the field-level update and query types used against them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use moot_utils::types::{CaseStatus, STATEMENTS_PER_SIDE, SectionCode, Side};

/// Persistence-assigned case identifier (UUIDv4 string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseId(String);

impl CaseId {
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CaseId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// One stored case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub id: CaseId,
    /// Case reference number produced with the case content
    pub cnr: String,
    pub title: String,
    pub details: String,
    pub section: SectionCode,
    #[serde(default)]
    pub plaintiff_arguments: Vec<String>,
    #[serde(default)]
    pub defendant_arguments: Vec<String>,
    pub status: CaseStatus,
    #[serde(default)]
    pub verdict_generated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CaseRecord {
    #[must_use]
    pub fn arguments(&self, side: Side) -> &[String] {
        match side {
            Side::Plaintiff => &self.plaintiff_arguments,
            Side::Defendant => &self.defendant_arguments,
        }
    }

    /// Both sides hold exactly [`STATEMENTS_PER_SIDE`] statements.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.plaintiff_arguments.len() == STATEMENTS_PER_SIDE
            && self.defendant_arguments.len() == STATEMENTS_PER_SIDE
    }
}

/// Content for a case that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCase {
    pub cnr: String,
    pub title: String,
    pub details: String,
    pub section: SectionCode,
}

impl NewCase {
    /// A fresh `details-only` record.
    #[must_use]
    pub fn into_record(self, id: CaseId, now: DateTime<Utc>) -> CaseRecord {
        CaseRecord {
            id,
            cnr: self.cnr,
            title: self.title,
            details: self.details,
            section: self.section,
            plaintiff_arguments: Vec::new(),
            defendant_arguments: Vec::new(),
            status: CaseStatus::DetailsOnly,
            verdict_generated: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Field replacements for one case. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseUpdate {
    pub plaintiff_arguments: Option<Vec<String>>,
    pub defendant_arguments: Option<Vec<String>>,
    pub status: Option<CaseStatus>,
    pub verdict_generated: Option<bool>,
}

impl CaseUpdate {
    /// Stage checkpoint: both statement sequences plus the status.
    #[must_use]
    pub fn progress(plaintiff: &[String], defendant: &[String], status: CaseStatus) -> Self {
        Self {
            plaintiff_arguments: Some(plaintiff.to_vec()),
            defendant_arguments: Some(defendant.to_vec()),
            status: Some(status),
            verdict_generated: None,
        }
    }

    #[must_use]
    pub fn verdict_generated() -> Self {
        Self {
            verdict_generated: Some(true),
            ..Self::default()
        }
    }

    pub fn apply(self, record: &mut CaseRecord, now: DateTime<Utc>) {
        if let Some(p) = self.plaintiff_arguments {
            record.plaintiff_arguments = p;
        }
        if let Some(d) = self.defendant_arguments {
            record.defendant_arguments = d;
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(flag) = self.verdict_generated {
            record.verdict_generated = flag;
        }
        record.updated_at = now;
    }
}

/// Conjunctive filter over case fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseQuery {
    pub section: Option<SectionCode>,
    pub status: Option<CaseStatus>,
    pub verdict_generated: Option<bool>,
}

impl CaseQuery {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn section(mut self, section: impl Into<SectionCode>) -> Self {
        self.section = Some(section.into());
        self
    }

    #[must_use]
    pub fn status(mut self, status: CaseStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn verdict_generated(mut self, flag: bool) -> Self {
        self.verdict_generated = Some(flag);
        self
    }

    #[must_use]
    pub fn matches(&self, record: &CaseRecord) -> bool {
        self.section.as_ref().is_none_or(|s| *s == record.section)
            && self.status.is_none_or(|s| s == record.status)
            && self
                .verdict_generated
                .is_none_or(|f| f == record.verdict_generated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CaseRecord {
        NewCase {
            cnr: "DLHC010001232024".to_string(),
            title: "State v. Sharma".to_string(),
            details: "A dispute over a boundary wall.".to_string(),
            section: SectionCode::new("447"),
        }
        .into_record(CaseId::new("c1"), Utc::now())
    }

    #[test]
    fn test_new_case_starts_details_only() {
        let r = record();
        assert_eq!(r.status, CaseStatus::DetailsOnly);
        assert!(r.plaintiff_arguments.is_empty());
        assert!(!r.verdict_generated);
        assert!(!r.is_complete());
    }

    #[test]
    fn test_serialized_field_names() {
        let json = serde_json::to_value(record()).unwrap();
        for field in [
            "id",
            "cnr",
            "title",
            "details",
            "section",
            "plaintiff_arguments",
            "defendant_arguments",
            "status",
            "verdict_generated",
        ] {
            assert!(json.get(field).is_some(), "missing field {field}");
        }
        assert_eq!(json["status"], "details-only");
        assert_eq!(json["section"], "447");
    }

    #[test]
    fn test_missing_argument_fields_default_to_empty() {
        let json = serde_json::json!({
            "id": "c9",
            "cnr": "X",
            "title": "T",
            "details": "D",
            "section": "302",
            "status": "details-only",
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        });
        let r: CaseRecord = serde_json::from_value(json).unwrap();
        assert!(r.plaintiff_arguments.is_empty());
        assert!(!r.verdict_generated);
    }

    #[test]
    fn test_update_only_touches_given_fields() {
        let mut r = record();
        CaseUpdate::progress(&["p".to_string()], &[], CaseStatus::InProgress)
            .apply(&mut r, Utc::now());
        assert_eq!(r.plaintiff_arguments, vec!["p".to_string()]);
        assert_eq!(r.status, CaseStatus::InProgress);

        CaseUpdate::verdict_generated().apply(&mut r, Utc::now());
        assert!(r.verdict_generated);
        assert_eq!(r.plaintiff_arguments, vec!["p".to_string()]);
    }

    #[test]
    fn test_query_matching() {
        let r = record();
        assert!(CaseQuery::all().matches(&r));
        assert!(CaseQuery::all().section("447").matches(&r));
        assert!(!CaseQuery::all().section("302").matches(&r));
        assert!(
            !CaseQuery::all()
                .section("447")
                .status(CaseStatus::Resolved)
                .matches(&r)
        );
        assert!(CaseQuery::all().verdict_generated(false).matches(&r));
    }
}
