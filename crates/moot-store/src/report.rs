//! Case counts by section, by status, and by both, plus CSV export.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::collections::BTreeMap;

use moot_utils::atomic_write::write_file_atomic;
use moot_utils::error::StoreError;

use crate::case::CaseRecord;

pub const SECTION_CSV: &str = "case_counts_by_section.csv";
pub const STATUS_CSV: &str = "case_counts_by_status.csv";
pub const SECTION_STATUS_CSV: &str = "case_counts_by_section_and_status.csv";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionCount {
    pub section: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionStatusCount {
    pub section: String,
    pub status: String,
    pub count: usize,
}

/// All three groupings, each sorted by descending count (ties by key).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaseCounts {
    pub total: usize,
    pub by_section: Vec<SectionCount>,
    pub by_status: Vec<StatusCount>,
    pub by_section_status: Vec<SectionStatusCount>,
}

fn sorted_by_count<K: Ord + Clone>(counts: BTreeMap<K, usize>) -> Vec<(K, usize)> {
    let mut entries: Vec<(K, usize)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries
}

impl CaseCounts {
    #[must_use]
    pub fn from_records(records: &[CaseRecord]) -> Self {
        let mut by_section: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_status: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_both: BTreeMap<(String, String), usize> = BTreeMap::new();

        for record in records {
            let section = record.section.to_string();
            let status = record.status.to_string();
            *by_section.entry(section.clone()).or_default() += 1;
            *by_status.entry(status.clone()).or_default() += 1;
            *by_both.entry((section, status)).or_default() += 1;
        }

        Self {
            total: records.len(),
            by_section: sorted_by_count(by_section)
                .into_iter()
                .map(|(section, count)| SectionCount { section, count })
                .collect(),
            by_status: sorted_by_count(by_status)
                .into_iter()
                .map(|(status, count)| StatusCount { status, count })
                .collect(),
            by_section_status: sorted_by_count(by_both)
                .into_iter()
                .map(|((section, status), count)| SectionStatusCount {
                    section,
                    status,
                    count,
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn section_csv(&self) -> String {
        let rows = self
            .by_section
            .iter()
            .map(|c| vec![c.section.clone(), c.count.to_string()]);
        to_csv(&["Section", "Count"], rows)
    }

    #[must_use]
    pub fn status_csv(&self) -> String {
        let rows = self
            .by_status
            .iter()
            .map(|c| vec![c.status.clone(), c.count.to_string()]);
        to_csv(&["Status", "Count"], rows)
    }

    #[must_use]
    pub fn section_status_csv(&self) -> String {
        let rows = self.by_section_status.iter().map(|c| {
            vec![c.section.clone(), c.status.clone(), c.count.to_string()]
        });
        to_csv(&["Section", "Status", "Count"], rows)
    }

    /// Write the three CSV files into `dir` and return their paths.
    pub fn write_csv(&self, dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, StoreError> {
        let files = [
            (SECTION_CSV, self.section_csv()),
            (STATUS_CSV, self.status_csv()),
            (SECTION_STATUS_CSV, self.section_status_csv()),
        ];

        let mut written = Vec::with_capacity(files.len());
        for (name, content) in files {
            let path = dir.join(name);
            write_file_atomic(&path, &content).map_err(|e| StoreError::WriteFailed {
                path: path.to_string(),
                reason: format!("{e:#}"),
            })?;
            written.push(path);
        }
        Ok(written)
    }
}

/// Quote a field when it contains a delimiter, quote, or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn to_csv(header: &[&str], rows: impl Iterator<Item = Vec<String>>) -> String {
    let mut out = header.join(",");
    out.push_str("\r\n");
    for row in rows {
        let line: Vec<String> = row.iter().map(|f| csv_field(f)).collect();
        out.push_str(&line.join(","));
        out.push_str("\r\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::{CaseId, NewCase};
    use chrono::Utc;
    use moot_utils::types::{CaseStatus, SectionCode};
    use std::fs;
    use tempfile::TempDir;

    fn record(section: &str, status: CaseStatus) -> CaseRecord {
        let mut r = NewCase {
            cnr: "X".to_string(),
            title: "T".to_string(),
            details: "D".to_string(),
            section: SectionCode::new(section),
        }
        .into_record(CaseId::generate(), Utc::now());
        r.status = status;
        r
    }

    fn sample() -> Vec<CaseRecord> {
        vec![
            record("302", CaseStatus::Resolved),
            record("302", CaseStatus::Resolved),
            record("302", CaseStatus::InProgress),
            record("420", CaseStatus::DetailsOnly),
        ]
    }

    #[test]
    fn test_counts_sorted_by_descending_count() {
        let counts = CaseCounts::from_records(&sample());
        assert_eq!(counts.total, 4);
        assert_eq!(
            counts.by_section,
            vec![
                SectionCount {
                    section: "302".to_string(),
                    count: 3
                },
                SectionCount {
                    section: "420".to_string(),
                    count: 1
                },
            ]
        );
        assert_eq!(counts.by_status[0].status, "resolved");
        assert_eq!(counts.by_status[0].count, 2);
        assert_eq!(counts.by_section_status.len(), 3);
    }

    #[test]
    fn test_csv_layout() {
        let counts = CaseCounts::from_records(&sample());
        assert_eq!(counts.section_csv(), "Section,Count\r\n302,3\r\n420,1\r\n");
        assert!(
            counts
                .section_status_csv()
                .starts_with("Section,Status,Count\r\n302,resolved,2\r\n")
        );
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_write_csv_creates_three_files() {
        let temp = TempDir::new().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().join("reports")).unwrap();
        let written = CaseCounts::from_records(&sample()).write_csv(&dir).unwrap();

        assert_eq!(written.len(), 3);
        assert!(dir.join(SECTION_STATUS_CSV).exists());
        let status = fs::read_to_string(dir.join(STATUS_CSV)).unwrap();
        assert!(status.starts_with("Status,Count\r\n"));
    }

    #[test]
    fn test_empty_store_yields_headers_only() {
        let counts = CaseCounts::from_records(&[]);
        assert_eq!(counts.total, 0);
        assert_eq!(counts.status_csv(), "Status,Count\r\n");
    }
}
