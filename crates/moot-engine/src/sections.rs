//! Sections catalog: which statute sections the pipeline works through.

use camino::Utf8Path;
use serde::Deserialize;

use moot_config::PipelineSettings;
use moot_utils::error::ConfigError;
use moot_utils::types::SectionCode;

#[derive(Deserialize)]
#[serde(untagged)]
enum SectionValue {
    Text(String),
    Number(u64),
}

#[derive(Deserialize)]
struct CatalogEntry {
    #[serde(rename = "Section")]
    section: SectionValue,
}

/// Parse a JSON catalog: `[{"Section": "302"}, {"Section": 420}, ...]`.
///
/// Extra fields are ignored, blank entries dropped and order kept.
///
/// # Errors
///
/// `ConfigError::InvalidFile` when the text is not such an array.
pub fn parse_catalog(json: &str) -> Result<Vec<SectionCode>, ConfigError> {
    let entries: Vec<CatalogEntry> = serde_json::from_str(json)
        .map_err(|e| ConfigError::InvalidFile(format!("sections catalog: {e}")))?;

    Ok(entries
        .into_iter()
        .map(|entry| match entry.section {
            SectionValue::Text(text) => SectionCode::new(text),
            SectionValue::Number(n) => SectionCode::new(n.to_string()),
        })
        .filter(|code| !code.as_str().is_empty())
        .collect())
}

/// # Errors
///
/// `ConfigError::NotFound` for a missing file, otherwise as [`parse_catalog`].
pub fn load_catalog(path: &Utf8Path) -> Result<Vec<SectionCode>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ConfigError::NotFound {
            path: path.to_string(),
        },
        _ => ConfigError::InvalidFile(format!("{path}: {e}")),
    })?;
    parse_catalog(&text)
}

/// Sections from the configured catalog file, else the inline list.
///
/// # Errors
///
/// Catalog read or parse failures, or `MissingRequired` when neither
/// source names a section.
pub fn resolve_sections(settings: &PipelineSettings) -> Result<Vec<SectionCode>, ConfigError> {
    let sections = match &settings.sections_file {
        Some(path) => load_catalog(path)?,
        None => settings
            .sections
            .iter()
            .map(|s| SectionCode::new(s.as_str()))
            .filter(|code| !code.as_str().is_empty())
            .collect(),
    };

    if sections.is_empty() {
        return Err(ConfigError::MissingRequired(
            "no sections configured (set pipeline.sections or pipeline.sections_file)".to_string(),
        ));
    }
    Ok(sections)
}
