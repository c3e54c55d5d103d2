//! Fresh case content for a section.

use async_trait::async_trait;
use serde::Deserialize;

use moot_llm::{RecoveryClassifier, RecoveryError};
use moot_store::NewCase;
use moot_utils::error::PipelineError;
use moot_utils::types::SectionCode;

use crate::prompts;
use crate::validation::strip_think;

/// Source of new `details-only` cases.
#[async_trait]
pub trait CaseContentGenerator: Send + Sync {
    /// # Errors
    ///
    /// [`PipelineError::PoolExhausted`] is fatal; anything else only skips
    /// the case being created.
    async fn new_case_content(&self, section: &SectionCode) -> Result<NewCase, PipelineError>;
}

#[derive(Debug, Deserialize)]
struct CaseContent {
    #[serde(alias = "referenceNumber", alias = "reference_number")]
    cnr: String,
    title: String,
    details: String,
}

/// Asks the model for a JSON object `{cnr, title, details}`.
pub struct LlmCaseContent {
    classifier: RecoveryClassifier,
}

impl LlmCaseContent {
    #[must_use]
    pub fn new(classifier: RecoveryClassifier) -> Self {
        Self { classifier }
    }
}

#[async_trait]
impl CaseContentGenerator for LlmCaseContent {
    async fn new_case_content(&self, section: &SectionCode) -> Result<NewCase, PipelineError> {
        let generation = self
            .classifier
            .generate(&prompts::case_content(section))
            .await
            .map_err(|err| match err {
                RecoveryError::PoolExhausted(exhausted) => PipelineError::PoolExhausted(exhausted),
                other => PipelineError::CaseContent {
                    section: section.clone(),
                    reason: other.to_string(),
                },
            })?;

        parse_case_content(section, &strip_think(&generation.text))
    }
}

/// Parse the first JSON object in `text` into a new case.
///
/// # Errors
///
/// [`PipelineError::CaseContent`] when no object is found, it does not
/// parse, or a field is blank.
pub fn parse_case_content(section: &SectionCode, text: &str) -> Result<NewCase, PipelineError> {
    let fail = |reason: String| PipelineError::CaseContent {
        section: section.clone(),
        reason,
    };

    let start = text
        .find('{')
        .ok_or_else(|| fail("reply contains no JSON object".to_string()))?;
    let end = text
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| fail("reply contains no complete JSON object".to_string()))?;

    let content: CaseContent = serde_json::from_str(&text[start..=end])
        .map_err(|e| fail(format!("reply is not valid case JSON: {e}")))?;

    for (field, value) in [
        ("cnr", &content.cnr),
        ("title", &content.title),
        ("details", &content.details),
    ] {
        if value.trim().is_empty() {
            return Err(fail(format!("field '{field}' is empty")));
        }
    }

    Ok(NewCase {
        cnr: content.cnr.trim().to_string(),
        title: content.title.trim().to_string(),
        details: content.details.trim().to_string(),
        section: section.clone(),
    })
}
