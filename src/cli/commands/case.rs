//! `moot case`: create one case in a section and argue it

use anyhow::Result;

use super::common::{acquire_lock, build_runtime, lift, print_json};
use crate::Config;
use crate::error::{ConfigError, PipelineError};
use crate::types::SectionCode;

pub async fn execute_case_command(
    section: &str,
    force: bool,
    json: bool,
    config: &Config,
) -> Result<()> {
    let section = SectionCode::new(section);
    if section.as_str().is_empty() {
        return Err(lift(ConfigError::InvalidValue {
            key: "section".to_string(),
            value: "must not be empty".to_string(),
        }));
    }

    let _lock = acquire_lock(config, "case", force)?;
    let runtime = build_runtime(config)?;
    let Some(case) = runtime
        .scheduler()
        .generate_case(&section)
        .await
        .map_err(lift)?
    else {
        return Err(lift(PipelineError::CaseContent {
            section,
            reason: "no usable case content could be generated and stored".to_string(),
        }));
    };

    if json {
        return print_json(&case);
    }

    println!("Case {}", case.id);
    println!("  Title: {}", case.title);
    println!("  CNR: {}", case.cnr);
    println!("  Section: {}", case.section);
    println!("  Status: {}", case.status);
    println!(
        "  Statements: plaintiff {}, defendant {}",
        case.plaintiff_arguments.len(),
        case.defendant_arguments.len()
    );
    if !case.is_complete() {
        println!("\n  The case is unfinished; `moot run --section {section}` resumes it.");
    }
    Ok(())
}
