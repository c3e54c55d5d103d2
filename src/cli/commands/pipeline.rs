//! `moot run`: drive the whole sections catalog

use anyhow::Result;

use super::common::{acquire_lock, build_runtime, lift, print_json};
use crate::engine::resolve_sections;
use crate::error::{ConfigError, PoolExhausted};
use crate::types::SectionCode;
use crate::{Config, HaltReason, RunSummary};

pub async fn execute_run_command(
    section: Option<&str>,
    force: bool,
    json: bool,
    config: &Config,
) -> Result<()> {
    let only = section.map(SectionCode::new);
    let catalog = catalog_for(config, only.as_ref())?;

    let _lock = acquire_lock(config, "run", force)?;
    let runtime = build_runtime(config)?;
    let summary = runtime
        .driver()
        .run(&catalog, only.as_ref())
        .await
        .map_err(lift)?;

    if json {
        print_json(&summary)?;
    } else {
        print_summary(&summary);
    }

    if let HaltReason::PoolExhausted { models, rotations } = summary.halt_reason {
        return Err(lift(PoolExhausted { models, rotations }));
    }
    Ok(())
}

/// The configured catalog, with `only` appended when it is not listed.
///
/// A lone `--section` works without any catalog configured.
fn catalog_for(config: &Config, only: Option<&SectionCode>) -> Result<Vec<SectionCode>> {
    match (resolve_sections(&config.pipeline), only) {
        (Ok(mut catalog), Some(section)) => {
            if !catalog.contains(section) {
                catalog.push(section.clone());
            }
            Ok(catalog)
        }
        (Ok(catalog), None) => Ok(catalog),
        (Err(ConfigError::MissingRequired(_)), Some(section)) => Ok(vec![section.clone()]),
        (Err(err), _) => Err(lift(err)),
    }
}

fn print_summary(summary: &RunSummary) {
    let halt = match &summary.halt_reason {
        HaltReason::AllSectionsProcessed => "all sections processed".to_string(),
        HaltReason::NoMatchingSections => "no matching sections".to_string(),
        HaltReason::PoolExhausted { models, rotations } => format!(
            "credential pool exhausted ({models} model(s), {rotations} rotation(s))"
        ),
    };
    println!("Run finished: {halt}");
    println!("  Sections processed: {}", summary.sections.len());
    for report in &summary.sections {
        println!(
            "    - {}: resumed {}, created {}, abandoned {}, resolved {} -> {}",
            report.section,
            report.resumed,
            report.created,
            report.abandoned,
            report.resolved_before,
            report.resolved_after
        );
    }
    if !summary.failed_sections.is_empty() {
        let failed: Vec<&str> = summary
            .failed_sections
            .iter()
            .map(SectionCode::as_str)
            .collect();
        println!("  Sections skipped: {}", failed.join(", "));
    }
    println!(
        "  Cases created: {}, abandoned: {}",
        summary.cases_created(),
        summary.cases_abandoned()
    );

    let stats = &summary.rotation_stats;
    println!(
        "  Key rotations: {} (models remaining {}/{}, keys remaining {}/{})",
        stats.rotation_count,
        stats.models_remaining,
        stats.total_models,
        stats.keys_remaining,
        stats.total_keys
    );
}
