//! `moot verdict`: judge resolved cases with every configured model

use anyhow::Result;
use std::sync::Arc;

use super::common::{acquire_lock, build_runtime, lift, print_json};
use crate::store::{CaseId, JsonVerdictStore};
use crate::{Config, VerdictRequest};

pub async fn execute_verdict_command(
    limit: Option<usize>,
    case_id: Option<&str>,
    force: bool,
    json: bool,
    config: &Config,
) -> Result<()> {
    let _lock = acquire_lock(config, "verdict", force)?;
    let runtime = build_runtime(config)?;
    let verdicts = JsonVerdictStore::open(&config.store.state_dir).map_err(lift)?;
    let generator = runtime.verdict_generator(Arc::new(verdicts));

    let request = VerdictRequest {
        case_id: case_id.map(CaseId::new),
        limit,
    };
    let report = generator.run(&request).await.map_err(lift)?;

    if json {
        return print_json(&report);
    }

    if report.cases == 0 {
        println!("No resolved cases are waiting for a verdict");
        return Ok(());
    }
    println!("Verdicts for {} case(s)", report.cases);
    println!("  Generated: {}", report.generated);
    println!("  Already present: {}", report.skipped_existing);
    println!("  Failed: {}", report.failed);
    Ok(())
}
