//! `moot report`: case counts by section, status, and both

use anyhow::{Context, Result, anyhow};
use camino::Utf8PathBuf;
use std::path::Path;

use super::common::{lift, print_json};
use crate::Config;
use crate::store::{CaseCounts, CaseStore, JsonCaseStore};

pub fn execute_report_command(json: bool, csv: Option<&Path>, config: &Config) -> Result<()> {
    let store = JsonCaseStore::open(&config.store.state_dir).map_err(lift)?;
    let records = store.all().map_err(lift)?;
    let counts = CaseCounts::from_records(&records);

    if let Some(dir) = csv {
        let dir = Utf8PathBuf::from_path_buf(dir.to_path_buf())
            .map_err(|p| anyhow!("CSV directory is not valid UTF-8: {}", p.display()))?;
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create report directory '{dir}'"))?;
        for path in counts.write_csv(&dir).map_err(lift)? {
            println!("Wrote {path}");
        }
        return Ok(());
    }

    if json {
        return print_json(&counts);
    }

    print_table(&counts);
    Ok(())
}

fn print_table(counts: &CaseCounts) {
    println!("Cases: {}", counts.total);
    if counts.total == 0 {
        return;
    }

    println!("\n  By section:");
    for row in &counts.by_section {
        println!("    {:<12} {:>6}", row.section, row.count);
    }

    println!("\n  By status:");
    for row in &counts.by_status {
        println!("    {:<12} {:>6}", row.status, row.count);
    }

    println!("\n  By section and status:");
    for row in &counts.by_section_status {
        println!("    {:<12} {:<12} {:>6}", row.section, row.status, row.count);
    }
}
