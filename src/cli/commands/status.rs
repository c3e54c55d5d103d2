//! `moot status`: configuration, store totals, lock holder and pool state

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;

use super::common::print_json;
use crate::llm::{CredentialPool, RotationStats};
use crate::lock::{LockInfo, StoreLock};
use crate::store::{CaseCounts, CaseStore, JsonCaseStore};
use crate::{Config, moot_version};

#[derive(Debug, Serialize)]
struct ConfigEntry {
    value: String,
    source: String,
}

#[derive(Debug, Serialize)]
struct StatusOutput {
    version: &'static str,
    state_dir: String,
    config_file: Option<String>,
    config: BTreeMap<String, ConfigEntry>,
    cases: Option<CaseCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cases_error: Option<String>,
    lock: Option<LockInfo>,
    pool: Option<RotationStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pool_error: Option<String>,
}

/// Gather status. Individual parts that fail are reported in place rather
/// than failing the command.
fn collect(config: &Config) -> StatusOutput {
    let state_dir = &config.store.state_dir;

    let (cases, cases_error) = match JsonCaseStore::open(state_dir).and_then(|s| s.all()) {
        Ok(records) => (Some(CaseCounts::from_records(&records)), None),
        Err(e) => (None, Some(e.to_string())),
    };

    let lock = StoreLock::read_info(state_dir).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Could not read lock file");
        None
    });

    // A fresh pool: rotation state lives only inside a running command
    let (pool, pool_error) = match config
        .resolve_credentials()
        .map_err(|e| e.to_string())
        .and_then(|c| CredentialPool::new(c.models, c.keys).map_err(|e| e.to_string()))
    {
        Ok(pool) => (Some(pool.stats()), None),
        Err(e) => (None, Some(e)),
    };

    StatusOutput {
        version: moot_version(),
        state_dir: state_dir.to_string(),
        config_file: config
            .config_path
            .as_ref()
            .map(|p| p.display().to_string()),
        config: config
            .effective_config()
            .into_iter()
            .map(|(key, (value, source))| (key, ConfigEntry { value, source }))
            .collect(),
        cases,
        cases_error,
        lock,
        pool,
        pool_error,
    }
}

pub fn execute_status_command(json: bool, config: &Config) -> Result<()> {
    let status = collect(config);
    if json {
        return print_json(&status);
    }

    println!("moot {}", status.version);
    println!("  State directory: {}", status.state_dir);
    match &status.config_file {
        Some(path) => println!("  Config file: {path}"),
        None => println!("  Config file: none (defaults and environment)"),
    }

    match (&status.cases, &status.cases_error) {
        (Some(counts), _) => {
            println!("  Cases: {}", counts.total);
            for row in &counts.by_status {
                println!("    - {}: {}", row.status, row.count);
            }
        }
        (None, Some(e)) => println!("  Cases: unreadable ({e})"),
        (None, None) => println!("  Cases: unknown"),
    }

    match &status.lock {
        Some(info) => println!(
            "  Lock: held by PID {} for `{}` (moot {})",
            info.pid, info.command, info.moot_version
        ),
        None => println!("  Lock: free"),
    }

    match (&status.pool, &status.pool_error) {
        (Some(stats), _) => {
            println!(
                "  Credential pool: {} model(s), {} key(s)",
                stats.total_models, stats.total_keys
            );
            println!("    Starting model: {}", stats.current_model);
            if let Some(prefix) = &stats.current_key_prefix {
                println!("    Starting key: {prefix}…");
            }
        }
        (None, Some(e)) => println!("  Credential pool: unavailable ({e})"),
        (None, None) => println!("  Credential pool: unavailable"),
    }

    println!("\n  Effective configuration:");
    for (key, entry) in &status.config {
        println!("    {key} = {} (from {})", entry.value, entry.source);
    }
    Ok(())
}
