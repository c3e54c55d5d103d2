//! Helpers shared by the CLI commands

use anyhow::{Context, Result};
use serde::Serialize;

use crate::lock::StoreLock;
use crate::{Config, MootError, MootRuntime};

/// Take the state-directory lock for a mutating command.
pub fn acquire_lock(config: &Config, command: &str, force: bool) -> Result<StoreLock> {
    StoreLock::acquire(
        &config.store.state_dir,
        command,
        force,
        Some(config.store.lock_ttl_secs),
    )
    .map_err(lift)
}

/// Build the production runtime for `config`.
pub fn build_runtime(config: &Config) -> Result<MootRuntime> {
    MootRuntime::from_config(config.clone()).map_err(lift)
}

/// Lift a library error into `anyhow` so `run()` can downcast it again.
pub fn lift<E: Into<MootError>>(err: E) -> anyhow::Error {
    anyhow::Error::new(err.into())
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON output")?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExitCode;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> Config {
        Config::builder()
            .state_dir(dir.path().join("state").to_string_lossy().to_string())
            .build()
            .unwrap()
    }

    #[test]
    fn test_second_lock_maps_to_lock_held() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        let _held = acquire_lock(&config, "run", false).unwrap();
        let err = acquire_lock(&config, "verdict", false).unwrap_err();

        let moot_error = err.downcast_ref::<MootError>().unwrap();
        assert_eq!(moot_error.to_exit_code(), ExitCode::LOCK_HELD);
    }

    #[test]
    fn test_lift_keeps_exit_code() {
        let err = lift(moot_utils::error::PoolExhausted {
            models: 1,
            rotations: 2,
        });
        let moot_error = err.downcast_ref::<MootError>().unwrap();
        assert_eq!(moot_error.to_exit_code(), ExitCode::POOL_EXHAUSTED);
    }
}
