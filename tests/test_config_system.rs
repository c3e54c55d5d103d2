//! Configuration discovery against the real process environment
//!
//! **WHITE-BOX TEST**: uses `config::{CliArgs, Config, ConfigSource}`.
//!
//! Tests that touch environment variables run `#[serial]`; the rest pass an
//! empty environment lookup.
//!
//! - upward discovery of `.moot/config.toml`
//! - precedence: CLI > environment > file > defaults
//! - `MOOT_HOME` overrides the state directory
//! - credentials come from the variable the config names
//! - invalid files are rejected with a configuration error

use anyhow::Result;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use moot::config::{CliArgs, Config, ConfigSource};
use moot::{ExitCode, MootError};

fn create_config_file(dir: &Path, content: &str) -> PathBuf {
    let moot_dir = dir.join(".moot");
    fs::create_dir_all(&moot_dir).unwrap();
    let config_path = moot_dir.join("config.toml");
    fs::write(&config_path, content).unwrap();
    config_path
}

fn explicit(path: PathBuf) -> CliArgs {
    CliArgs {
        config_path: Some(path),
        ..CliArgs::default()
    }
}

#[test]
fn test_upward_discovery_from_nested_directory() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    fs::create_dir_all(root.join(".git"))?;
    let config_path = create_config_file(
        root,
        r#"
[pipeline]
target_resolved = 7
"#,
    );
    let nested = root.join("cases").join("2024");
    fs::create_dir_all(&nested)?;

    let config = Config::discover_with_env(&nested, &CliArgs::default(), |_| None)?;

    assert_eq!(config.pipeline.target_resolved, 7);
    assert_eq!(config.config_path.as_deref(), Some(config_path.as_path()));
    assert_eq!(
        config.source_attribution.get("pipeline.target_resolved"),
        Some(&ConfigSource::Config)
    );
    Ok(())
}

#[test]
fn test_relative_paths_resolve_against_project_root() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = create_config_file(
        temp_dir.path(),
        r#"
[pipeline]
sections_file = "data/sections.json"

[store]
state_dir = "runs/state"
"#,
    );

    let config = Config::discover_with_env(temp_dir.path(), &explicit(config_path), |_| None)?;

    let sections_file = config.pipeline.sections_file.expect("sections_file set");
    assert!(sections_file.as_str().ends_with("data/sections.json"));
    assert!(
        sections_file
            .as_std_path()
            .starts_with(temp_dir.path())
    );
    assert!(config.store.state_dir.as_str().ends_with("runs/state"));
    Ok(())
}

#[test]
fn test_cli_overrides_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = create_config_file(
        temp_dir.path(),
        r#"
[llm]
models = ["llama-3.1-8b-instant"]

[recovery]
max_attempts = 4
"#,
    );
    let cli_args = CliArgs {
        config_path: Some(config_path),
        models: Some(vec!["llama-3.3-70b-versatile".to_string()]),
        max_attempts: Some(9),
        ..CliArgs::default()
    };

    let config = Config::discover_with_env(temp_dir.path(), &cli_args, |_| None)?;

    assert_eq!(config.llm.models, ["llama-3.3-70b-versatile"]);
    assert_eq!(config.recovery.max_attempts, 9);
    let effective = config.effective_config();
    assert_eq!(effective["recovery.max_attempts"].1, "cli");
    assert_eq!(effective["llm.max_tokens"].1, "default");
    Ok(())
}

#[test]
fn test_invalid_file_maps_to_config_exit_code() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = create_config_file(
        temp_dir.path(),
        r#"
[pipeline]
target_resolved = "three"
"#,
    );

    let err = Config::discover_with_env(temp_dir.path(), &explicit(config_path), |_| None)
        .unwrap_err();
    let err = MootError::from(err);
    assert_eq!(err.to_exit_code(), ExitCode::CONFIG);
    assert!(err.display_for_user().starts_with("Error:"));
    Ok(())
}

#[test]
#[serial]
fn test_moot_home_overrides_file_state_dir() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = create_config_file(
        temp_dir.path(),
        r#"
[store]
state_dir = "from-file"
"#,
    );
    let custom_home = temp_dir.path().join("custom-home");

    unsafe {
        env::set_var("MOOT_HOME", &custom_home);
    }
    let result = Config::discover_from(temp_dir.path(), &explicit(config_path));
    unsafe {
        env::remove_var("MOOT_HOME");
    }

    let config = result?;
    assert_eq!(config.store.state_dir.as_std_path(), custom_home.as_path());
    assert_eq!(
        config.source_attribution.get("store.state_dir"),
        Some(&ConfigSource::Env)
    );
    Ok(())
}

#[test]
#[serial]
fn test_credentials_follow_configured_variables() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = create_config_file(
        temp_dir.path(),
        r#"
[llm]
api_keys_env = "MOOT_TEST_KEYS"
models_env = "MOOT_TEST_MODELS"
"#,
    );

    unsafe {
        env::set_var("MOOT_TEST_KEYS", " gsk_one , gsk_two,,");
        env::set_var("MOOT_TEST_MODELS", "model-a, model-b");
    }
    let discovered = Config::discover_from(temp_dir.path(), &explicit(config_path));
    let credentials = discovered
        .as_ref()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .and_then(|c| c.resolve_credentials().map_err(|e| anyhow::anyhow!("{e}")));
    unsafe {
        env::remove_var("MOOT_TEST_KEYS");
        env::remove_var("MOOT_TEST_MODELS");
    }

    let credentials = credentials?;
    assert_eq!(credentials.keys, ["gsk_one", "gsk_two"]);
    assert_eq!(credentials.models, ["model-a", "model-b"]);
    // Keys never show up in debug output
    assert!(!format!("{credentials:?}").contains("gsk_one"));
    Ok(())
}

#[test]
#[serial]
fn test_missing_keys_is_reported_by_variable_name() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = Config::builder()
        .state_dir(temp_dir.path().join("state").to_string_lossy().to_string())
        .api_keys_env("MOOT_TEST_KEYS_UNSET")
        .build()?;

    unsafe {
        env::remove_var("MOOT_TEST_KEYS_UNSET");
    }
    let err = config.resolve_credentials().unwrap_err();
    assert!(err.to_string().contains("MOOT_TEST_KEYS_UNSET"));
    Ok(())
}
