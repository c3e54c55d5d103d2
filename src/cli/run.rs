//! CLI entry point and dispatch logic
//!
//! `run()` parses arguments, discovers the configuration, installs logging,
//! creates the tokio runtime and dispatches to the command handlers. It
//! prints every error itself; main.rs only maps the exit code.

use clap::Parser;

use super::args::{Cli, Commands};
use super::commands;

use crate::redaction::redact_secrets;
use crate::{CliArgs, Config, ExitCode, MootError};

/// Main CLI execution function.
///
/// Returns `Err(ExitCode)` after the error has been reported on stderr.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    let mut cli_args = CliArgs {
        config_path: cli.config.clone(),
        state_dir: cli.state_dir.clone(),
        models: (!cli.models.is_empty()).then(|| cli.models.clone()),
        max_attempts: cli.max_attempts,
        ..CliArgs::default()
    };
    if let Commands::Run {
        target,
        case_retries,
        sections_file,
        ..
    } = &cli.command
    {
        cli_args.target_resolved = *target;
        cli_args.case_retries = *case_retries;
        cli_args.sections_file = sections_file.clone();
    }

    if let Err(e) = crate::logging::init_tracing(cli.verbose, cli.log_format) {
        eprintln!("✗ Failed to initialize logging: {e}");
        return Err(ExitCode::INTERNAL);
    }

    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => {
            let err = MootError::from(err);
            eprintln!("{}", err.display_for_user());
            return Err(err.to_exit_code());
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ Failed to create async runtime: {e}");
            return Err(ExitCode::INTERNAL);
        }
    };

    let operation = cli.command.name();
    let result = rt.block_on(async {
        match cli.command {
            Commands::Run {
                section,
                force,
                json,
                ..
            } => commands::execute_run_command(section.as_deref(), force, json, &config).await,
            Commands::Case {
                section,
                force,
                json,
            } => commands::execute_case_command(&section, force, json, &config).await,
            Commands::Verdict {
                limit,
                case_id,
                force,
                json,
            } => {
                commands::execute_verdict_command(limit, case_id.as_deref(), force, json, &config)
                    .await
            }
            Commands::Report { json, csv } => {
                commands::execute_report_command(json, csv.as_deref(), &config)
            }
            Commands::Status { json } => commands::execute_status_command(json, &config),
        }
    });

    if let Err(error) = result {
        if let Some(moot_error) = error.downcast_ref::<MootError>() {
            eprintln!("{}", moot_error.display_for_user());
            tracing::debug!(operation, error = %moot_error, "Command failed");
            return Err(moot_error.to_exit_code());
        }

        eprintln!("✗ Unexpected error: {}", redact_secrets(&format!("{error:#}")));
        eprintln!("\n  General troubleshooting:");
        eprintln!("    - Run with --verbose for more detailed output");
        eprintln!("    - Check that the state directory is writable");
        return Err(ExitCode::INTERNAL);
    }

    Ok(())
}
