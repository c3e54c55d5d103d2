use std::path::PathBuf;

/// Configuration overrides taken from the command line.
///
/// Every field is optional; `None` leaves the value to the config file,
/// the environment, or the defaults.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Explicit config file, skipping upward discovery
    pub config_path: Option<PathBuf>,
    pub state_dir: Option<String>,
    pub models: Option<Vec<String>>,
    pub max_attempts: Option<u32>,
    pub target_resolved: Option<usize>,
    pub case_retries: Option<u32>,
    pub sections_file: Option<String>,
}
