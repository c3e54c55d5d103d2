//! CLI command implementations (facade)
//!
//! `run.rs` dispatches to the handlers re-exported here.

mod case;
mod common;
mod pipeline;
mod report;
mod status;
mod verdict;

pub use case::execute_case_command;
pub use pipeline::execute_run_command;
pub use report::execute_report_command;
pub use status::execute_status_command;
pub use verdict::execute_verdict_command;
