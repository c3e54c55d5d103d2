//! Configuration model, discovery, and validation for moot

mod config;

pub use config::*;
