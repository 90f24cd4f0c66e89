//! Logging for the staging pipeline
//!
//! This module provides:
//! - Bracketed event formatting
//! - Stdout logging, plus a timestamped log file when a directory is given

mod formatter;
mod setup;

pub use formatter::BracketedFormatter;
pub use setup::{default_log_dir, setup_logging};
