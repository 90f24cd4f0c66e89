use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use super::formatter::BracketedFormatter;
use crate::core::error::{StagingError, StagingResult};

/// Platform log directory, e.g. `~/.local/share/balanced-staging/logs` on Linux
pub fn default_log_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "balanced-staging").map(|dirs| dirs.data_local_dir().join("logs"))
}

/// Install the global subscriber.
///
/// Logs always go to stdout. When `log_dir` is given a timestamped file is
/// created there as well and its path returned. `RUST_LOG` overrides the
/// default `debug` filter.
pub fn setup_logging(log_dir: Option<&Path>) -> StagingResult<Option<PathBuf>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let stdout_layer = fmt::layer()
        .event_format(BracketedFormatter)
        .with_writer(std::io::stdout);

    let (file_layer, log_path) = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir).map_err(|e| StagingError::io(dir, e))?;

            let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
            let log_path = dir.join(format!("balanced_staging_{}.log", timestamp));
            let file = fs::OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&log_path)
                .map_err(|e| StagingError::io(&log_path, e))?;

            let layer = fmt::layer()
                .event_format(BracketedFormatter)
                .with_writer(Mutex::new(file))
                .with_ansi(false);
            (Some(layer), Some(log_path))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    if let Some(path) = &log_path {
        info!("Log file created at: {:?}", path);
    }
    Ok(log_path)
}
