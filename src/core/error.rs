use std::path::PathBuf;
use thiserror::Error;

/// Result type for staging operations
pub type StagingResult<T> = Result<T, StagingError>;

/// Error types for the balancing and staging pipeline.
///
/// Every variant is fatal for the current run. Nothing in the crate retries.
#[derive(Debug, Error)]
pub enum StagingError {
    #[error("class directory missing for {label:?} under {root}")]
    MissingClassDirectory { label: String, root: PathBuf },

    #[error("class {0:?} has no collected statistics")]
    UnknownClass(String),

    #[error("class {label:?} shrank to {found} files, below the balanced size {expected}")]
    ClassShrank {
        label: String,
        expected: usize,
        found: usize,
    },

    #[error("validation proportion {0} is outside [0, 1]")]
    InvalidProportion(f64),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to create staging directory: {0}")]
    StagingCreateFailed(#[source] std::io::Error),

    #[error("failed to stage {file}: {source}")]
    StageCopyFailed {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove staging directory {path}: {source}")]
    Teardown {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("training failed: {0}")]
    TrainingFailed(String),
}

impl StagingError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StagingError::Io {
            path: path.into(),
            source,
        }
    }
}
