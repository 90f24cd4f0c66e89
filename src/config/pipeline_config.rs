use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::analysis::check_proportion;
use crate::core::error::{StagingError, StagingResult};

pub const DEFAULT_VALIDATION_PROPORTION: f64 = 0.2;

/// Settings passed through to the external training step.
///
/// Nothing in this crate interprets them beyond deriving step counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    pub image_width: u32,
    pub image_height: u32,
    pub epochs: u32,
    pub batch_size: usize,
    /// Model artifacts are written to `models_dir/<unix seconds>/model_saved.m5`
    pub models_dir: PathBuf,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            image_width: 290,
            image_height: 325,
            epochs: 50,
            batch_size: 15,
            models_dir: PathBuf::from("models"),
        }
    }
}

/// Everything one staging run needs.
///
/// Replaces hardcoded class lists, paths and hyperparameters with one value
/// handed to the pipeline entry points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Class labels, each naming a subdirectory of `source_root`
    pub classes: Vec<String>,
    /// Directory holding one subdirectory per class
    pub source_root: PathBuf,
    /// Fraction of each balanced class that goes to validation
    pub validation_proportion: f64,
    /// Seed for the validation sampler. Drawn at random when unset.
    pub random_seed: Option<u64>,
    /// Number of threads copying files into staging
    pub copy_workers: usize,
    /// Where staging directories are created. System temp dir when unset.
    pub staging_dir: Option<PathBuf>,
    pub training: TrainingParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            classes: ["A1", "A3", "B1", "B3", "C1", "C3", "None"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            source_root: PathBuf::from("data").join("train"),
            validation_proportion: DEFAULT_VALIDATION_PROPORTION,
            random_seed: None,
            copy_workers: 1,
            staging_dir: None,
            training: TrainingParams::default(),
        }
    }
}

impl PipelineConfig {
    /// Build a config for the given classes and source root, defaults elsewhere
    pub fn new<S: Into<String>>(classes: impl IntoIterator<Item = S>, source_root: impl Into<PathBuf>) -> Self {
        Self {
            classes: classes.into_iter().map(Into::into).collect(),
            source_root: source_root.into(),
            ..Self::default()
        }
    }

    /// Load a JSON config file. Missing fields take their default values.
    pub fn load(path: &Path) -> StagingResult<Self> {
        info!("Loading pipeline config from: {:?}", path);
        let contents = fs::read_to_string(path).map_err(|e| StagingError::io(path, e))?;
        serde_json::from_str(&contents).map_err(|e| StagingError::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Reject configurations that cannot produce a run.
    ///
    /// Checked before anything touches the filesystem.
    pub fn validate(&self) -> StagingResult<()> {
        check_proportion(self.validation_proportion)?;

        if self.classes.is_empty() {
            return Err(StagingError::InvalidConfig("class list is empty".to_string()));
        }
        let mut seen = HashSet::new();
        for label in &self.classes {
            if label.is_empty() || label.contains(&['/', '\\'][..]) || label == "." || label == ".." {
                return Err(StagingError::InvalidConfig(format!(
                    "class label {:?} is not a plain directory name",
                    label
                )));
            }
            if !seen.insert(label.as_str()) {
                return Err(StagingError::InvalidConfig(format!(
                    "class label {:?} is listed twice",
                    label
                )));
            }
        }
        if self.copy_workers == 0 {
            return Err(StagingError::InvalidConfig(
                "copy_workers must be at least 1".to_string(),
            ));
        }
        if self.training.batch_size == 0 {
            return Err(StagingError::InvalidConfig(
                "batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
