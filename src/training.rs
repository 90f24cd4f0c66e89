//! Handoff to the external training step.
//!
//! Training itself lives outside this crate. A [`TrainingCollaborator`]
//! receives the staged directories and counts and returns the path of the
//! model artifact it produced. The same handoff is written as JSON next to
//! the model artifact, so the run can be inspected afterwards.

use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, info_span};

use crate::config::{PipelineConfig, TrainingParams};
use crate::core::dataset::ClassStats;
use crate::core::error::{StagingError, StagingResult};
use crate::pipeline::{with_staged_dataset, StagedDataset};

pub const MODEL_FILE_NAME: &str = "model_saved.m5";
pub const HANDOFF_FILE_NAME: &str = "handoff.json";

/// Everything the training step is given
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingHandoff {
    pub train_root: PathBuf,
    pub validation_root: PathBuf,
    pub train_count: usize,
    pub validation_count: usize,
    pub train_stats: ClassStats,
    pub validation_stats: ClassStats,
    pub params: TrainingParams,
    pub model_path: PathBuf,
}

impl TrainingHandoff {
    pub fn from_staged(staged: &StagedDataset, params: &TrainingParams, model_path: PathBuf) -> Self {
        Self {
            train_root: staged.train_root().to_path_buf(),
            validation_root: staged.validation_root().to_path_buf(),
            train_count: staged.train_count,
            validation_count: staged.validation_count,
            train_stats: staged.train_stats.clone(),
            validation_stats: staged.validation_stats.clone(),
            params: params.clone(),
            model_path,
        }
    }

    pub fn steps_per_epoch(&self) -> usize {
        self.train_count / self.params.batch_size.max(1)
    }

    pub fn validation_steps(&self) -> usize {
        self.validation_count / self.params.batch_size.max(1)
    }

    /// Where the JSON form of this handoff is written, beside the model
    pub fn handoff_file(&self) -> PathBuf {
        self.model_path.with_file_name(HANDOFF_FILE_NAME)
    }

    pub fn write_json(&self, path: &Path) -> StagingResult<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| StagingError::io(path, io::Error::from(e)))?;
        fs::write(path, json).map_err(|e| StagingError::io(path, e))
    }

    /// Environment variables describing this handoff
    pub fn env_vars(&self) -> Vec<(&'static str, String)> {
        vec![
            ("STAGE_TRAIN_DIR", self.train_root.display().to_string()),
            ("STAGE_VALIDATION_DIR", self.validation_root.display().to_string()),
            ("STAGE_TRAIN_COUNT", self.train_count.to_string()),
            ("STAGE_VALIDATION_COUNT", self.validation_count.to_string()),
            ("STAGE_STEPS_PER_EPOCH", self.steps_per_epoch().to_string()),
            ("STAGE_VALIDATION_STEPS", self.validation_steps().to_string()),
            ("STAGE_IMG_WIDTH", self.params.image_width.to_string()),
            ("STAGE_IMG_HEIGHT", self.params.image_height.to_string()),
            ("STAGE_EPOCHS", self.params.epochs.to_string()),
            ("STAGE_BATCH_SIZE", self.params.batch_size.to_string()),
            ("STAGE_MODEL_PATH", self.model_path.display().to_string()),
            ("STAGE_HANDOFF_FILE", self.handoff_file().display().to_string()),
        ]
    }
}

/// `models_dir/<unix seconds>/model_saved.m5`
pub fn model_path(models_dir: &Path, now: SystemTime) -> PathBuf {
    let secs = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    models_dir.join(secs.to_string()).join(MODEL_FILE_NAME)
}

/// Consumes staged data and produces a model artifact
pub trait TrainingCollaborator {
    fn train(&mut self, handoff: &TrainingHandoff) -> StagingResult<PathBuf>;
}

/// Runs an external program with the handoff passed as `STAGE_*` variables
#[derive(Debug, Clone)]
pub struct CommandTrainer {
    program: String,
    args: Vec<String>,
}

impl CommandTrainer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl TrainingCollaborator for CommandTrainer {
    fn train(&mut self, handoff: &TrainingHandoff) -> StagingResult<PathBuf> {
        info!("Running training command: {} {:?}", self.program, self.args);

        let status = Command::new(&self.program)
            .args(&self.args)
            .envs(handoff.env_vars())
            .status()
            .map_err(|e| {
                StagingError::TrainingFailed(format!("failed to start {:?}: {}", self.program, e))
            })?;

        if !status.success() {
            return Err(StagingError::TrainingFailed(format!(
                "{:?} exited with {}",
                self.program, status
            )));
        }

        Ok(handoff.model_path.clone())
    }
}

/// Stage the dataset, hand it to `trainer`, and tear the staging down.
pub fn run_training(
    config: &PipelineConfig,
    trainer: &mut dyn TrainingCollaborator,
) -> StagingResult<PathBuf> {
    let _span = info_span!("run_training").entered();

    with_staged_dataset(config, |staged| {
        let model_path = model_path(&config.training.models_dir, SystemTime::now());
        if let Some(parent) = model_path.parent() {
            fs::create_dir_all(parent).map_err(|e| StagingError::io(parent, e))?;
        }

        let handoff = TrainingHandoff::from_staged(staged, &config.training, model_path);
        handoff.write_json(&handoff.handoff_file())?;
        info!(
            "Training with {} train / {} validation samples per class ({} steps per epoch)",
            handoff.train_count,
            handoff.validation_count,
            handoff.steps_per_epoch()
        );

        let artifact = trainer.train(&handoff)?;
        info!("Training finished, model saved to: {:?}", artifact);
        Ok(artifact)
    })
}
