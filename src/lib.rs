//! Balances a class-labelled dataset and stages it for a training run.
//!
//! Given a directory with one subdirectory per class, the pipeline counts
//! each class, undersamples every class to the size of the smallest one,
//! splits each class into validation and train subsets, and copies both
//! subsets into two temporary directory trees. The trees are removed once
//! the caller is done with them, whether or not training succeeded.

pub mod config;
pub mod core;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod training;

pub use crate::config::{PipelineConfig, TrainingParams};
pub use crate::core::error::{StagingError, StagingResult};
pub use crate::pipeline::{plan, stage, with_staged_dataset, StagedDataset, StagingPlan};
pub use crate::training::{run_training, CommandTrainer, TrainingCollaborator, TrainingHandoff};
