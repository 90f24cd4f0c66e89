//! Pipeline entry points.
//!
//! `plan` runs the in-memory stages (stats, balancing, split). `stage` adds
//! the staging trees on top. `with_staged_dataset` is the scoped form most
//! callers want: the staging trees exist only while the closure runs.

use std::path::Path;
use tracing::{info, info_span, warn};

use crate::config::PipelineConfig;
use crate::core::analysis::{select_balanced, split, SeededSampler, SplitAssignment};
use crate::core::dataset::{collect_stats, ClassStats};
use crate::core::error::StagingResult;
use crate::core::operations::StagingArea;
use crate::report::report;

/// In-memory result of balancing and splitting
#[derive(Debug, Clone)]
pub struct StagingPlan {
    pub input_stats: ClassStats,
    pub target_size: usize,
    pub assignment: SplitAssignment,
    /// Seed the validation sampler actually used
    pub seed: u64,
}

impl StagingPlan {
    /// Per-class training count, read from the first class
    pub fn train_per_class(&self) -> usize {
        self.assignment
            .iter()
            .next()
            .map_or(0, |(_, s)| s.train.len())
    }

    /// Per-class validation count, read from the first class
    pub fn validation_per_class(&self) -> usize {
        self.assignment
            .iter()
            .next()
            .map_or(0, |(_, s)| s.validation.len())
    }
}

/// Staging trees populated for one run, plus the counts read back from them
#[derive(Debug)]
pub struct StagedDataset {
    pub area: StagingArea,
    pub train_stats: ClassStats,
    pub validation_stats: ClassStats,
    /// Files per class in the training tree
    pub train_count: usize,
    /// Files per class in the validation tree
    pub validation_count: usize,
}

impl StagedDataset {
    pub fn train_root(&self) -> &Path {
        self.area.train_root()
    }

    pub fn validation_root(&self) -> &Path {
        self.area.validation_root()
    }
}

/// Collect stats, balance and split without touching the filesystem.
pub fn plan(config: &PipelineConfig) -> StagingResult<StagingPlan> {
    config.validate()?;

    let input_stats = collect_stats(&config.classes, &config.source_root)?;
    report("Input data stats:", &input_stats);

    let retained = select_balanced(&config.classes, &config.source_root, &input_stats)?;

    let mut sampler = match config.random_seed {
        Some(seed) => SeededSampler::new(seed),
        None => SeededSampler::from_entropy(),
    };
    info!("Validation sampler seed: {}", sampler.seed());
    let assignment = split(&retained, config.validation_proportion, &mut sampler)?;

    Ok(StagingPlan {
        input_stats,
        target_size: retained.target_size,
        assignment,
        seed: sampler.seed(),
    })
}

/// Plan, then copy the selection into fresh staging trees.
///
/// On any failure after the trees were created they are removed before the
/// error is returned.
pub fn stage(config: &PipelineConfig) -> StagingResult<StagedDataset> {
    let _span = info_span!("stage", source = %config.source_root.display()).entered();

    let plan = plan(config)?;

    let mut area = StagingArea::create(config.staging_dir.as_deref())?;
    let (train_stats, validation_stats) = match populate(&area, &plan, config) {
        Ok(stats) => stats,
        Err(e) => {
            if let Err(cleanup) = area.teardown() {
                warn!("Teardown after failed staging also failed: {}", cleanup);
            }
            return Err(e);
        }
    };

    let first = &config.classes[0];
    let train_count = train_stats.get(first).unwrap_or(0);
    let validation_count = validation_stats.get(first).unwrap_or(0);

    Ok(StagedDataset {
        area,
        train_stats,
        validation_stats,
        train_count,
        validation_count,
    })
}

/// Copy the plan into the staging trees and read the counts back from disk
fn populate(
    area: &StagingArea,
    plan: &StagingPlan,
    config: &PipelineConfig,
) -> StagingResult<(ClassStats, ClassStats)> {
    area.materialize(&plan.assignment, config.copy_workers)?;

    let train_stats = collect_stats(&config.classes, area.train_root())?;
    let validation_stats = collect_stats(&config.classes, area.validation_root())?;
    report("Normalized training data stats:", &train_stats);
    report("Normalized validation data stats:", &validation_stats);

    Ok((train_stats, validation_stats))
}

/// Stage the dataset, run `f` against it, and always tear the staging down.
///
/// An error from `f` wins over a teardown error; a teardown error is only
/// returned when `f` succeeded.
pub fn with_staged_dataset<T, F>(config: &PipelineConfig, f: F) -> StagingResult<T>
where
    F: FnOnce(&StagedDataset) -> StagingResult<T>,
{
    let mut staged = stage(config)?;
    let outcome = f(&staged);
    let cleanup = staged.area.teardown();

    match (outcome, cleanup) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(cleanup)) => {
            warn!("Teardown after failed run also failed: {}", cleanup);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::StagingError;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::{tempdir, TempDir};

    fn source_tree(classes: &[(&str, usize)]) -> TempDir {
        let root = tempdir().unwrap();
        for (label, files) in classes {
            let dir = root.path().join(label);
            fs::create_dir_all(&dir).unwrap();
            for i in 0..*files {
                fs::write(dir.join(format!("{:04}.png", i)), format!("{label}/{i}")).unwrap();
            }
        }
        root
    }

    fn config_for(source: &Path, staging: &Path, classes: &[&str]) -> PipelineConfig {
        let mut config = PipelineConfig::new(classes.iter().copied(), source);
        config.random_seed = Some(5);
        config.staging_dir = Some(staging.to_path_buf());
        config
    }

    fn entries(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_plan_scenario() {
        let source = source_tree(&[("A", 10), ("B", 7)]);
        let staging = tempdir().unwrap();
        let config = config_for(source.path(), staging.path(), &["A", "B"]);

        let plan = plan(&config).unwrap();
        assert_eq!(plan.target_size, 7);
        assert_eq!(plan.train_per_class(), 6);
        assert_eq!(plan.validation_per_class(), 1);
        assert_eq!(plan.seed, 5);
        assert_eq!(entries(staging.path()), 0);
    }

    #[test]
    fn test_with_staged_dataset_scenario() {
        let source = source_tree(&[("A", 10), ("B", 7)]);
        let staging = tempdir().unwrap();
        let config = config_for(source.path(), staging.path(), &["A", "B"]);

        let roots = with_staged_dataset(&config, |staged| {
            assert_eq!(staged.train_count, 6);
            assert_eq!(staged.validation_count, 1);
            for label in ["A", "B"] {
                assert_eq!(entries(&staged.train_root().join(label)), 6);
                assert_eq!(entries(&staged.validation_root().join(label)), 1);
            }
            Ok((staged.train_root().to_path_buf(), staged.validation_root().to_path_buf()))
        })
        .unwrap();

        assert!(!roots.0.exists());
        assert!(!roots.1.exists());
        assert_eq!(entries(staging.path()), 0);
    }

    #[test]
    fn test_teardown_runs_when_closure_fails() {
        let source = source_tree(&[("A", 4), ("B", 4)]);
        let staging = tempdir().unwrap();
        let config = config_for(source.path(), staging.path(), &["A", "B"]);

        let mut seen: Option<PathBuf> = None;
        let err = with_staged_dataset(&config, |staged| -> StagingResult<()> {
            seen = Some(staged.train_root().to_path_buf());
            Err(StagingError::TrainingFailed("boom".to_string()))
        })
        .unwrap_err();

        assert!(matches!(err, StagingError::TrainingFailed(_)));
        assert!(!seen.unwrap().exists());
        assert_eq!(entries(staging.path()), 0);
    }

    #[test]
    fn test_missing_class_fails_before_staging() {
        let source = source_tree(&[("A", 3), ("B", 3)]);
        let staging = tempdir().unwrap();
        let config = config_for(source.path(), staging.path(), &["A", "B", "D"]);

        let err = stage(&config).unwrap_err();
        assert!(matches!(err, StagingError::MissingClassDirectory { ref label, .. } if label == "D"));
        assert_eq!(entries(staging.path()), 0);
    }

    #[test]
    fn test_invalid_proportion_fails_before_staging() {
        let source = source_tree(&[("A", 3)]);
        let staging = tempdir().unwrap();
        let mut config = config_for(source.path(), staging.path(), &["A"]);
        config.validation_proportion = -0.5;

        let err = stage(&config).unwrap_err();
        assert!(matches!(err, StagingError::InvalidProportion(_)));
        assert_eq!(entries(staging.path()), 0);
    }

    #[test]
    fn test_zero_class_stages_empty_trees() {
        let source = source_tree(&[("A", 5), ("B", 0)]);
        let staging = tempdir().unwrap();
        let config = config_for(source.path(), staging.path(), &["A", "B"]);

        with_staged_dataset(&config, |staged| {
            assert_eq!(staged.train_count, 0);
            assert_eq!(staged.validation_count, 0);
            for label in ["A", "B"] {
                assert_eq!(entries(&staged.train_root().join(label)), 0);
                assert_eq!(entries(&staged.validation_root().join(label)), 0);
            }
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_source_tree_untouched() {
        let source = source_tree(&[("A", 6), ("B", 9)]);
        let staging = tempdir().unwrap();
        let mut config = config_for(source.path(), staging.path(), &["A", "B"]);
        config.copy_workers = 3;

        with_staged_dataset(&config, |_| Ok(())).unwrap();
        assert_eq!(entries(&source.path().join("A")), 6);
        assert_eq!(entries(&source.path().join("B")), 9);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let source = source_tree(&[("A", 30), ("B", 25)]);
        let staging = tempdir().unwrap();
        let config = config_for(source.path(), staging.path(), &["A", "B"]);

        let first = plan(&config).unwrap();
        let second = plan(&config).unwrap();
        assert_eq!(first.assignment, second.assignment);
    }
}
