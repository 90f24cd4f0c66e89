//! Stratified train/validation split.
//!
//! Each class is split on its own, so both subsets keep the balanced class
//! proportions. Which files land in validation is decided by a
//! [`SamplingStrategy`], which makes the split reproducible when seeded.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use tracing::{debug, info};

use super::balancer::RetainedSet;
use crate::core::error::{StagingError, StagingResult};

/// Picks `amount` distinct indices out of `0..len`
pub trait SamplingStrategy {
    fn sample_indices(&mut self, len: usize, amount: usize) -> Vec<usize>;
}

/// Uniform sampling without replacement from a seeded RNG
#[derive(Debug, Clone)]
pub struct SeededSampler {
    seed: u64,
    rng: StdRng,
}

impl SeededSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seeded from the thread RNG. The seed is still retrievable for logging.
    pub fn from_entropy() -> Self {
        Self::new(rand::thread_rng().gen())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl SamplingStrategy for SeededSampler {
    fn sample_indices(&mut self, len: usize, amount: usize) -> Vec<usize> {
        rand::seq::index::sample(&mut self.rng, len, amount.min(len)).into_vec()
    }
}

/// Validation and train files of one class
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassSplit {
    pub validation: Vec<PathBuf>,
    pub train: Vec<PathBuf>,
}

/// Split result for all classes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitAssignment {
    classes: Vec<(String, ClassSplit)>,
}

impl SplitAssignment {
    pub fn get(&self, label: &str) -> Option<&ClassSplit> {
        self.classes
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, split)| split)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ClassSplit)> {
        self.classes.iter().map(|(l, s)| (l.as_str(), s))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Total number of files across both subsets of every class
    pub fn file_count(&self) -> usize {
        self.classes
            .iter()
            .map(|(_, s)| s.validation.len() + s.train.len())
            .sum()
    }
}

/// Number of validation files for a class of `len` files
pub fn validation_size(len: usize, proportion: f64) -> usize {
    ((len as f64 * proportion).floor() as usize).min(len)
}

pub fn check_proportion(proportion: f64) -> StagingResult<()> {
    if !(0.0..=1.0).contains(&proportion) {
        return Err(StagingError::InvalidProportion(proportion));
    }
    Ok(())
}

/// Split every retained class into validation and train subsets.
///
/// Both subsets keep the order of the retained list. Every retained file ends
/// up in exactly one subset.
pub fn split(
    retained: &RetainedSet,
    proportion: f64,
    sampler: &mut dyn SamplingStrategy,
) -> StagingResult<SplitAssignment> {
    check_proportion(proportion)?;

    let mut assignment = SplitAssignment::default();
    for (label, files) in retained.iter() {
        let amount = validation_size(files.len(), proportion);

        let mut picked = vec![false; files.len()];
        for idx in sampler.sample_indices(files.len(), amount) {
            picked[idx] = true;
        }

        let mut class_split = ClassSplit::default();
        for (file, is_validation) in files.iter().zip(picked) {
            if is_validation {
                class_split.validation.push(file.clone());
            } else {
                class_split.train.push(file.clone());
            }
        }

        debug!(
            "Class {:?}: {} validation, {} train",
            label,
            class_split.validation.len(),
            class_split.train.len()
        );
        assignment.classes.push((label.to_string(), class_split));
    }

    info!(
        "Split {} classes at validation proportion {}",
        assignment.len(),
        proportion
    );
    Ok(assignment)
}
