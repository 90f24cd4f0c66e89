//! Ephemeral train/validation directory trees.
//!
//! A [`StagingArea`] owns two freshly created, uniquely named directories.
//! It is the only thing allowed to delete them: `teardown` removes both trees
//! and is safe to call repeatedly, and `Drop` runs it for anything still
//! owned so an early return or a panic cannot leave staging data behind.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempDir};
use tracing::{debug, error, info, warn};

use super::file_ops::{copy_all, remove_tree, CopyJob};
use crate::core::analysis::SplitAssignment;
use crate::core::error::{StagingError, StagingResult};

const TRAIN_PREFIX: &str = "train-";
const VALIDATION_PREFIX: &str = "validation-";

#[derive(Debug)]
pub struct StagingArea {
    train_root: PathBuf,
    validation_root: PathBuf,
    train: Option<TempDir>,
    validation: Option<TempDir>,
}

fn make_dir(prefix: &str, base: Option<&Path>) -> StagingResult<TempDir> {
    let mut builder = Builder::new();
    builder.prefix(prefix);
    let dir = match base {
        Some(base) => builder.tempdir_in(base),
        None => builder.tempdir(),
    };
    dir.map_err(StagingError::StagingCreateFailed)
}

impl StagingArea {
    /// Create both staging roots under `base`, or the system temp dir.
    ///
    /// If the second directory cannot be created the first one is removed
    /// again before the error is returned.
    pub fn create(base: Option<&Path>) -> StagingResult<Self> {
        Self::create_with(base, make_dir)
    }

    fn create_with<F>(base: Option<&Path>, mut make: F) -> StagingResult<Self>
    where
        F: FnMut(&str, Option<&Path>) -> StagingResult<TempDir>,
    {
        let train = make(TRAIN_PREFIX, base)?;
        let validation = match make(VALIDATION_PREFIX, base) {
            Ok(dir) => dir,
            Err(e) => {
                if let Err(cleanup) = remove_tree(train.path()) {
                    warn!("Could not remove half-created staging root: {}", cleanup);
                }
                return Err(e);
            }
        };

        info!(
            "Created staging directories: train={:?}, validation={:?}",
            train.path(),
            validation.path()
        );

        Ok(Self {
            train_root: train.path().to_path_buf(),
            validation_root: validation.path().to_path_buf(),
            train: Some(train),
            validation: Some(validation),
        })
    }

    pub fn train_root(&self) -> &Path {
        &self.train_root
    }

    pub fn validation_root(&self) -> &Path {
        &self.validation_root
    }

    /// Whether `teardown` has removed both trees
    pub fn is_torn_down(&self) -> bool {
        self.train.is_none() && self.validation.is_none()
    }

    /// Populate both trees from a split assignment.
    ///
    /// One directory per class is created in each tree, even for classes with
    /// no files. Copying stops at the first failure; the caller still owns
    /// the area and must tear it down.
    pub fn materialize(&self, assignment: &SplitAssignment, workers: usize) -> StagingResult<()> {
        if self.is_torn_down() {
            return Err(StagingError::InvalidConfig(
                "cannot materialize into a torn down staging area".to_string(),
            ));
        }

        let mut jobs = Vec::with_capacity(assignment.file_count());
        for (label, class_split) in assignment.iter() {
            let train_dir = self.train_root.join(label);
            let validation_dir = self.validation_root.join(label);
            for dir in [&train_dir, &validation_dir] {
                fs::create_dir_all(dir).map_err(|e| StagingError::io(dir, e))?;
            }

            jobs.extend(class_split.train.iter().map(|src| CopyJob {
                src: src.clone(),
                dest_dir: train_dir.clone(),
            }));
            jobs.extend(class_split.validation.iter().map(|src| CopyJob {
                src: src.clone(),
                dest_dir: validation_dir.clone(),
            }));
        }

        info!("Copying {} files into staging with {} worker(s)", jobs.len(), workers.max(1));
        copy_all(&jobs, workers)?;
        debug!("Staging materialized");
        Ok(())
    }

    /// Remove both trees.
    ///
    /// A root is only released once it is gone. A root whose removal failed
    /// stays owned, so the next call (or `Drop`) tries again. Once both are
    /// removed further calls are no-ops.
    pub fn teardown(&mut self) -> StagingResult<()> {
        let mut result = Ok(());
        for slot in [&mut self.train, &mut self.validation] {
            let Some(dir) = slot.as_ref() else {
                continue;
            };
            match remove_tree(dir.path()) {
                Ok(()) => *slot = None,
                Err(e) => {
                    error!("{}", e);
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
            }
        }
        if result.is_ok() {
            info!(
                "Removed staging directories: train={:?}, validation={:?}",
                self.train_root, self.validation_root
            );
        }
        result
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        if !self.is_torn_down() {
            debug!("Staging area dropped before teardown, removing it now");
            if let Err(e) = self.teardown() {
                error!("Failed to clean up staging area on drop: {}", e);
            }
        }
    }
}

/// Remove two staging trees by path. Missing paths are ignored.
pub fn teardown(train_root: &Path, validation_root: &Path) -> StagingResult<()> {
    remove_tree(train_root)?;
    remove_tree(validation_root)
}
