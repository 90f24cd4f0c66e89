use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::core::error::{StagingError, StagingResult};

/// Per-class example counts, kept in the order the classes were supplied.
///
/// Serializes as a list of `[label, count]` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ClassStats {
    entries: Vec<(String, usize)>,
}

impl ClassStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the count for a class, replacing any previous value
    pub fn insert(&mut self, label: impl Into<String>, count: usize) {
        let label = label.into();
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = count,
            None => self.entries.push((label, count)),
        }
    }

    pub fn get(&self, label: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, count)| *count)
    }

    /// Smallest count across all recorded classes, `None` when empty
    pub fn min_count(&self) -> Option<usize> {
        self.entries.iter().map(|(_, count)| *count).min()
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, count)| *count).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(l, c)| (l.as_str(), *c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolve the directory for a class, failing if it is absent or not a directory.
pub fn class_dir(root: &Path, label: &str) -> StagingResult<PathBuf> {
    let dir = root.join(label);
    if !dir.is_dir() {
        return Err(StagingError::MissingClassDirectory {
            label: label.to_string(),
            root: root.to_path_buf(),
        });
    }
    Ok(dir)
}

/// List the immediate files of `root/label`, sorted by path.
///
/// Subdirectories are skipped. Sorting makes truncation and sampling
/// reproducible regardless of the order the OS returns entries in.
pub fn list_class_files(root: &Path, label: &str) -> StagingResult<Vec<PathBuf>> {
    let dir = class_dir(root, label)?;
    let entries = fs::read_dir(&dir).map_err(|e| StagingError::io(&dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StagingError::io(&dir, e))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    debug!("Found {} files for class {:?} in {:?}", files.len(), label, dir);
    Ok(files)
}

/// Count the files of every class under `root`.
///
/// Every label must have a directory; an empty directory counts as zero.
pub fn collect_stats<S: AsRef<str>>(classes: &[S], root: &Path) -> StagingResult<ClassStats> {
    info!("Collecting class statistics from: {:?}", root);

    let mut stats = ClassStats::new();
    for label in classes {
        let label = label.as_ref();
        let count = list_class_files(root, label)?.len();
        stats.insert(label, count);
    }

    Ok(stats)
}
