//! Class balancing by undersampling.
//!
//! Every class is cut down to the size of the smallest class. The cut keeps
//! the first files of the sorted listing, so the retained set only depends on
//! the directory contents.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::dataset::{list_class_files, ClassStats};
use crate::core::error::{StagingError, StagingResult};

/// Files kept for each class after balancing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetainedSet {
    /// Common size of every class
    pub target_size: usize,
    classes: Vec<(String, Vec<PathBuf>)>,
}

impl RetainedSet {
    pub fn new(target_size: usize) -> Self {
        Self {
            target_size,
            classes: Vec::new(),
        }
    }

    pub fn push(&mut self, label: impl Into<String>, files: Vec<PathBuf>) {
        self.classes.push((label.into(), files));
    }

    pub fn get(&self, label: &str) -> Option<&[PathBuf]> {
        self.classes
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, files)| files.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PathBuf])> {
        self.classes.iter().map(|(l, f)| (l.as_str(), f.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Compute the common size for the given classes
pub fn target_size<S: AsRef<str>>(classes: &[S], stats: &ClassStats) -> StagingResult<usize> {
    let mut smallest: Option<usize> = None;
    for label in classes {
        let label = label.as_ref();
        let count = stats
            .get(label)
            .ok_or_else(|| StagingError::UnknownClass(label.to_string()))?;
        smallest = Some(smallest.map_or(count, |s| s.min(count)));
    }
    Ok(smallest.unwrap_or(0))
}

/// Truncate every class to the smallest class size.
///
/// A target size of zero is a valid outcome and yields empty lists. A class
/// that lost files after `stats` was collected is `ClassShrank`.
pub fn select_balanced<S: AsRef<str>>(
    classes: &[S],
    root: &Path,
    stats: &ClassStats,
) -> StagingResult<RetainedSet> {
    let target = target_size(classes, stats)?;
    info!("Balancing {} classes to {} files each", classes.len(), target);

    let mut retained = RetainedSet::new(target);
    for label in classes {
        let label = label.as_ref();
        let mut files = list_class_files(root, label)?;
        if files.len() < target {
            return Err(StagingError::ClassShrank {
                label: label.to_string(),
                expected: target,
                found: files.len(),
            });
        }
        files.truncate(target);
        retained.push(label, files);
    }

    Ok(retained)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dataset::collect_stats;
    use std::fs;
    use tempfile::tempdir;

    fn make_class(root: &Path, label: &str, files: usize) {
        let dir = root.join(label);
        fs::create_dir_all(&dir).unwrap();
        for i in 0..files {
            fs::write(dir.join(format!("{:03}.jpg", i)), [i as u8]).unwrap();
        }
    }

    #[test]
    fn test_all_classes_truncated_to_smallest() {
        let root = tempdir().unwrap();
        for (label, count) in [("A", 10), ("B", 7), ("C", 12)] {
            make_class(root.path(), label, count);
        }
        let classes = ["A", "B", "C"];
        let stats = collect_stats(&classes, root.path()).unwrap();

        let retained = select_balanced(&classes, root.path(), &stats).unwrap();
        assert_eq!(retained.target_size, 7);
        for (_, files) in retained.iter() {
            assert_eq!(files.len(), 7);
        }
    }

    #[test]
    fn test_truncation_keeps_sorted_prefix() {
        let root = tempdir().unwrap();
        make_class(root.path(), "A", 5);
        make_class(root.path(), "B", 2);
        let classes = ["A", "B"];
        let stats = collect_stats(&classes, root.path()).unwrap();

        let retained = select_balanced(&classes, root.path(), &stats).unwrap();
        let names: Vec<_> = retained
            .get("A")
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["000.jpg", "001.jpg"]);
    }

    #[test]
    fn test_zero_target_is_not_an_error() {
        let root = tempdir().unwrap();
        make_class(root.path(), "A", 3);
        make_class(root.path(), "B", 0);
        let classes = ["A", "B"];
        let stats = collect_stats(&classes, root.path()).unwrap();

        let retained = select_balanced(&classes, root.path(), &stats).unwrap();
        assert_eq!(retained.target_size, 0);
        assert!(retained.iter().all(|(_, files)| files.is_empty()));
        assert_eq!(retained.len(), 2);
    }

    #[test]
    fn test_class_shrunk_after_stats() {
        let root = tempdir().unwrap();
        make_class(root.path(), "A", 6);
        make_class(root.path(), "B", 4);
        let classes = ["A", "B"];
        let stats = collect_stats(&classes, root.path()).unwrap();
        fs::remove_file(root.path().join("B").join("001.jpg")).unwrap();

        let err = select_balanced(&classes, root.path(), &stats).unwrap_err();
        match err {
            StagingError::ClassShrank { label, expected, found } => {
                assert_eq!(label, "B");
                assert_eq!(expected, 4);
                assert_eq!(found, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_class_in_stats() {
        let mut stats = ClassStats::new();
        stats.insert("A", 3);
        let err = target_size(&["A", "B"], &stats).unwrap_err();
        assert!(matches!(err, StagingError::UnknownClass(label) if label == "B"));
    }

    #[test]
    fn test_target_size_empty_class_list() {
        let stats = ClassStats::new();
        let classes: [&str; 0] = [];
        assert_eq!(target_size(&classes, &stats).unwrap(), 0);
    }
}
