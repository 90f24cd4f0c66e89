use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use tracing::{debug, error, trace, warn};

use crate::core::error::{StagingError, StagingResult};

/// A single file copy into a staging directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyJob {
    pub src: PathBuf,
    pub dest_dir: PathBuf,
}

/// Copy a file into `dest_dir`, keeping its file name.
///
/// # Returns
/// * `Ok(PathBuf)` with the path of the copy
/// * `Err(StagingError::StageCopyFailed)` if the copy failed
pub fn copy_into_dir(src: &Path, dest_dir: &Path) -> StagingResult<PathBuf> {
    let file_name = src.file_name().ok_or_else(|| StagingError::StageCopyFailed {
        file: src.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
    })?;
    let dest = dest_dir.join(file_name);

    trace!("Copying {:?} to {:?}", src, dest);
    fs::copy(src, &dest).map_err(|e| {
        error!("Failed to copy file from {:?} to {:?}: {}", src, dest, e);
        StagingError::StageCopyFailed {
            file: src.to_path_buf(),
            source: e,
        }
    })?;

    Ok(dest)
}

/// Recursively remove a directory tree. A path that no longer exists is not an error.
pub fn remove_tree(path: &Path) -> StagingResult<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => {
            debug!("Removed directory tree {:?}", path);
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Directory tree {:?} already removed", path);
            Ok(())
        }
        Err(e) => Err(StagingError::Teardown {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Run copy jobs, stopping at the first failure.
///
/// With more than one worker the jobs are pulled from a shared counter by a
/// bounded set of scoped threads. A failure raises the cancel flag so no new
/// copy starts; copies already running finish. The first recorded error is
/// returned.
pub fn copy_all(jobs: &[CopyJob], workers: usize) -> StagingResult<()> {
    let workers = workers.max(1).min(jobs.len().max(1));

    if workers == 1 {
        for job in jobs {
            copy_into_dir(&job.src, &job.dest_dir)?;
        }
        return Ok(());
    }

    let next = AtomicUsize::new(0);
    let cancel = AtomicBool::new(false);
    let first_error: Mutex<Option<StagingError>> = Mutex::new(None);

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                if cancel.load(Ordering::Relaxed) {
                    return;
                }
                let idx = next.fetch_add(1, Ordering::Relaxed);
                let Some(job) = jobs.get(idx) else {
                    return;
                };
                if let Err(e) = copy_into_dir(&job.src, &job.dest_dir) {
                    cancel.store(true, Ordering::Relaxed);
                    let mut slot = first_error.lock().unwrap_or_else(|p| p.into_inner());
                    if slot.is_none() {
                        *slot = Some(e);
                    }
                    return;
                }
            });
        }
    });

    let first_error = first_error.into_inner().unwrap_or_else(|p| p.into_inner());
    match first_error {
        Some(e) => {
            warn!("Copy aborted after first failure: {}", e);
            Err(e)
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_copy_into_dir_preserves_bytes() {
        let src_dir = tempdir().unwrap();
        let dest_dir = tempdir().unwrap();
        let src = src_dir.path().join("frame.png");
        let payload: Vec<u8> = (0..=255).collect();
        fs::write(&src, &payload).unwrap();

        let dest = copy_into_dir(&src, dest_dir.path()).unwrap();
        assert_eq!(dest, dest_dir.path().join("frame.png"));
        assert_eq!(fs::read(dest).unwrap(), payload);
    }

    #[test]
    fn test_copy_missing_source_fails() {
        let dest_dir = tempdir().unwrap();
        let missing = dest_dir.path().join("nope.png");
        let err = copy_into_dir(&missing, dest_dir.path()).unwrap_err();
        assert!(matches!(err, StagingError::StageCopyFailed { file, .. } if file == missing));
    }

    #[test]
    fn test_remove_tree_is_idempotent() {
        let dir = tempdir().unwrap();
        let tree = dir.path().join("tree");
        fs::create_dir_all(tree.join("A")).unwrap();
        fs::write(tree.join("A").join("x.png"), b"x").unwrap();

        remove_tree(&tree).unwrap();
        assert!(!tree.exists());
        remove_tree(&tree).unwrap();
    }

    #[test]
    fn test_copy_all_parallel() {
        let src_dir = tempdir().unwrap();
        let dest_dir = tempdir().unwrap();
        let jobs: Vec<CopyJob> = (0..32)
            .map(|i| {
                let src = src_dir.path().join(format!("{:02}.bin", i));
                fs::write(&src, vec![i as u8; 64]).unwrap();
                CopyJob {
                    src,
                    dest_dir: dest_dir.path().to_path_buf(),
                }
            })
            .collect();

        copy_all(&jobs, 4).unwrap();
        for (i, job) in jobs.iter().enumerate() {
            let copied = dest_dir.path().join(job.src.file_name().unwrap());
            assert_eq!(fs::read(copied).unwrap(), vec![i as u8; 64]);
        }
    }

    #[test]
    fn test_copy_all_reports_failure() {
        let src_dir = tempdir().unwrap();
        let dest_dir = tempdir().unwrap();
        let mut jobs = Vec::new();
        for i in 0..8 {
            let src = src_dir.path().join(format!("{}.bin", i));
            fs::write(&src, [i as u8]).unwrap();
            jobs.push(CopyJob {
                src,
                dest_dir: dest_dir.path().to_path_buf(),
            });
        }
        let missing = src_dir.path().join("missing.bin");
        jobs.insert(3, CopyJob {
            src: missing.clone(),
            dest_dir: dest_dir.path().to_path_buf(),
        });

        for workers in [1, 3] {
            let err = copy_all(&jobs, workers).unwrap_err();
            assert!(matches!(err, StagingError::StageCopyFailed { ref file, .. } if *file == missing));
        }
    }

    #[test]
    fn test_copy_all_sequential_stops_at_failure() {
        let src_dir = tempdir().unwrap();
        let dest_dir = tempdir().unwrap();
        let ok = src_dir.path().join("after.bin");
        fs::write(&ok, b"x").unwrap();
        let jobs = vec![
            CopyJob {
                src: src_dir.path().join("missing.bin"),
                dest_dir: dest_dir.path().to_path_buf(),
            },
            CopyJob {
                src: ok,
                dest_dir: dest_dir.path().to_path_buf(),
            },
        ];

        assert!(copy_all(&jobs, 1).is_err());
        assert!(!dest_dir.path().join("after.bin").exists());
    }
}
