mod file_ops;
mod staging;

pub use file_ops::{copy_all, copy_into_dir, remove_tree, CopyJob};
pub use staging::{teardown, StagingArea};
