mod class_stats;

pub use class_stats::{class_dir, collect_stats, list_class_files, ClassStats};
