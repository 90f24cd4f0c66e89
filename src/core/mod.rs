pub mod analysis;
pub mod dataset;
pub mod error;
pub mod operations;

pub use analysis::*;
pub use dataset::*;
pub use error::{StagingError, StagingResult};
pub use operations::*;
