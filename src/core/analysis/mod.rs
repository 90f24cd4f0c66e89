mod balancer;
mod splitter;

pub use balancer::{select_balanced, target_size, RetainedSet};
pub use splitter::{
    check_proportion, split, validation_size, ClassSplit, SamplingStrategy, SeededSampler,
    SplitAssignment,
};
