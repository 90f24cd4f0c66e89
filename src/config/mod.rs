mod pipeline_config;

pub use pipeline_config::{PipelineConfig, TrainingParams, DEFAULT_VALIDATION_PROPORTION};
