pub mod config;
mod orchestrator;
mod output;
mod types;

pub use orchestrator::{run_pipeline, run_pipeline_reported};
pub use output::{write_composite, write_outputs};
pub use types::{CompositeOutput, PipelineOutput, PipelineStage, ProgressReporter};
