pub mod paths;
pub mod pipeline;

pub use paths::PipelinePaths;
pub use pipeline::{Pipeline, PipelineError, RunSummary};
