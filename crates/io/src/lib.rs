// File I/O for the negativation dashboard: loaders, gates, materializer

pub mod artifact;
pub mod csv;
pub mod decode;
pub mod error;
pub mod loader;
pub mod materialize;
pub mod pipeline;
pub mod presentation;
pub mod sheet;
pub mod validate;

pub use error::PipelineError;
pub use pipeline::{run_pipeline, PipelineRun};
