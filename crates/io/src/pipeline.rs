// Load -> reconcile -> materialize

use negdash_recon::config::DashboardConfig;
use negdash_recon::model::ReconResult;

use crate::error::PipelineError;
use crate::loader::load_all;
use crate::materialize::{materialize, Materialized, OutputPaths};

#[derive(Debug)]
pub struct PipelineRun {
    pub result: ReconResult,
    pub output: Materialized,
}

/// One full run. Outputs are only touched after every input passed its gates
/// and the engine produced a result.
pub fn run_pipeline(config: &DashboardConfig) -> Result<PipelineRun, PipelineError> {
    let input = load_all(config)?;
    let result = negdash_recon::run(&input)?;
    let paths = OutputPaths {
        artifact: config.artifact_path(),
        presentation: config.presentation_path(),
    };
    let output = materialize(&result, &paths)?;
    Ok(PipelineRun { result, output })
}
