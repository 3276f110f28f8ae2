use std::path::PathBuf;

use negdash_recon::ReconError;
use thiserror::Error;

/// Everything that can stop a load or materialize pass.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{source_name}: input file not found: {}", path.display())]
    MissingInputFile { source_name: String, path: PathBuf },

    #[error("{source_name}: undersized or corrupt input {}: {reason}", path.display())]
    UndersizedOrCorruptInput {
        source_name: String,
        path: PathBuf,
        reason: String,
    },

    #[error("{source_name}: column '{column}' not found in {}", path.display())]
    MissingExpectedColumn {
        source_name: String,
        path: PathBuf,
        column: String,
    },

    #[error("failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("failed to write {}: {reason}", path.display())]
    WriteFailure { path: PathBuf, reason: String },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Recon(#[from] ReconError),
}

impl PipelineError {
    pub(crate) fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::WriteFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Attach a file path to a column error raised while building a relation.
    pub(crate) fn from_recon_at(err: ReconError, path: impl Into<PathBuf>) -> Self {
        match err {
            ReconError::MissingColumn { source_name, column } => Self::MissingExpectedColumn {
                source_name,
                path: path.into(),
                column,
            },
            other => Self::Recon(other),
        }
    }
}
