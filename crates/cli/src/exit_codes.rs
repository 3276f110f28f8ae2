//! CLI Exit Code Registry
//!
//! Single source of truth for `negdash` exit codes. Schedulers and wrapper
//! scripts branch on these, so a code never changes meaning once released.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (unspecified)                          |
//! | 2    | CLI usage error (bad args)                           |
//! | 3    | Config file unreadable, malformed or invalid         |
//! | 4    | A required input file is missing                     |
//! | 5    | A spreadsheet is undersized or fails its zip check   |
//! | 6    | An input lacks its identity column                   |
//! | 7    | The artifact or presentation could not be written    |
//! | 8    | An input could not be parsed                         |
//!
//! Codes 4-6 mean the run aborted before any output was touched.

use negdash_io::PipelineError;
use negdash_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments.
pub const EXIT_USAGE: u8 = 2;

/// Config file could not be read, parsed or validated.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// A required input (workbook or non-optional extract) does not exist.
pub const EXIT_MISSING_INPUT: u8 = 4;

/// A workbook is below the size floor or is not an intact zip container.
pub const EXIT_CORRUPT_INPUT: u8 = 5;

/// A source has no column matching its configured identity column.
pub const EXIT_MISSING_COLUMN: u8 = 6;

/// Writing the artifact or the presentation failed.
pub const EXIT_WRITE_FAILURE: u8 = 7;

/// An input or artifact exists but could not be parsed.
pub const EXIT_PARSE: u8 = 8;

pub fn pipeline_exit_code(err: &PipelineError) -> u8 {
    match err {
        PipelineError::MissingInputFile { .. } => EXIT_MISSING_INPUT,
        PipelineError::UndersizedOrCorruptInput { .. } => EXIT_CORRUPT_INPUT,
        PipelineError::MissingExpectedColumn { .. } => EXIT_MISSING_COLUMN,
        PipelineError::WriteFailure { .. } => EXIT_WRITE_FAILURE,
        PipelineError::Parse { .. } => EXIT_PARSE,
        PipelineError::Io { .. } => EXIT_ERROR,
        PipelineError::Recon(inner) => recon_exit_code(inner),
    }
}

pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        ReconError::MissingColumn { .. } => EXIT_MISSING_COLUMN,
        ReconError::InvalidInput(_) => EXIT_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn gate_failures_have_distinct_codes() {
        let codes = [
            pipeline_exit_code(&PipelineError::MissingInputFile {
                source_name: "CNM".into(),
                path: PathBuf::from("a"),
            }),
            pipeline_exit_code(&PipelineError::UndersizedOrCorruptInput {
                source_name: "CNM".into(),
                path: PathBuf::from("a"),
                reason: "small".into(),
            }),
            pipeline_exit_code(&PipelineError::MissingExpectedColumn {
                source_name: "CNM".into(),
                path: PathBuf::from("a"),
                column: "Documento".into(),
            }),
        ];
        assert_eq!(codes, [EXIT_MISSING_INPUT, EXIT_CORRUPT_INPUT, EXIT_MISSING_COLUMN]);
    }

    #[test]
    fn config_errors_map_to_invalid_config() {
        let err = PipelineError::Recon(ReconError::ConfigValidation("bad".into()));
        assert_eq!(pipeline_exit_code(&err), EXIT_INVALID_CONFIG);
        assert_eq!(recon_exit_code(&ReconError::ConfigParse("x".into())), EXIT_INVALID_CONFIG);
    }

    #[test]
    fn codes_are_unique() {
        let all = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_INVALID_CONFIG,
            EXIT_MISSING_INPUT,
            EXIT_CORRUPT_INPUT,
            EXIT_MISSING_COLUMN,
            EXIT_WRITE_FAILURE,
            EXIT_PARSE,
        ];
        let distinct: std::collections::HashSet<u8> = all.iter().copied().collect();
        assert_eq!(distinct.len(), all.len());
    }
}
