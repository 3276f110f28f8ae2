// Read a previously written artifact back

use std::path::Path;

use negdash_recon::display::display_text;
use negdash_recon::model::Status;
use serde::Serialize;

use crate::error::PipelineError;
use crate::presentation::ARTIFACT_COLUMNS;
use crate::sheet::read_sheet;
use crate::validate::require_file;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactRow {
    pub id: String,
    pub document: String,
    pub name: String,
    pub date: String,
    pub movement: String,
    pub location: String,
    pub status: Status,
}

/// Rows of an artifact, in file order. Every artifact column must be present.
pub fn read_artifact(path: &Path) -> Result<Vec<ArtifactRow>, PipelineError> {
    require_file("artifact", path)?;
    let table = read_sheet(path, None, 0)?;

    let mut positions = [0usize; ARTIFACT_COLUMNS.len()];
    for (slot, column) in positions.iter_mut().zip(ARTIFACT_COLUMNS) {
        *slot = table
            .headers
            .iter()
            .position(|h| h.as_str() == column)
            .ok_or_else(|| PipelineError::MissingExpectedColumn {
                source_name: "artifact".into(),
                path: path.to_path_buf(),
                column: column.to_string(),
            })?;
    }

    table
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let get = |col: usize| row.get(positions[col]).map(display_text).unwrap_or_default();
            let raw_status = get(6);
            let status = Status::parse(&raw_status).ok_or_else(|| {
                PipelineError::parse(path, format!("row {}: unknown status '{raw_status}'", idx + 2))
            })?;
            Ok(ArtifactRow {
                id: get(0),
                document: get(1),
                name: get(2),
                date: get(3),
                movement: get(4),
                location: get(5),
                status,
            })
        })
        .collect()
}
