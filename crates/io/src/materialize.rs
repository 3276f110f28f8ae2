// Result materializer: xlsx artifact + JSON presentation

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use negdash_recon::model::{ReconResult, ReconciledRecord};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook};

use crate::error::PipelineError;
use crate::presentation::{build_dashboard, presence_summary, Dashboard, ARTIFACT_COLUMNS};

pub const ARTIFACT_SHEET: &str = "Resultado";

/// Column widths of the artifact, in Excel character units.
const COLUMN_WIDTHS: [f64; 7] = [14.0, 18.0, 36.0, 18.0, 12.0, 28.0, 14.0];

#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub artifact: PathBuf,
    pub presentation: PathBuf,
}

#[derive(Debug)]
pub struct Materialized {
    pub artifact: PathBuf,
    pub presentation: PathBuf,
    pub rows: usize,
    pub dashboard: Dashboard,
}

/// Write the artifact and the presentation, ordered by document.
///
/// Both files are written to temporary siblings first and only renamed
/// into place once both exist, so a failed write leaves earlier outputs
/// untouched.
pub fn materialize(result: &ReconResult, paths: &OutputPaths) -> Result<Materialized, PipelineError> {
    let mut records: Vec<&ReconciledRecord> = result.records.iter().collect();
    records.sort_by(|a, b| a.document.cmp(&b.document));

    let dashboard = build_dashboard(result, &records);

    ensure_parent(&paths.artifact)?;
    ensure_parent(&paths.presentation)?;

    let artifact_tmp = stage_artifact(&records, &paths.artifact)?;
    let presentation_tmp = match stage_presentation(&dashboard, &paths.presentation) {
        Ok(tmp) => tmp,
        Err(e) => {
            discard(&artifact_tmp);
            return Err(e);
        }
    };
    if let Err(e) = commit(&artifact_tmp, &paths.artifact) {
        discard(&presentation_tmp);
        return Err(e);
    }
    commit(&presentation_tmp, &paths.presentation)?;

    log::info!(
        "wrote {} rows to {} and {}",
        records.len(),
        paths.artifact.display(),
        paths.presentation.display()
    );
    Ok(Materialized {
        artifact: paths.artifact.clone(),
        presentation: paths.presentation.clone(),
        rows: records.len(),
        dashboard,
    })
}

/// Write the tabular artifact next to `path` and return the temporary file.
/// Documents are written as text so leading zeros survive.
fn stage_artifact(records: &[&ReconciledRecord], path: &Path) -> Result<PathBuf, PipelineError> {
    let mut workbook = XlsxWorkbook::new();
    let worksheet = workbook
        .add_worksheet()
        .set_name(ARTIFACT_SHEET)
        .map_err(|e| PipelineError::write(path, format!("failed to create sheet: {e}")))?;

    let header_format = Format::new().set_bold();
    for (col, title) in ARTIFACT_COLUMNS.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, *title, &header_format)
            .map_err(|e| PipelineError::write(path, e))?;
        worksheet
            .set_column_width(col as u16, COLUMN_WIDTHS[col])
            .map_err(|e| PipelineError::write(path, e))?;
    }

    for (idx, record) in records.iter().enumerate() {
        let row = idx as u32 + 1;
        let location = presence_summary(record);
        let values = [
            record.record_id.as_str(),
            record.document.as_str(),
            record.name.as_str(),
            record.date.as_str(),
            record.movement.as_str(),
            location.as_str(),
            record.status.as_str(),
        ];
        for (col, value) in values.iter().enumerate() {
            worksheet
                .write_string(row, col as u16, *value)
                .map_err(|e| PipelineError::write(path, format!("row {row}: {e}")))?;
        }
    }

    let last_col = ARTIFACT_COLUMNS.len() as u16 - 1;
    worksheet
        .autofilter(0, 0, records.len() as u32, last_col)
        .map_err(|e| PipelineError::write(path, format!("failed to set autofilter: {e}")))?;
    worksheet
        .set_freeze_panes(1, 0)
        .map_err(|e| PipelineError::write(path, format!("failed to set freeze panes: {e}")))?;

    let tmp = temp_sibling(path);
    if let Err(e) = workbook.save(&tmp) {
        discard(&tmp);
        return Err(PipelineError::write(path, format!("failed to save workbook: {e}")));
    }
    Ok(tmp)
}

/// Write the presentation structure as pretty JSON next to `path`.
fn stage_presentation(dashboard: &Dashboard, path: &Path) -> Result<PathBuf, PipelineError> {
    let tmp = temp_sibling(path);
    let file = File::create(&tmp).map_err(|e| PipelineError::write(&tmp, e))?;
    let mut writer = BufWriter::new(file);
    let written = serde_json::to_writer_pretty(&mut writer, dashboard)
        .map_err(|e| PipelineError::write(path, e))
        .and_then(|_| {
            writer
                .write_all(b"\n")
                .and_then(|_| writer.flush())
                .map_err(|e| PipelineError::write(path, e))
        });
    drop(writer);
    if let Err(e) = written {
        discard(&tmp);
        return Err(e);
    }
    Ok(tmp)
}

fn ensure_parent(path: &Path) -> Result<(), PipelineError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            std::fs::create_dir_all(dir).map_err(|e| PipelineError::write(dir, e))
        }
        _ => Ok(()),
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

fn commit(tmp: &Path, path: &Path) -> Result<(), PipelineError> {
    std::fs::rename(tmp, path).map_err(|e| {
        discard(tmp);
        PipelineError::write(path, e)
    })
}

fn discard(tmp: &Path) {
    if let Err(e) = std::fs::remove_file(tmp) {
        log::debug!("could not remove {}: {e}", tmp.display());
    }
}
