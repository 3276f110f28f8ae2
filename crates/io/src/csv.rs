// CSV extract import: encoding fallback, header decoding

use std::collections::HashSet;
use std::path::Path;

use negdash_recon::config::{canonical, ExtractColumns};
use negdash_recon::model::Cell;

use crate::decode::{decode_header, decode_value, dedup_headers};
use crate::error::PipelineError;

const DECODED_COLUMNS: [&str; 4] = [canonical::IDENTITY, canonical::NAME, canonical::RECORD_ID, canonical::DATE];

/// One extract file after header decoding and canonical renaming.
/// The last column is always the `fonte` label column.
#[derive(Debug, Clone)]
pub struct ExtractTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl ExtractTable {
    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }
}

/// Read one labeled extract.
///
/// Headers are decoded, made unique, then renamed through the alias table.
/// When two headers map to the same canonical name the first one wins and
/// the later column is dropped. Values in the identity, name, record id
/// and date columns have entities and placeholders decoded.
pub fn read_extract(
    path: &Path,
    label: &str,
    delimiter: u8,
    columns: &ExtractColumns,
) -> Result<ExtractTable, PipelineError> {
    let content = read_file_as_utf8(path)?;
    extract_from_string(&content, delimiter, label, columns).map_err(|reason| PipelineError::parse(path, reason))
}

fn extract_from_string(
    content: &str,
    delimiter: u8,
    label: &str,
    columns: &ExtractColumns,
) -> Result<ExtractTable, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let raw_headers = reader.headers().map_err(|e| e.to_string())?.clone();
    let decoded: Vec<String> = raw_headers.iter().map(decode_header).collect();
    let (unique, renamed) = dedup_headers(decoded);
    if renamed {
        log::warn!("{label}: duplicate header names were suffixed");
    }

    // (source column, output name) for every column that survives renaming
    let mut kept: Vec<(usize, String)> = Vec::new();
    let mut taken: HashSet<String> = HashSet::new();
    for (idx, header) in unique.into_iter().enumerate() {
        let name = columns
            .canonical_for(&header)
            .map(str::to_string)
            .unwrap_or(header);
        if taken.insert(name.clone()) {
            kept.push((idx, name));
        } else {
            log::warn!("{label}: dropping column {} that also maps to '{name}'", idx + 1);
        }
    }

    let decoded_columns: HashSet<usize> = kept
        .iter()
        .filter(|(_, name)| DECODED_COLUMNS.contains(&name.as_str()))
        .map(|(idx, _)| *idx)
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| e.to_string())?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let mut cells: Vec<Cell> = kept
            .iter()
            .map(|(idx, _)| {
                let field = record.get(*idx).unwrap_or("");
                if field.is_empty() {
                    Cell::Empty
                } else if decoded_columns.contains(idx) {
                    Cell::Text(decode_value(field))
                } else {
                    Cell::text(field)
                }
            })
            .collect();
        cells.push(Cell::text(label));
        rows.push(cells);
    }

    let mut headers: Vec<String> = kept.into_iter().map(|(_, name)| name).collect();
    headers.push(canonical::LABEL.to_string());

    Ok(ExtractTable { headers, rows })
}

/// Read file and convert to UTF-8 if needed (Windows-1252 fallback). A leading BOM is dropped.
pub fn read_file_as_utf8(path: &Path) -> Result<String, PipelineError> {
    let bytes = std::fs::read(path).map_err(|e| PipelineError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            log::debug!("{}: not UTF-8, decoding as Windows-1252", path.display());
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    };

    Ok(match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    })
}
