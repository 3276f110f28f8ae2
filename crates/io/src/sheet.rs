// Excel sheet reader: header row at a fixed offset, typed cells below

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use negdash_recon::model::Cell;

use crate::decode::dedup_headers;
use crate::error::PipelineError;

/// Header names plus the data rows under them, aligned by column.
#[derive(Debug, Default)]
pub struct SheetTable {
    pub sheet: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// Read one sheet of a workbook (xlsx, xls, xlsb, ods).
///
/// `skip_rows` counts rows from the top of the sheet; the row right after
/// them is the header row. Blank rows below the header are dropped.
/// Without `sheet`, the first sheet of the workbook is read.
pub fn read_sheet(path: &Path, sheet: Option<&str>, skip_rows: usize) -> Result<SheetTable, PipelineError> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| PipelineError::parse(path, format!("failed to open workbook: {e}")))?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| PipelineError::parse(path, "workbook contains no sheets"))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| PipelineError::parse(path, format!("failed to read sheet '{sheet_name}': {e}")))?;

    // calamine ranges start at the first used row; offsets are absolute.
    let start_row = range.start().map(|(r, _)| r as usize).unwrap_or(0);
    if start_row > skip_rows {
        // The header row itself is blank.
        log::warn!(
            "{}: sheet '{sheet_name}' has no header at row {}",
            path.display(),
            skip_rows + 1
        );
        return Ok(SheetTable {
            sheet: sheet_name,
            ..Default::default()
        });
    }

    let mut rows = range.rows().skip(skip_rows - start_row);
    let headers: Vec<String> = match rows.next() {
        Some(row) => row.iter().map(header_text).collect(),
        None => Vec::new(),
    };
    let (headers, renamed) = dedup_headers(headers);
    if renamed {
        log::warn!("{}: duplicate header names were suffixed", path.display());
    }

    let mut data = Vec::new();
    for row in rows {
        let cells: Vec<Cell> = row.iter().map(to_cell).collect();
        if cells.iter().all(Cell::is_blank) {
            continue;
        }
        data.push(cells);
    }

    Ok(SheetTable {
        sheet: sheet_name,
        headers,
        rows: data,
    })
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        other => to_cell(other).to_string(),
    }
}

fn to_cell(cell: &Data) -> Cell {
    match cell {
        Data::Empty => Cell::Empty,
        Data::String(s) if s.is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(n) => Cell::Number(*n),
        Data::Int(n) => Cell::Number(*n as f64),
        Data::Bool(b) => Cell::text(if *b { "TRUE" } else { "FALSE" }),
        Data::Error(e) => {
            log::debug!("cell error value #{e:?} read as empty");
            Cell::Empty
        }
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            match excel_serial_to_datetime(serial) {
                Some(ts) => Cell::DateTime(ts),
                None => Cell::Number(serial),
            }
        }
        Data::DateTimeIso(s) => parse_iso(s).map(Cell::DateTime).unwrap_or_else(|| Cell::Text(s.clone())),
        Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

/// Convert a 1900-system Excel serial to a timestamp, rounded to the second.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    // Day zero is 1899-12-30, which absorbs the 1900 leap-year bug for
    // every serial after February 1900.
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let days = serial.trunc();
    let seconds = ((serial - days) * 86_400.0).round();
    epoch
        .checked_add_signed(Duration::days(days as i64))?
        .checked_add_signed(Duration::seconds(seconds as i64))
}

fn parse_iso(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
