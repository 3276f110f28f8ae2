//! Display formatting shared by the engine and the materializer.

use chrono::{NaiveDate, NaiveDateTime};

use crate::model::Cell;

/// Shown when no source supplies a display value.
pub const PLACEHOLDER: &str = "-";

/// Output format of ledger timestamps.
pub const DISPLAY_TIMESTAMP: &str = "%d/%m/%Y %H:%M";

const DAY_FIRST_DATETIME: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const DAY_FIRST_DATE: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d"];

/// Parse a textual timestamp, reading ambiguous dates day-first.
pub fn parse_day_first(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DAY_FIRST_DATETIME
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DAY_FIRST_DATE
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Render a ledger timestamp as `DD/MM/YYYY HH:MM`.
///
/// Text that does not parse is shown as-is.
pub fn format_timestamp(cell: &Cell) -> String {
    match cell {
        Cell::DateTime(dt) => dt.format(DISPLAY_TIMESTAMP).to_string(),
        Cell::Text(s) => match parse_day_first(s) {
            Some(dt) => dt.format(DISPLAY_TIMESTAMP).to_string(),
            None => {
                log::debug!("unparseable timestamp {s:?}, kept verbatim");
                s.trim().to_string()
            }
        },
        other => other.to_string(),
    }
}

/// Trimmed text of a non-blank cell.
pub fn display_text(cell: &Cell) -> String {
    cell.to_string().trim().to_string()
}
