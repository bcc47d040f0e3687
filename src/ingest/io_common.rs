// Cell handling shared by the workbook and the delimited-text readers.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use survey_master::RawRow;

/// Display format of date cells.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

pub fn simplify_file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Trimmed text, or nothing for a blank cell.
pub fn normalize_text(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

pub fn format_date(dt: &NaiveDateTime) -> String {
    dt.format(DATE_FORMAT).to_string()
}

/// Dates stored as ISO 8601 text (`2024-03-15` or `2024-03-15T10:00:00`).
pub fn parse_iso_date(s: &str) -> Option<String> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|dt| format_date(&dt))
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d").map(|d| d.format(DATE_FORMAT).to_string()))
        .ok()
}

/// Pairs the cells of a line with the header.
///
/// Cells under a blank header and blank cells are left out. Cells beyond the
/// header are dropped. Returns nothing when the line holds no value at all.
pub fn assemble_row(headers: &[String], cells: Vec<Option<String>>) -> Option<RawRow> {
    let row: RawRow = headers
        .iter()
        .zip(cells)
        .filter(|(header, _)| !header.is_empty())
        .filter_map(|(header, cell)| cell.map(|v| (header.clone(), v)))
        .collect();
    if row.is_empty() {
        None
    } else {
        Some(row)
    }
}
