// Primitives for reading delimited text files.

use std::path::Path;

use log::debug;
use snafu::prelude::*;
use survey_master::RawRow;

use crate::ingest::io_common::{assemble_row, normalize_text, simplify_file_name};
use crate::ingest::*;

/// The content of a delimited file: the header row and the non-blank lines.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct DelimitedTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// Reads a file with a header row. Lines may be shorter or longer than the
/// header.
pub fn read_delimited(path: &Path, delimiter: u8) -> IngestResult<DelimitedTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;

    let headers: Vec<String> = rdr
        .headers()
        .context(CsvLineParseSnafu { lineno: 1usize })?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    debug!(
        "read_delimited: {}: headers: {:?}",
        simplify_file_name(path),
        headers
    );

    let mut rows: Vec<RawRow> = Vec::new();
    for (idx, record_r) in rdr.records().enumerate() {
        let record = record_r.context(CsvLineParseSnafu { lineno: idx + 2 })?;
        let cells: Vec<Option<String>> = record.iter().map(normalize_text).collect();
        match assemble_row(&headers, cells) {
            Some(row) => rows.push(row),
            None => debug!("read_delimited: line {}: blank, skipping", idx + 2),
        }
    }
    Ok(DelimitedTable { headers, rows })
}
