// Workbook reader (xlsx, xls, xlsb, ods).

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use log::{debug, info, warn};
use snafu::prelude::*;
use survey_master::RawRow;

use crate::ingest::io_common::{assemble_row, format_date, normalize_text, parse_iso_date};
use crate::ingest::*;

pub const SURVEY_SHEET: &str = "Survey Master";
pub const QUESTION_SHEET: &str = "Question Master";

/// The rows of the two data sets of a workbook. A missing sheet reads as no rows.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct WorkbookSheets {
    pub survey_rows: Vec<RawRow>,
    pub question_rows: Vec<RawRow>,
}

pub fn read_workbook(path: &Path) -> IngestResult<WorkbookSheets> {
    let mut workbook = open_workbook_auto(path).context(OpeningWorkbookSnafu { path })?;
    let names = workbook.sheet_names();
    debug!("read_workbook: {:?}: sheets {:?}", path, names);

    let mut res = WorkbookSheets::default();
    for (sheet, rows) in [
        (SURVEY_SHEET, &mut res.survey_rows),
        (QUESTION_SHEET, &mut res.question_rows),
    ] {
        if names.iter().any(|n| n == sheet) {
            *rows = read_sheet(&mut workbook, sheet)?;
            info!("read_workbook: {:?}: {} rows", sheet, rows.len());
        } else {
            warn!("read_workbook: {:?} has no sheet named {:?}", path, sheet);
        }
    }
    Ok(res)
}

fn read_sheet(workbook: &mut Sheets<BufReader<File>>, sheet: &str) -> IngestResult<Vec<RawRow>> {
    let range = workbook
        .worksheet_range(sheet)
        .context(ReadingSheetSnafu { sheet })?;

    let mut iter = range.rows();
    let header: Vec<String> = match iter.next() {
        Some(cells) => cells
            .iter()
            .map(|c| cell_text(c).unwrap_or_default())
            .collect(),
        None => return Ok(Vec::new()),
    };
    debug!("read_sheet: {:?}: header: {:?}", sheet, header);

    let rows: Vec<RawRow> = iter
        .filter_map(|cells| assemble_row(&header, cells.iter().map(cell_text).collect()))
        .collect();
    Ok(rows)
}

/// The text of a cell as it would be displayed, or nothing for a blank cell.
///
/// Formula cells hold their cached result. Error cells read as blank.
pub fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => normalize_text(s),
        Data::Float(f) => Some(f.to_string()),
        Data::Int(i) => Some(i.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(d) => Some(format_date(&d)),
            None => Some(dt.as_f64().to_string()),
        },
        Data::DateTimeIso(s) => parse_iso_date(s).or_else(|| normalize_text(s)),
        Data::DurationIso(s) => normalize_text(s),
    }
}
