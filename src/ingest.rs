use log::{debug, info};

use snafu::{prelude::*, Snafu};
use std::path::{Path, PathBuf};

use survey_master::columns::{infer_record_kind, DeclaredKind};
use survey_master::*;

pub mod config_reader;
pub mod io_common;
pub mod io_csv;
pub mod io_xlsx;
pub mod store;
pub mod transaction;

use crate::ingest::transaction::ImportRejection;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum IngestError {
    #[snafu(display("Unsupported file format {extension:?}: expected .xlsx, .xls, .xlsb, .ods, .csv or .tsv"))]
    UnsupportedFormat { extension: String },
    #[snafu(display(
        "Survey Master and Question Master sheets are required for workbook imports (survey records: {has_survey_master}, question records: {has_question_master})"
    ))]
    MissingSheets {
        has_survey_master: bool,
        has_question_master: bool,
    },
    #[snafu(display(
        "Could not detect the content of {path:?}: expected a Survey Master or a Question Master data set"
    ))]
    UndetectedTextKind { path: PathBuf },
    #[snafu(display("Error opening workbook {path:?}"))]
    OpeningWorkbook {
        source: calamine::Error,
        path: PathBuf,
    },
    #[snafu(display("Error reading sheet {sheet:?}"))]
    ReadingSheet {
        source: calamine::Error,
        sheet: String,
    },
    #[snafu(display("Error opening delimited file {path:?}"))]
    CsvOpen { source: csv::Error, path: PathBuf },
    #[snafu(display("Error parsing line {lineno}"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Blocking task failed"))]
    BlockingTask { source: tokio::task::JoinError },

    #[snafu(display("{}", rejection.error))]
    Rejected { rejection: Box<ImportRejection> },

    #[snafu(display("Error writing store {path:?}"))]
    StoreWrite {
        source: std::io::Error,
        path: PathBuf,
    },
    #[snafu(display("The store writer has stopped"))]
    WriterStopped {},
    #[snafu(display("Error accessing store {path:?}"))]
    StoreIo {
        source: std::io::Error,
        path: PathBuf,
    },
    #[snafu(display("Store {path:?} is not a valid store document"))]
    StoreCorrupt {
        source: serde_json::Error,
        path: PathBuf,
    },
    #[snafu(display("Error serializing the store"))]
    SerializingStore { source: serde_json::Error },

    #[snafu(display("Error staging upload {path:?}"))]
    Staging {
        source: std::io::Error,
        path: PathBuf,
    },
    #[snafu(display("Error opening config file {path:?}"))]
    OpeningConfig {
        source: std::io::Error,
        path: PathBuf,
    },
    #[snafu(display("Error parsing config file {path:?}"))]
    ParsingConfig {
        source: serde_json::Error,
        path: PathBuf,
    },
    #[snafu(display("Error writing output {path:?}"))]
    WritingOutput {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error + Send + Sync>, Some)))]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

pub type IngestResult<T> = Result<T, IngestError>;

/// The file formats understood by the readers.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum InputFormat {
    Workbook,
    Delimited(u8),
}

impl InputFormat {
    /// Chooses the reader from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> IngestResult<InputFormat> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "xlsx" | "xls" | "xlsb" | "xlsm" | "ods" => Ok(InputFormat::Workbook),
            "csv" => Ok(InputFormat::Delimited(b',')),
            "tsv" => Ok(InputFormat::Delimited(b'\t')),
            _ => UnsupportedFormatSnafu { extension }.fail(),
        }
    }
}

/// Reads an uploaded file into candidate records.
///
/// Workbooks must hold both data sets. A delimited file holds one of them,
/// either declared by the caller or detected from its header row.
pub fn parse_upload(path: &Path, declared: DeclaredKind) -> IngestResult<ImportBatch> {
    let format = InputFormat::from_path(path)?;
    info!("parse_upload: {:?} as {:?}", path, format);
    let batch = match format {
        InputFormat::Workbook => {
            let sheets = io_xlsx::read_workbook(path)?;
            let batch = build_batch(&sheets.survey_rows, &sheets.question_rows);
            debug!(
                "parse_upload: {} surveys, {} questions",
                batch.surveys.len(),
                batch.questions.len()
            );
            ensure!(
                !batch.surveys.is_empty() && !batch.questions.is_empty(),
                MissingSheetsSnafu {
                    has_survey_master: !batch.surveys.is_empty(),
                    has_question_master: !batch.questions.is_empty(),
                }
            );
            batch
        }
        InputFormat::Delimited(delimiter) => {
            let table = io_csv::read_delimited(path, delimiter)?;
            let batch = match infer_record_kind(&table.headers, declared) {
                Some(RecordKind::Survey) => build_batch(&table.rows, &[]),
                Some(RecordKind::Question) => build_batch(&[], &table.rows),
                None => ImportBatch::default(),
            };
            ensure!(
                !batch.is_empty(),
                UndetectedTextKindSnafu {
                    path: path.to_path_buf()
                }
            );
            batch
        }
    };
    Ok(batch)
}
