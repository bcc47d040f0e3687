//! One import: parse the upload, check it against the store, validate it,
//! commit it. Either everything in the upload is stored or nothing is.

use std::collections::HashSet;
use std::fs::File;
use std::io;
use std::path::Path;

use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::Serialize;
use snafu::prelude::*;
use tempfile::NamedTempFile;

use survey_master::columns::DeclaredKind;
use survey_master::validate::{validate_question, validate_survey};
use survey_master::*;

use crate::ingest::io_common::simplify_file_name;
use crate::ingest::store::Store;
use crate::ingest::*;

pub const DUPLICATE_SURVEY_MESSAGE: &str = "Survey ID already exists in the system";
pub const REPEATED_SURVEY_MESSAGE: &str = "Survey ID appears more than once in the upload";

#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Replace the surveys that already exist instead of rejecting the upload.
    pub overwrite: bool,
    /// What a delimited text upload contains.
    pub kind: DeclaredKind,
}

/// The problems found with one incoming record.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordError {
    #[serde(rename = "type")]
    pub kind: RecordKind,
    /// 1-based position of the record among the incoming records of its kind.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub survey_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
    pub errors: Vec<String>,
}

/// Why an upload was turned down. Nothing was stored.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRejection {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub duplicates: Vec<String>,
    pub validation_errors: Vec<RecordError>,
    pub surveys_count: usize,
    pub questions_count: usize,
}

/// What an accepted upload added to the store.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub message: String,
    pub overwrite: bool,
    pub surveys_imported: usize,
    pub questions_imported: usize,
    pub surveys: Vec<Survey>,
}

/// A survey id of the upload that is already taken in the store.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Conflict {
    pub survey_id: String,
    /// 1-based position of the incoming survey record.
    pub survey_index: usize,
}

/// A copy of an uploaded file in the upload directory.
///
/// The copy keeps the extension of the original. It is removed by
/// [`StagedUpload::discard`], or when dropped.
#[derive(Debug)]
pub struct StagedUpload {
    file: NamedTempFile,
    original_name: String,
}

impl StagedUpload {
    pub fn stage(source: &Path, upload_dir: &Path) -> IngestResult<StagedUpload> {
        std::fs::create_dir_all(upload_dir).context(StagingSnafu { path: upload_dir })?;
        let suffix = source
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let mut file = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&suffix)
            .tempfile_in(upload_dir)
            .context(StagingSnafu { path: upload_dir })?;
        let mut input = File::open(source).context(StagingSnafu { path: source })?;
        io::copy(&mut input, file.as_file_mut()).context(StagingSnafu { path: source })?;
        let original_name = simplify_file_name(source);
        info!("StagedUpload: {} -> {:?}", original_name, file.path());
        Ok(StagedUpload {
            file,
            original_name,
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn discard(self) {
        let path = self.file.path().to_path_buf();
        match self.file.close() {
            Ok(()) => debug!("StagedUpload: removed {:?}", path),
            Err(e) => warn!("StagedUpload: could not remove {:?}: {}", path, e),
        }
    }
}

/// Imports a staged upload. The staged file is removed whatever the outcome.
pub async fn import_upload(
    store: &Store,
    upload: StagedUpload,
    options: ImportOptions,
) -> IngestResult<ImportSummary> {
    info!(
        "import_upload: {} (overwrite: {})",
        upload.original_name(),
        options.overwrite
    );
    let res = import_file(store, upload.path(), options).await;
    upload.discard();
    res
}

/// Imports a file without staging it.
pub async fn import_file(
    store: &Store,
    path: &Path,
    options: ImportOptions,
) -> IngestResult<ImportSummary> {
    let p = path.to_path_buf();
    let batch = tokio::task::spawn_blocking(move || parse_upload(&p, options.kind))
        .await
        .context(BlockingTaskSnafu {})??;
    apply_batch(store, batch, options.overwrite).await
}

/// Checks the candidate records against the store and commits them.
pub async fn apply_batch(
    store: &Store,
    batch: ImportBatch,
    overwrite: bool,
) -> IngestResult<ImportSummary> {
    let mut snapshot = store.read().await?;

    let conflicts = find_conflicts(&snapshot, &batch);
    if !conflicts.is_empty() {
        let ids: Vec<&str> = conflicts.iter().map(|c| c.survey_id.as_str()).collect();
        if !overwrite {
            info!("apply_batch: rejected, existing survey ids: {:?}", ids);
            return RejectedSnafu {
                rejection: Box::new(duplicates_rejection(&conflicts, &batch)),
            }
            .fail();
        }
        info!("apply_batch: replacing survey ids: {:?}", ids);
        remove_conflicts(&mut snapshot, &conflicts);
    }

    let errors = validate_batch(&snapshot, &batch);
    if !errors.is_empty() {
        info!("apply_batch: rejected, {} invalid records", errors.len());
        return RejectedSnafu {
            rejection: Box::new(ImportRejection {
                error: "Validation failed".to_string(),
                message: None,
                duplicates: Vec::new(),
                validation_errors: errors,
                surveys_count: batch.surveys.len(),
                questions_count: batch.questions.len(),
            }),
        }
        .fail();
    }

    let summary = ImportSummary {
        message: "Import successful".to_string(),
        overwrite,
        surveys_imported: batch.surveys.len(),
        questions_imported: batch.questions.len(),
        surveys: batch.surveys.clone(),
    };
    snapshot.surveys.extend(batch.surveys);
    snapshot.questions.extend(batch.questions);
    store.write(&snapshot).await?;
    info!(
        "apply_batch: imported {} surveys and {} questions",
        summary.surveys_imported, summary.questions_imported
    );
    Ok(summary)
}

/// The incoming surveys whose id is already in use in the store, each id once.
///
/// Only survey records collide. Questions that come without their survey
/// are added to the questions already stored for it.
pub fn find_conflicts(snapshot: &StoreSnapshot, batch: &ImportBatch) -> Vec<Conflict> {
    let stored_surveys: HashSet<&str> = snapshot
        .surveys
        .iter()
        .map(|s| s.survey_id.as_str())
        .collect();

    let mut conflicts: IndexMap<&str, Conflict> = IndexMap::new();
    for (idx, survey) in batch.surveys.iter().enumerate() {
        let id = survey.survey_id.as_str();
        if stored_surveys.contains(id) && !conflicts.contains_key(id) {
            conflicts.insert(
                id,
                Conflict {
                    survey_id: id.to_string(),
                    survey_index: idx + 1,
                },
            );
        }
    }
    conflicts.into_values().collect()
}

/// Drops what the colliding upload replaces: the stored survey and all its
/// questions.
fn remove_conflicts(snapshot: &mut StoreSnapshot, conflicts: &[Conflict]) {
    for c in conflicts.iter() {
        snapshot.surveys.retain(|s| s.survey_id != c.survey_id);
        let before = snapshot.questions.len();
        snapshot.questions.retain(|q| q.survey_id != c.survey_id);
        debug!(
            "remove_conflicts: {}: removed {} questions",
            c.survey_id,
            before - snapshot.questions.len()
        );
    }
}

fn duplicates_rejection(conflicts: &[Conflict], batch: &ImportBatch) -> ImportRejection {
    let validation_errors = conflicts
        .iter()
        .map(|c| RecordError {
            kind: RecordKind::Survey,
            index: Some(c.survey_index),
            survey_id: Some(c.survey_id.clone()),
            question_id: None,
            errors: vec![DUPLICATE_SURVEY_MESSAGE.to_string()],
        })
        .collect();
    ImportRejection {
        error: "Duplicate survey IDs found".to_string(),
        message: Some(
            "Import rejected because one or more Survey IDs already exist. \
             Retry with overwrite to replace the existing surveys."
                .to_string(),
        ),
        duplicates: conflicts.iter().map(|c| c.survey_id.clone()).collect(),
        validation_errors,
        surveys_count: batch.surveys.len(),
        questions_count: batch.questions.len(),
    }
}

/// Validates every incoming record against what the store will hold.
fn validate_batch(snapshot: &StoreSnapshot, batch: &ImportBatch) -> Vec<RecordError> {
    let all_surveys: Vec<Survey> = snapshot
        .surveys
        .iter()
        .chain(batch.surveys.iter())
        .cloned()
        .collect();
    let all_questions: Vec<Question> = snapshot
        .questions
        .iter()
        .chain(batch.questions.iter())
        .cloned()
        .collect();

    let mut res: Vec<RecordError> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for (idx, survey) in batch.surveys.iter().enumerate() {
        let mut errors = validate_survey(survey);
        if !survey.survey_id.is_empty() && !seen.insert(survey.survey_id.as_str()) {
            errors.push(REPEATED_SURVEY_MESSAGE.to_string());
        }
        if !errors.is_empty() {
            debug!("validate_batch: survey {}: {:?}", idx + 1, errors);
            res.push(RecordError {
                kind: RecordKind::Survey,
                index: Some(idx + 1),
                survey_id: Some(survey.survey_id.clone()),
                question_id: None,
                errors,
            });
        }
    }
    for (idx, question) in batch.questions.iter().enumerate() {
        let errors = validate_question(question, &all_surveys, &all_questions);
        if !errors.is_empty() {
            debug!("validate_batch: question {}: {:?}", idx + 1, errors);
            res.push(RecordError {
                kind: RecordKind::Question,
                index: Some(idx + 1),
                survey_id: Some(question.survey_id.clone()),
                question_id: Some(question.question_id.clone()),
                errors,
            });
        }
    }
    res
}
