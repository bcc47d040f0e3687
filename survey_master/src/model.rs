// ********* Input data structures ***********

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One row of a data set, as produced by the format readers.
///
/// Keys are the header text of the column (original spelling before the
/// column mapping, canonical field names after it). Empty cells are absent.
pub type RawRow = IndexMap<String, String>;

/// The language used when a row does not say which medium it is written in,
/// and the preferred primary language of a question.
pub const DEFAULT_LANGUAGE: &str = "English";

/// Highest option index read from the `option<N>` columns.
pub const MAX_OPTIONS: usize = 20;

pub const YES_NO_VALUES: [&str; 2] = ["Yes", "No"];

pub const MODES: [&str; 4] = ["None", "New Data", "Correction", "Delete Data"];

/// The two kinds of records a data set can hold.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Survey,
    Question,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Survey => write!(f, "survey"),
            RecordKind::Question => write!(f, "question"),
        }
    }
}

/// A survey, as stored.
///
/// The flags and the mode are kept as the text found in the input. They are
/// checked by the validation, never coerced.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Survey {
    #[serde(default)]
    pub survey_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub survey_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub survey_description: Option<String>,
    #[serde(default)]
    pub available_mediums: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hierarchical_access_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_school: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept_multiple_entries: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_on_report_bot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_fencing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_tagging: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_survey: Option<String>,
    /// Columns the mapping does not know about, under their original header.
    #[serde(flatten)]
    pub extra: IndexMap<String, String>,
}

impl Survey {
    /// The Yes/No flags, with their canonical field names.
    pub fn yes_no_fields(&self) -> [(&'static str, Option<&str>); 9] {
        [
            ("public", self.public.as_deref()),
            ("inSchool", self.in_school.as_deref()),
            ("acceptMultipleEntries", self.accept_multiple_entries.as_deref()),
            ("visibleOnReportBot", self.visible_on_report_bot.as_deref()),
            ("isActive", self.is_active.as_deref()),
            ("downloadResponse", self.download_response.as_deref()),
            ("geoFencing", self.geo_fencing.as_deref()),
            ("geoTagging", self.geo_tagging.as_deref()),
            ("testSurvey", self.test_survey.as_deref()),
        ]
    }
}

/// A choice offered by a question, in one language.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOption {
    pub text: String,
    pub text_in_english: String,
    /// Comma-separated ids of the child questions opened by this option.
    #[serde(default)]
    pub children: String,
}

/// The language-dependent part of a question.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    #[serde(default)]
    pub question_description: String,
    #[serde(default)]
    pub question_description_optional: String,
    #[serde(default)]
    pub table_header_value: String,
    #[serde(default)]
    pub table_question_value: String,
    #[serde(default)]
    pub options: Vec<QuestionOption>,
}

/// A question, consolidated across all the languages it was supplied in.
///
/// The top-level description, table values and options are a copy of the
/// translation in the primary language (`medium`).
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub survey_id: String,
    pub question_id: String,
    #[serde(default)]
    pub question_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_dynamic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_mandatory: Option<String>,
    #[serde(default)]
    pub source_question: String,
    #[serde(default)]
    pub text_input_type: String,
    #[serde(default)]
    pub text_limit_characters: String,
    #[serde(default)]
    pub max_value: String,
    #[serde(default)]
    pub min_value: String,
    #[serde(default)]
    pub table_header_value: String,
    #[serde(default)]
    pub table_question_value: String,
    #[serde(default)]
    pub question_media_link: String,
    #[serde(default)]
    pub question_media_type: String,
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub medium: String,
    #[serde(default)]
    pub question_description: String,
    #[serde(default)]
    pub question_description_optional: String,
    #[serde(default)]
    pub options: Vec<QuestionOption>,
    #[serde(default)]
    pub translations: IndexMap<String, Translation>,
}

impl Question {
    /// The identity of a question within a data set.
    pub fn key(&self) -> (&str, &str, &str) {
        (
            self.survey_id.as_str(),
            self.question_id.as_str(),
            self.question_type.as_str(),
        )
    }
}

/// The candidate records read from one uploaded file.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ImportBatch {
    pub surveys: Vec<Survey>,
    pub questions: Vec<Question>,
}

impl ImportBatch {
    pub fn is_empty(&self) -> bool {
        self.surveys.is_empty() && self.questions.is_empty()
    }
}

/// Everything that is persisted.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub surveys: Vec<Survey>,
    #[serde(default)]
    pub questions: Vec<Question>,
}
