//! Mapping between the column headers found in the data sets and the
//! canonical field names of the records.
//!
//! The same vocabulary is used in both directions: reading a Survey Master /
//! Question Master sheet, and writing one back.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{RawRow, RecordKind, MAX_OPTIONS};

const SURVEY_COLUMNS: &[(&str, &str)] = &[
    ("surveyid", "surveyId"),
    ("surveyname", "surveyName"),
    ("surveydescription", "surveyDescription"),
    ("availablemediums", "availableMediums"),
    ("hierarchicalaccesslevel", "hierarchicalAccessLevel"),
    ("public", "public"),
    ("inschool", "inSchool"),
    ("acceptmultipleentries", "acceptMultipleEntries"),
    ("launchdate", "launchDate"),
    ("closedate", "closeDate"),
    ("mode", "mode"),
    ("visibleonreportbot", "visibleOnReportBot"),
    ("isactive", "isActive"),
    ("downloadresponse", "downloadResponse"),
    ("geofencing", "geoFencing"),
    ("geotagging", "geoTagging"),
    ("testsurvey", "testSurvey"),
];

const QUESTION_COLUMNS: &[(&str, &str)] = &[
    ("surveyid", "surveyId"),
    ("medium", "medium"),
    ("mediuminenglish", "mediumInEnglish"),
    ("questionid", "questionId"),
    ("questiontype", "questionType"),
    ("isdynamic", "isDynamic"),
    ("questiondescription", "questionDescription"),
    ("questiondescriptionoptional", "questionDescriptionOptional"),
    ("maxvalue", "maxValue"),
    ("minvalue", "minValue"),
    ("ismandatory", "isMandatory"),
    ("tableheadervalue", "tableHeaderValue"),
    ("tablequestionvalue", "tableQuestionValue"),
    ("sourcequestion", "sourceQuestion"),
    ("textinputtype", "textInputType"),
    ("textlimitcharacters", "textLimitCharacters"),
    ("mode", "mode"),
    ("questionmedialink", "questionMediaLink"),
    ("questionmediatype", "questionMediaType"),
];

static OPTION_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^option([0-9]+)(inenglish|children)?$").unwrap());

/// Lowercases the header and drops everything that is not a letter or a
/// digit, so that `Survey_ID`, `survey id` and `SurveyId` all compare equal.
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

fn lookup(table: &[(&str, &'static str)], normalized: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(k, _)| *k == normalized)
        .map(|(_, field)| *field)
}

/// The canonical survey field for a header, or the header itself if unknown.
pub fn map_survey_column(header: &str) -> String {
    let normalized = normalize_header(header);
    lookup(SURVEY_COLUMNS, &normalized)
        .map(|s| s.to_string())
        .unwrap_or_else(|| header.to_string())
}

/// The canonical question field for a header, or the header itself if unknown.
///
/// Besides the fixed table, `option<N>`, `option<N>InEnglish` and
/// `option<N>Children` are recognized for N up to [`MAX_OPTIONS`], and any
/// header starting with "question description" (other than the optional
/// description) is taken as the description.
pub fn map_question_column(header: &str) -> String {
    let normalized = normalize_header(header);

    if let Some(caps) = OPTION_COLUMN.captures(&normalized) {
        let index = caps[1].parse::<usize>().ok();
        if let Some(n) = index.filter(|n| (1..=MAX_OPTIONS).contains(n)) {
            return match caps.get(2).map(|m| m.as_str()) {
                Some("inenglish") => format!("option{}InEnglish", n),
                Some("children") => format!("option{}Children", n),
                _ => format!("option{}", n),
            };
        }
        debug!("map_question_column: option index out of range: {:?}", header);
    }

    if normalized.starts_with("questiondescription") && normalized != "questiondescriptionoptional"
    {
        return "questionDescription".to_string();
    }

    lookup(QUESTION_COLUMNS, &normalized)
        .map(|s| s.to_string())
        .unwrap_or_else(|| header.to_string())
}

pub fn map_column(kind: RecordKind, header: &str) -> String {
    match kind {
        RecordKind::Survey => map_survey_column(header),
        RecordKind::Question => map_question_column(header),
    }
}

/// Renames all the cells of a row to their canonical field names.
/// When two headers map to the same field, the rightmost one wins.
pub fn map_row(kind: RecordKind, row: &RawRow) -> RawRow {
    row.iter()
        .map(|(header, value)| (map_column(kind, header), value.clone()))
        .collect()
}

/// What the caller says a delimited text file contains.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub enum DeclaredKind {
    Survey,
    Question,
    /// Not declared: the kind is inferred from the header.
    #[default]
    Both,
}

impl std::str::FromStr for DeclaredKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "survey" => Ok(DeclaredKind::Survey),
            "question" => Ok(DeclaredKind::Question),
            "both" | "" => Ok(DeclaredKind::Both),
            x => Err(format!(
                "unknown sheet type {:?}: expected survey, question or both",
                x
            )),
        }
    }
}

/// Decides which kind of records a delimited file holds.
///
/// A declared kind is taken as is. Otherwise a question id column means
/// question data (even if a survey id column is also present), a survey id
/// column alone means survey data, and anything else is undecidable.
pub fn infer_record_kind<S: AsRef<str>>(
    headers: &[S],
    declared: DeclaredKind,
) -> Option<RecordKind> {
    match declared {
        DeclaredKind::Survey => return Some(RecordKind::Survey),
        DeclaredKind::Question => return Some(RecordKind::Question),
        DeclaredKind::Both => {}
    }
    let normalized: Vec<String> = headers
        .iter()
        .map(|h| normalize_header(h.as_ref()))
        .collect();
    if normalized.iter().any(|h| h == "questionid") {
        Some(RecordKind::Question)
    } else if normalized.iter().any(|h| h == "surveyid") {
        Some(RecordKind::Survey)
    } else {
        None
    }
}
