mod model;
use indexmap::IndexMap;
use log::{debug, info, warn};

pub use crate::model::*;

pub mod columns;
pub mod rules;
pub mod validate;

use crate::columns::map_row;

// **** Surveys ****

/// Builds one survey per row of a Survey Master data set.
///
/// Rows are taken with their original headers. Columns that do not map to
/// a survey field are kept in `extra` under their original spelling. Rows
/// without a survey id are skipped.
pub fn surveys_from_rows(rows: &[RawRow]) -> Vec<Survey> {
    let mut res: Vec<Survey> = Vec::with_capacity(rows.len());
    for (idx, raw) in rows.iter().enumerate() {
        let row = map_row(RecordKind::Survey, raw);
        if get(&row, "surveyId").map_or(true, |id| id.trim().is_empty()) {
            warn!("surveys_from_rows: row {}: missing survey id, skipping", idx + 1);
            continue;
        }
        res.push(survey_from_row(&row));
    }
    info!("surveys_from_rows: {} surveys", res.len());
    res
}

fn survey_from_row(row: &RawRow) -> Survey {
    let mut survey = Survey::default();
    for (field, value) in row.iter() {
        let v = Some(value.clone());
        match field.as_str() {
            "surveyId" => survey.survey_id = value.clone(),
            "surveyName" => survey.survey_name = v,
            "surveyDescription" => survey.survey_description = v,
            "availableMediums" => survey.available_mediums = split_mediums(value),
            "hierarchicalAccessLevel" => survey.hierarchical_access_level = v,
            "public" => survey.public = v,
            "inSchool" => survey.in_school = v,
            "acceptMultipleEntries" => survey.accept_multiple_entries = v,
            "launchDate" => survey.launch_date = v,
            "closeDate" => survey.close_date = v,
            "mode" => survey.mode = v,
            "visibleOnReportBot" => survey.visible_on_report_bot = v,
            "isActive" => survey.is_active = v,
            "downloadResponse" => survey.download_response = v,
            "geoFencing" => survey.geo_fencing = v,
            "geoTagging" => survey.geo_tagging = v,
            "testSurvey" => survey.test_survey = v,
            _ => {
                survey.extra.insert(field.clone(), value.clone());
            }
        }
    }
    survey
}

/// `"English, Hindi,,Marathi"` -> `["English", "Hindi", "Marathi"]`
pub fn split_mediums(s: &str) -> Vec<String> {
    s.split(',')
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .map(|m| m.to_string())
        .collect()
}

// **** Questions ****

type QuestionKey = (String, String, String);

fn get<'a>(row: &'a RawRow, field: &str) -> Option<&'a str> {
    row.get(field).map(|s| s.as_str()).filter(|s| !s.is_empty())
}

fn get_or(row: &RawRow, field: &str, default: &str) -> String {
    get(row, field).unwrap_or(default).to_string()
}

/// Groups the rows of a Question Master data set into questions.
///
/// A question is identified by (survey id, question id, question type) and
/// is usually supplied as one row per language. The first row of a question
/// provides the fields that do not depend on the language; every row adds
/// the translation for its own language. A second row in the same language
/// replaces the earlier translation wholesale: the last row wins, the two
/// are not merged.
///
/// Questions come out in the order their first row was seen. Rows without a
/// survey id or a question id are skipped.
pub fn consolidate_questions(rows: &[RawRow]) -> Vec<Question> {
    let mut by_key: IndexMap<QuestionKey, Question> = IndexMap::new();

    for (idx, raw) in rows.iter().enumerate() {
        let row = map_row(RecordKind::Question, raw);
        let (survey_id, question_id) = match (get(&row, "surveyId"), get(&row, "questionId")) {
            (Some(s), Some(q)) => (s.to_string(), q.to_string()),
            _ => {
                warn!(
                    "consolidate_questions: row {}: missing survey id or question id, skipping",
                    idx + 1
                );
                continue;
            }
        };
        let question_type = get_or(&row, "questionType", "");
        let key = (survey_id, question_id, question_type);

        let question = by_key
            .entry(key)
            .or_insert_with_key(|(s, q, t)| seed_question(s, q, t, &row));

        let language = row_language(&row);
        debug!(
            "consolidate_questions: row {}: {}/{} in {}",
            idx + 1,
            question.survey_id,
            question.question_id,
            language
        );
        question.translations.insert(language, row_translation(&row));
    }

    let res: Vec<Question> = by_key
        .into_values()
        .map(|mut q| {
            apply_primary_translation(&mut q);
            q
        })
        .collect();
    info!(
        "consolidate_questions: {} rows -> {} questions",
        rows.len(),
        res.len()
    );
    res
}

fn seed_question(survey_id: &str, question_id: &str, question_type: &str, row: &RawRow) -> Question {
    Question {
        survey_id: survey_id.to_string(),
        question_id: question_id.to_string(),
        question_type: question_type.to_string(),
        is_dynamic: get(row, "isDynamic").map(|s| s.to_string()),
        is_mandatory: get(row, "isMandatory").map(|s| s.to_string()),
        source_question: get_or(row, "sourceQuestion", ""),
        text_input_type: get_or(row, "textInputType", "None"),
        text_limit_characters: get_or(row, "textLimitCharacters", ""),
        max_value: get_or(row, "maxValue", ""),
        min_value: get_or(row, "minValue", ""),
        table_header_value: get_or(row, "tableHeaderValue", ""),
        table_question_value: get_or(row, "tableQuestionValue", ""),
        question_media_link: get_or(row, "questionMediaLink", ""),
        question_media_type: get_or(row, "questionMediaType", "None"),
        mode: get_or(row, "mode", "None"),
        ..Question::default()
    }
}

/// The language a row is written in.
fn row_language(row: &RawRow) -> String {
    get(row, "mediumInEnglish")
        .or_else(|| get(row, "medium"))
        .unwrap_or(DEFAULT_LANGUAGE)
        .to_string()
}

fn row_translation(row: &RawRow) -> Translation {
    Translation {
        question_description: get_or(row, "questionDescription", ""),
        question_description_optional: get_or(row, "questionDescriptionOptional", ""),
        table_header_value: get_or(row, "tableHeaderValue", ""),
        table_question_value: get_or(row, "tableQuestionValue", ""),
        options: parse_options(row),
    }
}

/// Reads `option1` .. `option20`. Blank options are skipped, so the
/// position in the result is the display order, not the column index.
fn parse_options(row: &RawRow) -> Vec<QuestionOption> {
    let mut options: Vec<QuestionOption> = Vec::new();
    for i in 1..=MAX_OPTIONS {
        let text = get(row, &format!("option{}", i)).or_else(|| get(row, &format!("Option_{}", i)));
        if let Some(text) = text {
            let text_in_english = get(row, &format!("option{}InEnglish", i))
                .or_else(|| get(row, &format!("Option_{}_in_English", i)))
                .unwrap_or(text);
            let children = get(row, &format!("option{}Children", i))
                .or_else(|| get(row, &format!("Option_{}Children", i)))
                .unwrap_or("");
            options.push(QuestionOption {
                text: text.to_string(),
                text_in_english: text_in_english.to_string(),
                children: children.to_string(),
            });
        }
    }
    options
}

/// English when available, otherwise the first language that was read.
pub fn primary_language(translations: &IndexMap<String, Translation>) -> Option<&str> {
    if translations.contains_key(DEFAULT_LANGUAGE) {
        Some(DEFAULT_LANGUAGE)
    } else {
        translations.keys().next().map(|s| s.as_str())
    }
}

/// Copies the translation in the primary language onto the top-level fields.
pub fn apply_primary_translation(question: &mut Question) {
    let language = primary_language(&question.translations)
        .unwrap_or(DEFAULT_LANGUAGE)
        .to_string();
    let primary = question
        .translations
        .get(&language)
        .cloned()
        .unwrap_or_default();

    if question.medium.is_empty() {
        question.medium = language;
    }
    question.question_description = primary.question_description;
    question.question_description_optional = primary.question_description_optional;
    if !primary.table_header_value.is_empty() {
        question.table_header_value = primary.table_header_value;
    }
    if !primary.table_question_value.is_empty() {
        question.table_question_value = primary.table_question_value;
    }
    question.options = primary.options;
}

/// Reads the two data sets of an upload into candidate records.
pub fn build_batch(survey_rows: &[RawRow], question_rows: &[RawRow]) -> ImportBatch {
    ImportBatch {
        surveys: surveys_from_rows(survey_rows),
        questions: consolidate_questions(question_rows),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn row(cells: &[(&str, &str)]) -> RawRow {
        cells
            .iter()
            .map(|(h, v)| (h.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn survey_row_to_record() {
        let rows = vec![row(&[
            ("Survey ID", "SCH_2024"),
            ("Survey_Name", "School census"),
            ("Available Mediums", "English, Hindi"),
            ("Is Active", "Yes"),
            ("Owner", "district office"),
        ])];
        let surveys = surveys_from_rows(&rows);
        assert_eq!(surveys.len(), 1);
        let s = &surveys[0];
        assert_eq!(s.survey_id, "SCH_2024");
        assert_eq!(s.survey_name.as_deref(), Some("School census"));
        assert_eq!(s.available_mediums, vec!["English", "Hindi"]);
        assert_eq!(s.is_active.as_deref(), Some("Yes"));
        assert_eq!(s.extra.get("Owner").map(|s| s.as_str()), Some("district office"));
    }

    #[test]
    fn survey_rows_without_an_id_are_skipped() {
        init();
        let rows = vec![
            row(&[("Survey Name", "No id"), ("Notes", "draft")]),
            row(&[("Survey ID", "  "), ("Survey Name", "Blank id")]),
            row(&[("Survey ID", "S2"), ("Survey Name", "Kept")]),
        ];
        let surveys = surveys_from_rows(&rows);
        assert_eq!(surveys.len(), 1);
        assert_eq!(surveys[0].survey_id, "S2");
    }

    #[test]
    fn consolidates_translations_into_one_question() {
        init();
        let rows = vec![
            row(&[
                ("Survey_ID", "S1"),
                ("Question_ID", "Q1"),
                ("Question_Type", "Drop Down"),
                ("Medium", "Hindi"),
                ("Question_Description", "कितने कमरे?"),
                ("Option_1", "एक"),
                ("Option_1_in_English", "One"),
            ]),
            row(&[
                ("Survey_ID", "S1"),
                ("Question_ID", "Q1"),
                ("Question_Type", "Drop Down"),
                ("Medium", "English"),
                ("Question_Description", "How many rooms?"),
                ("Option_1", "One"),
            ]),
        ];
        let questions = consolidate_questions(&rows);
        assert_eq!(questions.len(), 1);
        let q = &questions[0];
        let langs: Vec<&str> = q.translations.keys().map(|s| s.as_str()).collect();
        assert_eq!(langs, vec!["Hindi", "English"]);
        assert_eq!(q.medium, "English");
        assert_eq!(q.question_description, "How many rooms?");
        assert_eq!(q.translations["Hindi"].options[0].text_in_english, "One");
        assert_eq!(q.text_input_type, "None");
        assert_eq!(q.question_media_type, "None");
        assert_eq!(q.mode, "None");
    }

    #[test]
    fn first_language_is_primary_without_english() {
        let rows = vec![
            row(&[
                ("surveyId", "S1"),
                ("questionId", "Q1"),
                ("questionType", "Text Response"),
                ("Medium in English", "Marathi"),
                ("Medium", "मराठी"),
                ("questionDescription", "प्रश्न"),
            ]),
            row(&[
                ("surveyId", "S1"),
                ("questionId", "Q1"),
                ("questionType", "Text Response"),
                ("medium", "Hindi"),
                ("questionDescription", "सवाल"),
            ]),
        ];
        let q = &consolidate_questions(&rows)[0];
        assert_eq!(q.medium, "Marathi");
        assert_eq!(q.question_description, "प्रश्न");
    }

    #[test]
    fn same_language_row_replaces_the_translation() {
        let base = [
            ("surveyId", "S1"),
            ("questionId", "Q1"),
            ("questionType", "Drop Down"),
        ];
        let mut first = row(&base);
        first.insert("questionDescription".into(), "Old".into());
        first.insert("option1".into(), "A".into());
        first.insert("option2".into(), "B".into());
        let mut second = row(&base);
        second.insert("questionDescription".into(), "New".into());
        second.insert("option1".into(), "C".into());

        let q = &consolidate_questions(&[first, second])[0];
        assert_eq!(q.translations.len(), 1);
        assert_eq!(q.question_description, "New");
        assert_eq!(q.options.len(), 1);
        assert_eq!(q.options[0].text, "C");
    }

    #[test]
    fn options_skip_blank_columns() {
        let rows = vec![row(&[
            ("Survey_ID", "S1"),
            ("Question_ID", "Q1"),
            ("Question_Type", "Drop Down"),
            ("Option_1", "Red"),
            ("Option_2", ""),
            ("Option_3", "Blue"),
            ("Option_3_Children", "Q1.1,Q1.2"),
        ])];
        let q = &consolidate_questions(&rows)[0];
        let texts: Vec<&str> = q.options.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, vec!["Red", "Blue"]);
        assert_eq!(q.options[1].text_in_english, "Blue");
        assert_eq!(q.options[1].children, "Q1.1,Q1.2");
    }

    #[test]
    fn keys_include_the_question_type() {
        init();
        let rows = vec![
            row(&[("surveyId", "S1"), ("questionId", "Q1"), ("questionType", "Calendar")]),
            row(&[("surveyId", "S1"), ("questionId", "Q1"), ("questionType", "Drop Down")]),
            row(&[("surveyId", "S1"), ("questionType", "Drop Down")]),
        ];
        let questions = consolidate_questions(&rows);
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].question_type, "Calendar");
        assert_eq!(questions[1].question_type, "Drop Down");
        assert_eq!(questions[1].medium, DEFAULT_LANGUAGE);
    }

    #[test]
    fn table_values_fall_back_to_the_seed_row() {
        let rows = vec![
            row(&[
                ("surveyId", "S1"),
                ("questionId", "Q9"),
                ("questionType", "Tabular Text Input"),
                ("medium", "Hindi"),
                ("tableHeaderValue", "Category,Count"),
                ("tableQuestionValue", "a:Boys\nb:Girls"),
            ]),
            row(&[
                ("surveyId", "S1"),
                ("questionId", "Q9"),
                ("questionType", "Tabular Text Input"),
                ("medium", "English"),
            ]),
        ];
        let q = &consolidate_questions(&rows)[0];
        assert_eq!(q.medium, "English");
        assert_eq!(q.table_header_value, "Category,Count");
        assert_eq!(q.table_question_value, "a:Boys\nb:Girls");
    }

    #[test]
    fn records_serialize_with_sheet_field_names() {
        let survey = Survey {
            survey_id: "S1".to_string(),
            in_school: Some("No".to_string()),
            ..Survey::default()
        };
        let js = serde_json::to_value(&survey).unwrap();
        assert_eq!(js["surveyId"], "S1");
        assert_eq!(js["inSchool"], "No");
        assert!(js.get("surveyName").is_none());
        let back: Survey = serde_json::from_value(js).unwrap();
        assert_eq!(back, survey);
    }
}
