//! Record validation.
//!
//! Both entry points are pure: they look at one record (and the context it
//! will live in) and return every rule it breaks, as human readable
//! messages. An empty list means the record can be stored.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{Question, Survey, MODES, YES_NO_VALUES};
use crate::rules::{
    QuestionType, Requirement, TableValueRule, QUESTION_MEDIA_TYPES, TEXT_INPUT_TYPES,
};

pub const MAX_SURVEY_NAME_CHARS: usize = 99;
pub const MAX_SURVEY_DESCRIPTION_CHARS: usize = 256;

static SURVEY_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").unwrap());

static TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{2})/([0-9]{2})/([0-9]{4}) ([0-9]{2}):([0-9]{2}):([0-9]{2})$").unwrap()
});

static CHILD_QUESTION_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Q[0-9]+(\.[0-9]+)+$").unwrap());

static TABLE_QUESTION_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9]+:[^\n]+(\n[A-Za-z0-9]+:[^\n]+)*$").unwrap()
});

fn is_blank(s: Option<&str>) -> bool {
    s.map(|x| x.trim().is_empty()).unwrap_or(true)
}

/// Checks a `DD/MM/YYYY HH:MM:SS` timestamp.
///
/// Only the range of each field is checked, not the calendar: the 31st of
/// February is accepted.
pub fn is_valid_timestamp(s: &str) -> bool {
    let caps = match TIMESTAMP.captures(s) {
        Some(c) => c,
        None => return false,
    };
    let field = |i: usize| caps[i].parse::<u32>().unwrap_or(u32::MAX);
    let (day, month, hours, minutes, seconds) = (field(1), field(2), field(4), field(5), field(6));
    (1..=12).contains(&month)
        && (1..=31).contains(&day)
        && hours <= 23
        && minutes <= 59
        && seconds <= 59
}

pub fn validate_survey(survey: &Survey) -> Vec<String> {
    let mut errors: Vec<String> = Vec::new();

    if survey.survey_id.trim().is_empty() {
        errors.push("Survey ID is required".to_string());
    } else if !SURVEY_ID.is_match(&survey.survey_id) {
        errors.push(
            "Survey ID must contain only alphanumeric characters and underscores (no spaces)"
                .to_string(),
        );
    }

    match survey.survey_name.as_deref() {
        n if is_blank(n) => errors.push("Survey Name is required".to_string()),
        Some(n) if n.chars().count() > MAX_SURVEY_NAME_CHARS => errors.push(format!(
            "Survey Name must not exceed {} characters",
            MAX_SURVEY_NAME_CHARS
        )),
        _ => {}
    }

    match survey.survey_description.as_deref() {
        d if is_blank(d) => errors.push("Survey Description is required".to_string()),
        Some(d) if d.chars().count() > MAX_SURVEY_DESCRIPTION_CHARS => errors.push(format!(
            "Survey Description must not exceed {} characters",
            MAX_SURVEY_DESCRIPTION_CHARS
        )),
        _ => {}
    }

    for (field, value) in survey.yes_no_fields() {
        if let Some(v) = value {
            if !YES_NO_VALUES.contains(&v) {
                errors.push(format!("{} must be 'Yes' or 'No'", field));
            }
        }
    }

    if let Some(mode) = survey.mode.as_deref() {
        if !MODES.contains(&mode) {
            errors.push(format!("Mode must be one of: {}", MODES.join(", ")));
        }
    }

    if let Some(d) = survey.launch_date.as_deref() {
        if !is_valid_timestamp(d) {
            errors.push("Launch Date must be in DD/MM/YYYY HH:MM:SS format".to_string());
        }
    }
    if let Some(d) = survey.close_date.as_deref() {
        if !is_valid_timestamp(d) {
            errors.push("Close Date must be in DD/MM/YYYY HH:MM:SS format".to_string());
        }
    }

    errors
}

/// Validates a question.
///
/// `_surveys` and `_questions` are everything the question will be stored
/// with (the store after any overwrite, plus the incoming batch). The
/// current rules only check the shape of `sourceQuestion`, not that the
/// parent exists among them.
pub fn validate_question(
    question: &Question,
    _surveys: &[Survey],
    _questions: &[Question],
) -> Vec<String> {
    let mut errors: Vec<String> = Vec::new();

    if question.question_id.trim().is_empty() {
        errors.push("Question ID is required".to_string());
    }

    let question_type = QuestionType::from_name(&question.question_type);
    if question_type.is_none() {
        let names: Vec<&str> = QuestionType::ALL.iter().map(|qt| qt.name()).collect();
        errors.push(format!(
            "Question Type must be one of: {}",
            names.join(", ")
        ));
    }

    if question.question_description.trim().is_empty() {
        errors.push("Question Description is required".to_string());
    }

    if question.question_id.contains('.') {
        if !CHILD_QUESTION_ID.is_match(&question.question_id) {
            errors.push("Child Question ID must be in format Q1.1, Q1.2, etc.".to_string());
        }
        if question.source_question.trim().is_empty() {
            errors.push("Child questions must have a Source Question".to_string());
        }
    }

    if let Some(qt) = question_type {
        check_type_rules(question, qt, &mut errors);
    }

    if !question.text_input_type.is_empty()
        && !TEXT_INPUT_TYPES.contains(&question.text_input_type.as_str())
    {
        errors.push(format!(
            "Text_input_type must be one of: {}",
            TEXT_INPUT_TYPES.join(", ")
        ));
    }

    if !question.question_media_type.is_empty()
        && !QUESTION_MEDIA_TYPES.contains(&question.question_media_type.as_str())
    {
        errors.push(format!(
            "Question_Media_Type must be one of: {}",
            QUESTION_MEDIA_TYPES.join(", ")
        ));
    }

    if let Some(v) = question.is_mandatory.as_deref() {
        if !YES_NO_VALUES.contains(&v) {
            errors.push("Is Mandatory must be 'Yes' or 'No'".to_string());
        }
    }
    if let Some(v) = question.is_dynamic.as_deref() {
        if !YES_NO_VALUES.contains(&v) {
            errors.push("IsDynamic must be 'Yes' or 'No'".to_string());
        }
    }

    errors
}

fn check_type_rules(question: &Question, qt: QuestionType, errors: &mut Vec<String>) {
    let rules = qt.rules();

    for req in rules.required {
        match req {
            Requirement::Options => {
                if question.options.is_empty() {
                    errors.push(format!("{} requires at least one option", qt));
                }
            }
            Requirement::Field(field) => {
                if field.value(question).trim().is_empty() {
                    errors.push(format!("{} is required for {}", field.name(), qt));
                }
            }
        }
    }

    if let Some(expected) = rules.text_input_type {
        if question.text_input_type != expected {
            errors.push(format!("textInputType must be '{}' for {}", expected, qt));
        }
    }

    if let Some(expected) = rules.question_media_type {
        if question.question_media_type != expected {
            errors.push(format!(
                "questionMediaType must be '{}' for {}",
                expected, qt
            ));
        }
    }

    let num_options = question.options.len();
    if num_options > 0 {
        if let Some(max) = rules.max_options {
            if num_options > max {
                errors.push(format!("Maximum {} options allowed for {}", max, qt));
            }
        }
        if let Some(min) = rules.min_options {
            if num_options < min {
                errors.push(format!("Minimum {} options required for {}", min, qt));
            }
        }
    }

    if let Some(table_rule) = rules.table_question_value {
        if !question.table_question_value.is_empty() {
            check_table_question_value(&question.table_question_value, &table_rule, errors);
        }
    }
}

/// Checks the `key:text` lines of a table question.
fn check_table_question_value(value: &str, rule: &TableValueRule, errors: &mut Vec<String>) {
    if !TABLE_QUESTION_VALUE.is_match(value) {
        errors.push("tableQuestionValue must be in format: a:Question 1\\nb:Question 2".to_string());
    }

    let lines: Vec<&str> = value.split('\n').collect();
    if lines.len() > rule.max_lines {
        errors.push(format!(
            "Maximum {} questions allowed in tableQuestionValue",
            rule.max_lines
        ));
    }

    for (idx, line) in lines.iter().enumerate() {
        if let Some((_, text)) = line.split_once(':') {
            if text.chars().count() > rule.max_chars_per_line {
                errors.push(format!(
                    "Question {} in tableQuestionValue exceeds {} characters",
                    idx + 1,
                    rule.max_chars_per_line
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionOption;

    fn good_survey() -> Survey {
        Survey {
            survey_id: "SCH_2024".to_string(),
            survey_name: Some("School infrastructure".to_string()),
            survey_description: Some("Yearly infrastructure census".to_string()),
            public: Some("Yes".to_string()),
            mode: Some("New Data".to_string()),
            launch_date: Some("01/06/2024 09:00:00".to_string()),
            close_date: Some("30/06/2024 18:00:00".to_string()),
            ..Survey::default()
        }
    }

    fn option(text: &str) -> QuestionOption {
        QuestionOption {
            text: text.to_string(),
            text_in_english: text.to_string(),
            children: String::new(),
        }
    }

    fn question(id: &str, qt: &str) -> Question {
        Question {
            survey_id: "SCH_2024".to_string(),
            question_id: id.to_string(),
            question_type: qt.to_string(),
            question_description: "How many classrooms?".to_string(),
            text_input_type: "None".to_string(),
            question_media_type: "None".to_string(),
            mode: "None".to_string(),
            is_mandatory: Some("Yes".to_string()),
            ..Question::default()
        }
    }

    #[test]
    fn accepts_a_complete_survey() {
        assert_eq!(validate_survey(&good_survey()), Vec::<String>::new());
    }

    #[test]
    fn reports_every_survey_problem() {
        let survey = Survey {
            survey_id: "SCH 2024".to_string(),
            survey_name: Some("x".repeat(100)),
            survey_description: None,
            geo_fencing: Some("yes".to_string()),
            mode: Some("Update".to_string()),
            close_date: Some("2024/06/30 18:00:00".to_string()),
            ..good_survey()
        };
        let errors = validate_survey(&survey);
        assert_eq!(
            errors,
            vec![
                "Survey ID must contain only alphanumeric characters and underscores (no spaces)",
                "Survey Name must not exceed 99 characters",
                "Survey Description is required",
                "geoFencing must be 'Yes' or 'No'",
                "Mode must be one of: None, New Data, Correction, Delete Data",
                "Close Date must be in DD/MM/YYYY HH:MM:SS format",
            ]
        );
    }

    #[test]
    fn timestamps_check_ranges_not_calendar() {
        assert!(is_valid_timestamp("31/02/2024 10:00:00"));
        assert!(!is_valid_timestamp("2024/02/31 10:00:00"));
        assert!(!is_valid_timestamp("32/01/2024 10:00:00"));
        assert!(!is_valid_timestamp("01/13/2024 10:00:00"));
        assert!(!is_valid_timestamp("01/01/2024 24:00:00"));
        assert!(!is_valid_timestamp("01/01/2024 23:60:00"));
        assert!(!is_valid_timestamp("01/01/2024"));
        // Only ASCII digits.
        assert!(!is_valid_timestamp("01/01/\u{0968}\u{0966}\u{0968}\u{096A} 10:00:00"));
        assert!(!is_valid_timestamp("\u{0967}\u{096B}/03/2024 10:00:00"));
    }

    #[test]
    fn child_question_needs_a_source() {
        let mut q = question("Q1.1", "Text Response");
        let errors = validate_question(&q, &[], &[]);
        assert_eq!(errors, vec!["Child questions must have a Source Question"]);

        q.source_question = "Q1".to_string();
        assert!(validate_question(&q, &[], &[]).is_empty());
    }

    #[test]
    fn malformed_child_id() {
        let mut q = question("Q1.x", "Text Response");
        q.source_question = "Q1".to_string();
        assert_eq!(
            validate_question(&q, &[], &[]),
            vec!["Child Question ID must be in format Q1.1, Q1.2, etc."]
        );

        let mut q = question("Q\u{0967}.\u{0967}", "Text Response");
        q.source_question = "Q1".to_string();
        assert_eq!(
            validate_question(&q, &[], &[]),
            vec!["Child Question ID must be in format Q1.1, Q1.2, etc."]
        );
    }

    #[test]
    fn unknown_type_and_missing_description() {
        let mut q = question("Q2", "Essay");
        q.question_description = "  ".to_string();
        let errors = validate_question(&q, &[], &[]);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("Question Type must be one of: Multiple Choice"));
        assert_eq!(errors[1], "Question Description is required");
    }

    #[test]
    fn choice_questions_need_options_within_bounds() {
        let q = question("Q3", "Drop Down");
        assert_eq!(
            validate_question(&q, &[], &[]),
            vec!["Drop Down requires at least one option"]
        );

        let mut q = question("Q3", "Likert Scale");
        q.options = vec![option("Agree"), option("Disagree")];
        assert_eq!(
            validate_question(&q, &[], &[]),
            vec!["Minimum 3 options required for Likert Scale"]
        );

        q.options = (1..=8).map(|i| option(&i.to_string())).collect();
        assert_eq!(
            validate_question(&q, &[], &[]),
            vec!["Maximum 7 options allowed for Likert Scale"]
        );
    }

    #[test]
    fn fixed_values_and_required_fields() {
        let q = question("Q4", "Numeric Response");
        assert_eq!(
            validate_question(&q, &[], &[]),
            vec![
                "maxValue is required for Numeric Response",
                "minValue is required for Numeric Response",
                "textInputType must be 'Numeric' for Numeric Response",
            ]
        );

        let mut q = question("Q5", "Image Upload");
        q.question_media_type = "Picture".to_string();
        assert_eq!(
            validate_question(&q, &[], &[]),
            vec![
                "questionMediaType must be 'Image' for Image Upload",
                "Question_Media_Type must be one of: None, Image, Video, Audio",
            ]
        );
    }

    #[test]
    fn table_question_value_grammar() {
        let mut q = question("Q6", "Tabular Text Input");
        q.table_header_value = "Category,Count".to_string();
        q.table_question_value = "a:Boys toilets\nb:Girls toilets".to_string();
        assert!(validate_question(&q, &[], &[]).is_empty());

        q.table_question_value = "Boys toilets\nb:Girls toilets".to_string();
        assert_eq!(
            validate_question(&q, &[], &[]),
            vec!["tableQuestionValue must be in format: a:Question 1\\nb:Question 2"]
        );

        q.table_question_value = format!("a:{}\nb:ok", "x".repeat(101));
        assert_eq!(
            validate_question(&q, &[], &[]),
            vec!["Question 1 in tableQuestionValue exceeds 100 characters"]
        );

        q.table_question_value = (1..=21)
            .map(|i| format!("k{}:row {}", i, i))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(
            validate_question(&q, &[], &[]),
            vec!["Maximum 20 questions allowed in tableQuestionValue"]
        );
    }

    #[test]
    fn global_enums() {
        let mut q = question("Q7", "Text Response");
        q.text_input_type = "Free".to_string();
        q.is_mandatory = Some("Y".to_string());
        q.is_dynamic = Some("No".to_string());
        assert_eq!(
            validate_question(&q, &[], &[]),
            vec![
                "Text_input_type must be one of: None, Numeric, Alphanumeric, Alphabets, Date, Decimal, Mobile Number",
                "Is Mandatory must be 'Yes' or 'No'",
            ]
        );
    }
}
