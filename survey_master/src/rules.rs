//! The question types and the rules attached to each of them.
//!
//! The validation looks the rules up in [`RULE_TABLE`]; supporting a new
//! question type means adding a variant and a table entry.

use crate::model::Question;

pub const TEXT_INPUT_TYPES: [&str; 7] = [
    "None",
    "Numeric",
    "Alphanumeric",
    "Alphabets",
    "Date",
    "Decimal",
    "Mobile Number",
];

pub const QUESTION_MEDIA_TYPES: [&str; 4] = ["None", "Image", "Video", "Audio"];

/// All the question types that can be imported.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum QuestionType {
    MultipleChoiceSingleSelect,
    MultipleChoiceMultiSelect,
    DropDown,
    LikertScale,
    TextResponse,
    NumericResponse,
    Calendar,
    ImageUpload,
    VideoUpload,
    VoiceResponse,
    TabularTextInput,
    TabularDropDown,
    TabularCheckBox,
}

impl QuestionType {
    pub const ALL: [QuestionType; 13] = [
        QuestionType::MultipleChoiceSingleSelect,
        QuestionType::MultipleChoiceMultiSelect,
        QuestionType::DropDown,
        QuestionType::LikertScale,
        QuestionType::TextResponse,
        QuestionType::NumericResponse,
        QuestionType::Calendar,
        QuestionType::ImageUpload,
        QuestionType::VideoUpload,
        QuestionType::VoiceResponse,
        QuestionType::TabularTextInput,
        QuestionType::TabularDropDown,
        QuestionType::TabularCheckBox,
    ];

    /// The spelling used in the Question Master sheet.
    pub fn name(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoiceSingleSelect => "Multiple Choice Single Select",
            QuestionType::MultipleChoiceMultiSelect => "Multiple Choice Multi Select",
            QuestionType::DropDown => "Drop Down",
            QuestionType::LikertScale => "Likert Scale",
            QuestionType::TextResponse => "Text Response",
            QuestionType::NumericResponse => "Numeric Response",
            QuestionType::Calendar => "Calendar",
            QuestionType::ImageUpload => "Image Upload",
            QuestionType::VideoUpload => "Video Upload",
            QuestionType::VoiceResponse => "Voice Response",
            QuestionType::TabularTextInput => "Tabular Text Input",
            QuestionType::TabularDropDown => "Tabular Drop Down",
            QuestionType::TabularCheckBox => "Tabular Check Box",
        }
    }

    /// Exact match on the sheet spelling.
    pub fn from_name(name: &str) -> Option<QuestionType> {
        QuestionType::ALL.iter().copied().find(|qt| qt.name() == name)
    }

    pub fn rules(&self) -> &'static TypeRules {
        rules_for(*self)
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A scalar question field that a type can make mandatory.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum QuestionField {
    TextInputType,
    TextLimitCharacters,
    MaxValue,
    MinValue,
    TableHeaderValue,
    TableQuestionValue,
    QuestionMediaLink,
    QuestionMediaType,
    SourceQuestion,
}

impl QuestionField {
    pub fn name(&self) -> &'static str {
        match self {
            QuestionField::TextInputType => "textInputType",
            QuestionField::TextLimitCharacters => "textLimitCharacters",
            QuestionField::MaxValue => "maxValue",
            QuestionField::MinValue => "minValue",
            QuestionField::TableHeaderValue => "tableHeaderValue",
            QuestionField::TableQuestionValue => "tableQuestionValue",
            QuestionField::QuestionMediaLink => "questionMediaLink",
            QuestionField::QuestionMediaType => "questionMediaType",
            QuestionField::SourceQuestion => "sourceQuestion",
        }
    }

    pub fn value<'a>(&self, question: &'a Question) -> &'a str {
        match self {
            QuestionField::TextInputType => &question.text_input_type,
            QuestionField::TextLimitCharacters => &question.text_limit_characters,
            QuestionField::MaxValue => &question.max_value,
            QuestionField::MinValue => &question.min_value,
            QuestionField::TableHeaderValue => &question.table_header_value,
            QuestionField::TableQuestionValue => &question.table_question_value,
            QuestionField::QuestionMediaLink => &question.question_media_link,
            QuestionField::QuestionMediaType => &question.question_media_type,
            QuestionField::SourceQuestion => &question.source_question,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Requirement {
    /// At least one option.
    Options,
    /// A non-blank value.
    Field(QuestionField),
}

/// Limits on the `key:text` lines of a table question.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct TableValueRule {
    pub max_lines: usize,
    pub max_chars_per_line: usize,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TypeRules {
    pub question_type: QuestionType,
    pub required: &'static [Requirement],
    pub text_input_type: Option<&'static str>,
    pub question_media_type: Option<&'static str>,
    pub min_options: Option<usize>,
    pub max_options: Option<usize>,
    pub table_question_value: Option<TableValueRule>,
}

const TABLE_VALUES: TableValueRule = TableValueRule {
    max_lines: 20,
    max_chars_per_line: 100,
};

const NO_RULES: TypeRules = TypeRules {
    question_type: QuestionType::TextResponse,
    required: &[],
    text_input_type: None,
    question_media_type: None,
    min_options: None,
    max_options: None,
    table_question_value: None,
};

const CHOICE: TypeRules = TypeRules {
    required: &[Requirement::Options],
    min_options: Some(2),
    max_options: Some(20),
    ..NO_RULES
};

const TABULAR: TypeRules = TypeRules {
    required: &[
        Requirement::Field(QuestionField::TableHeaderValue),
        Requirement::Field(QuestionField::TableQuestionValue),
    ],
    table_question_value: Some(TABLE_VALUES),
    ..NO_RULES
};

const TABULAR_CHOICE: TypeRules = TypeRules {
    required: &[
        Requirement::Field(QuestionField::TableHeaderValue),
        Requirement::Field(QuestionField::TableQuestionValue),
        Requirement::Options,
    ],
    min_options: Some(2),
    max_options: Some(20),
    table_question_value: Some(TABLE_VALUES),
    ..NO_RULES
};

pub static RULE_TABLE: [TypeRules; 13] = [
    TypeRules {
        question_type: QuestionType::MultipleChoiceSingleSelect,
        ..CHOICE
    },
    TypeRules {
        question_type: QuestionType::MultipleChoiceMultiSelect,
        ..CHOICE
    },
    TypeRules {
        question_type: QuestionType::DropDown,
        ..CHOICE
    },
    TypeRules {
        question_type: QuestionType::LikertScale,
        min_options: Some(3),
        max_options: Some(7),
        ..CHOICE
    },
    TypeRules {
        question_type: QuestionType::TextResponse,
        required: &[Requirement::Field(QuestionField::TextInputType)],
        ..NO_RULES
    },
    TypeRules {
        question_type: QuestionType::NumericResponse,
        required: &[
            Requirement::Field(QuestionField::MaxValue),
            Requirement::Field(QuestionField::MinValue),
        ],
        text_input_type: Some("Numeric"),
        ..NO_RULES
    },
    TypeRules {
        question_type: QuestionType::Calendar,
        text_input_type: Some("Date"),
        ..NO_RULES
    },
    TypeRules {
        question_type: QuestionType::ImageUpload,
        question_media_type: Some("Image"),
        ..NO_RULES
    },
    TypeRules {
        question_type: QuestionType::VideoUpload,
        question_media_type: Some("Video"),
        ..NO_RULES
    },
    TypeRules {
        question_type: QuestionType::VoiceResponse,
        question_media_type: Some("Audio"),
        ..NO_RULES
    },
    TypeRules {
        question_type: QuestionType::TabularTextInput,
        ..TABULAR
    },
    TypeRules {
        question_type: QuestionType::TabularDropDown,
        ..TABULAR_CHOICE
    },
    TypeRules {
        question_type: QuestionType::TabularCheckBox,
        ..TABULAR_CHOICE
    },
];

/// The rules of a question type.
pub fn rules_for(question_type: QuestionType) -> &'static TypeRules {
    RULE_TABLE
        .iter()
        .find(|r| r.question_type == question_type)
        .unwrap_or(&NO_RULES_ENTRY)
}

// Only reachable if a variant is missing from the table.
static NO_RULES_ENTRY: TypeRules = NO_RULES;
