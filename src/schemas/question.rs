use serde::{Deserialize, Deserializer, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::Question;
use crate::db::types::QuestionKind;

/// Kind-discriminated question body; fields that do not belong to the kind are ignored.
///
/// The `kind` tag takes snake_case, kebab-case or camelCase. Free-form spellings
/// such as "Multiple Choice" are only accepted from the generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum QuestionPayload {
    #[serde(alias = "multiple-choice", alias = "multipleChoice")]
    MultipleChoice {
        text: String,
        #[serde(default)]
        options: Vec<String>,
        #[serde(default, alias = "correctOptionIndex")]
        correct_option_index: Option<i32>,
    },
    #[serde(alias = "true-false", alias = "trueFalse")]
    TrueFalse {
        text: String,
        #[serde(default, alias = "correctAnswer")]
        correct_answer: Option<bool>,
    },
    #[serde(alias = "open-analysis", alias = "openAnalysis")]
    OpenAnalysis {
        text: String,
        #[serde(default, alias = "expectedAnswer")]
        expected_answer: Option<String>,
    },
    #[serde(alias = "open-exercise", alias = "openExercise")]
    OpenExercise {
        text: String,
        #[serde(default, alias = "expectedAnswer")]
        expected_answer: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuestionCreate {
    #[serde(default, alias = "order")]
    pub(crate) position: Option<i32>,
    #[serde(flatten)]
    pub(crate) question: QuestionPayload,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct QuestionUpdate {
    #[serde(default)]
    pub(crate) text: Option<String>,
    #[serde(default)]
    pub(crate) options: Option<Vec<String>>,
    #[serde(default, alias = "correctOptionIndex")]
    pub(crate) correct_option_index: Option<i32>,
    #[serde(default, alias = "correctAnswer")]
    pub(crate) correct_answer: Option<bool>,
    #[serde(default, alias = "expectedAnswer")]
    pub(crate) expected_answer: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) kind: QuestionKind,
    pub(crate) text: String,
    #[serde(rename = "order")]
    pub(crate) position: i32,
    pub(crate) options: Vec<String>,
    pub(crate) correct_option_index: Option<i32>,
    pub(crate) correct_answer: Option<bool>,
    pub(crate) expected_answer: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl QuestionResponse {
    pub(crate) fn from_db(question: Question) -> Self {
        Self {
            id: question.id,
            exam_id: question.exam_id,
            kind: question.kind,
            text: question.text,
            position: question.position,
            options: question.options.0,
            correct_option_index: question.correct_option_index,
            correct_answer: question.correct_answer,
            expected_answer: question.expected_answer,
            created_at: format_primitive(question.created_at),
            updated_at: format_primitive(question.updated_at),
        }
    }
}

/// One question as produced by the generation collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct GeneratedQuestion {
    #[serde(alias = "type", deserialize_with = "deserialize_kind")]
    pub(crate) kind: QuestionKind,
    #[serde(alias = "question")]
    pub(crate) text: String,
    #[serde(default)]
    pub(crate) options: Vec<String>,
    #[serde(default, alias = "correctOptionIndex")]
    pub(crate) correct_option_index: Option<i32>,
    #[serde(default, alias = "correctAnswer")]
    pub(crate) correct_answer: Option<bool>,
    #[serde(default, alias = "expectedAnswer")]
    pub(crate) expected_answer: Option<String>,
}

fn deserialize_kind<'de, D>(deserializer: D) -> Result<QuestionKind, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    QuestionKind::parse_loose(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unknown question kind: {raw}")))
}

/// Generated questions bucketed by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct GroupedQuestions {
    #[serde(default)]
    pub(crate) multiple_choice: Vec<GeneratedQuestion>,
    #[serde(default)]
    pub(crate) true_false: Vec<GeneratedQuestion>,
    #[serde(default)]
    pub(crate) open_analysis: Vec<GeneratedQuestion>,
    #[serde(default)]
    pub(crate) open_exercise: Vec<GeneratedQuestion>,
}

impl GroupedQuestions {
    pub(crate) fn bucket(&self, kind: QuestionKind) -> &[GeneratedQuestion] {
        match kind {
            QuestionKind::MultipleChoice => &self.multiple_choice,
            QuestionKind::TrueFalse => &self.true_false,
            QuestionKind::OpenAnalysis => &self.open_analysis,
            QuestionKind::OpenExercise => &self.open_exercise,
        }
    }

    pub(crate) fn bucket_mut(&mut self, kind: QuestionKind) -> &mut Vec<GeneratedQuestion> {
        match kind {
            QuestionKind::MultipleChoice => &mut self.multiple_choice,
            QuestionKind::TrueFalse => &mut self.true_false,
            QuestionKind::OpenAnalysis => &mut self.open_analysis,
            QuestionKind::OpenExercise => &mut self.open_exercise,
        }
    }

    pub(crate) fn len(&self) -> usize {
        QuestionKind::ALL.iter().map(|kind| self.bucket(*kind).len()).sum()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerationResponse {
    pub(crate) questions: GroupedQuestions,
}
