use crate::db::models::Question;
use crate::db::types::QuestionKind;
use crate::schemas::question::{QuestionPayload, QuestionUpdate};
use crate::services::errors::ExamError;

pub(crate) const MIN_CHOICE_OPTIONS: usize = 2;

/// A question's content detached from its identity and position.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QuestionDraft {
    pub(crate) kind: QuestionKind,
    pub(crate) text: String,
    pub(crate) options: Vec<String>,
    pub(crate) correct_option_index: Option<i32>,
    pub(crate) correct_answer: Option<bool>,
    pub(crate) expected_answer: Option<String>,
}

impl QuestionDraft {
    fn empty(kind: QuestionKind, text: String) -> Self {
        Self {
            kind,
            text: text.trim().to_string(),
            options: Vec::new(),
            correct_option_index: None,
            correct_answer: None,
            expected_answer: None,
        }
    }

    pub(crate) fn from_payload(payload: QuestionPayload) -> Self {
        match payload {
            QuestionPayload::MultipleChoice { text, options, correct_option_index } => Self {
                options: normalize_options(options),
                correct_option_index,
                ..Self::empty(QuestionKind::MultipleChoice, text)
            },
            QuestionPayload::TrueFalse { text, correct_answer } => {
                Self { correct_answer, ..Self::empty(QuestionKind::TrueFalse, text) }
            }
            QuestionPayload::OpenAnalysis { text, expected_answer } => {
                Self { expected_answer, ..Self::empty(QuestionKind::OpenAnalysis, text) }
            }
            QuestionPayload::OpenExercise { text, expected_answer } => {
                Self { expected_answer, ..Self::empty(QuestionKind::OpenExercise, text) }
            }
        }
    }

    pub(crate) fn from_stored(question: &Question) -> Self {
        Self {
            kind: question.kind,
            text: question.text.clone(),
            options: question.options.0.clone(),
            correct_option_index: question.correct_option_index,
            correct_answer: question.correct_answer,
            expected_answer: question.expected_answer.clone(),
        }
    }

    /// Applies the fields of `patch` that belong to this draft's kind.
    pub(crate) fn apply(mut self, patch: QuestionUpdate) -> Self {
        if let Some(text) = patch.text {
            self.text = text.trim().to_string();
        }

        match self.kind {
            QuestionKind::MultipleChoice => {
                if let Some(options) = patch.options {
                    self.options = normalize_options(options);
                }
                if patch.correct_option_index.is_some() {
                    self.correct_option_index = patch.correct_option_index;
                }
            }
            QuestionKind::TrueFalse => {
                if patch.correct_answer.is_some() {
                    self.correct_answer = patch.correct_answer;
                }
            }
            QuestionKind::OpenAnalysis | QuestionKind::OpenExercise => {
                if patch.expected_answer.is_some() {
                    self.expected_answer = patch.expected_answer;
                }
            }
        }

        self
    }

    pub(crate) fn validate(&self) -> Result<(), ExamError> {
        if self.text.is_empty() {
            return Err(ExamError::validation("Question text must not be empty"));
        }

        match self.kind {
            QuestionKind::MultipleChoice => {
                if self.options.len() < MIN_CHOICE_OPTIONS {
                    return Err(ExamError::validation(format!(
                        "Multiple choice questions need at least {MIN_CHOICE_OPTIONS} options"
                    )));
                }
                if self.options.iter().any(|option| option.is_empty()) {
                    return Err(ExamError::validation("Options must not be empty"));
                }
                let in_range = self
                    .correct_option_index
                    .and_then(|index| usize::try_from(index).ok())
                    .is_some_and(|index| index < self.options.len());
                if !in_range {
                    return Err(ExamError::validation(
                        "correct_option_index must point at one of the options",
                    ));
                }
            }
            QuestionKind::TrueFalse => {
                if self.correct_answer.is_none() {
                    return Err(ExamError::validation(
                        "True/false questions need a correct_answer",
                    ));
                }
            }
            QuestionKind::OpenAnalysis | QuestionKind::OpenExercise => {}
        }

        Ok(())
    }
}

fn normalize_options(options: Vec<String>) -> Vec<String> {
    options.into_iter().map(|option| option.trim().to_string()).collect()
}
