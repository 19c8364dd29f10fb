use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{DifficultyLevel, ExamStatus, QuestionKind};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Teacher {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) hashed_password: String,
    pub(crate) full_name: String,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Course {
    pub(crate) id: String,
    pub(crate) teacher_id: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// Requested number of questions per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Distribution {
    #[serde(default, alias = "multipleChoice")]
    pub(crate) multiple_choice: u32,
    #[serde(default, alias = "trueFalse")]
    pub(crate) true_false: u32,
    #[serde(default, alias = "openAnalysis")]
    pub(crate) open_analysis: u32,
    #[serde(default, alias = "openExercise")]
    pub(crate) open_exercise: u32,
}

impl Distribution {
    /// Sum of the four counts; widened so oversized inputs cannot wrap.
    pub(crate) fn total(&self) -> u64 {
        u64::from(self.multiple_choice)
            + u64::from(self.true_false)
            + u64::from(self.open_analysis)
            + u64::from(self.open_exercise)
    }

    pub(crate) fn count(&self, kind: QuestionKind) -> u32 {
        match kind {
            QuestionKind::MultipleChoice => self.multiple_choice,
            QuestionKind::TrueFalse => self.true_false,
            QuestionKind::OpenAnalysis => self.open_analysis,
            QuestionKind::OpenExercise => self.open_exercise,
        }
    }

    pub(crate) fn set(&mut self, kind: QuestionKind, count: u32) {
        match kind {
            QuestionKind::MultipleChoice => self.multiple_choice = count,
            QuestionKind::TrueFalse => self.true_false = count,
            QuestionKind::OpenAnalysis => self.open_analysis = count,
            QuestionKind::OpenExercise => self.open_exercise = count,
        }
    }

    pub(crate) fn single(kind: QuestionKind) -> Self {
        let mut distribution = Self::default();
        distribution.set(kind, 1);
        distribution
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Exam {
    pub(crate) id: String,
    pub(crate) teacher_id: String,
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) status: ExamStatus,
    pub(crate) subject: Option<String>,
    pub(crate) difficulty: Option<DifficultyLevel>,
    pub(crate) attempts: Option<i32>,
    pub(crate) total_questions: Option<i32>,
    pub(crate) time_minutes: Option<i32>,
    pub(crate) reference: Option<String>,
    pub(crate) distribution: Option<Json<Distribution>>,
    pub(crate) content: Option<Json<serde_json::Value>>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) kind: QuestionKind,
    pub(crate) text: String,
    pub(crate) position: i32,
    pub(crate) options: Json<Vec<String>>,
    pub(crate) correct_option_index: Option<i32>,
    pub(crate) correct_answer: Option<bool>,
    pub(crate) expected_answer: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct ExamSummaryRow {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) status: ExamStatus,
    pub(crate) subject: Option<String>,
    pub(crate) difficulty: Option<DifficultyLevel>,
    pub(crate) question_count: i64,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distribution_accepts_camel_case_and_missing_counts() {
        let parsed: Distribution =
            serde_json::from_value(serde_json::json!({"multipleChoice": 3, "open_exercise": 2}))
                .expect("distribution");
        assert_eq!(parsed.multiple_choice, 3);
        assert_eq!(parsed.true_false, 0);
        assert_eq!(parsed.open_exercise, 2);
        assert_eq!(parsed.total(), 5);
    }

    #[test]
    fn distribution_total_does_not_wrap() {
        let distribution = Distribution {
            multiple_choice: u32::MAX,
            true_false: u32::MAX,
            open_analysis: 0,
            open_exercise: 0,
        };
        assert_eq!(distribution.total(), 2 * u64::from(u32::MAX));
    }
}
