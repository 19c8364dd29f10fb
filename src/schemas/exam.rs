use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Distribution, Exam, ExamSummaryRow, Question};
use crate::db::types::{DifficultyLevel, ExamStatus};
use crate::schemas::question::QuestionResponse;

fn deserialize_difficulty<'de, D>(deserializer: D) -> Result<DifficultyLevel, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    DifficultyLevel::parse_loose(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unknown difficulty: {raw}")))
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub(crate) struct ExamCreate {
    #[serde(alias = "courseId", alias = "classId")]
    #[validate(length(min = 1, message = "course_id must not be empty"))]
    pub(crate) course_id: String,
    #[serde(default)]
    #[validate(length(max = 500, message = "title must be at most 500 characters"))]
    pub(crate) title: Option<String>,
    #[validate(length(min = 1, max = 255, message = "subject must not be empty"))]
    pub(crate) subject: String,
    #[serde(deserialize_with = "deserialize_difficulty")]
    pub(crate) difficulty: DifficultyLevel,
    #[validate(range(min = 1, max = 3, message = "attempts must be between 1 and 3"))]
    pub(crate) attempts: i32,
    #[serde(alias = "totalQuestions")]
    pub(crate) total_questions: i64,
    #[serde(alias = "timeMinutes")]
    #[validate(range(min = 1, message = "time_minutes must be positive"))]
    pub(crate) time_minutes: i32,
    #[serde(default)]
    pub(crate) reference: Option<String>,
    #[serde(default)]
    pub(crate) distribution: Option<Distribution>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub(crate) struct GenerationRequest {
    #[validate(length(min = 1, max = 255, message = "subject must not be empty"))]
    pub(crate) subject: String,
    #[serde(deserialize_with = "deserialize_difficulty")]
    pub(crate) difficulty: DifficultyLevel,
    #[serde(alias = "totalQuestions")]
    pub(crate) total_questions: i64,
    #[serde(default)]
    pub(crate) reference: Option<String>,
    pub(crate) distribution: Distribution,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 500, message = "title must not be empty"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) status: Option<ExamStatus>,
    #[serde(default, alias = "courseId", alias = "classId")]
    pub(crate) course_id: Option<String>,
}

/// Loosely shaped save used by the client when the full form is not available.
#[derive(Debug, Deserialize)]
pub(crate) struct QuickSaveRequest {
    #[serde(default, alias = "courseId", alias = "classId")]
    pub(crate) course_id: Option<String>,
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) subject: Option<String>,
    #[serde(default)]
    pub(crate) difficulty: Option<String>,
    #[serde(default)]
    pub(crate) questions: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) status: ExamStatus,
    pub(crate) course_id: String,
    pub(crate) teacher_id: String,
    pub(crate) subject: Option<String>,
    pub(crate) difficulty: Option<DifficultyLevel>,
    pub(crate) attempts: Option<i32>,
    pub(crate) total_questions: Option<i32>,
    pub(crate) time_minutes: Option<i32>,
    pub(crate) reference: Option<String>,
    pub(crate) distribution: Option<Distribution>,
    pub(crate) content: Option<serde_json::Value>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
    pub(crate) questions: Vec<QuestionResponse>,
}

impl ExamResponse {
    pub(crate) fn from_db(exam: Exam, questions: Vec<Question>) -> Self {
        Self {
            id: exam.id,
            title: exam.title,
            status: exam.status,
            course_id: exam.course_id,
            teacher_id: exam.teacher_id,
            subject: exam.subject,
            difficulty: exam.difficulty,
            attempts: exam.attempts,
            total_questions: exam.total_questions,
            time_minutes: exam.time_minutes,
            reference: exam.reference,
            distribution: exam.distribution.map(|value| value.0),
            content: exam.content.map(|value| value.0),
            created_at: format_primitive(exam.created_at),
            updated_at: format_primitive(exam.updated_at),
            questions: questions.into_iter().map(QuestionResponse::from_db).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamSummaryResponse {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) status: ExamStatus,
    pub(crate) subject: Option<String>,
    pub(crate) difficulty: Option<DifficultyLevel>,
    pub(crate) question_count: i64,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl ExamSummaryResponse {
    pub(crate) fn from_row(row: ExamSummaryRow) -> Self {
        Self {
            id: row.id,
            course_id: row.course_id,
            title: row.title,
            status: row.status,
            subject: row.subject,
            difficulty: row.difficulty,
            question_count: row.question_count,
            created_at: format_primitive(row.created_at),
            updated_at: format_primitive(row.updated_at),
        }
    }
}
