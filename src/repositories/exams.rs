use sqlx::types::Json;
use sqlx::PgPool;

use crate::db::models::{Distribution, Exam, ExamSummaryRow};
use crate::db::types::{DifficultyLevel, ExamStatus};

pub(crate) const COLUMNS: &str = "\
    id, teacher_id, course_id, title, status, subject, difficulty, attempts, \
    total_questions, time_minutes, reference, distribution, content, created_at, updated_at";

pub(crate) struct CreateExam {
    pub(crate) id: String,
    pub(crate) teacher_id: String,
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) subject: Option<String>,
    pub(crate) difficulty: Option<DifficultyLevel>,
    pub(crate) attempts: Option<i32>,
    pub(crate) total_questions: Option<i32>,
    pub(crate) time_minutes: Option<i32>,
    pub(crate) reference: Option<String>,
    pub(crate) distribution: Option<Distribution>,
    pub(crate) content: Option<serde_json::Value>,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) struct UpdateExam {
    pub(crate) title: Option<String>,
    pub(crate) status: Option<ExamStatus>,
    pub(crate) course_id: Option<String>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateExam) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "INSERT INTO exams (
            id, teacher_id, course_id, title, status, subject, difficulty, attempts,
            total_questions, time_minutes, reference, distribution, content,
            created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$14)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.teacher_id)
    .bind(params.course_id)
    .bind(params.title)
    .bind(ExamStatus::Saved)
    .bind(params.subject)
    .bind(params.difficulty)
    .bind(params.attempts)
    .bind(params.total_questions)
    .bind(params.time_minutes)
    .bind(params.reference)
    .bind(params.distribution.map(Json))
    .bind(params.content.map(Json))
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateExam,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "UPDATE exams SET
            title = COALESCE($1, title),
            status = COALESCE($2, status),
            course_id = COALESCE($3, course_id),
            updated_at = $4
         WHERE id = $5
         RETURNING {COLUMNS}",
    ))
    .bind(params.title)
    .bind(params.status)
    .bind(params.course_id)
    .bind(params.updated_at)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_by_course(
    pool: &PgPool,
    course_id: &str,
    teacher_id: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<ExamSummaryRow>, sqlx::Error> {
    sqlx::query_as::<_, ExamSummaryRow>(
        "SELECT e.id,
                e.course_id,
                e.title,
                e.status,
                e.subject,
                e.difficulty,
                (SELECT COUNT(*) FROM exam_questions q WHERE q.exam_id = e.id) AS question_count,
                e.created_at,
                e.updated_at
         FROM exams e
         WHERE e.course_id = $1 AND e.teacher_id = $2
         ORDER BY e.created_at DESC, e.id DESC
         OFFSET $3 LIMIT $4",
    )
    .bind(course_id)
    .bind(teacher_id)
    .bind(skip.max(0))
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_by_course(
    pool: &PgPool,
    course_id: &str,
    teacher_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM exams WHERE course_id = $1 AND teacher_id = $2")
        .bind(course_id)
        .bind(teacher_id)
        .fetch_one(pool)
        .await
}
