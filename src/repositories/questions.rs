use sqlx::types::Json;
use sqlx::PgPool;

use crate::db::models::Question;
use crate::db::types::QuestionKind;

const COLUMNS: &str = "\
    id, exam_id, kind, text, position, options, correct_option_index, correct_answer, \
    expected_answer, created_at, updated_at";

pub(crate) struct CreateQuestion {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) kind: QuestionKind,
    pub(crate) text: String,
    /// Requested slot; `None` or anything past the end appends.
    pub(crate) position: Option<i32>,
    pub(crate) options: Vec<String>,
    pub(crate) correct_option_index: Option<i32>,
    pub(crate) correct_answer: Option<bool>,
    pub(crate) expected_answer: Option<String>,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) struct UpdateQuestion {
    pub(crate) text: String,
    pub(crate) options: Vec<String>,
    pub(crate) correct_option_index: Option<i32>,
    pub(crate) correct_answer: Option<bool>,
    pub(crate) expected_answer: Option<String>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

#[derive(Debug)]
pub(crate) enum InsertOutcome {
    Inserted(Question),
    ExamMissing,
    ExamFull(i64),
}

/// Final slot for a new question in a list of `len` questions.
pub(crate) fn resolve_position(requested: Option<i32>, len: i64) -> i32 {
    let end = i32::try_from(len).unwrap_or(i32::MAX);
    match requested {
        Some(position) if position < end => position.max(0),
        _ => end,
    }
}

pub(crate) async fn list_by_exam(
    pool: &PgPool,
    exam_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM exam_questions WHERE exam_id = $1 ORDER BY position ASC",
    ))
    .bind(exam_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!("SELECT {COLUMNS} FROM exam_questions WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Shifts every question at or after the target slot and inserts the new one,
/// holding the exam row lock so concurrent inserts on one exam serialize.
pub(crate) async fn insert_at(
    pool: &PgPool,
    params: CreateQuestion,
    max_per_exam: i64,
) -> Result<InsertOutcome, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let locked = sqlx::query_scalar::<_, String>("SELECT id FROM exams WHERE id = $1 FOR UPDATE")
        .bind(&params.exam_id)
        .fetch_optional(&mut *tx)
        .await?;
    if locked.is_none() {
        return Ok(InsertOutcome::ExamMissing);
    }

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM exam_questions WHERE exam_id = $1")
        .bind(&params.exam_id)
        .fetch_one(&mut *tx)
        .await?;
    if count >= max_per_exam {
        return Ok(InsertOutcome::ExamFull(count));
    }

    let position = resolve_position(params.position, count);

    sqlx::query(
        "UPDATE exam_questions
         SET position = position + 1, updated_at = $3
         WHERE exam_id = $1 AND position >= $2",
    )
    .bind(&params.exam_id)
    .bind(position)
    .bind(params.created_at)
    .execute(&mut *tx)
    .await?;

    let question = sqlx::query_as::<_, Question>(&format!(
        "INSERT INTO exam_questions (
            id, exam_id, kind, text, position, options, correct_option_index,
            correct_answer, expected_answer, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$10)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.exam_id)
    .bind(params.kind)
    .bind(params.text)
    .bind(position)
    .bind(Json(params.options))
    .bind(params.correct_option_index)
    .bind(params.correct_answer)
    .bind(params.expected_answer)
    .bind(params.created_at)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(InsertOutcome::Inserted(question))
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateQuestion,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "UPDATE exam_questions SET
            text = $1,
            options = $2,
            correct_option_index = $3,
            correct_answer = $4,
            expected_answer = $5,
            updated_at = $6
         WHERE id = $7
         RETURNING {COLUMNS}",
    ))
    .bind(params.text)
    .bind(Json(params.options))
    .bind(params.correct_option_index)
    .bind(params.correct_answer)
    .bind(params.expected_answer)
    .bind(params.updated_at)
    .bind(id)
    .fetch_optional(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::resolve_position;

    #[test]
    fn absent_or_overflowing_position_appends() {
        assert_eq!(resolve_position(None, 3), 3);
        assert_eq!(resolve_position(Some(3), 3), 3);
        assert_eq!(resolve_position(Some(42), 3), 3);
    }

    #[test]
    fn in_range_position_is_kept() {
        assert_eq!(resolve_position(Some(0), 3), 0);
        assert_eq!(resolve_position(Some(2), 3), 2);
    }

    #[test]
    fn negative_position_clamps_to_front() {
        assert_eq!(resolve_position(Some(-1), 3), 0);
    }
}
