use axum::extract::{Path, State};

use crate::api::envelope::{ApiResponse, JsonBody};
use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::core::state::AppState;
use crate::schemas::exam::{ExamResponse, ExamUpdate};
use crate::services::{exam_commands, exam_queries};

pub(in crate::api::exams) async fn get_exam(
    Path(exam_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<ApiResponse<ExamResponse>, ApiError> {
    let (exam, questions) = exam_queries::get_exam(state.store(), &teacher, &exam_id).await?;

    Ok(ApiResponse::ok("Exam retrieved", ExamResponse::from_db(exam, questions)))
}

pub(in crate::api::exams) async fn update_exam(
    Path(exam_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ExamUpdate>,
) -> Result<ApiResponse<ExamResponse>, ApiError> {
    let exam = exam_commands::update_exam(state.store(), &teacher, &exam_id, payload).await?;
    let questions = state
        .store()
        .list_questions(&exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load exam questions"))?;

    Ok(ApiResponse::ok("Exam updated", ExamResponse::from_db(exam, questions)))
}
