use axum::extract::{Path, State};

use crate::api::envelope::{ApiResponse, JsonBody};
use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::core::state::AppState;
use crate::schemas::question::{QuestionCreate, QuestionResponse, QuestionUpdate};
use crate::services::exam_commands;

pub(in crate::api::exams) async fn add_question(
    Path(exam_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<QuestionCreate>,
) -> Result<ApiResponse<QuestionResponse>, ApiError> {
    let question = exam_commands::add_question(
        state.store(),
        state.settings().exam(),
        &teacher,
        &exam_id,
        payload,
    )
    .await?;

    Ok(ApiResponse::created("Question added", QuestionResponse::from_db(question)))
}

pub(in crate::api::exams) async fn update_question(
    Path(question_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<QuestionUpdate>,
) -> Result<ApiResponse<QuestionResponse>, ApiError> {
    let question =
        exam_commands::update_question(state.store(), &teacher, &question_id, payload).await?;

    Ok(ApiResponse::ok("Question updated", QuestionResponse::from_db(question)))
}
