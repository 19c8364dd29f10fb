use axum::extract::State;

use crate::api::envelope::{ApiResponse, JsonBody};
use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::core::state::AppState;
use crate::schemas::exam::{ExamCreate, ExamResponse, GenerationRequest, QuickSaveRequest};
use crate::schemas::question::GenerationResponse;
use crate::services::{exam_commands, quick_save as quick_save_service};

pub(in crate::api::exams) async fn create_exam(
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ExamCreate>,
) -> Result<ApiResponse<ExamResponse>, ApiError> {
    let exam =
        exam_commands::create_exam(state.store(), state.settings().exam(), &teacher, payload)
            .await?;

    Ok(ApiResponse::created("Exam created", ExamResponse::from_db(exam, Vec::new())))
}

pub(in crate::api::exams) async fn generate_questions(
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<GenerationRequest>,
) -> Result<ApiResponse<GenerationResponse>, ApiError> {
    tracing::info!(teacher_id = %teacher.id, action = "generate", "Question generation requested");

    let questions =
        exam_commands::generate_questions(state.generator(), state.settings().exam(), payload)
            .await?;

    Ok(ApiResponse::ok("Questions generated", GenerationResponse { questions }))
}

pub(in crate::api::exams) async fn quick_save(
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<QuickSaveRequest>,
) -> Result<ApiResponse<ExamResponse>, ApiError> {
    let exam = quick_save_service::quick_save(state.store(), &teacher, payload).await?;

    Ok(ApiResponse::created("Exam saved", ExamResponse::from_db(exam, Vec::new())))
}
