use axum::{
    extract::{Path, Query, State},
    routing::get,
    Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::envelope::{ApiResponse, JsonBody};
use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::api::pagination::{PageQuery, PaginatedResponse};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories::CreateCourse;
use crate::schemas::course::{CourseCreate, CourseResponse};
use crate::schemas::exam::ExamSummaryResponse;
use crate::services::exam_queries;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_courses).post(create_course))
        .route("/:course_id/exams", get(list_course_exams))
}

async fn create_course(
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CourseCreate>,
) -> Result<ApiResponse<CourseResponse>, ApiError> {
    payload.validate()?;

    let course = state
        .store()
        .create_course(CreateCourse {
            id: Uuid::new_v4().to_string(),
            teacher_id: teacher.id.clone(),
            name: payload.name.trim().to_string(),
            description: payload.description.filter(|value| !value.trim().is_empty()),
            created_at: primitive_now_utc(),
        })
        .await
        .map_err(|e| ApiError::internal(e, "Failed to create course"))?;

    tracing::info!(teacher_id = %teacher.id, course_id = %course.id, "Course created");
    Ok(ApiResponse::created("Course created", CourseResponse::from_db(course)))
}

async fn list_courses(
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<CourseResponse>>, ApiError> {
    let courses = state
        .store()
        .list_courses_for_teacher(&teacher.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list courses"))?;

    Ok(ApiResponse::ok(
        "Courses retrieved",
        courses.into_iter().map(CourseResponse::from_db).collect(),
    ))
}

async fn list_course_exams(
    Path(course_id): Path<String>,
    Query(params): Query<PageQuery>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<ApiResponse<PaginatedResponse<ExamSummaryResponse>>, ApiError> {
    let (skip, limit) = params.normalized();
    let page =
        exam_queries::list_exams_by_course(state.store(), &teacher, &course_id, skip, limit)
            .await?;

    Ok(ApiResponse::ok(
        "Exams retrieved",
        PaginatedResponse {
            items: page.items.into_iter().map(ExamSummaryResponse::from_row).collect(),
            total_count: page.total_count,
            skip,
            limit,
        },
    ))
}
