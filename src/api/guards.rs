use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::{security, state::AppState};
use crate::db::models::Teacher;

/// The authenticated, active teacher behind a bearer token.
pub(crate) struct CurrentTeacher(pub(crate) Teacher);

#[async_trait]
impl FromRequestParts<AppState> for CurrentTeacher {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        // No credentials at all means no caller identity.
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(ApiError::Forbidden("Not authenticated"))?
            .to_str()
            .map_err(|_| ApiError::Unauthorized("Invalid authentication credentials"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let claims = security::verify_token(token, app_state.settings())
            .map_err(|_| ApiError::Unauthorized("Invalid authentication credentials"))?;

        let teacher = app_state
            .store()
            .find_teacher_by_id(&claims.sub)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load teacher"))?;

        let Some(teacher) = teacher else {
            return Err(ApiError::Unauthorized("Teacher not found"));
        };

        if !teacher.is_active {
            return Err(ApiError::Unauthorized("Invalid authentication credentials"));
        }

        Ok(CurrentTeacher(teacher))
    }
}
