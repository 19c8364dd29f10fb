use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::envelope::{ApiResponse, JsonBody};
use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::api::validation::{normalize_email, validate_password_len};
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Teacher;
use crate::repositories::{CreateTeacher, StoreError};
use crate::schemas::auth::{LoginRequest, SignupRequest, TokenResponse};
use crate::schemas::teacher::TeacherResponse;

/// Max attempts per window for auth endpoints.
const AUTH_RATE_LIMIT: u64 = 10;
/// Rate limit window in seconds.
const AUTH_RATE_WINDOW_SECONDS: u64 = 60;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/signup", post(signup)).route("/login", post(login)).route("/me", get(me))
}

async fn signup(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<SignupRequest>,
) -> Result<ApiResponse<TokenResponse>, ApiError> {
    payload.validate()?;
    validate_password_len(&payload.password)?;
    let email = normalize_email(&payload.email);

    enforce_rate_limit(&state, "signup", &email).await?;

    let existing = state
        .store()
        .find_teacher_by_email(&email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing teacher"))?;
    if existing.is_some() {
        return Err(ApiError::Conflict("Email already registered".to_string()));
    }

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let teacher = state
        .store()
        .create_teacher(CreateTeacher {
            id: Uuid::new_v4().to_string(),
            email,
            hashed_password,
            full_name: payload.full_name.trim().to_string(),
            created_at: primitive_now_utc(),
        })
        .await
        .map_err(|err| match err {
            StoreError::Conflict(message) => ApiError::Conflict(message),
            other => ApiError::internal(other, "Failed to create teacher"),
        })?;

    tracing::info!(teacher_id = %teacher.id, action = "signup", "Teacher registered");
    let response = token_response(&state, teacher)?;
    Ok(ApiResponse::created("Teacher registered", response))
}

async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<ApiResponse<TokenResponse>, ApiError> {
    let email = normalize_email(&payload.email);
    enforce_rate_limit(&state, "login", &email).await?;

    let teacher = state
        .store()
        .find_teacher_by_email(&email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load teacher"))?
        .ok_or(ApiError::Unauthorized("Incorrect email or password"))?;

    let verified = security::verify_password(&payload.password, &teacher.hashed_password)
        .map_err(|_| ApiError::Unauthorized("Incorrect email or password"))?;
    if !verified {
        return Err(ApiError::Unauthorized("Incorrect email or password"));
    }

    if !teacher.is_active {
        return Err(ApiError::BadRequest("Inactive teacher".to_string()));
    }

    let response = token_response(&state, teacher)?;
    Ok(ApiResponse::ok("Login successful", response))
}

async fn me(CurrentTeacher(teacher): CurrentTeacher) -> ApiResponse<TeacherResponse> {
    ApiResponse::ok("Current teacher", TeacherResponse::from_db(teacher))
}

async fn enforce_rate_limit(state: &AppState, action: &str, email: &str) -> Result<(), ApiError> {
    let rate_key = format!("rl:{action}:{email}");
    let allowed = state
        .redis()
        .rate_limit(&rate_key, AUTH_RATE_LIMIT, AUTH_RATE_WINDOW_SECONDS)
        .await
        .unwrap_or(true);
    if allowed {
        Ok(())
    } else {
        Err(ApiError::TooManyRequests("Too many attempts, try again later"))
    }
}

fn token_response(state: &AppState, teacher: Teacher) -> Result<TokenResponse, ApiError> {
    let access_token = security::create_access_token(&teacher.id, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    Ok(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
        teacher: TeacherResponse::from_db(teacher),
    })
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::test_support;

    #[tokio::test]
    async fn signup_login_and_me_flow() {
        let ctx = test_support::setup_test_context().await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/auth/signup",
                None,
                Some(json!({
                    "email": "Ada@School.org",
                    "password": "long-enough-password",
                    "fullName": "Ada Lovelace"
                })),
            ))
            .await
            .expect("signup");
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = test_support::read_json(response).await;
        assert_eq!(body["data"]["teacher"]["email"], "ada@school.org");

        let duplicate = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/auth/signup",
                None,
                Some(json!({
                    "email": "ada@school.org",
                    "password": "long-enough-password",
                    "full_name": "Ada Again"
                })),
            ))
            .await
            .expect("duplicate signup");
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({"email": "ada@school.org", "password": "long-enough-password"})),
            ))
            .await
            .expect("login");
        assert_eq!(response.status(), StatusCode::OK);
        let body = test_support::read_json(response).await;
        let token = body["data"]["access_token"].as_str().expect("token").to_string();

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(Method::GET, "/api/auth/me", Some(&token), None))
            .await
            .expect("me");
        assert_eq!(response.status(), StatusCode::OK);
        let body = test_support::read_json(response).await;
        assert_eq!(body["data"]["full_name"], "Ada Lovelace");
        assert_eq!(body["path"], "/api/auth/me");
    }

    #[tokio::test]
    async fn login_rejects_wrong_password() {
        let ctx = test_support::setup_test_context().await;
        test_support::insert_teacher(&ctx, "grace@school.org", "Grace Hopper", "correct-password")
            .await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({"email": "grace@school.org", "password": "wrong-password"})),
            ))
            .await
            .expect("login");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = test_support::read_json(response).await;
        assert_eq!(body["error"]["kind"], "unauthorized");
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let ctx = test_support::setup_test_context().await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/auth/signup",
                None,
                Some(json!({"email": "x@school.org", "password": "short", "full_name": "X"})),
            ))
            .await
            .expect("signup");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
