use axum::extract::rejection::JsonRejection;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::api::envelope::EnvelopeBody;
use crate::services::errors::ExamError;

#[derive(Debug, Serialize)]
pub(crate) struct ErrorPayload {
    pub(crate) status: u16,
    pub(crate) kind: &'static str,
    pub(crate) detail: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden(&'static str),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    TooManyRequests(&'static str),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }

    pub(crate) fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(self) -> String {
        match self {
            Self::Unauthorized(message)
            | Self::Forbidden(message)
            | Self::TooManyRequests(message) => message.to_string(),
            Self::BadRequest(message)
            | Self::NotFound(message)
            | Self::Conflict(message)
            | Self::Internal(message) => message,
        }
    }
}

/// Stable machine-readable name for an error status.
pub(crate) fn kind_for_status(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => "validation",
        StatusCode::UNAUTHORIZED => "unauthorized",
        StatusCode::FORBIDDEN => "access_denied",
        StatusCode::NOT_FOUND => "not_found",
        StatusCode::METHOD_NOT_ALLOWED => "method_not_allowed",
        StatusCode::CONFLICT => "conflict",
        StatusCode::TOO_MANY_REQUESTS => "rate_limited",
        StatusCode::SERVICE_UNAVAILABLE => "service_unavailable",
        status if status.is_server_error() => "internal",
        _ => "client_error",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = ?self, "Request failed");
        }

        let detail = self.detail();
        let payload = ErrorPayload { status: status.as_u16(), kind: kind_for_status(status), detail };

        let mut response = status.into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response.extensions_mut().insert(EnvelopeBody::error(payload));
        response
    }
}

impl From<ExamError> for ApiError {
    fn from(err: ExamError) -> Self {
        match err {
            ExamError::Validation(message) => Self::BadRequest(message),
            ExamError::AccessDenied(message) => Self::Forbidden(message),
            ExamError::NotFound(message) => Self::NotFound(message.to_string()),
            ExamError::Conflict(message) => Self::Conflict(message),
            ExamError::Internal(message) => Self::Internal(message),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ExamError::from(errors).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exam_errors_map_to_distinct_statuses() {
        let cases = [
            (ExamError::validation("bad"), StatusCode::BAD_REQUEST),
            (ExamError::AccessDenied("no"), StatusCode::FORBIDDEN),
            (ExamError::NotFound("missing"), StatusCode::NOT_FOUND),
            (ExamError::Conflict("dup".to_string()), StatusCode::CONFLICT),
            (ExamError::Internal("boom".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn unauthorized_sets_challenge_header() {
        let response = ApiError::Unauthorized("nope").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
        assert!(response.extensions().get::<EnvelopeBody>().is_some());
    }
}
