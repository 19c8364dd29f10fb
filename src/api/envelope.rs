//! Uniform response wrapper.
//!
//! Handlers return [`ApiResponse`] or [`ApiError`]; both stash an
//! [`EnvelopeBody`] in the response extensions and [`wrap_envelope`] renders
//! it as `{correlation_id, message, path, data | error}` once the request id
//! and original path are known.

use axum::body::{to_bytes, Body};
use axum::extract::{FromRequest, OriginalUri, Request};
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::api::errors::{kind_for_status, ApiError, ErrorPayload};

pub(crate) const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

const MAX_FALLBACK_BODY: usize = 64 * 1024;

/// JSON body extractor whose rejections come back as enveloped 400s.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub(crate) struct JsonBody<T>(pub(crate) T);

#[derive(Debug, Clone)]
pub(crate) enum EnvelopeBody {
    Data { message: String, data: Value },
    Error { message: String, error: Value },
}

impl EnvelopeBody {
    pub(crate) fn error(payload: ErrorPayload) -> Self {
        let message = payload.detail.clone();
        let error = serde_json::to_value(&payload).unwrap_or(Value::Null);
        Self::Error { message, error }
    }
}

pub(crate) struct ApiResponse<T> {
    status: StatusCode,
    message: &'static str,
    data: T,
}

impl<T> ApiResponse<T> {
    pub(crate) fn ok(message: &'static str, data: T) -> Self {
        Self { status: StatusCode::OK, message, data }
    }

    pub(crate) fn created(message: &'static str, data: T) -> Self {
        Self { status: StatusCode::CREATED, message, data }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        match serde_json::to_value(&self.data) {
            Ok(data) => {
                let mut response = self.status.into_response();
                response
                    .extensions_mut()
                    .insert(EnvelopeBody::Data { message: self.message.to_string(), data });
                response
            }
            Err(err) => ApiError::internal(err, "Failed to serialize response").into_response(),
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    correlation_id: &'a str,
    message: &'a str,
    path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a Value>,
}

pub(crate) async fn wrap_envelope(request: Request, next: Next) -> Response {
    let correlation_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let mut response = next.run(request).await;

    let body = match response.extensions_mut().remove::<EnvelopeBody>() {
        Some(body) => body,
        None if response.status().is_client_error() || response.status().is_server_error() => {
            fallback_error(&mut response).await
        }
        None => return response,
    };

    let (message, data, error) = match &body {
        EnvelopeBody::Data { message, data } => (message.as_str(), Some(data), None),
        EnvelopeBody::Error { message, error } => (message.as_str(), None, Some(error)),
    };
    let envelope = Envelope { correlation_id: &correlation_id, message, path: &path, data, error };

    let bytes = match serde_json::to_vec(&envelope) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!(error = %err, "Failed to serialize response envelope");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if !parts.headers.contains_key(&REQUEST_ID_HEADER) {
        if let Ok(value) = HeaderValue::from_str(&correlation_id) {
            parts.headers.insert(REQUEST_ID_HEADER, value);
        }
    }
    Response::from_parts(parts, Body::from(bytes))
}

/// Wraps error responses produced outside our handlers, such as path rejections.
async fn fallback_error(response: &mut Response) -> EnvelopeBody {
    let status = response.status();
    let body = std::mem::take(response.body_mut());
    let detail = match to_bytes(body, MAX_FALLBACK_BODY).await {
        Ok(bytes) if !bytes.is_empty() => String::from_utf8_lossy(&bytes).into_owned(),
        _ => status.canonical_reason().unwrap_or("Request failed").to_string(),
    };

    EnvelopeBody::error(ErrorPayload { status: status.as_u16(), kind: kind_for_status(status), detail })
}
