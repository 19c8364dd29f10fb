use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::schemas::teacher::TeacherResponse;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SignupRequest {
    #[validate(email(message = "email must be a valid address"))]
    pub(crate) email: String,
    pub(crate) password: String,
    #[serde(alias = "fullName")]
    #[validate(length(min = 1, max = 255, message = "full_name must not be empty"))]
    pub(crate) full_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    pub(crate) email: String,
    pub(crate) password: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
    pub(crate) token_type: String,
    pub(crate) teacher: TeacherResponse,
}
