use thiserror::Error;

use crate::repositories::StoreError;

/// Failure kinds of exam commands and queries; each maps to one HTTP status.
#[derive(Debug, Error)]
pub(crate) enum ExamError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    AccessDenied(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
}

impl ExamError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Log the underlying error and keep `context` as the visible message.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }
}

impl From<StoreError> for ExamError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound("Record not found"),
            StoreError::Conflict(message) => Self::Conflict(message),
            StoreError::ExamFull(count) => {
                Self::Validation(format!("Exam already holds {count} questions, the maximum"))
            }
            StoreError::Database(err) => Self::internal(err, "Database operation failed"),
        }
    }
}

impl From<validator::ValidationErrors> for ExamError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(format_validation_errors(&errors))
    }
}

/// Flattens field errors into `field: message; field: message`, sorted by field.
fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, items)| {
            items.iter().map(move |item| match &item.message {
                Some(message) => format!("{field}: {message}"),
                None => format!("{field}: invalid value"),
            })
        })
        .collect();
    parts.sort();
    parts.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe {
        #[validate(range(min = 1, message = "must be positive"))]
        count: i32,
    }

    #[test]
    fn validation_errors_name_the_field() {
        let errors = Probe { count: 0 }.validate().expect_err("invalid");
        let err = ExamError::from(errors);
        assert_eq!(err.to_string(), "count: must be positive");
    }

    #[test]
    fn store_capacity_is_a_validation_error() {
        let err = ExamError::from(StoreError::ExamFull(200));
        assert!(matches!(err, ExamError::Validation(_)));
    }
}
