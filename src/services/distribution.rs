use crate::core::config::ExamSettings;
use crate::db::models::Distribution;
use crate::services::errors::ExamError;

/// Checks `total_questions` against zero and the configured cap; returns it narrowed.
pub(crate) fn validate_total(total_questions: i64, limits: &ExamSettings) -> Result<i32, ExamError> {
    if total_questions <= 0 {
        return Err(ExamError::validation("totalQuestions must be greater than 0"));
    }
    if total_questions > i64::from(limits.max_total_questions) {
        return Err(ExamError::validation(format!(
            "totalQuestions must not exceed {}",
            limits.max_total_questions
        )));
    }
    i32::try_from(total_questions)
        .map_err(|_| ExamError::validation("totalQuestions is out of range"))
}

/// The four counts must add up to exactly `total_questions`.
pub(crate) fn validate_distribution(
    total_questions: i32,
    distribution: &Distribution,
) -> Result<(), ExamError> {
    let sum = distribution.total();
    if u64::try_from(total_questions).is_ok_and(|total| total == sum) {
        return Ok(());
    }
    Err(ExamError::validation(format!(
        "Distribution total ({sum}) does not match totalQuestions ({total_questions})"
    )))
}
