use crate::db::models::{Exam, Question, Teacher};
use crate::repositories::{ExamPage, Store};
use crate::services::errors::ExamError;

/// Loads an exam and checks the stored owner against the caller.
pub(crate) async fn load_owned_exam(
    store: &dyn Store,
    teacher: &Teacher,
    exam_id: &str,
) -> Result<Exam, ExamError> {
    let exam = store.find_exam(exam_id).await?.ok_or(ExamError::NotFound("Exam not found"))?;

    if exam.teacher_id != teacher.id {
        tracing::warn!(
            teacher_id = %teacher.id,
            exam_id = %exam.id,
            "Rejected access to another teacher's exam"
        );
        return Err(ExamError::AccessDenied("Not authorized to access this exam"));
    }

    Ok(exam)
}

pub(crate) async fn get_exam(
    store: &dyn Store,
    teacher: &Teacher,
    exam_id: &str,
) -> Result<(Exam, Vec<Question>), ExamError> {
    let exam = load_owned_exam(store, teacher, exam_id).await?;
    let questions = store.list_questions(&exam.id).await?;
    Ok((exam, questions))
}

/// The caller's exams in one course, newest first.
pub(crate) async fn list_exams_by_course(
    store: &dyn Store,
    teacher: &Teacher,
    course_id: &str,
    skip: i64,
    limit: i64,
) -> Result<ExamPage, ExamError> {
    if store.find_course(course_id).await?.is_none() {
        return Err(ExamError::NotFound("Course not found"));
    }

    Ok(store.list_exams_by_course(course_id, &teacher.id, skip.max(0), limit.clamp(1, 1000)).await?)
}
