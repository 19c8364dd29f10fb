use uuid::Uuid;
use validator::Validate;

use crate::core::config::ExamSettings;
use crate::core::metrics;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Course, Exam, Question, Teacher};
use crate::db::types::QuestionKind;
use crate::repositories::{CreateExam, CreateQuestion, Store, UpdateExam, UpdateQuestion};
use crate::schemas::exam::{ExamCreate, ExamUpdate, GenerationRequest};
use crate::schemas::question::{GroupedQuestions, QuestionCreate, QuestionUpdate};
use crate::services::distribution::{validate_distribution, validate_total};
use crate::services::errors::ExamError;
use crate::services::exam_queries::load_owned_exam;
use crate::services::question_generation::{group_by_kind, QuestionGenerator};
use crate::services::question_rules::QuestionDraft;

pub(crate) async fn require_owned_course(
    store: &dyn Store,
    teacher: &Teacher,
    course_id: &str,
) -> Result<Course, ExamError> {
    let course =
        store.find_course(course_id).await?.ok_or(ExamError::NotFound("Course not found"))?;

    if course.teacher_id != teacher.id {
        return Err(ExamError::AccessDenied("Not authorized to use this course"));
    }

    Ok(course)
}

pub(crate) async fn create_exam(
    store: &dyn Store,
    limits: &ExamSettings,
    teacher: &Teacher,
    payload: ExamCreate,
) -> Result<Exam, ExamError> {
    payload.validate()?;
    let total_questions = validate_total(payload.total_questions, limits)?;
    if let Some(distribution) = &payload.distribution {
        validate_distribution(total_questions, distribution)?;
    }

    let course = require_owned_course(store, teacher, payload.course_id.trim()).await?;

    let subject = payload.subject.trim().to_string();
    let title = payload
        .title
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| subject.clone());

    let exam = store
        .create_exam(CreateExam {
            id: Uuid::new_v4().to_string(),
            teacher_id: teacher.id.clone(),
            course_id: course.id,
            title,
            subject: Some(subject),
            difficulty: Some(payload.difficulty),
            attempts: Some(payload.attempts),
            total_questions: Some(total_questions),
            time_minutes: Some(payload.time_minutes),
            reference: payload.reference.filter(|value| !value.trim().is_empty()),
            distribution: payload.distribution,
            content: None,
            created_at: primitive_now_utc(),
        })
        .await?;

    tracing::info!(teacher_id = %teacher.id, exam_id = %exam.id, action = "create", "Exam created");
    Ok(exam)
}

pub(crate) async fn update_exam(
    store: &dyn Store,
    teacher: &Teacher,
    exam_id: &str,
    payload: ExamUpdate,
) -> Result<Exam, ExamError> {
    payload.validate()?;
    let title = match payload.title.as_deref().map(str::trim) {
        Some("") => return Err(ExamError::validation("title must not be empty")),
        other => other.map(str::to_string),
    };

    let exam = load_owned_exam(store, teacher, exam_id).await?;

    let course_id = match payload.course_id.as_deref().map(str::trim) {
        Some(course_id) if course_id != exam.course_id => {
            Some(require_owned_course(store, teacher, course_id).await?.id)
        }
        _ => None,
    };

    let updated = store
        .update_exam(
            &exam.id,
            UpdateExam {
                title,
                status: payload.status,
                course_id,
                updated_at: primitive_now_utc(),
            },
        )
        .await?;

    tracing::info!(teacher_id = %teacher.id, exam_id = %exam.id, action = "update", "Exam updated");
    Ok(updated)
}

/// Validates the request, asks the collaborator for questions and buckets them by kind.
pub(crate) async fn generate_questions(
    generator: &dyn QuestionGenerator,
    limits: &ExamSettings,
    request: GenerationRequest,
) -> Result<GroupedQuestions, ExamError> {
    request.validate()?;
    let total_questions = validate_total(request.total_questions, limits)?;
    validate_distribution(total_questions, &request.distribution)?;

    let questions = generator
        .generate(&request)
        .await
        .map_err(|err| ExamError::internal(&err, &err.to_string()))?;

    let grouped = group_by_kind(questions);
    for kind in QuestionKind::ALL {
        metrics::record_generated_questions(kind, grouped.bucket(kind).len());
    }

    if grouped.len() != request.distribution.total() as usize {
        tracing::warn!(
            requested = request.distribution.total(),
            received = grouped.len(),
            "Generated question count differs from the request"
        );
    }

    Ok(grouped)
}

pub(crate) async fn add_question(
    store: &dyn Store,
    limits: &ExamSettings,
    teacher: &Teacher,
    exam_id: &str,
    payload: QuestionCreate,
) -> Result<Question, ExamError> {
    if payload.position.is_some_and(|position| position < 0) {
        return Err(ExamError::validation("position must not be negative"));
    }

    let draft = QuestionDraft::from_payload(payload.question);
    draft.validate()?;

    let exam = load_owned_exam(store, teacher, exam_id).await?;

    let question = store
        .insert_question(
            CreateQuestion {
                id: Uuid::new_v4().to_string(),
                exam_id: exam.id.clone(),
                kind: draft.kind,
                text: draft.text,
                position: payload.position,
                options: draft.options,
                correct_option_index: draft.correct_option_index,
                correct_answer: draft.correct_answer,
                expected_answer: draft.expected_answer,
                created_at: primitive_now_utc(),
            },
            i64::from(limits.max_questions_per_exam),
        )
        .await?;

    tracing::info!(
        teacher_id = %teacher.id,
        exam_id = %exam.id,
        question_id = %question.id,
        position = question.position,
        action = "add_question",
        "Question added"
    );
    Ok(question)
}

pub(crate) async fn update_question(
    store: &dyn Store,
    teacher: &Teacher,
    question_id: &str,
    patch: QuestionUpdate,
) -> Result<Question, ExamError> {
    let question = store
        .find_question(question_id)
        .await?
        .ok_or(ExamError::NotFound("Question not found"))?;
    let exam = load_owned_exam(store, teacher, &question.exam_id).await?;

    let draft = QuestionDraft::from_stored(&question).apply(patch);
    draft.validate()?;

    let updated = store
        .update_question(
            &question.id,
            UpdateQuestion {
                text: draft.text,
                options: draft.options,
                correct_option_index: draft.correct_option_index,
                correct_answer: draft.correct_answer,
                expected_answer: draft.expected_answer,
                updated_at: primitive_now_utc(),
            },
        )
        .await?;

    tracing::info!(
        teacher_id = %teacher.id,
        exam_id = %exam.id,
        question_id = %updated.id,
        action = "update_question",
        "Question updated"
    );
    Ok(updated)
}
