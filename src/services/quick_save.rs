use std::collections::HashSet;

use rand::Rng;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::core::time::{format_primitive, primitive_now_utc, unix_millis};
use crate::db::models::{Exam, Teacher};
use crate::db::types::DifficultyLevel;
use crate::repositories::{CreateExam, Store};
use crate::schemas::exam::QuickSaveRequest;
use crate::services::errors::ExamError;
use crate::services::exam_commands::require_owned_course;

const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const SUFFIX_LEN: usize = 4;
const FALLBACK_TITLE: &str = "Untitled exam";
const MAX_TITLE_CHARS: usize = 500;
const MAX_SUBJECT_CHARS: usize = 255;

/// Saves whatever the client has without the distribution checks of a full create.
pub(crate) async fn quick_save(
    store: &dyn Store,
    teacher: &Teacher,
    payload: QuickSaveRequest,
) -> Result<Exam, ExamError> {
    let course_id = payload
        .course_id
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ExamError::validation("course_id is required"))?;

    let subject = trimmed(payload.subject);
    let title = trimmed(payload.title);
    check_length("title", title.as_deref(), MAX_TITLE_CHARS)?;
    check_length("subject", subject.as_deref(), MAX_SUBJECT_CHARS)?;

    let course = require_owned_course(store, teacher, course_id).await?;

    let now = primitive_now_utc();
    let questions =
        normalize_questions(payload.questions, unix_millis(now), &mut rand::thread_rng());

    let difficulty = trimmed(payload.difficulty);
    let title = title.or_else(|| subject.clone()).unwrap_or_else(|| FALLBACK_TITLE.to_string());

    let content = json!({
        "subject": subject,
        "difficulty": difficulty,
        "created_at": format_primitive(now),
        "questions": questions,
    });

    let exam = store
        .create_exam(CreateExam {
            id: Uuid::new_v4().to_string(),
            teacher_id: teacher.id.clone(),
            course_id: course.id,
            title,
            subject,
            difficulty: difficulty.as_deref().and_then(DifficultyLevel::parse_loose),
            attempts: None,
            total_questions: None,
            time_minutes: None,
            reference: None,
            distribution: None,
            content: Some(content),
            created_at: now,
        })
        .await?;

    tracing::info!(
        teacher_id = %teacher.id,
        exam_id = %exam.id,
        action = "quick_save",
        "Exam quick-saved"
    );

    Ok(exam)
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|item| item.trim().to_string()).filter(|item| !item.is_empty())
}

fn check_length(field: &str, value: Option<&str>, max: usize) -> Result<(), ExamError> {
    match value {
        Some(value) if value.chars().count() > max => {
            Err(ExamError::validation(format!("{field} must be at most {max} characters")))
        }
        _ => Ok(()),
    }
}

/// Gives every question a unique `id`.
///
/// Supplied ids are kept; missing ones become `{timestamp_ms}-{kind}-{index}`.
/// Any id already taken by an earlier question gets `-` and a random suffix.
pub(crate) fn normalize_questions<R: Rng>(
    questions: Vec<Value>,
    timestamp_ms: i128,
    rng: &mut R,
) -> Vec<Value> {
    let mut seen = HashSet::with_capacity(questions.len());

    questions
        .into_iter()
        .enumerate()
        .map(|(index, question)| {
            let mut object = match question {
                Value::Object(map) => map,
                other => {
                    let mut map = Map::new();
                    map.insert("value".to_string(), other);
                    map
                }
            };

            let base = supplied_id(&object).unwrap_or_else(|| {
                format!("{timestamp_ms}-{}-{index}", question_kind(&object))
            });

            let mut id = base.clone();
            while seen.contains(&id) {
                id = format!("{base}-{}", random_suffix(rng));
            }
            seen.insert(id.clone());

            object.insert("id".to_string(), Value::String(id));
            Value::Object(object)
        })
        .collect()
}

fn supplied_id(object: &Map<String, Value>) -> Option<String> {
    match object.get("id") {
        Some(Value::String(value)) if !value.trim().is_empty() => Some(value.trim().to_string()),
        Some(Value::Number(value)) => Some(value.to_string()),
        _ => None,
    }
}

fn question_kind(object: &Map<String, Value>) -> &str {
    object
        .get("kind")
        .or_else(|| object.get("type"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("question")
}

fn random_suffix<R: Rng>(rng: &mut R) -> String {
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect()
}
