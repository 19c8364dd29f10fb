use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    Router,
};
use sqlx::types::Json;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use crate::api;
use crate::core::{
    config::Settings, redis::RedisHandle, security, state::AppState, time::primitive_now_utc,
};
use crate::db::models::{Course, Exam, ExamSummaryRow, Question, Teacher};
use crate::db::types::{ExamStatus, QuestionKind};
use crate::repositories::questions::resolve_position;
use crate::repositories::{
    CreateCourse, CreateExam, CreateQuestion, CreateTeacher, ExamPage, Store, StoreError,
    StoreResult, UpdateExam, UpdateQuestion,
};
use crate::schemas::exam::GenerationRequest;
use crate::schemas::question::GeneratedQuestion;
use crate::services::question_generation::{GenerationError, QuestionGenerator};

const TEST_SECRET_KEY: &str = "test-secret";

pub(crate) struct TestContext {
    pub(crate) state: AppState,
    pub(crate) app: Router,
    pub(crate) store: Arc<MemoryStore>,
    pub(crate) generator: Arc<StubGenerator>,
    _guard: OwnedMutexGuard<()>,
}

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn set_test_env() {
    dotenvy::dotenv().ok();

    std::env::set_var("EXAM_STUDIO_ENV", "test");
    std::env::set_var("EXAM_STUDIO_STRICT_CONFIG", "0");
    std::env::set_var("SECRET_KEY", TEST_SECRET_KEY);
    std::env::set_var("PROMETHEUS_ENABLED", "0");
    std::env::set_var("REDIS_HOST", "127.0.0.1");
    std::env::set_var("POSTGRES_PASSWORD", "test-password");
    std::env::remove_var("DATABASE_URL");
    std::env::remove_var("OPENAI_API_KEY");
    std::env::remove_var("API_PREFIX");
    std::env::remove_var("MAX_TOTAL_QUESTIONS");
    std::env::remove_var("MAX_QUESTIONS_PER_EXAM");
    std::env::remove_var("AI_TEMPERATURE");
    std::env::remove_var("DB_MAX_CONNECTIONS");
    std::env::remove_var("BACKEND_CORS_ORIGINS");
}

pub(crate) async fn setup_test_context() -> TestContext {
    build_context(|| {}, StubGenerator::default()).await
}

pub(crate) async fn setup_test_context_with(configure: impl FnOnce()) -> TestContext {
    build_context(configure, StubGenerator::default()).await
}

pub(crate) async fn setup_test_context_with_generator(generator: StubGenerator) -> TestContext {
    build_context(|| {}, generator).await
}

async fn build_context(configure: impl FnOnce(), generator: StubGenerator) -> TestContext {
    let guard = env_lock().await;
    set_test_env();
    configure();

    let settings = Settings::load().expect("settings");
    // Never connected: health reports it disconnected and rate limits fail open.
    let redis = RedisHandle::new(settings.redis().redis_url());

    let store = Arc::new(MemoryStore::default());
    let generator = Arc::new(generator);
    let state = AppState::new(settings, store.clone(), generator.clone(), redis);
    let app = api::router::router(state.clone());

    TestContext { state, app, store, generator, _guard: guard }
}

/// `Store` over plain collections with the same ordering and ownership semantics as Postgres.
#[derive(Default)]
pub(crate) struct MemoryStore {
    data: RwLock<MemoryData>,
}

#[derive(Default)]
struct MemoryData {
    teachers: HashMap<String, Teacher>,
    courses: Vec<Course>,
    exams: Vec<Exam>,
    questions: Vec<Question>,
}

impl MemoryStore {
    pub(crate) async fn exam_count(&self) -> usize {
        self.data.read().await.exams.len()
    }

    pub(crate) async fn question_count(&self) -> usize {
        self.data.read().await.questions.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_teacher(&self, params: CreateTeacher) -> StoreResult<Teacher> {
        let mut data = self.data.write().await;
        if data.teachers.values().any(|teacher| teacher.email == params.email) {
            return Err(StoreError::Conflict("Email already registered".to_string()));
        }

        let teacher = Teacher {
            id: params.id,
            email: params.email,
            hashed_password: params.hashed_password,
            full_name: params.full_name,
            is_active: true,
            created_at: params.created_at,
            updated_at: params.created_at,
        };
        data.teachers.insert(teacher.id.clone(), teacher.clone());
        Ok(teacher)
    }

    async fn find_teacher_by_id(&self, id: &str) -> StoreResult<Option<Teacher>> {
        Ok(self.data.read().await.teachers.get(id).cloned())
    }

    async fn find_teacher_by_email(&self, email: &str) -> StoreResult<Option<Teacher>> {
        let data = self.data.read().await;
        Ok(data.teachers.values().find(|teacher| teacher.email == email).cloned())
    }

    async fn create_course(&self, params: CreateCourse) -> StoreResult<Course> {
        let course = Course {
            id: params.id,
            teacher_id: params.teacher_id,
            name: params.name,
            description: params.description,
            created_at: params.created_at,
            updated_at: params.created_at,
        };
        self.data.write().await.courses.push(course.clone());
        Ok(course)
    }

    async fn find_course(&self, id: &str) -> StoreResult<Option<Course>> {
        let data = self.data.read().await;
        Ok(data.courses.iter().find(|course| course.id == id).cloned())
    }

    async fn list_courses_for_teacher(&self, teacher_id: &str) -> StoreResult<Vec<Course>> {
        let data = self.data.read().await;
        Ok(data.courses.iter().rev().filter(|course| course.teacher_id == teacher_id).cloned().collect())
    }

    async fn create_exam(&self, params: CreateExam) -> StoreResult<Exam> {
        let exam = Exam {
            id: params.id,
            teacher_id: params.teacher_id,
            course_id: params.course_id,
            title: params.title,
            status: ExamStatus::Saved,
            subject: params.subject,
            difficulty: params.difficulty,
            attempts: params.attempts,
            total_questions: params.total_questions,
            time_minutes: params.time_minutes,
            reference: params.reference,
            distribution: params.distribution.map(Json),
            content: params.content.map(Json),
            created_at: params.created_at,
            updated_at: params.created_at,
        };
        self.data.write().await.exams.push(exam.clone());
        Ok(exam)
    }

    async fn find_exam(&self, id: &str) -> StoreResult<Option<Exam>> {
        let data = self.data.read().await;
        Ok(data.exams.iter().find(|exam| exam.id == id).cloned())
    }

    async fn update_exam(&self, id: &str, params: UpdateExam) -> StoreResult<Exam> {
        let mut data = self.data.write().await;
        let exam = data.exams.iter_mut().find(|exam| exam.id == id).ok_or(StoreError::NotFound)?;

        if let Some(title) = params.title {
            exam.title = title;
        }
        if let Some(status) = params.status {
            exam.status = status;
        }
        if let Some(course_id) = params.course_id {
            exam.course_id = course_id;
        }
        exam.updated_at = params.updated_at;
        Ok(exam.clone())
    }

    async fn list_exams_by_course(
        &self,
        course_id: &str,
        teacher_id: &str,
        skip: i64,
        limit: i64,
    ) -> StoreResult<ExamPage> {
        let data = self.data.read().await;
        // Insertion order breaks ties between exams created in the same instant.
        let mut matching: Vec<(usize, &Exam)> = data
            .exams
            .iter()
            .enumerate()
            .filter(|(_, exam)| exam.course_id == course_id && exam.teacher_id == teacher_id)
            .collect();
        matching.sort_by(|(left_seq, left), (right_seq, right)| {
            right.created_at.cmp(&left.created_at).then(right_seq.cmp(left_seq))
        });

        let total_count = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(skip.max(0) as usize)
            .take(limit.clamp(1, 1000) as usize)
            .map(|(_, exam)| ExamSummaryRow {
                id: exam.id.clone(),
                course_id: exam.course_id.clone(),
                title: exam.title.clone(),
                status: exam.status,
                subject: exam.subject.clone(),
                difficulty: exam.difficulty,
                question_count: data
                    .questions
                    .iter()
                    .filter(|question| question.exam_id == exam.id)
                    .count() as i64,
                created_at: exam.created_at,
                updated_at: exam.updated_at,
            })
            .collect();

        Ok(ExamPage { items, total_count })
    }

    async fn list_questions(&self, exam_id: &str) -> StoreResult<Vec<Question>> {
        let data = self.data.read().await;
        let mut questions: Vec<Question> =
            data.questions.iter().filter(|question| question.exam_id == exam_id).cloned().collect();
        questions.sort_by_key(|question| question.position);
        Ok(questions)
    }

    async fn insert_question(
        &self,
        params: CreateQuestion,
        max_per_exam: i64,
    ) -> StoreResult<Question> {
        let mut data = self.data.write().await;
        if !data.exams.iter().any(|exam| exam.id == params.exam_id) {
            return Err(StoreError::NotFound);
        }

        let count =
            data.questions.iter().filter(|question| question.exam_id == params.exam_id).count()
                as i64;
        if count >= max_per_exam {
            return Err(StoreError::ExamFull(count));
        }

        let position = resolve_position(params.position, count);
        for question in data.questions.iter_mut() {
            if question.exam_id == params.exam_id && question.position >= position {
                question.position += 1;
                question.updated_at = params.created_at;
            }
        }

        let question = Question {
            id: params.id,
            exam_id: params.exam_id,
            kind: params.kind,
            text: params.text,
            position,
            options: Json(params.options),
            correct_option_index: params.correct_option_index,
            correct_answer: params.correct_answer,
            expected_answer: params.expected_answer,
            created_at: params.created_at,
            updated_at: params.created_at,
        };
        data.questions.push(question.clone());
        Ok(question)
    }

    async fn find_question(&self, id: &str) -> StoreResult<Option<Question>> {
        let data = self.data.read().await;
        Ok(data.questions.iter().find(|question| question.id == id).cloned())
    }

    async fn update_question(&self, id: &str, params: UpdateQuestion) -> StoreResult<Question> {
        let mut data = self.data.write().await;
        let question = data
            .questions
            .iter_mut()
            .find(|question| question.id == id)
            .ok_or(StoreError::NotFound)?;

        question.text = params.text;
        question.options = Json(params.options);
        question.correct_option_index = params.correct_option_index;
        question.correct_answer = params.correct_answer;
        question.expected_answer = params.expected_answer;
        question.updated_at = params.updated_at;
        Ok(question.clone())
    }
}

/// Deterministic generator that answers exactly the requested distribution.
#[derive(Default)]
pub(crate) struct StubGenerator {
    calls: AtomicUsize,
    failure: Option<String>,
}

impl StubGenerator {
    pub(crate) fn failing(message: &str) -> Self {
        Self { calls: AtomicUsize::new(0), failure: Some(message.to_string()) }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub(crate) fn sample_question(kind: QuestionKind, text: &str) -> GeneratedQuestion {
    let mut question = GeneratedQuestion {
        kind,
        text: text.to_string(),
        options: Vec::new(),
        correct_option_index: None,
        correct_answer: None,
        expected_answer: None,
    };
    match kind {
        QuestionKind::MultipleChoice => {
            question.options = vec!["A".to_string(), "B".to_string(), "C".to_string()];
            question.correct_option_index = Some(0);
        }
        QuestionKind::TrueFalse => question.correct_answer = Some(true),
        QuestionKind::OpenAnalysis | QuestionKind::OpenExercise => {
            question.expected_answer = Some("Model answer".to_string());
        }
    }
    question
}

#[async_trait]
impl QuestionGenerator for StubGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<GeneratedQuestion>, GenerationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(message) = &self.failure {
            return Err(GenerationError::Upstream(message.clone()));
        }

        // Interleave kinds so callers cannot rely on the flat order.
        let rounds = QuestionKind::ALL
            .iter()
            .map(|kind| request.distribution.count(*kind))
            .max()
            .unwrap_or(0);
        let mut questions = Vec::new();
        for round in 0..rounds {
            for kind in QuestionKind::ALL.iter().rev() {
                if round < request.distribution.count(*kind) {
                    let text = format!(
                        "{} {} #{} (call {call})",
                        request.subject,
                        kind.as_str(),
                        round + 1
                    );
                    questions.push(sample_question(*kind, &text));
                }
            }
        }
        Ok(questions)
    }
}

pub(crate) async fn insert_teacher(
    ctx: &TestContext,
    email: &str,
    full_name: &str,
    password: &str,
) -> Teacher {
    let hashed_password = security::hash_password(password).expect("hash password");
    ctx.store
        .create_teacher(CreateTeacher {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            hashed_password,
            full_name: full_name.to_string(),
            created_at: primitive_now_utc(),
        })
        .await
        .expect("insert teacher")
}

pub(crate) async fn insert_course(ctx: &TestContext, teacher_id: &str, name: &str) -> Course {
    ctx.store
        .create_course(CreateCourse {
            id: Uuid::new_v4().to_string(),
            teacher_id: teacher_id.to_string(),
            name: name.to_string(),
            description: None,
            created_at: primitive_now_utc(),
        })
        .await
        .expect("insert course")
}

pub(crate) async fn insert_exam(
    ctx: &TestContext,
    teacher_id: &str,
    course_id: &str,
    title: &str,
) -> Exam {
    ctx.store
        .create_exam(CreateExam {
            id: Uuid::new_v4().to_string(),
            teacher_id: teacher_id.to_string(),
            course_id: course_id.to_string(),
            title: title.to_string(),
            subject: Some("Chemistry".to_string()),
            difficulty: None,
            attempts: Some(1),
            total_questions: Some(3),
            time_minutes: Some(30),
            reference: None,
            distribution: None,
            content: None,
            created_at: primitive_now_utc(),
        })
        .await
        .expect("insert exam")
}

/// Appends a true/false question.
pub(crate) async fn insert_question(ctx: &TestContext, exam_id: &str, text: &str) -> Question {
    ctx.store
        .insert_question(
            CreateQuestion {
                id: Uuid::new_v4().to_string(),
                exam_id: exam_id.to_string(),
                kind: QuestionKind::TrueFalse,
                text: text.to_string(),
                position: None,
                options: Vec::new(),
                correct_option_index: None,
                correct_answer: Some(true),
                expected_answer: None,
                created_at: primitive_now_utc(),
            },
            i64::MAX,
        )
        .await
        .expect("insert question")
}

pub(crate) fn bearer_token(teacher_id: &str, settings: &Settings) -> String {
    security::create_access_token(teacher_id, settings, None).expect("token")
}

pub(crate) fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    if let Some(body) = body {
        let bytes = serde_json::to_vec(&body).expect("serialize body");
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("request body")
    }
}

pub(crate) async fn read_json(response: axum::response::Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}
