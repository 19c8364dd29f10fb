//! Persistence for teachers, courses, exams and their ordered questions.
//!
//! Handlers talk to the [`Store`] trait; [`PgStore`] backs it with the
//! free-function repositories in this module.

pub(crate) mod courses;
pub(crate) mod exams;
mod postgres;
pub(crate) mod questions;
pub(crate) mod teachers;

use async_trait::async_trait;
use thiserror::Error;

use crate::db::models::{Course, Exam, ExamSummaryRow, Question, Teacher};

pub(crate) use courses::CreateCourse;
pub(crate) use exams::{CreateExam, UpdateExam};
pub(crate) use postgres::PgStore;
pub(crate) use questions::{CreateQuestion, UpdateQuestion};
pub(crate) use teachers::CreateTeacher;

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("{0}")]
    Conflict(String),
    #[error("exam already holds {0} questions")]
    ExamFull(i64),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub(crate) type StoreResult<T> = Result<T, StoreError>;

/// One page of a teacher's exams in a course.
#[derive(Debug, Clone)]
pub(crate) struct ExamPage {
    pub(crate) items: Vec<ExamSummaryRow>,
    pub(crate) total_count: i64,
}

#[async_trait]
pub(crate) trait Store: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    // Teachers
    async fn create_teacher(&self, params: CreateTeacher) -> StoreResult<Teacher>;
    async fn find_teacher_by_id(&self, id: &str) -> StoreResult<Option<Teacher>>;
    async fn find_teacher_by_email(&self, email: &str) -> StoreResult<Option<Teacher>>;

    // Courses
    async fn create_course(&self, params: CreateCourse) -> StoreResult<Course>;
    async fn find_course(&self, id: &str) -> StoreResult<Option<Course>>;
    async fn list_courses_for_teacher(&self, teacher_id: &str) -> StoreResult<Vec<Course>>;

    // Exams
    async fn create_exam(&self, params: CreateExam) -> StoreResult<Exam>;
    async fn find_exam(&self, id: &str) -> StoreResult<Option<Exam>>;
    async fn update_exam(&self, id: &str, params: UpdateExam) -> StoreResult<Exam>;
    async fn list_exams_by_course(
        &self,
        course_id: &str,
        teacher_id: &str,
        skip: i64,
        limit: i64,
    ) -> StoreResult<ExamPage>;

    // Questions
    async fn list_questions(&self, exam_id: &str) -> StoreResult<Vec<Question>>;
    /// Inserts at the requested slot and renumbers later questions atomically.
    async fn insert_question(
        &self,
        params: CreateQuestion,
        max_per_exam: i64,
    ) -> StoreResult<Question>;
    async fn find_question(&self, id: &str) -> StoreResult<Option<Question>>;
    async fn update_question(&self, id: &str, params: UpdateQuestion) -> StoreResult<Question>;
}
