use async_trait::async_trait;
use sqlx::PgPool;

use super::questions::InsertOutcome;
use super::{
    courses, exams, questions, teachers, CreateCourse, CreateExam, CreateQuestion, CreateTeacher,
    ExamPage, Store, StoreError, StoreResult, UpdateExam, UpdateQuestion,
};
use crate::db::models::{Course, Exam, Question, Teacher};

#[derive(Clone)]
pub(crate) struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_teacher(&self, params: CreateTeacher) -> StoreResult<Teacher> {
        teachers::create(&self.pool, params).await.map_err(|err| {
            if is_unique_violation(&err) {
                StoreError::Conflict("Email already registered".to_string())
            } else {
                StoreError::Database(err)
            }
        })
    }

    async fn find_teacher_by_id(&self, id: &str) -> StoreResult<Option<Teacher>> {
        Ok(teachers::find_by_id(&self.pool, id).await?)
    }

    async fn find_teacher_by_email(&self, email: &str) -> StoreResult<Option<Teacher>> {
        Ok(teachers::find_by_email(&self.pool, email).await?)
    }

    async fn create_course(&self, params: CreateCourse) -> StoreResult<Course> {
        Ok(courses::create(&self.pool, params).await?)
    }

    async fn find_course(&self, id: &str) -> StoreResult<Option<Course>> {
        Ok(courses::find_by_id(&self.pool, id).await?)
    }

    async fn list_courses_for_teacher(&self, teacher_id: &str) -> StoreResult<Vec<Course>> {
        Ok(courses::list_for_teacher(&self.pool, teacher_id).await?)
    }

    async fn create_exam(&self, params: CreateExam) -> StoreResult<Exam> {
        Ok(exams::create(&self.pool, params).await?)
    }

    async fn find_exam(&self, id: &str) -> StoreResult<Option<Exam>> {
        Ok(exams::find_by_id(&self.pool, id).await?)
    }

    async fn update_exam(&self, id: &str, params: UpdateExam) -> StoreResult<Exam> {
        exams::update(&self.pool, id, params).await?.ok_or(StoreError::NotFound)
    }

    async fn list_exams_by_course(
        &self,
        course_id: &str,
        teacher_id: &str,
        skip: i64,
        limit: i64,
    ) -> StoreResult<ExamPage> {
        let total_count = exams::count_by_course(&self.pool, course_id, teacher_id).await?;
        let items = exams::list_by_course(&self.pool, course_id, teacher_id, skip, limit).await?;
        Ok(ExamPage { items, total_count })
    }

    async fn list_questions(&self, exam_id: &str) -> StoreResult<Vec<Question>> {
        Ok(questions::list_by_exam(&self.pool, exam_id).await?)
    }

    async fn insert_question(
        &self,
        params: CreateQuestion,
        max_per_exam: i64,
    ) -> StoreResult<Question> {
        match questions::insert_at(&self.pool, params, max_per_exam).await? {
            InsertOutcome::Inserted(question) => Ok(question),
            InsertOutcome::ExamMissing => Err(StoreError::NotFound),
            InsertOutcome::ExamFull(count) => Err(StoreError::ExamFull(count)),
        }
    }

    async fn find_question(&self, id: &str) -> StoreResult<Option<Question>> {
        Ok(questions::find_by_id(&self.pool, id).await?)
    }

    async fn update_question(&self, id: &str, params: UpdateQuestion) -> StoreResult<Question> {
        questions::update(&self.pool, id, params).await?.ok_or(StoreError::NotFound)
    }
}
