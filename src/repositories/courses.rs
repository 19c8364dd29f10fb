use sqlx::PgPool;

use crate::db::models::Course;

const COURSE_COLUMNS: &str = "id, teacher_id, name, description, created_at, updated_at";

pub(crate) struct CreateCourse {
    pub(crate) id: String,
    pub(crate) teacher_id: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateCourse) -> Result<Course, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "INSERT INTO courses (id, teacher_id, name, description, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$5,$5)
         RETURNING {COURSE_COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.teacher_id)
    .bind(params.name)
    .bind(params.description)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    course_id: &str,
) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"))
        .bind(course_id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_for_teacher(
    pool: &PgPool,
    teacher_id: &str,
) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses
         WHERE teacher_id = $1
         ORDER BY created_at DESC, id DESC",
    ))
    .bind(teacher_id)
    .fetch_all(pool)
    .await
}
