use sqlx::PgPool;

use crate::db::models::Teacher;

const COLUMNS: &str = "id, email, hashed_password, full_name, is_active, created_at, updated_at";

pub(crate) struct CreateTeacher {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) hashed_password: String,
    pub(crate) full_name: String,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Teacher>, sqlx::Error> {
    sqlx::query_as::<_, Teacher>(&format!("SELECT {COLUMNS} FROM teachers WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<Teacher>, sqlx::Error> {
    sqlx::query_as::<_, Teacher>(&format!("SELECT {COLUMNS} FROM teachers WHERE email = $1"))
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn create(pool: &PgPool, params: CreateTeacher) -> Result<Teacher, sqlx::Error> {
    sqlx::query_as::<_, Teacher>(&format!(
        "INSERT INTO teachers (
            id, email, hashed_password, full_name, is_active, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,TRUE,$5,$5)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.email)
    .bind(params.hashed_password)
    .bind(params.full_name)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}
