use sqlx::Row;

fn database_url() -> Option<String> {
    dotenvy::dotenv().ok();

    std::env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty())
}

#[tokio::test]
async fn migrations_apply_and_tables_exist() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        eprintln!("DATABASE_URL is not set; skipping migrations smoke test");
        return Ok(());
    };

    let pool =
        sqlx::postgres::PgPoolOptions::new().max_connections(1).connect(&database_url).await?;

    let migrations_dir =
        std::env::var("EXAM_STUDIO_MIGRATIONS_DIR").unwrap_or_else(|_| "migrations".to_string());
    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(&migrations_dir)).await?;
    migrator.run(&pool).await?;

    for table in ["teachers", "courses", "exams", "exam_questions"] {
        let row = sqlx::query("SELECT to_regclass($1)::text").bind(table).fetch_one(&pool).await?;
        let regclass: Option<String> = row.try_get(0)?;
        assert!(regclass.is_some(), "expected table {table} to exist after migrations");
    }

    let row = sqlx::query(
        "SELECT condeferrable FROM pg_constraint WHERE conname = 'uq_exam_questions_position'",
    )
    .fetch_one(&pool)
    .await?;
    let deferrable: bool = row.try_get(0)?;
    assert!(deferrable, "question position constraint must be deferrable");

    Ok(())
}
