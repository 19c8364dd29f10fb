pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;
// Client-side form state; the server binary never drives it.
#[cfg_attr(not(test), allow(dead_code))]
pub(crate) mod wizard;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use crate::core::{config::Settings, redis::RedisHandle, state::AppState, telemetry};
use crate::repositories::PgStore;
use crate::services::question_generation::OpenAiQuestionGenerator;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let redis = RedisHandle::new(settings.redis().redis_url());
    if let Err(err) = redis.connect().await {
        tracing::error!(error = %err, "Failed to connect to Redis; continuing without rate limits");
    } else {
        tracing::info!("Redis connected successfully");
    }

    let generator = OpenAiQuestionGenerator::from_settings(&settings)?;
    let state =
        AppState::new(settings, Arc::new(PgStore::new(db_pool)), Arc::new(generator), redis.clone());

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        "Exam Studio API listening"
    );

    let result =
        axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await;

    redis.disconnect().await;
    tracing::info!("Redis disconnected");

    result?;

    Ok(())
}
