use tracing_subscriber::{fmt, EnvFilter};

use crate::core::config::Settings;

/// Installs the global subscriber; `RUST_LOG` wins over the configured level.
pub(crate) fn init_tracing(settings: &Settings) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.telemetry().log_level)
            .map_err(|err| anyhow::anyhow!("invalid log filter: {err}"))?,
    };

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_span_events(fmt::format::FmtSpan::CLOSE);

    let installed = if settings.telemetry().json {
        builder.json().flatten_event(true).try_init()
    } else {
        builder.compact().try_init()
    };

    installed.map_err(|err| anyhow::anyhow!(err.to_string()))
}
