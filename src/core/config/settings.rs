use super::parsing::{
    env_optional, env_or_default, normalize_prefix, parse_bool, parse_cors_origins,
    parse_environment, parse_f64, parse_u16, parse_u32, parse_u64,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    AiSettings, ApiSettings, ConfigError, CorsSettings, DatabaseSettings, ExamSettings,
    RedisSettings, RuntimeSettings, SecuritySettings, ServerHost, ServerPort, ServerSettings,
    Settings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("EXAM_STUDIO_HOST", "0.0.0.0");
        let port = env_or_default("EXAM_STUDIO_PORT", "8000");

        let environment = parse_environment(
            env_optional("EXAM_STUDIO_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_optional("EXAM_STUDIO_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Exam Studio API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_prefix = normalize_prefix(&env_or_default("API_PREFIX", "/api"));

        let secret_key = match env_optional("SECRET_KEY") {
            Some(value) => value,
            None => load_or_create_secret_key(),
        };

        let access_token_expire_minutes = parse_u64(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            env_or_default("ACCESS_TOKEN_EXPIRE_MINUTES", "10080"),
        )?;
        let algorithm = env_or_default("ALGORITHM", "HS256");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "exam_studio");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "exam_studio");
        let database_url = env_optional("DATABASE_URL");
        let max_connections =
            parse_u32("DB_MAX_CONNECTIONS", env_or_default("DB_MAX_CONNECTIONS", "20"))?;

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let openai_api_key = env_or_default("OPENAI_API_KEY", "");
        let openai_base_url = env_or_default("OPENAI_BASE_URL", "https://api.openai.com/v1");
        let ai_model = env_or_default("AI_MODEL", "gpt-4o-mini");
        let ai_max_tokens = parse_u32("AI_MAX_TOKENS", env_or_default("AI_MAX_TOKENS", "4000"))?;
        let ai_temperature =
            parse_f64("AI_TEMPERATURE", env_or_default("AI_TEMPERATURE", "0.4"))?;
        let ai_request_timeout =
            parse_u64("AI_REQUEST_TIMEOUT", env_or_default("AI_REQUEST_TIMEOUT", "120"))?;

        let max_total_questions =
            parse_u32("MAX_TOTAL_QUESTIONS", env_or_default("MAX_TOTAL_QUESTIONS", "100"))?;
        let max_questions_per_exam =
            parse_u32("MAX_QUESTIONS_PER_EXAM", env_or_default("MAX_QUESTIONS_PER_EXAM", "200"))?;

        let log_level = env_or_default("EXAM_STUDIO_LOG_LEVEL", "info");
        let json =
            env_optional("EXAM_STUDIO_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_prefix },
            security: SecuritySettings { secret_key, access_token_expire_minutes, algorithm },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
                max_connections,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            ai: AiSettings {
                openai_api_key,
                openai_base_url,
                ai_model,
                ai_max_tokens,
                ai_temperature,
                ai_request_timeout,
            },
            exam: ExamSettings { max_total_questions, max_questions_per_exam },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn ai(&self) -> &AiSettings {
        &self.ai
    }

    pub(crate) fn exam(&self) -> &ExamSettings {
        &self.exam
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.exam.max_total_questions == 0 {
            return Err(ConfigError::InvalidValue {
                field: "MAX_TOTAL_QUESTIONS",
                value: "0".to_string(),
            });
        }

        if self.exam.max_questions_per_exam < self.exam.max_total_questions {
            return Err(ConfigError::InvalidValue {
                field: "MAX_QUESTIONS_PER_EXAM",
                value: self.exam.max_questions_per_exam.to_string(),
            });
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "DB_MAX_CONNECTIONS",
                value: "0".to_string(),
            });
        }

        if !(0.0..=2.0).contains(&self.ai.ai_temperature) {
            return Err(ConfigError::InvalidValue {
                field: "AI_TEMPERATURE",
                value: self.ai.ai_temperature.to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.ai.openai_api_key.is_empty() {
            return Err(ConfigError::MissingSecret("OPENAI_API_KEY"));
        }
        if self.ai.openai_base_url.is_empty() {
            return Err(ConfigError::MissingSecret("OPENAI_BASE_URL"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[tokio::test]
    async fn load_uses_defaults_in_test_environment() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::remove_var("API_PREFIX");

        let settings = Settings::load().expect("settings");
        assert_eq!(settings.api().api_prefix, "/api");
        assert_eq!(settings.exam().max_total_questions, 100);
        assert!(!settings.runtime().strict_config);
    }

    #[tokio::test]
    async fn strict_config_requires_ai_credentials() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("EXAM_STUDIO_STRICT_CONFIG", "1");
        std::env::remove_var("OPENAI_API_KEY");

        let result = Settings::load();
        std::env::set_var("EXAM_STUDIO_STRICT_CONFIG", "0");

        assert!(matches!(result, Err(ConfigError::MissingSecret("OPENAI_API_KEY"))));
    }

    #[tokio::test]
    async fn strict_config_requires_database_password() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("EXAM_STUDIO_STRICT_CONFIG", "1");
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        std::env::remove_var("POSTGRES_PASSWORD");

        let result = Settings::load();
        std::env::set_var("EXAM_STUDIO_STRICT_CONFIG", "0");
        std::env::remove_var("OPENAI_API_KEY");
        std::env::set_var("POSTGRES_PASSWORD", "test-password");

        assert!(matches!(result, Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"))));
    }

    #[tokio::test]
    async fn rejects_per_exam_cap_below_request_cap() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("MAX_TOTAL_QUESTIONS", "50");
        std::env::set_var("MAX_QUESTIONS_PER_EXAM", "10");

        let result = Settings::load();
        std::env::remove_var("MAX_TOTAL_QUESTIONS");
        std::env::remove_var("MAX_QUESTIONS_PER_EXAM");

        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { field: "MAX_QUESTIONS_PER_EXAM", .. })
        ));
    }
}
