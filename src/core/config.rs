use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Production => "production",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    runtime: RuntimeSettings,
    database: DatabaseSettings,
    sweeper: SweeperSettings,
    telemetry: TelemetrySettings,
}

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub environment: Environment,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub postgres_server: String,
    pub postgres_port: u16,
    pub postgres_user: String,
    pub postgres_password: String,
    pub postgres_db: String,
    pub database_url: Option<String>,
}

impl DatabaseSettings {
    pub fn database_url(&self) -> String {
        if let Some(url) = &self.database_url {
            if !url.trim().is_empty() {
                return url.clone();
            }
        }
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.postgres_user,
            self.postgres_password,
            self.postgres_server,
            self.postgres_port,
            self.postgres_db
        )
    }
}

#[derive(Debug, Clone)]
pub struct SweeperSettings {
    pub interval_seconds: u64,
    pub batch_limit: i64,
}

#[derive(Debug, Clone)]
pub struct TelemetrySettings {
    pub log_level: String,
    pub json: bool,
    pub prometheus_enabled: bool,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let environment = parse_environment(
            env_optional("QUIZCORE_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "quizcore");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "quizcore_db");
        let database_url = env_optional("DATABASE_URL");

        let sweep_interval_seconds = parse_u64(
            "SWEEP_INTERVAL_SECONDS",
            env_or_default("SWEEP_INTERVAL_SECONDS", "60"),
        )?;
        let sweep_batch_limit =
            parse_u64("SWEEP_BATCH_LIMIT", env_or_default("SWEEP_BATCH_LIMIT", "1000"))? as i64;

        let log_level = env_or_default("LOG_LEVEL", "info");
        let log_json = env_optional("LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        Ok(Settings {
            runtime: RuntimeSettings { environment },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
            },
            sweeper: SweeperSettings {
                interval_seconds: sweep_interval_seconds,
                batch_limit: sweep_batch_limit,
            },
            telemetry: TelemetrySettings { log_level, json: log_json, prometheus_enabled },
        })
    }

    pub fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    pub fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub fn sweeper(&self) -> &SweeperSettings {
        &self.sweeper
    }

    pub fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }
}

fn env_optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}

fn parse_environment(value: Option<String>) -> Environment {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        Some("production") | Some("prod") => Environment::Production,
        Some("test") => Environment::Test,
        _ => Environment::Development,
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_u16(name: &'static str, value: String) -> Result<u16, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue { name, value })
}

fn parse_u64(name: &'static str, value: String) -> Result<u64, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue { name, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_url_prefers_explicit_url() {
        let database = DatabaseSettings {
            postgres_server: "db".into(),
            postgres_port: 5432,
            postgres_user: "user".into(),
            postgres_password: "pw".into(),
            postgres_db: "quiz".into(),
            database_url: Some("postgresql://elsewhere/db".into()),
        };
        assert_eq!(database.database_url(), "postgresql://elsewhere/db");
    }

    #[test]
    fn database_url_built_from_parts() {
        let database = DatabaseSettings {
            postgres_server: "db".into(),
            postgres_port: 5433,
            postgres_user: "user".into(),
            postgres_password: "pw".into(),
            postgres_db: "quiz".into(),
            database_url: None,
        };
        assert_eq!(database.database_url(), "postgresql://user:pw@db:5433/quiz");
    }

    #[test]
    fn parse_bool_accepts_common_truthy_values() {
        assert!(parse_bool("1"));
        assert!(parse_bool("TRUE"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("nope"));
    }
}
