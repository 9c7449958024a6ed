use std::fmt::Display;
use std::str::FromStr;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from the current process environment only.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Typed reads over an env-var lookup.
struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    fn require(&self, var: &str) -> Result<String, ConfigError> {
        (self.lookup)(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    }

    fn text(&self, var: &str, default: &str) -> String {
        (self.lookup)(var).unwrap_or_else(|_| default.to_string())
    }

    /// Blank values count as unset so `.env` templates can leave keys empty.
    fn optional(&self, var: &str) -> Option<String> {
        (self.lookup)(var).ok().filter(|v| !v.trim().is_empty())
    }

    fn number<T>(&self, var: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match (self.lookup)(var) {
            Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Ok(default),
        }
    }

    fn flag(&self, var: &str, default: bool) -> Result<bool, ConfigError> {
        let Ok(raw) = (self.lookup)(var) else {
            return Ok(default);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("expected a boolean, got '{other}'"),
            }),
        }
    }
}

/// Build application configuration using the provided env-var lookup function.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let env = EnvReader { lookup };

    Ok(AppConfig {
        database_url: env.require("DATABASE_URL")?,
        env: parse_environment(&env.text("MWATCH_ENV", "development")),
        log_level: env.text("MWATCH_LOG_LEVEL", "info"),
        db_max_connections: env.number("MWATCH_DB_MAX_CONNECTIONS", 10)?,
        db_min_connections: env.number("MWATCH_DB_MIN_CONNECTIONS", 1)?,
        db_acquire_timeout_secs: env.number("MWATCH_DB_ACQUIRE_TIMEOUT_SECS", 10)?,
        scheduler_cron: env.text("MWATCH_SCHEDULER_CRON", "0 * * * * *"),
        scheduler_max_concurrent_projects: env
            .number("MWATCH_SCHEDULER_MAX_CONCURRENT_PROJECTS", 4)?,
        scheduler_auto_pause: env.flag("MWATCH_SCHEDULER_AUTO_PAUSE", false)?,
        connector_timeout_secs: env.number("MWATCH_CONNECTOR_TIMEOUT_SECS", 25)?,
        http_timeout_secs: env.number("MWATCH_HTTP_TIMEOUT_SECS", 15)?,
        user_agent: env.text("MWATCH_USER_AGENT", "mwatch/0.1 (mention-monitor)"),
        classifier_url: env.optional("MWATCH_CLASSIFIER_URL"),
        alert_email_enabled: env.flag("MWATCH_ALERT_EMAIL_ENABLED", false)?,
        email_api_url: env.optional("MWATCH_EMAIL_API_URL"),
        email_api_key: env.optional("MWATCH_EMAIL_API_KEY"),
        email_from: env.optional("MWATCH_EMAIL_FROM"),
        dashboard_url: env.text("MWATCH_DASHBOARD_URL", "http://localhost:5173/dashboard"),
        youtube_api_key: env.optional("YOUTUBE_API_KEY"),
        twitter_bearer_token: env.optional("TWITTER_BEARER_TOKEN"),
        meta_access_token: env.optional("META_ACCESS_TOKEN"),
        meta_page_id: env.optional("META_PAGE_ID"),
        meta_ig_user_id: env.optional("META_IG_USER_ID"),
    })
}

/// Unrecognized values fall back to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s.trim().to_ascii_lowercase().as_str() {
        "production" | "prod" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
