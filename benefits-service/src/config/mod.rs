use secrecy::Secret;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone, Deserialize)]
pub struct BenefitsConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub database: DatabaseConfig,
    pub sheets: SheetsConfig,
    pub webhook: WebhookConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: Secret<String>,
    pub max_connections: u32,
    pub idle_timeout_ms: u64,
    pub connection_timeout_ms: u64,
    /// libpq-style mode; `require` encrypts without verifying the
    /// server certificate.
    pub ssl_mode: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetsConfig {
    /// CSV export URL. When unset the database is the only source.
    pub url: Option<String>,
    pub service_account_email: Option<String>,
    pub private_key: Option<Secret<String>>,
    pub token_url: String,
}

impl SheetsConfig {
    /// Service-account credentials, only when both halves are present.
    pub fn credentials(&self) -> Option<(&str, &Secret<String>)> {
        match (&self.service_account_email, &self.private_key) {
            (Some(email), Some(key)) => Some((email.as_str(), key)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// AI workflow endpoint. Checked per search request, not at startup.
    pub url: Option<String>,
}

impl BenefitsConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(BenefitsConfig {
            common: common_config,
            database: DatabaseConfig {
                host: get_env("DB_HOST", Some("localhost"), is_prod)?,
                port: parse_env("DB_PORT", 5432, is_prod)?,
                name: get_env("DB_NAME", Some("benefits"), is_prod)?,
                user: get_env("DB_USER", Some("postgres"), is_prod)?,
                password: Secret::new(get_env("DB_PASSWORD", Some(""), is_prod)?),
                max_connections: parse_env("DB_MAX_CONNECTIONS", 20, false)?,
                idle_timeout_ms: parse_env("DB_IDLE_TIMEOUT", 30_000, false)?,
                connection_timeout_ms: parse_env("DB_CONNECTION_TIMEOUT", 2_000, false)?,
                ssl_mode: get_env("DB_SSL_MODE", Some("require"), false)?,
            },
            sheets: SheetsConfig {
                url: optional_env("GOOGLE_SHEETS_URL"),
                service_account_email: optional_env("GOOGLE_SERVICE_ACCOUNT_EMAIL"),
                private_key: optional_env("GOOGLE_PRIVATE_KEY").map(Secret::new),
                token_url: get_env("GOOGLE_TOKEN_URL", Some(DEFAULT_TOKEN_URL), false)?,
            },
            webhook: WebhookConfig {
                url: optional_env("N8N_WEBHOOK_URL"),
            },
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigurationError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigurationError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: T, is_prod: bool) -> Result<T, AppError>
where
    T: std::str::FromStr + ToString,
    T::Err: std::fmt::Display,
{
    get_env(key, Some(&default.to_string()), is_prod)?
        .trim()
        .parse()
        .map_err(|e| AppError::ConfigurationError(anyhow::anyhow!("{} is invalid: {}", key, e)))
}
