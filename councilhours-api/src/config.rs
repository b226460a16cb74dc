/// Configuration management
///
/// Settings come from environment variables; a `.env` file is loaded first
/// when present.
///
/// # Environment Variables
///
/// - `API_HOST` / `API_PORT`: bind address (default `0.0.0.0:8000`)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default 10)
/// - `SECRET_KEY`: session signing key, at least 32 characters (required)
/// - `SESSION_HOURS`: session lifetime (default 12)
/// - `COUNCIL_TITLE`: council name used in responses and emails
/// - `EMAIL_TEXT`: notification template path (default `email_template.txt`)
/// - `EMAIL_SUBJECT`: notification subject (default `Notification from {COUNCIL_TITLE}`)
/// - `URL`: public URL placed in emails (default `http://localhost:8000`)
/// - `CORS_ORIGINS`: comma-separated allowed origins (default `*`)
/// - `PRODUCTION`: enables HSTS (default false)
/// - `ACCESS_CODE_LENGTH` / `ACCESS_CODE_MAX_ATTEMPTS`: allocator policy (default 6 / 10000)
/// - `LOG_FORMAT`: `json` for JSON log lines, anything else for text

use councilhours_shared::access_code::{DEFAULT_CODE_LENGTH, DEFAULT_MAX_ATTEMPTS, MAX_CODE_LENGTH};
use councilhours_shared::auth::jwt::DEFAULT_SESSION_HOURS;
use councilhours_shared::notify;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_COUNCIL_TITLE: &str = "Knights of Columbus Council";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,

    pub database: DatabaseConfig,

    pub session: SessionConfig,

    pub council: CouncilConfig,

    pub access_code: AccessCodeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,

    pub port: u16,

    /// `*` allows any origin
    pub cors_origins: Vec<String>,

    pub production: bool,

    pub log_json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(skip_serializing)]
    pub secret: String,

    pub hours: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouncilConfig {
    pub title: String,

    /// Resolved absolute path of the notification template
    pub email_template: PathBuf,

    pub email_subject: String,

    /// Public URL of the application
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessCodeConfig {
    pub length: usize,

    pub max_attempts: u32,
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} is invalid: {}", key, e)),
        _ => Ok(default),
    }
}

fn parse_flag(raw: Option<String>) -> bool {
    raw.map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&lookup, "API_PORT", 8000u16)?;

        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
        let max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10u32)?;

        let secret = lookup("SECRET_KEY")
            .ok_or_else(|| anyhow::anyhow!("SECRET_KEY environment variable is required"))?;
        if secret.len() < 32 {
            anyhow::bail!("SECRET_KEY must be at least 32 characters long");
        }
        let hours = parse_or(&lookup, "SESSION_HOURS", DEFAULT_SESSION_HOURS)?;
        if hours <= 0 {
            anyhow::bail!("SESSION_HOURS must be positive");
        }

        let title = lookup("COUNCIL_TITLE").unwrap_or_else(|| DEFAULT_COUNCIL_TITLE.to_string());
        let email_template =
            notify::resolve_path(&lookup("EMAIL_TEXT").unwrap_or_else(|| "email_template.txt".to_string()));
        let email_subject = lookup("EMAIL_SUBJECT").unwrap_or_else(|| notify::default_subject(&title));
        let url = lookup("URL").unwrap_or_else(|| "http://localhost:8000".to_string());

        let length = parse_or(&lookup, "ACCESS_CODE_LENGTH", DEFAULT_CODE_LENGTH)?;
        let max_attempts = parse_or(&lookup, "ACCESS_CODE_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?;
        if length == 0 || max_attempts == 0 {
            anyhow::bail!("ACCESS_CODE_LENGTH and ACCESS_CODE_MAX_ATTEMPTS must be at least 1");
        }
        if length > MAX_CODE_LENGTH {
            anyhow::bail!("ACCESS_CODE_LENGTH must be at most {}", MAX_CODE_LENGTH);
        }

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
                production: parse_flag(lookup("PRODUCTION")),
                log_json: lookup("LOG_FORMAT")
                    .map(|v| v.eq_ignore_ascii_case("json"))
                    .unwrap_or(false),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            session: SessionConfig { secret, hours },
            council: CouncilConfig {
                title,
                email_template,
                email_subject,
                url,
            },
            access_code: AccessCodeConfig {
                length,
                max_attempts,
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}
