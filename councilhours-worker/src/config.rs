/// Worker configuration
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `WORKER_POLL_INTERVAL_SECS`: idle wait between polls (default 5)
/// - `WORKER_BATCH_SIZE`: notifications claimed per poll (default 10)
/// - `WORKER_MAX_ATTEMPTS`: delivery attempts before a notification stays failed (default 5)
/// - `WORKER_LEASE_SECS`: how long a claimed notification may stay in `sending` (default 300)
/// - `MAIL_TRANSPORT`: `log` (default) or `http`
/// - `MAIL_API_URL` / `MAIL_API_KEY`: mail API endpoint and bearer key, required for `http`
/// - `SMTP_FROM`: sender address (default `noreply@localhost`)
/// - `LOG_FORMAT`: `json` for JSON log lines

use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_BATCH_SIZE: i64 = 10;
pub const DEFAULT_MAX_ATTEMPTS: i32 = 5;
pub const DEFAULT_LEASE_SECS: u64 = 300;

/// How outgoing mail leaves the worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailTransport {
    /// Writes each email to the log
    Log,

    /// Posts each email to a transactional mail API
    Http { url: String, api_key: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    pub database_url: String,

    pub poll_interval: Duration,

    pub batch_size: i64,

    pub max_attempts: i32,

    pub lease: Duration,

    pub transport: MailTransport,

    pub from_address: String,

    pub log_json: bool,
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> anyhow::Result<T> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a number, got '{}'", key, raw)),
        None => Ok(default),
    }
}

impl WorkerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let poll_interval_secs =
            parse_or(&lookup, "WORKER_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?;
        let batch_size = parse_or(&lookup, "WORKER_BATCH_SIZE", DEFAULT_BATCH_SIZE)?;
        let max_attempts = parse_or(&lookup, "WORKER_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?;
        let lease_secs = parse_or(&lookup, "WORKER_LEASE_SECS", DEFAULT_LEASE_SECS)?;
        if poll_interval_secs == 0 || batch_size < 1 || max_attempts < 1 || lease_secs == 0 {
            anyhow::bail!(
                "WORKER_POLL_INTERVAL_SECS, WORKER_BATCH_SIZE, WORKER_MAX_ATTEMPTS and WORKER_LEASE_SECS must be at least 1"
            );
        }

        let transport = match lookup("MAIL_TRANSPORT")
            .map(|t| t.trim().to_ascii_lowercase())
            .as_deref()
        {
            None | Some("") | Some("log") => MailTransport::Log,
            Some("http") => MailTransport::Http {
                url: lookup("MAIL_API_URL").ok_or_else(|| {
                    anyhow::anyhow!("MAIL_API_URL is required when MAIL_TRANSPORT=http")
                })?,
                api_key: lookup("MAIL_API_KEY").ok_or_else(|| {
                    anyhow::anyhow!("MAIL_API_KEY is required when MAIL_TRANSPORT=http")
                })?,
            },
            Some(other) => anyhow::bail!("Unknown MAIL_TRANSPORT '{}', expected log or http", other),
        };

        Ok(Self {
            database_url,
            poll_interval: Duration::from_secs(poll_interval_secs),
            batch_size,
            max_attempts,
            lease: Duration::from_secs(lease_secs),
            transport,
            from_address: lookup("SMTP_FROM").unwrap_or_else(|| "noreply@localhost".to_string()),
            log_json: lookup("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<WorkerConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WorkerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/db")]).unwrap();
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.lease, Duration::from_secs(300));
        assert_eq!(config.transport, MailTransport::Log);
        assert_eq!(config.from_address, "noreply@localhost");
    }

    #[test]
    fn test_database_url_required() {
        assert!(config_from(&[]).is_err());
    }

    #[test]
    fn test_http_transport_needs_endpoint_and_key() {
        let err = config_from(&[
            ("DATABASE_URL", "postgres://localhost/db"),
            ("MAIL_TRANSPORT", "http"),
            ("MAIL_API_URL", "https://mail.example.org/send"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("MAIL_API_KEY"));

        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/db"),
            ("MAIL_TRANSPORT", "HTTP"),
            ("MAIL_API_URL", "https://mail.example.org/send"),
            ("MAIL_API_KEY", "key-123"),
            ("SMTP_FROM", "council@example.org"),
        ])
        .unwrap();
        assert_eq!(
            config.transport,
            MailTransport::Http {
                url: "https://mail.example.org/send".to_string(),
                api_key: "key-123".to_string(),
            }
        );
        assert_eq!(config.from_address, "council@example.org");
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(config_from(&[
            ("DATABASE_URL", "postgres://localhost/db"),
            ("WORKER_BATCH_SIZE", "0"),
        ])
        .is_err());
        assert!(config_from(&[
            ("DATABASE_URL", "postgres://localhost/db"),
            ("WORKER_POLL_INTERVAL_SECS", "soon"),
        ])
        .is_err());
        assert!(config_from(&[
            ("DATABASE_URL", "postgres://localhost/db"),
            ("MAIL_TRANSPORT", "pigeon"),
        ])
        .is_err());
        assert!(config_from(&[
            ("DATABASE_URL", "postgres://localhost/db"),
            ("WORKER_LEASE_SECS", "0"),
        ])
        .is_err());
    }
}
