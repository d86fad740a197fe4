//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREKEEP_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)
//!
//! ## Optional
//! - `STOREKEEP_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREKEEP_PORT` - Listen port (default: 3000)
//! - `STOREKEEP_PREPARATION_MINUTES` - Minutes between checkout and the
//!   order's expected completion (default: 30)
//! - `LOG_FORMAT` - `pretty` or `json` (default: pretty)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};

use chrono::TimeDelta;
use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_PREPARATION_MINUTES: &str = "30";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Offset from checkout time to the order's expected completion
    pub preparation: TimeDelta,
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("STOREKEEP_DATABASE_URL")
            .or_else(|| lookup("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("STOREKEEP_DATABASE_URL".to_string()))?;

        let host = parse_or_default(&lookup, "STOREKEEP_HOST", "127.0.0.1", |v| {
            v.parse::<IpAddr>().map_err(|e| e.to_string())
        })?;
        let port = parse_or_default(&lookup, "STOREKEEP_PORT", "3000", |v| {
            v.parse::<u16>().map_err(|e| e.to_string())
        })?;
        let preparation = parse_or_default(
            &lookup,
            "STOREKEEP_PREPARATION_MINUTES",
            DEFAULT_PREPARATION_MINUTES,
            parse_minutes,
        )?;
        let log_format = parse_or_default(&lookup, "LOG_FORMAT", "pretty", |v| {
            match v.to_ascii_lowercase().as_str() {
                "pretty" => Ok(LogFormat::Pretty),
                "json" => Ok(LogFormat::Json),
                other => Err(format!("expected 'pretty' or 'json', got '{other}'")),
            }
        })?;

        Ok(Self {
            database_url,
            host,
            port,
            preparation,
            log_format,
            sentry_dsn: lookup("SENTRY_DSN").filter(|v| !v.is_empty()),
            sentry_environment: lookup("SENTRY_ENVIRONMENT").filter(|v| !v.is_empty()),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_or_default<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
    parse: impl FnOnce(&str) -> Result<T, String>,
) -> Result<T, ConfigError> {
    let value = lookup(key).unwrap_or_else(|| default.to_string());
    parse(value.trim()).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e))
}

fn parse_minutes(value: &str) -> Result<TimeDelta, String> {
    let minutes = value.parse::<u32>().map_err(|e| e.to_string())?;
    Ok(TimeDelta::minutes(i64::from(minutes)))
}
