//! Process configuration.
//!
//! Read once at startup from the environment (after an optional `.env` is
//! loaded). Parsing is a pure function over a lookup so it can be tested
//! without touching the real process environment.

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

pub const DEFAULT_PORT: u16 = 7000;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PAYMENT_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub host: IpAddr,
    pub port: u16,
    pub access_token_secret: String,
    /// Postgres connection string; in-memory stores when absent.
    pub database_url: Option<String>,
    /// Stripe secret key; the dev gateway is used when absent.
    pub payment_secret_key: Option<String>,
    pub payment_api_base: String,
    pub log_filter: String,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database_url.as_ref().map(|_| "postgres"))
            .field("payments", &self.payment_secret_key.as_ref().map(|_| "stripe"))
            .field("payment_api_base", &self.payment_api_base)
            .field("log_filter", &self.log_filter)
            .field("log_format", &self.log_format)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match get("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid { key: "PORT", value: raw })?,
            None => DEFAULT_PORT,
        };

        let host_raw = get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let host = host_raw
            .parse()
            .map_err(|_| ConfigError::Invalid { key: "HOST", value: host_raw.clone() })?;

        let access_token_secret = get("ACCESS_TOKEN_SECRET").ok_or(ConfigError::Missing("ACCESS_TOKEN_SECRET"))?;

        let log_format = match get("LOG_FORMAT").as_deref() {
            None | Some("json") => LogFormat::Json,
            Some("pretty") => LogFormat::Pretty,
            Some(other) => {
                return Err(ConfigError::Invalid { key: "LOG_FORMAT", value: other.to_string() });
            }
        };

        Ok(Self {
            host,
            port,
            access_token_secret,
            database_url: get("DATABASE_URL"),
            payment_secret_key: get("PAYMENT_SECRET_KEY"),
            payment_api_base: get("PAYMENT_API_BASE").unwrap_or_else(|| DEFAULT_PAYMENT_API_BASE.to_string()),
            log_filter: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            log_format,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
