//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development. `BACKEND_URL` is the single source of
//! truth for where the story backend lives.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub backend_url: String,
    /// Base for image URLs handed to browsers. Defaults to `backend_url`.
    pub public_backend_url: String,
    pub database_url: Option<String>,
    pub log_level: Level,
    pub default_user_id: i64,
    pub cors_origin: String,
    pub backend_timeout: Duration,
    pub rewrite_bucket_host: bool,
    pub image_strength: f32,
    pub image_prefix: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // --- Server ---
        let bind_address_str = lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        // --- Story backend ---
        let backend_url = lookup("BACKEND_URL")
            .unwrap_or_else(|| "http://localhost:8000".to_string())
            .trim_end_matches('/')
            .to_string();
        if !backend_url.starts_with("http://") && !backend_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "BACKEND_URL".to_string(),
                format!("'{}' is not an http(s) URL", backend_url),
            ));
        }
        let public_backend_url = lookup("PUBLIC_BACKEND_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| backend_url.clone());

        let backend_timeout = parse_or("BACKEND_TIMEOUT_SECS", &lookup, 300u64)
            .map(Duration::from_secs)?;

        // --- Session storage (optional) ---
        let database_url = lookup("DATABASE_URL").filter(|s| !s.trim().is_empty());

        // --- Wizard settings ---
        let default_user_id = parse_or("DEFAULT_USER_ID", &lookup, 1i64)?;
        let rewrite_bucket_host = parse_or("REWRITE_BUCKET_HOST", &lookup, true)?;
        let image_strength = parse_or("IMAGE_STRENGTH", &lookup, 1.0f32)?;
        if !(0.0..=1.0).contains(&image_strength) {
            return Err(ConfigError::InvalidValue(
                "IMAGE_STRENGTH".to_string(),
                format!("{} is outside 0.0..=1.0", image_strength),
            ));
        }
        let image_prefix =
            lookup("IMAGE_PREFIX").unwrap_or_else(|| "storyplot_i2i_all".to_string());

        Ok(Self {
            bind_address,
            backend_url,
            public_backend_url,
            database_url,
            log_level,
            default_user_id,
            cors_origin,
            backend_timeout,
            rewrite_bucket_host,
            image_strength,
            image_prefix,
        })
    }
}

fn parse_or<T>(
    key: &str,
    lookup: &impl Fn(&str) -> Option<String>,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}
