//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    /// Path to the serialized risk model artifact.
    pub model_path: PathBuf,
    /// Positive-class probability above which a vehicle is classified High.
    pub risk_threshold: f64,
    pub mail_relay_url: Option<String>,
    pub mail_from: String,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Risk Model Settings ---
        let model_path = std::env::var("MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./risk_model.json"));

        let risk_threshold_str =
            std::env::var("RISK_THRESHOLD").unwrap_or_else(|_| "0.6".to_string());
        let risk_threshold = risk_threshold_str.parse::<f64>().map_err(|e| {
            ConfigError::InvalidValue("RISK_THRESHOLD".to_string(), e.to_string())
        })?;
        if !(0.0..=1.0).contains(&risk_threshold) {
            return Err(ConfigError::InvalidValue(
                "RISK_THRESHOLD".to_string(),
                format!("'{}' is not a probability", risk_threshold_str),
            ));
        }

        // --- Load Mail Settings (relay is optional for local development) ---
        let mail_relay_url = std::env::var("MAIL_RELAY_URL").ok();
        let mail_from = std::env::var("MAIL_FROM")
            .unwrap_or_else(|_| "no-reply@fleet-maintenance.local".to_string());

        let cors_origin =
            std::env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            model_path,
            risk_threshold,
            mail_relay_url,
            mail_from,
            cors_origin,
        })
    }
}
