//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;
use utoipa::ToSchema;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// The public identity-provider settings handed to clients. None of these are
/// secrets; they identify the project to the client SDK.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseClientConfig {
    pub api_key: Option<String>,
    pub auth_domain: Option<String>,
    pub project_id: Option<String>,
    pub storage_bucket: Option<String>,
    pub messaging_sender_id: Option<String>,
    pub app_id: Option<String>,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: Option<String>,
    pub log_level: Level,
    pub prompts_path: Option<PathBuf>,
    pub gemini_api_key: Option<String>,
    pub gemini_api_base: String,
    pub gemini_model: String,
    pub youtube_api_key: Option<String>,
    pub max_image_bytes: usize,
    pub firebase: FirebaseClientConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            database_url: None,
            log_level: Level::INFO,
            prompts_path: None,
            gemini_api_key: None,
            gemini_api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            gemini_model: "gemini-2.0-flash".to_string(),
            youtube_api_key: None,
            // One stored document tops out just under 1 MiB.
            max_image_bytes: 1_048_487,
            firebase: FirebaseClientConfig::default(),
        }
    }
}

/// Reads a variable, treating an empty value as unset.
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
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
        let defaults = Self::default();

        // --- Load Server and Database Settings ---
        let bind_address = match optional_var("BIND_ADDRESS") {
            Some(value) => value.parse::<SocketAddr>().map_err(|e| {
                ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
            })?,
            None => defaults.bind_address,
        };

        let database_url = optional_var("DATABASE_URL");

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let prompts_path = optional_var("PROMPTS_PATH").map(PathBuf::from);

        // --- Load API Keys (as optional) ---
        let gemini_api_key = optional_var("GEMINI_API_KEY").or_else(|| optional_var("GOOGLE_API_KEY"));
        let youtube_api_key = optional_var("YOUTUBE_API_KEY");

        // --- Load Adapter-specific Settings ---
        let gemini_api_base = optional_var("GEMINI_API_BASE").unwrap_or(defaults.gemini_api_base);
        let gemini_model = optional_var("GEMINI_MODEL").unwrap_or(defaults.gemini_model);
        let max_image_bytes = match optional_var("MAX_IMAGE_BYTES") {
            Some(value) => value.parse::<usize>().map_err(|e| {
                ConfigError::InvalidValue("MAX_IMAGE_BYTES".to_string(), e.to_string())
            })?,
            None => defaults.max_image_bytes,
        };

        let firebase = FirebaseClientConfig {
            api_key: optional_var("FIREBASE_API_KEY"),
            auth_domain: optional_var("FIREBASE_AUTH_DOMAIN"),
            project_id: optional_var("FIREBASE_PROJECT_ID"),
            storage_bucket: optional_var("FIREBASE_STORAGE_BUCKET"),
            messaging_sender_id: optional_var("FIREBASE_MESSAGING_SENDER_ID"),
            app_id: optional_var("FIREBASE_APP_ID"),
        };

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            prompts_path,
            gemini_api_key,
            gemini_api_base,
            gemini_model,
            youtube_api_key,
            max_image_bytes,
            firebase,
        })
    }
}
