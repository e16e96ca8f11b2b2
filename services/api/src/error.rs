//! services/api/src/error.rs
//!
//! Failures that stop the server from starting or keep it from serving.
//! Per-request failures are `web::error::HttpError`.

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Connecting to Postgres failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The model or video-search HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Binding the listener, serving, or reading prompt overrides.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_errors_name_their_source() {
        let err = ApiError::from(ConfigError::MissingVar("GEMINI_MODEL".to_string()));
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing the environment variable GEMINI_MODEL"
        );

        let err = ApiError::from(std::io::Error::new(
            std::io::ErrorKind::AddrInUse,
            "address in use",
        ));
        assert!(matches!(err, ApiError::Io(_)));
        assert_eq!(err.to_string(), "IO error: address in use");
    }
}
