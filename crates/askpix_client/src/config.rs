//! crates/askpix_client/src/config.rs
//!
//! Resolves where the API lives. Development builds talk to a local server by
//! default; packaged builds (the `packaged` feature) run outside the API's
//! origin and must be told the base URL explicitly.

pub const API_BASE_URL_VAR: &str = "ASKPIX_API_BASE_URL";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}; packaged builds need the public API base URL")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Without a trailing slash.
    pub api_base_url: String,
}

impl ClientConfig {
    pub fn new(api_base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let api_base_url = api_base_url.into().trim().trim_end_matches('/').to_string();
        if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue(
                API_BASE_URL_VAR.to_string(),
                format!("'{}' is not an http(s) URL", api_base_url),
            ));
        }
        Ok(Self { api_base_url })
    }

    /// Builds the config from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        match lookup(API_BASE_URL_VAR).filter(|v| !v.trim().is_empty()) {
            Some(url) => Self::new(url),
            None if cfg!(feature = "packaged") => {
                Err(ConfigError::MissingVar(API_BASE_URL_VAR.to_string()))
            }
            None => Self::new(DEFAULT_API_BASE_URL),
        }
    }

    /// Loads from the process environment, reading `.env` outside tests.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path)
    }

    /// The WebSocket URL for `path`: `ws://` under `http://`, `wss://` under `https://`.
    pub fn ws_url(&self, path: &str) -> String {
        let url = self.url(path);
        match url.strip_prefix("https://") {
            Some(rest) => format!("wss://{}", rest),
            None => format!("ws://{}", url.trim_start_matches("http://")),
        }
    }
}
