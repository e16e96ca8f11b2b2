//! crates/askpix_client/src/error.rs

use askpix_core::ports::PortError;

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Could not reach the server: {0}")]
    Transport(#[from] reqwest::Error),
    /// The API answered with an error status and its `{error}` message.
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("Unexpected response from the server: {0}")]
    InvalidResponse(String),
    #[error("Live connection failed: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),
    /// The server reported an error on the live list socket.
    #[error("{0}")]
    Live(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl From<ClientError> for PortError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Api { status: 403, message } => PortError::PermissionDenied(message),
            ClientError::Api { status: 404, message } => PortError::NotFound(message),
            ClientError::Api { status: 413, .. } => PortError::PayloadTooLarge,
            ClientError::Config(e) => PortError::Configuration(e.to_string()),
            other => PortError::Unexpected(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_statuses_map_to_port_errors() {
        let denied = ClientError::Api {
            status: 403,
            message: "You don't have permission to delete this solution.".to_string(),
        };
        assert_eq!(
            PortError::from(denied).user_message(),
            "You don't have permission to delete this solution."
        );

        let too_large = ClientError::Api {
            status: 413,
            message: "anything".to_string(),
        };
        assert_eq!(PortError::from(too_large), PortError::PayloadTooLarge);

        let failed = ClientError::Api {
            status: 500,
            message: "Model produced no output.".to_string(),
        };
        assert_eq!(
            PortError::from(failed),
            PortError::Unexpected("Model produced no output.".to_string())
        );
    }

    #[test]
    fn missing_configuration_is_a_configuration_error() {
        let err = ClientError::Config(ConfigError::MissingVar("ASKPIX_API_BASE_URL".to_string()));
        assert!(matches!(PortError::from(err), PortError::Configuration(_)));
    }
}
