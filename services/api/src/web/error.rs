//! services/api/src/web/error.rs
//!
//! The error type returned by every HTTP handler. It always renders as a JSON
//! `{ "error": ..., "details"?: ... }` body with a matching status code.

use askpix_core::flows::FlowError;
use askpix_core::ports::PortError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::web::validation::FieldErrors;

/// The JSON body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    /// Field name to the list of problems found with it.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<FieldErrors>,
}

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("Invalid input")]
    Validation(FieldErrors),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error(transparent)]
    Flow(#[from] FlowError),
    #[error(transparent)]
    Port(#[from] PortError),
}

fn port_status(err: &PortError) -> StatusCode {
    match err {
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        PortError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        PortError::Configuration(_) | PortError::Unexpected(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl HttpError {
    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::Validation(_) | HttpError::BadRequest(_) => StatusCode::BAD_REQUEST,
            HttpError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            HttpError::Flow(FlowError::Port(port)) | HttpError::Port(port) => port_status(port),
            HttpError::Flow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected ({}): {}", status, self);
        }

        let message = self.to_string();
        let details = match self {
            HttpError::Validation(fields) => Some(fields),
            _ => None,
        };
        let body = Json(ErrorBody {
            error: message,
            details,
        });
        (status, body).into_response()
    }
}
