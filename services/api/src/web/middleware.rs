//! services/api/src/web/middleware.rs
//!
//! Request middleware: caller identification for the saved-solution routes and
//! the preflight status rewrite.

use axum::{
    extract::Request,
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::web::error::HttpError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The opaque id of the signed-in caller, as asserted by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

/// Middleware that reads the caller's id from the `x-user-id` header.
///
/// If present, inserts a `UserId` into request extensions for handlers to use.
/// If missing or blank, returns 401 Unauthorized.
pub async fn require_user(mut req: Request, next: Next) -> Result<Response, HttpError> {
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| HttpError::Unauthorized(format!("{} header is required", USER_ID_HEADER)))?;

    req.extensions_mut().insert(UserId(user_id));
    Ok(next.run(req).await)
}

/// Answers successful CORS preflights with 204 No Content.
pub async fn preflight_no_content(req: Request, next: Next) -> Response {
    let is_preflight = req.method() == Method::OPTIONS;
    let mut response = next.run(req).await;
    if is_preflight && response.status() == StatusCode::OK {
        *response.status_mut() = StatusCode::NO_CONTENT;
    }
    response
}
