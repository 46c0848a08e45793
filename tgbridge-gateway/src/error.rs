//! Error types for tgbridge-gateway
//!
//! Route handlers return [`Error`]; its `IntoResponse` impl maps each
//! variant to a status code and an `{"error": message}` body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Fixed message for a send request whose account has no stored session
pub const SESSION_NOT_FOUND_MESSAGE: &str = "User not authorized or session expired";

/// Main error type for tgbridge-gateway
#[derive(Error, Debug)]
pub enum Error {
    /// QR authorization failed (connection, login error, missing 2FA password, timeout)
    #[error("{0}")]
    Authorization(String),

    /// No session stored for the requested account
    #[error("{}", SESSION_NOT_FOUND_MESSAGE)]
    SessionNotFound,

    /// Required request field missing
    #[error("{0}")]
    BadRequest(String),

    /// Connect or send failed for an authorized account
    #[error("{0}")]
    Operation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Authorization(_) | Error::SessionNotFound => StatusCode::UNAUTHORIZED,
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Operation(_) | Error::Config(_) | Error::Io(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Convenience Result type using tgbridge-gateway Error
pub type Result<T> = std::result::Result<T, Error>;
