use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

// ── Error codes ─────────────────────────────────────────────────────
//
// Stable, machine-readable identifiers. Clients match on these,
// never on the human-readable message string.

/// Stable error code constants shared by every module.
pub mod error_code {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
}

/// Build the standard failure envelope.
///
/// ```json
/// {"success": false, "code": "NOT_FOUND", "error": "no route for /api/nope"}
/// ```
///
/// Module-specific error types render through this too, so every failed
/// response carries the same three keys.
pub fn error_body(code: &str, message: &str) -> serde_json::Value {
    serde_json::json!({
        "success": false,
        "code": code,
        "error": message,
    })
}

// ── ServiceError ────────────────────────────────────────────────────

/// Generic service error for module construction and routing.
///
/// Business modules define their own error enums for request handling;
/// this one covers the plumbing around them.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Resource or route does not exist. HTTP 404.
    #[error("{0}")]
    NotFound(String),

    /// Input data is invalid. HTTP 400.
    #[error("{0}")]
    Validation(String),

    /// Storage backend failure. HTTP 500.
    #[error("{0}")]
    Storage(String),
}

impl ServiceError {
    /// Stable, machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => error_code::NOT_FOUND,
            ServiceError::Validation(_) => error_code::VALIDATION_FAILED,
            ServiceError::Storage(_) => error_code::STORAGE_ERROR,
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = error_body(self.error_code(), &self.to_string());
        (status, axum::Json(body)).into_response()
    }
}
