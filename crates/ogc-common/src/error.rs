//! Error types for the OGC features engine.

use thiserror::Error;

/// Result type alias using OgcError.
pub type OgcResult<T> = Result<T, OgcError>;

/// Primary error type for feature query operations.
///
/// Database faults are collapsed into `InternalError` before they reach a
/// caller; the original fault text is logged, never surfaced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OgcError {
    // === Not found (404) ===
    #[error("Collection not found")]
    CollectionNotFound,

    #[error("{0}")]
    NotFound(String),

    // === Bad request (400) ===
    #[error("Collection does not support this crs")]
    UnsupportedCrs,

    #[error("Collection does not support this bbox-crs")]
    UnsupportedBboxCrs,

    #[error("{0}")]
    InvalidFilterParameter(String),

    #[error("{0}")]
    BadRequest(String),

    // === Internal (500) ===
    #[error("Internal Server Error")]
    InternalError,
}

impl OgcError {
    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            OgcError::CollectionNotFound | OgcError::NotFound(_) => 404,

            OgcError::UnsupportedCrs
            | OgcError::UnsupportedBboxCrs
            | OgcError::InvalidFilterParameter(_)
            | OgcError::BadRequest(_) => 400,

            OgcError::InternalError => 500,
        }
    }

    /// Get the OGC exception code string for this error.
    pub fn code(&self) -> &'static str {
        match self.http_status_code() {
            404 => "Not found",
            400 => "Bad Request",
            _ => "Internal Server Error",
        }
    }

    /// Build the client-visible JSON error body.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.code(),
            "description": self.to_string(),
        })
    }
}
