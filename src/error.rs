/// Unified error types for the Waypost directory service
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the directory service
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Authentication errors (no usable identity)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authorization errors (identity present, insufficient role)
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity or resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transition attempted on an entity already in a terminal state
    #[error("Already finalized: {0}")]
    AlreadyFinalized(String),

    /// Missing or too-short rejection reason
    #[error("Invalid reason: {0}")]
    InvalidReason(String),

    /// Latitude or longitude outside the valid range
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    /// Search radius above the configured cap
    #[error("Radius too large: requested {requested_km} km, maximum {max_km} km")]
    RadiusTooLarge { requested_km: f64, max_km: f64 },

    /// Geocoding provider error or timeout (distinct from "no match")
    #[error("Geocoding unavailable: {0}")]
    GeocodingUnavailable(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: std::time::Duration },

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert DirectoryError to HTTP response
impl IntoResponse for DirectoryError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            DirectoryError::Authentication(_) => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationRequired",
                self.to_string(),
            ),
            DirectoryError::Authorization(_) => (
                StatusCode::FORBIDDEN,
                "Forbidden",
                self.to_string(),
            ),
            DirectoryError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "InvalidRequest",
                self.to_string(),
            ),
            DirectoryError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                "NotFound",
                self.to_string(),
            ),
            DirectoryError::AlreadyFinalized(_) => (
                StatusCode::CONFLICT,
                "AlreadyFinalized",
                self.to_string(),
            ),
            DirectoryError::InvalidReason(_) => (
                StatusCode::BAD_REQUEST,
                "InvalidReason",
                self.to_string(),
            ),
            DirectoryError::InvalidCoordinates(_) => (
                StatusCode::BAD_REQUEST,
                "InvalidCoordinates",
                self.to_string(),
            ),
            DirectoryError::RadiusTooLarge { .. } => (
                StatusCode::BAD_REQUEST,
                "RadiusTooLarge",
                self.to_string(),
            ),
            DirectoryError::GeocodingUnavailable(_) => (
                StatusCode::BAD_GATEWAY,
                "GeocodingUnavailable",
                self.to_string(),
            ),
            DirectoryError::RateLimitExceeded { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RateLimitExceeded",
                "Rate limit exceeded".to_string(),
            ),
            DirectoryError::Database(_) | DirectoryError::Internal(_) | DirectoryError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Internal server error".to_string(), // Don't leak details
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for directory operations
pub type DirectoryResult<T> = Result<T, DirectoryError>;
