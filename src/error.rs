//! # Error Handling
//!
//! This module defines the application's error types and how they're converted
//! to HTTP responses. Every failure in the upload → recognition pipeline maps
//! to an explicit status code; nothing is silently swallowed.
//!
//! ## Error Categories:
//! - **Internal**: Server-side problems (500 errors)
//! - **BadRequest**: Client sent invalid data (400 errors)
//! - **MissingUpload**: Multipart body contained no file part (400 errors)
//! - **UploadFailed**: Writing or reading the scratch file failed (500 errors)
//! - **RecognitionFailed**: The external speech API call failed (502 errors)
//! - **ConfigError**: Configuration problems (500 errors)
//! - **ValidationError**: Data validation failed (400 errors)
//!
//! ## Why custom errors:
//! Custom error types make it easy to handle the different failure scenarios
//! of the pipeline and provide meaningful error messages to API clients.

use actix_web::{HttpResponse, ResponseError};  // Web framework error handling
use serde_json::json;                          // For creating JSON error responses
use std::fmt;                                  // For implementing Display trait

/// Custom error types for the application.
///
/// ## Usage Example:
/// ```rust
/// return Err(AppError::MissingUpload("no file part in request".to_string()));
/// ```
#[derive(Debug)]
pub enum AppError {
    /// Internal server errors (lock poisoning, unexpected I/O, etc.)
    Internal(String),

    /// Client sent invalid or malformed data
    BadRequest(String),

    /// The multipart body finished without producing a file part
    MissingUpload(String),

    /// Streaming the upload to the scratch file (or reading it back) failed
    UploadFailed(String),

    /// The external recognition service call failed or returned garbage
    RecognitionFailed(String),

    /// Configuration file or environment variable problems
    ConfigError(String),

    /// User input failed validation rules
    ValidationError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::MissingUpload(msg) => write!(f, "Missing upload: {}", msg),
            AppError::UploadFailed(msg) => write!(f, "Upload failed: {}", msg),
            AppError::RecognitionFailed(msg) => write!(f, "Recognition failed: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

/// Implementation of the ResponseError trait for AppError.
///
/// ## HTTP Status Code Mapping:
/// - Internal/ConfigError/UploadFailed → 500 (Internal Server Error)
/// - BadRequest/ValidationError/MissingUpload → 400 (Bad Request)
/// - RecognitionFailed → 502 (Bad Gateway, the upstream service failed)
///
/// ## JSON Response Format:
/// All errors return JSON with a consistent structure:
/// ```json
/// {
///   "error": {
///     "type": "missing_upload",
///     "message": "no file part in request",
///     "timestamp": "2025-01-01T12:00:00Z"
///   }
/// }
/// ```
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        // Map each error type to HTTP status code, error type, and message
        let (status, error_type, message) = match self {
            AppError::Internal(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,  // 500
                "internal_error",
                msg.clone(),
            ),
            AppError::BadRequest(msg) => (
                actix_web::http::StatusCode::BAD_REQUEST,  // 400
                "bad_request",
                msg.clone(),
            ),
            AppError::MissingUpload(msg) => (
                actix_web::http::StatusCode::BAD_REQUEST,  // 400
                "missing_upload",
                msg.clone(),
            ),
            AppError::UploadFailed(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,  // 500
                "upload_failed",
                msg.clone(),
            ),
            AppError::RecognitionFailed(msg) => (
                actix_web::http::StatusCode::BAD_GATEWAY,  // 502
                "recognition_failed",
                msg.clone(),
            ),
            AppError::ConfigError(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,  // 500
                "config_error",
                msg.clone(),
            ),
            AppError::ValidationError(msg) => (
                actix_web::http::StatusCode::BAD_REQUEST,  // 400
                "validation_error",
                msg.clone(),
            ),
        };

        // Build the HTTP response with JSON body
        HttpResponse::build(status).json(json!({
            "error": {
                "type": error_type,           // Machine-readable error type
                "message": message,           // Human-readable error message
                "timestamp": chrono::Utc::now().to_rfc3339()  // When the error occurred
            }
        }))
    }
}

/// Automatic conversion from anyhow::Error to AppError.
///
/// When you use `?` with an anyhow::Error, it automatically becomes an
/// AppError::Internal.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Automatic conversion from JSON parsing errors to AppError.
///
/// JSON parsing errors are almost always due to the client sending malformed
/// data, so they result in a 400 (Bad Request), not a 500.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

/// Automatic conversion from configuration errors to AppError.
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

/// Automatic conversion from I/O errors to AppError.
///
/// The only I/O this service performs is scratch-file I/O during an upload,
/// so a raw io::Error always means the upload pipeline broke server-side.
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::UploadFailed(err.to_string())
    }
}

/// Type alias for Results that use our custom error type.
pub type AppResult<T> = Result<T, AppError>;
