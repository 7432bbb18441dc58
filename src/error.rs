//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the
//! application. It centralizes error management, providing a consistent way
//! to handle and represent the error conditions that can occur, from
//! database issues to authorization failures.
//!
//! `AppError` implements `actix_web::error::ResponseError` to seamlessly
//! convert application errors into appropriate HTTP responses with JSON
//! bodies. It also provides `From` trait implementations for common error
//! types like `sqlx::Error`, `validator::ValidationErrors`,
//! `jsonwebtoken::errors::Error`, and `bcrypt::BcryptError`, allowing for
//! easy conversion using the `?` operator.

use actix_web::{error::ResponseError, HttpResponse};
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

/// Represents all possible errors that can occur within the application.
#[derive(Debug)]
pub enum AppError {
    /// The caller is not authenticated, or their credentials/token are
    /// invalid or expired (HTTP 401).
    Unauthorized(String),
    /// The caller is authenticated but lacks the required access level for
    /// the resource (HTTP 403).
    Forbidden(String),
    /// Malformed or conflicting request, including duplicate registrations
    /// and duplicate member additions (HTTP 400).
    BadRequest(String),
    /// The requested resource does not exist (HTTP 404).
    NotFound(String),
    /// An unexpected server-side error (HTTP 500).
    InternalServerError(String),
    /// An error originating from the database layer (HTTP 500).
    DatabaseError(String),
    /// Failed input validation on a request payload (HTTP 400).
    ValidationError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
        }
    }
}

/// Converts `AppError` variants into `HttpResponse` objects.
///
/// Existence failures map to 404 and authorization failures to 403; service
/// code checks existence first, so the two are distinguishable to callers.
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Unauthorized(msg) => HttpResponse::Unauthorized().json(json!({
                "error": msg
            })),
            AppError::Forbidden(msg) => HttpResponse::Forbidden().json(json!({
                "error": msg
            })),
            AppError::BadRequest(msg) => HttpResponse::BadRequest().json(json!({
                "error": msg
            })),
            AppError::NotFound(msg) => HttpResponse::NotFound().json(json!({
                "error": msg
            })),
            AppError::InternalServerError(msg) => HttpResponse::InternalServerError().json(json!({
                "error": msg
            })),
            // Database errors are presented as internal server errors to the client.
            AppError::DatabaseError(msg) => HttpResponse::InternalServerError().json(json!({
                "error": msg
            })),
            AppError::ValidationError(msg) => HttpResponse::BadRequest().json(json!({
                "error": msg
            })),
        }
    }
}

/// Converts `sqlx::Error` into `AppError`.
///
/// `sqlx::Error::RowNotFound` maps to `AppError::NotFound`; everything else
/// becomes `AppError::DatabaseError` and is logged in full.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            _ => {
                log::error!("database error: {}", error);
                AppError::DatabaseError(error.to_string())
            }
        }
    }
}

/// Converts `validator::ValidationErrors` into `AppError::ValidationError`,
/// preserving the detailed field messages.
impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationError(error.to_string())
    }
}

/// Converts `jsonwebtoken::errors::Error` into `AppError::Unauthorized`.
impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        AppError::Unauthorized(error.to_string())
    }
}

/// Converts `bcrypt::BcryptError` into `AppError::InternalServerError`.
impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}
