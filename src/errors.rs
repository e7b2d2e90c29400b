//! # Error Handling
//!
//! Every failure a resource endpoint can produce maps to exactly one HTTP
//! status and renders the same envelope:
//!
//! ```json
//! { "error": { "messages": "Resource Not Found", "status_code": 404 } }
//! ```
//!
//! `messages` is a string for most errors and a `field -> [messages]` object
//! for validation failures.
//!
//! **Never expose internal errors to users.** Database errors and internal
//! details are logged server-side through `tracing` and replaced by a generic
//! message in the response.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use restcrate::ApiError;
//!
//! async fn my_handler() -> Result<ApiResponse, ApiError> {
//!     // Database errors convert automatically and are logged
//!     let post = Post::find_by_id(id)
//!         .one(db)
//!         .await?
//!         .ok_or_else(ApiError::not_found)?;
//!     // ...
//! }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use std::fmt;

use crate::validation::ValidationErrors;

const WRONG_ARGUMENTS: &str = "Wrong Arguments";
const UNAUTHORIZED: &str = "Unauthorized";
const FORBIDDEN: &str = "Forbidden";
const NOT_FOUND: &str = "Resource Not Found";
const METHOD_NOT_ALLOWED: &str = "Method Not Allowed";
const CONFLICT: &str = "Resource already exists";
const INTERNAL: &str = "Internal Error";
const NOT_IMPLEMENTED: &str = "Not implemented";

/// API error type with automatic logging and sanitized responses
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - missing or invalid arguments
    BadRequest { message: String },

    /// 400 Bad Request - payload rules failed
    ValidationFailed { errors: ValidationErrors },

    /// 401 Unauthorized
    Unauthorized { message: String },

    /// 403 Forbidden
    Forbidden { message: String },

    /// 404 Not Found
    NotFound { message: String },

    /// 405 Method Not Allowed
    MethodNotAllowed { message: String },

    /// 409 Conflict - duplicate or already existing resource
    Conflict { message: String },

    /// 500 Internal Server Error - database error (details logged, not exposed)
    Database { internal: DbErr },

    /// 500 Internal Server Error
    Internal {
        message: String,
        /// Internal error details (logged, not sent to user)
        internal: Option<String>,
    },

    /// 501 Not Implemented
    NotImplemented { message: String },
}

impl ApiError {
    // ============================================================================
    // Constructors
    // ============================================================================

    /// 400 with a specific message.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// 400 with the default `Wrong Arguments` message.
    #[must_use]
    pub fn wrong_arguments() -> Self {
        Self::bad_request(WRONG_ARGUMENTS)
    }

    #[must_use]
    pub fn validation_failed(errors: ValidationErrors) -> Self {
        Self::ValidationFailed { errors }
    }

    #[must_use]
    pub fn unauthorized() -> Self {
        Self::Unauthorized {
            message: UNAUTHORIZED.to_string(),
        }
    }

    #[must_use]
    pub fn forbidden() -> Self {
        Self::Forbidden {
            message: FORBIDDEN.to_string(),
        }
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self::NotFound {
            message: NOT_FOUND.to_string(),
        }
    }

    #[must_use]
    pub fn method_not_allowed() -> Self {
        Self::MethodNotAllowed {
            message: METHOD_NOT_ALLOWED.to_string(),
        }
    }

    #[must_use]
    pub fn conflict() -> Self {
        Self::Conflict {
            message: CONFLICT.to_string(),
        }
    }

    /// 500 from a database error. The error is logged, never rendered.
    #[must_use]
    pub fn database(err: DbErr) -> Self {
        Self::Database { internal: err }
    }

    /// 500 with optional internal details that are logged only.
    pub fn internal(internal: Option<String>) -> Self {
        Self::Internal {
            message: INTERNAL.to_string(),
            internal,
        }
    }

    #[must_use]
    pub fn not_implemented() -> Self {
        Self::NotImplemented {
            message: NOT_IMPLEMENTED.to_string(),
        }
    }

    /// Replace the user-facing message.
    ///
    /// Has no effect on validation and database errors, whose rendered
    /// messages are fixed.
    #[must_use]
    pub fn with_message(mut self, text: impl Into<String>) -> Self {
        match &mut self {
            Self::BadRequest { message }
            | Self::Unauthorized { message }
            | Self::Forbidden { message }
            | Self::NotFound { message }
            | Self::MethodNotAllowed { message }
            | Self::Conflict { message }
            | Self::Internal { message, .. }
            | Self::NotImplemented { message } => *message = text.into(),
            Self::ValidationFailed { .. } | Self::Database { .. } => {}
        }
        self
    }

    // ============================================================================
    // Rendering
    // ============================================================================

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } | Self::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Database { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotImplemented { .. } => StatusCode::NOT_IMPLEMENTED,
        }
    }

    /// The sanitized text shown to users. Validation errors summarize here and
    /// render their field map in the envelope.
    fn user_message(&self) -> String {
        match self {
            Self::BadRequest { message }
            | Self::Unauthorized { message }
            | Self::Forbidden { message }
            | Self::NotFound { message }
            | Self::MethodNotAllowed { message }
            | Self::Conflict { message }
            | Self::Internal { message, .. }
            | Self::NotImplemented { message } => message.clone(),
            Self::ValidationFailed { errors } => errors.to_string(),
            Self::Database { .. } => INTERNAL.to_string(),
        }
    }

    fn messages(&self) -> ErrorMessages<'_> {
        match self {
            Self::ValidationFailed { errors } => ErrorMessages::Fields(errors),
            _ => ErrorMessages::Text(self.user_message()),
        }
    }

    /// Log internal error details (not sent to user)
    fn log_internal(&self) {
        match self {
            Self::Database { internal } => {
                tracing::error!(error = ?internal, "Database error occurred");
            }
            Self::Internal {
                internal: Some(details),
                ..
            } => {
                tracing::error!(details = %details, "Internal error occurred");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "API error"
                );
            }
        }
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum ErrorMessages<'a> {
    Text(String),
    Fields(&'a ValidationErrors),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    messages: ErrorMessages<'a>,
    status_code: u16,
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: ErrorBody<'a>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();

        let status = self.status_code();
        let envelope = ErrorEnvelope {
            error: ErrorBody {
                messages: self.messages(),
                status_code: status.as_u16(),
            },
        };

        (status, Json(envelope)).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// Conversions
// ============================================================================

/// Convert `SeaORM` `DbErr` to `ApiError`
///
/// - `DbErr::RecordNotFound` → 404
/// - unique constraint violation → 409
/// - everything else → 500, logged internally
impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        if matches!(err, DbErr::RecordNotFound(_)) {
            return Self::not_found();
        }
        if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
            return Self::conflict();
        }
        Self::database(err)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::validation_failed(errors)
    }
}
