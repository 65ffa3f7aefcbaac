//! Error types shared by the services and their HTTP mapping.
//!
//! Services return `Result<_, AppError>`; the only place an error becomes a
//! status code is `AppError::into_response`.

use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

/// Failures of the record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store call timed out")]
    Timeout,

    /// A unique constraint was violated (e.g. two registrations racing on one email).
    #[error("duplicate value: {0}")]
    Duplicate(String),

    #[error("could not decode stored record: {0}")]
    Decode(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut => StoreError::Timeout,
            sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
                StoreError::Unavailable(e.to_string())
            }
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                StoreError::Duplicate(db.message().to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

/// Reasons a request could not be authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Authentication token required")]
    MissingToken,

    /// Malformed token or signature mismatch.
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    Expired,

    /// The token was valid but its user no longer exists.
    #[error("Invalid token: user not found")]
    UserNotFound,

    /// Login failure. Deliberately identical for unknown email and wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,
}

impl AuthError {
    fn code(self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::InvalidToken => "invalid_token",
            AuthError::Expired => "token_expired",
            AuthError::UserNotFound => "user_not_found",
            AuthError::InvalidCredentials => "invalid_credentials",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A request field failed validation. `field` names the offending input.
    #[error("{message}")]
    Validation { field: &'static str, message: String },

    /// The body could not be parsed into the expected request type.
    #[error("{0}")]
    InvalidBody(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Resource absent, or owned by someone else.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// No route matches the request path.
    #[error("Route {0} not found")]
    NoRoute(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, field) = match &self {
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                message.clone(),
                Some(*field),
            ),
            AppError::InvalidBody(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_body", msg.clone(), None)
            }
            AppError::Auth(e) => (StatusCode::UNAUTHORIZED, e.code(), e.to_string(), None),
            AppError::NotFound(_) | AppError::NoRoute(_) => {
                (StatusCode::NOT_FOUND, "not_found", self.to_string(), None)
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            AppError::Store(StoreError::Unavailable(_) | StoreError::Timeout) => {
                error!(error = %self, "store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "store_unavailable",
                    "The service is temporarily unavailable".to_string(),
                    None,
                )
            }
            AppError::Store(_) | AppError::Internal(_) => {
                error!(error = ?self, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        if status.is_client_error() {
            warn!(%status, code, %message, "request rejected");
        }

        let mut error = json!({ "code": code, "message": message });
        if let Some(field) = field {
            error["field"] = json!(field);
        }
        (status, Json(json!({ "error": error }))).into_response()
    }
}

/// `Json` extractor whose rejections render as `AppError::InvalidBody`.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidBody(rejection.body_text())
    }
}
