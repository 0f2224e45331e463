use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Why a request failed authentication.
///
/// The variants exist for diagnostics only: every one of them is rendered to
/// the client as the same `401 Unauthorized` body.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// No token was presented.
    #[error("no token presented")]
    NoToken,

    /// The token is malformed or its signature does not match.
    #[error("invalid token signature")]
    InvalidSignature,

    /// The token is authentic but its session no longer exists.
    #[error("session expired or revoked")]
    SessionExpiredOrRevoked,
}

/// Failures of the session store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No readable record exists for the identifier.
    #[error("session not found")]
    NotFound,

    /// The record exists but cannot be decoded.
    #[error("corrupt session record {id}: {reason}")]
    Corrupt { id: String, reason: String },

    /// A freshly generated identifier already has a record.
    #[error("session id collision: {0}")]
    Collision(String),

    /// The record could not be encoded.
    #[error("session serialization failed: {0}")]
    Serialization(String),

    /// An I/O error.
    #[error("session storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A database error.
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// A database pool error.
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// A session store error.
    #[error("Session store error: {0}")]
    Store(StoreError),

    /// An authentication error for a protected call.
    #[error("Unauthorized: {0}")]
    Auth(#[from] AuthError),

    /// Bad login credentials.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A resource that already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A missing or invalid configuration value.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An encryption error.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// A row that lacks an expected column.
    #[error("Missing data: {0}")]
    MissingData(String),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::Auth(AuthError::SessionExpiredOrRevoked),
            other => AppError::Store(other),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        AppError::Validation("Invalid or incomplete request body".to_string())
    }
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }

            AppError::Pool(ref e) => {
                tracing::error!("Pool error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }

            AppError::Store(ref e) => {
                tracing::error!("Session store error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }

            AppError::Auth(reason) => {
                tracing::warn!("Request rejected: {}", reason);
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            }

            AppError::Authentication(ref msg) => {
                tracing::warn!("Authentication failed: {}", msg);
                (StatusCode::UNAUTHORIZED, msg.clone())
            }

            AppError::Conflict(ref msg) => {
                tracing::debug!("Conflict: {}", msg);
                (StatusCode::CONFLICT, msg.clone())
            }

            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }

            AppError::Configuration(ref msg) => {
                tracing::error!("Configuration error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }

            AppError::Encryption(ref msg) => {
                tracing::error!("Encryption error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Encryption error".to_string())
            }

            AppError::MissingData(ref column) => {
                tracing::error!("Missing column in row: {}", column);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = sonic_rs::to_string(&sonic_rs::json!({
            "error": message
        }))
        .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

        (
            status,
            [(http::header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_session_maps_to_unauthorized() {
        let err: AppError = StoreError::NotFound.into();
        assert!(matches!(err, AppError::Auth(AuthError::SessionExpiredOrRevoked)));
    }

    #[test]
    fn every_auth_reason_renders_the_same_response() {
        for reason in [
            AuthError::NoToken,
            AuthError::InvalidSignature,
            AuthError::SessionExpiredOrRevoked,
        ] {
            let response = AppError::Auth(reason).into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn unreadable_bodies_are_validation_errors() {
        let rejection =
            JsonRejection::from(axum::extract::rejection::MissingJsonContentType::default());
        let err: AppError = rejection.into();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn store_faults_are_server_errors() {
        let err: AppError = StoreError::Io(std::io::Error::other("disk full")).into();
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
