use crate::services::{
    auth::AuthError,
    collection_service::CollectionError,
    ingest_service::{ErrorKind, IngestError},
};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = self.status.as_u16(), "{}", self.message);
        }

        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string())
    }
}

impl From<CollectionError> for AppError {
    fn from(err: CollectionError) -> Self {
        match err {
            CollectionError::NotFound | CollectionError::ImageNotFound => {
                AppError::not_found(err.to_string())
            }
            CollectionError::Validation(msg) => AppError::bad_request(msg),
            CollectionError::Io(_) | CollectionError::Repository(_) => {
                AppError::internal(err.to_string())
            }
        }
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        let status = match err.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Validation | ErrorKind::ArchiveInvalid => StatusCode::BAD_REQUEST,
            ErrorKind::StorageIo | ErrorKind::PersistenceFailure => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        AppError::new(status, err.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::InvalidAuth(_) => {
                AppError::unauthorized(err.to_string())
            }
            AuthError::Token(_) => AppError::internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::archive::ArchiveError;

    #[test]
    fn ingest_kinds_map_to_statuses() {
        let not_found: AppError = IngestError::CollectionNotFound("x".into()).into();
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);

        let invalid: AppError = IngestError::Archive(ArchiveError::Entry {
            name: "a.png".into(),
            reason: "bad crc".into(),
        })
        .into();
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

        let io: AppError = IngestError::Directory(std::io::Error::other("disk full")).into();
        assert_eq!(io.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn collection_errors_map_to_statuses() {
        let err: AppError = CollectionError::NotFound.into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "collection not found");

        let err: AppError = CollectionError::Validation("title is required".into()).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
