use axum::{
    Json,
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::password::PasswordError;
use crate::storage::UploadError;

const GENERIC_AUTH_FAILURE: &str = "Invalid credentials";
const GENERIC_INTERNAL_FAILURE: &str = "Internal server error";
const ALREADY_ASSOCIATED: &str = "Tag already associated with user";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("User already exists: {0}")]
    UserAlreadyExists(String),
    #[error("Tag already associated with user")]
    AlreadyAssociated,
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("User not found")]
    UserNotFound,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("Forbidden")]
    Forbidden,
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Password hashing failed: {0}")]
    PasswordHashingError(String),
    #[error("JWT creation failed: {0}")]
    TokenCreationError(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_)
            | AppError::UserAlreadyExists(_)
            | AppError::AlreadyAssociated
            | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::UserNotFound
            | AppError::InvalidCredentials
            | AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PasswordHashingError(_)
            | AppError::TokenCreationError(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match self {
            AppError::InvalidInput(msg)
            | AppError::UserAlreadyExists(msg)
            | AppError::Conflict(msg)
            | AppError::NotFound(msg) => msg,
            AppError::AlreadyAssociated => ALREADY_ASSOCIATED.to_string(),
            AppError::UserNotFound | AppError::InvalidCredentials => {
                GENERIC_AUTH_FAILURE.to_string()
            }
            AppError::Unauthenticated(reason) => {
                warn!(%reason, "Rejected unauthenticated request.");
                "Unauthorized".to_string()
            }
            AppError::Forbidden => "Forbidden".to_string(),
            internal => {
                error!(error = %internal, "Request failed with an internal error.");
                GENERIC_INTERNAL_FAILURE.to_string()
            }
        };
        (status, Json(serde_json::json!({ "error": error_message }))).into_response()
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Hashing(msg) => AppError::PasswordHashingError(msg),
            PasswordError::MalformedDigest(msg) => {
                AppError::InternalServerError(format!("stored password digest is malformed: {msg}"))
            }
        }
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::NoFile | UploadError::BadExtension => AppError::InvalidInput(err.to_string()),
            UploadError::StorageFailure(source) => {
                AppError::InternalServerError(format!("failed to save image: {source}"))
            }
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::InternalServerError(format!("background task failed: {err}"))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}
