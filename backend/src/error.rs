use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::fabric::LedgerError;
use crate::persistence::StorageError;

/// Failures of the registry itself: lookups, duplicates, lifecycle rules.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{kind} {id} does not exist")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} {id} already exists")]
    AlreadyExists { kind: &'static str, id: String },

    #[error("cannot {action} {kind} {id} while it is {current}")]
    InvalidTransition {
        kind: &'static str,
        id: String,
        current: String,
        action: &'static str,
    },

    #[error("{0}")]
    Validation(String),

    #[error("invalid email or password")]
    InvalidCredentials,
}

impl RegistryError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        RegistryError::NotFound { kind, id: id.into() }
    }

    pub fn already_exists(kind: &'static str, id: impl Into<String>) -> Self {
        RegistryError::AlreadyExists { kind, id: id.into() }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Unauthorized(String),

    #[error("malformed request: {0}")]
    BadRequest(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Registry(RegistryError::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND")
            }
            ApiError::Registry(RegistryError::AlreadyExists { .. })
            | ApiError::Registry(RegistryError::InvalidTransition { .. }) => {
                (StatusCode::CONFLICT, "CONFLICT")
            }
            ApiError::Registry(RegistryError::Validation(_)) | ApiError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            ApiError::Registry(RegistryError::InvalidCredentials) | ApiError::Unauthorized(_) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED")
            }
            ApiError::Ledger(_) => (StatusCode::BAD_GATEWAY, "LEDGER_ERROR"),
            ApiError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            log::error!("{}", self);
        } else {
            log::warn!("{}", self);
        }
        let body = json!({
            "success": false,
            "error": self.to_string(),
            "code": code,
        });
        (status, Json(body)).into_response()
    }
}
