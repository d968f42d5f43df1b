//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Problems found while validating or resolving list configuration. Never retried.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} '{id}' on list {list}")]
    MissingReference {
        list: String,
        kind: &'static str,
        id: String,
    },
    #[error("list {list}: unsupported HTTP verb '{verb}' for {operation}")]
    UnknownVerb {
        list: String,
        operation: &'static str,
        verb: String,
    },
    #[error("list {list}: {operation} endpoint is required")]
    MissingEndpoint { list: String, operation: &'static str },
    #[error("duplicate list key: {0}")]
    DuplicateKey(String),
    #[error("duplicate list path: {0}")]
    DuplicatePath(String),
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

/// Raised by response normalizers when a backend payload does not have the expected shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct NormalizeError(pub String);

impl NormalizeError {
    pub fn new(msg: impl Into<String>) -> Self {
        NormalizeError(msg.into())
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("backend: {0}")]
    Backend(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("normalize: {0}")]
    Normalize(#[from] NormalizeError),
    #[error("validation: {0}")]
    Validation(String),
    #[error("not allowed: {0}")]
    Policy(String),
    #[error("invalid csrf token")]
    Csrf,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("request cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return AppError::Backend(format!("timed out: {}", e));
        }
        match e.status() {
            Some(status) => AppError::Backend(format!("status {}: {}", status.as_u16(), e)),
            None => AppError::Backend(e.to_string()),
        }
    }
}

impl AppError {
    /// True for guard-rail rejections that happen before any store or network call.
    pub fn is_policy(&self) -> bool {
        matches!(self, AppError::Policy(_) | AppError::Csrf)
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::Backend(_) => (StatusCode::BAD_GATEWAY, "backend_error"),
            AppError::Db(e) => {
                if let sqlx::Error::RowNotFound = e {
                    (StatusCode::NOT_FOUND, "not_found")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                }
            }
            AppError::Normalize(_) => (StatusCode::BAD_GATEWAY, "normalize_error"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AppError::Policy(_) => (StatusCode::FORBIDDEN, "not_allowed"),
            AppError::Csrf => (StatusCode::FORBIDDEN, "invalid_csrf"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Cancelled => (StatusCode::REQUEST_TIMEOUT, "cancelled"),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    /// Error response carrying extra context in `error.details`.
    pub fn with_details(self, details: serde_json::Value) -> Response {
        self.render(Some(details))
    }

    fn render(self, details: Option<serde_json::Value>) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(code, error = %self, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.render(None)
    }
}
