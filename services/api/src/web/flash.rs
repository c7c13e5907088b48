//! services/api/src/web/flash.rs
//!
//! User-facing messages and the request-boundary error type.
//!
//! Every handler returns `Result<_, WebError>`. The error kind is turned into a
//! status code and a flash message in exactly one place, `IntoResponse` below,
//! which is also where unexpected faults get logged.

use axum::{
    extract::rejection::FormRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pdf_qa_core::{IndexError, PortError};
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

pub const UNEXPECTED_MESSAGE: &str = "An unexpected error occurred. Please try again later.";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password";
pub const NOT_READY_MESSAGE: &str = "Please initialize the document embeddings first.";
pub const MISSING_FIELDS_MESSAGE: &str = "Please fill in all required fields.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FlashCategory {
    Success,
    Warning,
    Danger,
}

/// A short message for the user, tagged with how it should be shown.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Flash {
    pub category: FlashCategory,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            category: FlashCategory::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            category: FlashCategory::Warning,
            message: message.into(),
        }
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self {
            category: FlashCategory::Danger,
            message: message.into(),
        }
    }
}

/// The body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct FlashBody {
    pub flash: Flash,
}

//=========================================================================================
// Request-boundary Error
//=========================================================================================

#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error("Username or email already exists")]
    DuplicateIdentity,
    #[error("{0}")]
    InvalidInput(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Not enough documents: found {found}, need {required}")]
    InsufficientCorpus { found: usize, required: usize },
    #[error("Index not ready")]
    NotReady,
    #[error("Unexpected: {0}")]
    Unexpected(String),
}

impl WebError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebError::DuplicateIdentity => StatusCode::CONFLICT,
            WebError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            WebError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            WebError::InsufficientCorpus { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            WebError::NotReady => StatusCode::CONFLICT,
            WebError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn flash(&self) -> Flash {
        match self {
            WebError::DuplicateIdentity => Flash::warning("Username or email already exists"),
            WebError::InvalidInput(message) => Flash::warning(message.clone()),
            WebError::InvalidCredentials => Flash::warning(INVALID_CREDENTIALS_MESSAGE),
            WebError::InsufficientCorpus { required, .. } => Flash::warning(format!(
                "Not enough documents loaded. Please ensure there are at least {} documents.",
                required
            )),
            WebError::NotReady => Flash::warning(NOT_READY_MESSAGE),
            WebError::Unexpected(_) => Flash::danger(UNEXPECTED_MESSAGE),
        }
    }
}

impl From<PortError> for WebError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::Conflict(_) => WebError::DuplicateIdentity,
            other => WebError::Unexpected(other.to_string()),
        }
    }
}

impl From<IndexError> for WebError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::InsufficientCorpus { found, required } => {
                WebError::InsufficientCorpus { found, required }
            }
            IndexError::NotReady => WebError::NotReady,
            IndexError::Port(port) => port.into(),
        }
    }
}

/// A form body that is missing fields or cannot be decoded.
impl From<FormRejection> for WebError {
    fn from(rejection: FormRejection) -> Self {
        warn!(status = %rejection.status(), detail = %rejection.body_text(), "Malformed form body");
        WebError::InvalidInput(MISSING_FIELDS_MESSAGE.to_string())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match &self {
            WebError::Unexpected(detail) => error!(detail = %detail, "Request failed"),
            other => warn!(error = %other, "Request rejected"),
        }
        (self.status(), Json(FlashBody { flash: self.flash() })).into_response()
    }
}
