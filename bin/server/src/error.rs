//! Error types for the server.
//!
//! [`ApiError`] is what handlers return; it renders as a status code and an
//! `{"error": "..."}` body. [`ServerError`] covers startup failures and is
//! reported through rootcause.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use resume_review_workflow::{EngineError, WaitpointError};
use serde_json::json;
use std::fmt;

/// Errors returned from API handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The request body or path could not be used.
    BadRequest { message: String },
    /// `/api/workflows` was asked for a workflow it does not know.
    UnknownWorkflow { workflow: String },
    /// The approval token could not be resolved.
    Waitpoint(WaitpointError),
    /// The engine refused to start or resume a run.
    Engine(EngineError),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } | Self::UnknownWorkflow { .. } => StatusCode::BAD_REQUEST,
            Self::Waitpoint(e) => match e {
                WaitpointError::NotFound { .. } => StatusCode::NOT_FOUND,
                WaitpointError::AlreadyResolved { .. } | WaitpointError::DuplicateToken { .. } => {
                    StatusCode::CONFLICT
                }
                WaitpointError::Expired { .. } | WaitpointError::Abandoned { .. } => {
                    StatusCode::GONE
                }
            },
            Self::Engine(e) => match e {
                EngineError::RunNotFound { .. } => StatusCode::NOT_FOUND,
                EngineError::RunAlreadyTerminal { .. } | EngineError::RunInProgress { .. } => {
                    StatusCode::CONFLICT
                }
                EngineError::Journal(_) | EngineError::TaskFailed { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRequest { message } => write!(f, "{message}"),
            Self::UnknownWorkflow { .. } => write!(f, "Unknown workflow type"),
            Self::Waitpoint(e) => write!(f, "{e}"),
            Self::Engine(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<WaitpointError> for ApiError {
    fn from(e: WaitpointError) -> Self {
        Self::Waitpoint(e)
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        Self::Engine(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Errors that stop the server from starting.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration could not be loaded or is inconsistent.
    Config { details: String },
    /// The step journal could not be opened.
    Journal { details: String },
    /// The listener could not be bound or stopped serving.
    Serve { details: String },
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "invalid configuration: {details}"),
            Self::Journal { details } => write!(f, "failed to open step journal: {details}"),
            Self::Serve { details } => write!(f, "server error: {details}"),
        }
    }
}

impl std::error::Error for ServerError {}
