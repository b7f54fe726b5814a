//! Error taxonomy shared by the portal's components and its HTTP surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::transport::http::types::ErrorResponse;

#[derive(Error, Debug)]
pub enum PortalError {
    /// Missing salt or credentials. The operation is never attempted.
    #[error("Server configuration error: {0}")]
    Configuration(String),

    /// Bad caller input, detected before any side effect.
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<String>,
    },

    #[error("{0}")]
    NotFound(String),

    /// Retrieved data is insufficient to produce a trustworthy result.
    #[error("{0}")]
    Aggregation(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    /// Storage account or space could not be prepared.
    #[error("{message}")]
    SpaceSetup {
        message: String,
        details: Option<String>,
    },

    /// A ledger or storage network call failed.
    #[error("{message}")]
    Upstream {
        message: String,
        details: Option<String>,
    },
}

impl PortalError {
    pub fn validation(message: impl Into<String>) -> Self {
        PortalError::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn upstream(message: impl Into<String>, cause: &anyhow::Error) -> Self {
        PortalError::Upstream {
            message: message.into(),
            details: Some(format!("{:#}", cause)),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            PortalError::Validation { .. } => StatusCode::BAD_REQUEST,
            PortalError::NotFound(_) => StatusCode::NOT_FOUND,
            PortalError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            PortalError::Configuration(_)
            | PortalError::Aggregation(_)
            | PortalError::SpaceSetup { .. }
            | PortalError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Diagnostic detail, kept apart from the user-facing message.
    pub fn details(&self) -> Option<&str> {
        match self {
            PortalError::Validation { details, .. }
            | PortalError::SpaceSetup { details, .. }
            | PortalError::Upstream { details, .. } => details.as_deref(),
            _ => None,
        }
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), details = ?self.details(), "{}", self);
        } else {
            tracing::debug!(status = status.as_u16(), "{}", self);
        }
        let body = ErrorResponse {
            error: self.to_string(),
            details: self.details().map(str::to_string),
        };
        (status, Json(body)).into_response()
    }
}

pub type PortalResult<T> = Result<T, PortalError>;
