//! Error types for the bootstrap server

use crate::builder::BuildError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use kfctl_types::ErrorBody;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Construction and lifecycle errors
#[derive(Debug, Error)]
pub enum ServerError {
    /// Working directory missing, not a directory, or read-only
    #[error("Unusable working directory {path}: {reason}")]
    WorkDir { path: PathBuf, reason: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Could not bind the listener
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Accept loop failed
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),

    /// `register_endpoints` was already called
    #[error("Endpoints are already registered")]
    EndpointsRegistered,

    /// The server is already serving
    #[error("Server is already serving")]
    AlreadyServing,

    /// The readiness wait ran out of budget
    #[error("Server did not start listening within {waited_ms}ms")]
    NotReady { waited_ms: u64 },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors answered to clients as structured bodies
#[derive(Debug, Error)]
pub enum ApiError {
    /// Undecodable or invalid payload
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No project in the deployment spec
    #[error("Missing project: {0}")]
    MissingProject(String),

    /// No usable credentials
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// Unknown route
    #[error("Not found: {0}")]
    NotFound(String),

    /// The builder did not finish within the request timeout
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status and stable code
    pub fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT"),
            ApiError::MissingProject(_) => (StatusCode::BAD_REQUEST, "MISSING_PROJECT"),
            ApiError::MissingCredentials(_) => (StatusCode::UNAUTHORIZED, "MISSING_CREDENTIALS"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::DeadlineExceeded(_) => (StatusCode::GATEWAY_TIMEOUT, "DEADLINE_EXCEEDED"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        }
    }
}

impl From<BuildError> for ApiError {
    fn from(err: BuildError) -> Self {
        match err {
            BuildError::MissingProject => ApiError::MissingProject(err.to_string()),
            BuildError::MissingCredentials(_) => ApiError::MissingCredentials(err.to_string()),
            BuildError::InvalidSpec(_) => ApiError::BadRequest(err.to_string()),
            BuildError::Io(_) | BuildError::Encode(_) | BuildError::Internal(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.classify();

        if status.is_server_error() {
            tracing::error!(code, error = %self, "Request failed");
        } else {
            tracing::debug!(code, error = %self, "Request rejected");
        }

        let body = ErrorBody {
            code: code.to_string(),
            message: self.to_string(),
            status: status.as_u16(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for server operations
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(
            ApiError::BadRequest("x".to_string()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::MissingCredentials("x".to_string())
                .into_response()
                .status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::DeadlineExceeded("x".to_string())
                .into_response()
                .status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_build_error_mapping() {
        assert_eq!(
            ApiError::from(BuildError::MissingProject).classify().1,
            "MISSING_PROJECT"
        );
        assert_eq!(
            ApiError::from(BuildError::MissingCredentials("none".to_string()))
                .classify()
                .1,
            "MISSING_CREDENTIALS"
        );
        assert_eq!(
            ApiError::from(BuildError::InvalidSpec("bad".to_string()))
                .classify()
                .0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(BuildError::Internal("boom".to_string()))
                .classify()
                .0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
