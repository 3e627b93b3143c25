//! Client error types

use kfctl_auth::AuthError;
use thiserror::Error;

/// Errors returned by [`crate::KfctlClient`]
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server address could not be turned into a base URL
    #[error("Invalid server address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// The call context was cancelled
    #[error("Call cancelled")]
    Cancelled,

    /// The call context's deadline passed
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// The client's token source could not supply credentials
    #[error("Credentials unavailable: {0}")]
    Credentials(#[from] AuthError),

    /// The request never produced a response
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server processed the request and rejected it
    #[error("Server error {status} {code}: {message}")]
    Server {
        status: u16,
        code: String,
        message: String,
    },

    /// The response body could not be decoded
    #[error("Undecodable response (HTTP {status}): {reason}")]
    Decode { status: u16, reason: String },

    /// The server did not answer health checks within the readiness budget
    #[error("Server not ready after {waited_ms}ms: {last_error}")]
    NotReady {
        waited_ms: u64,
        #[source]
        last_error: Box<ClientError>,
    },
}

impl ClientError {
    /// True when the server received the request and answered with an error.
    ///
    /// False for failures where the request may never have arrived.
    pub fn is_server_rejection(&self) -> bool {
        matches!(self, ClientError::Server { .. })
    }

    /// Stable error code, for server rejections
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Server { code, .. } => Some(code),
            _ => None,
        }
    }

    /// HTTP status, when a response was received
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Server { status, .. } | ClientError::Decode { status, .. } => {
                Some(*status)
            }
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_rejection() {
        let err = ClientError::Server {
            status: 400,
            code: "MISSING_PROJECT".to_string(),
            message: "spec.project is required".to_string(),
        };
        assert!(err.is_server_rejection());
        assert_eq!(err.code(), Some("MISSING_PROJECT"));
        assert_eq!(err.status(), Some(400));

        assert!(!ClientError::Cancelled.is_server_rejection());
        assert!(!ClientError::Decode {
            status: 200,
            reason: "eof".to_string()
        }
        .is_server_rejection());
        assert_eq!(ClientError::DeadlineExceeded.code(), None);
    }
}
