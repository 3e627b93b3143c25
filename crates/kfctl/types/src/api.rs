//! Wire contract between the bootstrap server and client
//!
//! Paths and bodies live here so that a server and client built from the
//! same tree always agree.

use serde::{Deserialize, Serialize};

/// Route for the create deployment call
pub const CREATE_DEPLOYMENT_PATH: &str = "/kfctl/apps/v1alpha2/create";

/// Liveness route
pub const HEALTH_PATH: &str = "/healthz";

/// Secret name carrying a GCP access token
pub const GCP_ACCESS_TOKEN_NAME: &str = "gcp-access-token";

/// Error response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable machine-readable classification, e.g. `MISSING_PROJECT`
    pub code: String,

    /// Human-readable message
    pub message: String,

    /// HTTP status the server answered with
    pub status: u16,
}

/// Health check response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_round_trip() {
        let body = ErrorBody {
            code: "MISSING_PROJECT".to_string(),
            message: "spec.project is required".to_string(),
            status: 400,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(serde_json::from_str::<ErrorBody>(&json).unwrap(), body);
    }
}
