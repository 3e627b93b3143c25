//! Package registry configuration
//!
//! The server receives these at construction and forwards them to the
//! deployment builder untouched.

use serde::{Deserialize, Serialize};

/// A package registry the deployment builder may pull from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryConfig {
    pub name: String,

    #[serde(default)]
    pub repo: String,

    #[serde(default)]
    pub version: String,

    /// Path inside the repository
    #[serde(default)]
    pub path: String,

    /// Resolved location, e.g. a local checkout or archive URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reg_uri: Option<String>,
}

impl RegistryConfig {
    pub fn new(name: impl Into<String>, repo: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            repo: repo.into(),
            version: version.into(),
            ..Default::default()
        }
    }
}
