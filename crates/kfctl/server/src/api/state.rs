//! Application state for API handlers

use crate::builder::{BuildRequest, DeploymentBuilder};
use kfctl_auth::{StaticTokenSource, Token, TokenSource};
use kfctl_types::{KfDef, RegistryConfig, GCP_ACCESS_TOKEN_NAME};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Shared application state, fixed when serving starts
#[derive(Clone)]
pub struct AppState {
    /// Server-owned working directory
    pub work_dir: PathBuf,

    /// Registries passed through to the builder
    pub registries: Arc<[RegistryConfig]>,

    /// Credential source for requests that carry no token of their own
    pub token_source: Arc<dyn TokenSource>,

    /// Deployment builder
    pub builder: Arc<dyn DeploymentBuilder>,

    /// Serializes builder calls; they share `work_dir`
    pub build_lock: Arc<Mutex<()>>,

    /// Bound on one create call
    pub request_timeout: Duration,

    pub github_token: Option<String>,

    pub in_cluster: bool,

    /// Server version
    pub version: String,
}

impl AppState {
    pub fn new(
        work_dir: PathBuf,
        registries: Arc<[RegistryConfig]>,
        token_source: Arc<dyn TokenSource>,
        builder: Arc<dyn DeploymentBuilder>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            work_dir,
            registries,
            token_source,
            builder,
            build_lock: Arc::new(Mutex::new(())),
            request_timeout,
            github_token: None,
            in_cluster: false,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Assemble the builder input for one request.
    ///
    /// A `gcp-access-token` literal in the request is scoped to that request;
    /// the server's token source is never modified by a caller.
    pub fn build_request(&self, kfdef: KfDef) -> BuildRequest {
        let token_source: Arc<dyn TokenSource> =
            match kfdef.spec.literal_secret(GCP_ACCESS_TOKEN_NAME) {
                Some(value) => Arc::new(StaticTokenSource::with_token(Token::bearer(value))),
                None => self.token_source.clone(),
            };

        BuildRequest {
            kfdef,
            registries: self.registries.clone(),
            work_dir: self.work_dir.clone(),
            token_source,
            github_token: self.github_token.clone(),
            in_cluster: self.in_cluster,
        }
    }
}
