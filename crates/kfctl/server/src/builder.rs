//! Deployment builder seam
//!
//! The server decodes and validates requests; turning a `KfDef` into cluster
//! resources is the builder's job. [`AppDirBuilder`] is the default: it
//! checks that a project and credentials are present and lays down the app
//! directory, leaving resource creation to tooling that reads it.

use async_trait::async_trait;
use kfctl_auth::TokenSource;
use kfctl_types::{ConditionType, KfDef, KfDefCondition, RegistryConfig, SecretSource};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// File the app definition is written to inside its directory
pub const APP_FILE_NAME: &str = "app.yaml";

/// Everything a builder gets for one request
#[derive(Clone)]
pub struct BuildRequest {
    /// Decoded and validated definition
    pub kfdef: KfDef,

    /// Registries configured on the server
    pub registries: Arc<[RegistryConfig]>,

    /// Server-owned working directory
    pub work_dir: PathBuf,

    /// The request's own `gcp-access-token` if it carried one, else the server's source
    pub token_source: Arc<dyn TokenSource>,

    /// Token for fetching registries from GitHub
    pub github_token: Option<String>,

    /// Whether the server runs inside the target cluster
    pub in_cluster: bool,
}

/// Builder failures, classified for the wire
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("spec.project is required to create a deployment")]
    MissingProject,

    #[error("no usable credentials: {0}")]
    MissingCredentials(String),

    #[error("invalid deployment spec: {0}")]
    InvalidSpec(String),

    #[error("failed to write app directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode app definition: {0}")]
    Encode(#[from] serde_yaml::Error),

    #[error("{0}")]
    Internal(String),
}

/// Creates a deployment from a definition.
///
/// The server serializes calls, so implementations need not be reentrant.
#[async_trait]
pub trait DeploymentBuilder: Send + Sync {
    async fn build(&self, request: &BuildRequest) -> Result<KfDef, BuildError>;
}

/// Default builder: validates prerequisites and writes `<work_dir>/<name>/app.yaml`
#[derive(Debug, Clone, Default)]
pub struct AppDirBuilder;

impl AppDirBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Definition as persisted: literal secret values never touch disk
    fn persisted(kfdef: &KfDef) -> KfDef {
        let mut stored = kfdef.clone();
        stored
            .spec
            .secrets
            .retain(|s| !matches!(s.secret_source, SecretSource::Literal(_)));
        stored
    }

    fn app_dir(work_dir: &Path, kfdef: &KfDef) -> Result<PathBuf, BuildError> {
        match kfdef.spec.app_dir.as_deref() {
            None | Some("") => Ok(work_dir.join(kfdef.app_name())),
            Some(dir) => {
                let relative = Path::new(dir);
                let escapes = relative.is_absolute()
                    || relative
                        .components()
                        .any(|c| !matches!(c, std::path::Component::Normal(_)));
                if escapes {
                    return Err(BuildError::InvalidSpec(format!(
                        "appDir {dir:?} must be a relative path inside the working directory"
                    )));
                }
                Ok(work_dir.join(relative))
            }
        }
    }
}

#[async_trait]
impl DeploymentBuilder for AppDirBuilder {
    async fn build(&self, request: &BuildRequest) -> Result<KfDef, BuildError> {
        let kfdef = &request.kfdef;

        let project = kfdef
            .spec
            .project
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or(BuildError::MissingProject)?;

        let token = request
            .token_source
            .token()
            .await
            .map_err(|e| BuildError::MissingCredentials(e.to_string()))?;

        let app_dir = Self::app_dir(&request.work_dir, kfdef)?;
        tokio::fs::create_dir_all(&app_dir).await?;

        let yaml = serde_yaml::to_string(&Self::persisted(kfdef))?;
        tokio::fs::write(app_dir.join(APP_FILE_NAME), yaml).await?;

        tracing::info!(
            app = kfdef.app_name(),
            project,
            app_dir = %app_dir.display(),
            registries = request.registries.len(),
            token_type = %token.token_type,
            "Created app directory"
        );

        let relative = app_dir.strip_prefix(&request.work_dir).unwrap_or(&app_dir);
        let mut created = kfdef.clone();
        created.spec.app_dir = Some(relative.display().to_string());
        created.set_condition(
            KfDefCondition::new(ConditionType::Available, true)
                .with_reason("AppCreated", format!("app written to {}", app_dir.display())),
        );
        Ok(created)
    }
}
