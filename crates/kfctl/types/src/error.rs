//! Validation errors for deployment definitions

use thiserror::Error;

/// Reasons a `KfDef` is rejected before it reaches the builder
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Two secrets share a name
    #[error("duplicate secret name: {0}")]
    DuplicateSecret(String),

    /// A secret has an empty name
    #[error("secret at position {0} has an empty name")]
    EmptySecretName(usize),

    /// An env-backed secret points at an unset variable
    #[error("environment variable {0} is not set")]
    MissingEnv(String),

    /// The deployment name is not a valid DNS-1123 label
    #[error("invalid deployment name {0:?}: must be lowercase alphanumerics or '-', at most 63 characters")]
    InvalidName(String),
}
