//! kfctl Types - Deployment definitions for the bootstrap service
//!
//! These are the values that travel between the bootstrap server and its
//! clients. The server never interprets them beyond routing and rejecting;
//! the deployment builder behind it does the real work.
//!
//! ## Key Concepts
//!
//! - **KfDef**: declarative description of a cluster deployment
//! - **Secret**: named credential reference embedded in a `KfDef`
//! - **SecretSource**: where a secret's value comes from (exactly one source)
//! - **RegistryConfig**: package registry passed through to the builder
//! - **ErrorBody**: structured error returned by the server on failure

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod api;
pub mod error;
pub mod kfdef;
pub mod registry;
pub mod secret;

pub use api::{
    ErrorBody, HealthResponse, CREATE_DEPLOYMENT_PATH, GCP_ACCESS_TOKEN_NAME, HEALTH_PATH,
};
pub use error::ValidationError;
pub use kfdef::{ConditionType, KfDef, KfDefCondition, KfDefSpec, KfDefStatus, ObjectMeta};
pub use registry::RegistryConfig;
pub use secret::{EnvSource, LiteralSource, Secret, SecretSource};
