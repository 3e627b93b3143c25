//! kfctl bootstrap server
//!
//! Long-lived HTTP service that accepts a `KfDef` and hands it to a
//! deployment builder. The pieces:
//! - [`Server`]: lifecycle (bind, publish address, serve, shut down)
//! - [`api`]: routes and request handlers
//! - [`builder`]: the deployment builder seam and its default implementation
//! - [`config`]: layered configuration for the `kfctld` binary
//!
//! ```no_run
//! use kfctl_auth::FakeTokenSource;
//! use kfctl_backoff::ExponentialBackoff;
//! use kfctl_server::Server;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = Server::new("/tmp/kfctl", Vec::new(), None, false)?;
//! server.set_token_source(Arc::new(FakeTokenSource::new()));
//! server.register_endpoints()?;
//!
//! let background = server.clone();
//! tokio::spawn(async move { background.start_http(0).await });
//!
//! let addr = server.wait_ready(&ExponentialBackoff::default()).await?;
//! println!("listening on {addr}");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod api;
pub mod builder;
pub mod config;
pub mod error;
pub mod server;

pub use builder::{AppDirBuilder, BuildError, BuildRequest, DeploymentBuilder, APP_FILE_NAME};
pub use config::ServerConfig;
pub use error::{ApiError, ApiResult, ServerError, ServerResult};
pub use server::Server;
