//! Client for the kfctl bootstrap server
//!
//! ```no_run
//! use kfctl_client::{CallContext, KfctlClient};
//! use kfctl_types::{KfDef, KfDefSpec, Secret};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), kfctl_client::ClientError> {
//! let client = KfctlClient::new("127.0.0.1:8080")?;
//!
//! let kfdef = KfDef::new(
//!     "my-app",
//!     KfDefSpec {
//!         project: Some("my-project".to_string()),
//!         secrets: vec![Secret::literal("gcp-access-token", "ya29.token")],
//!         ..Default::default()
//!     },
//! );
//!
//! let ctx = CallContext::with_timeout(Duration::from_secs(600));
//! let created = client.create_deployment(&ctx, &kfdef).await?;
//! println!("created {}", created.app_name());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

mod client;
mod context;
mod error;

pub use client::{KfctlClient, DEFAULT_CONNECT_TIMEOUT};
pub use context::CallContext;
pub use error::{ClientError, ClientResult};
