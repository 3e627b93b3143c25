//! HTTP client for the kfctl bootstrap server

use crate::context::CallContext;
use crate::error::{ClientError, ClientResult};
use kfctl_auth::TokenSource;
use kfctl_backoff::{retry_notify, ExponentialBackoff};
use kfctl_types::{ErrorBody, HealthResponse, KfDef, CREATE_DEPLOYMENT_PATH, HEALTH_PATH};
use reqwest::{header::AUTHORIZATION, Client, RequestBuilder, Url};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Bound on establishing a connection; the call context bounds the rest
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-attempt bound while waiting for the server to become ready
const HEALTH_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for a kfctl bootstrap server
#[derive(Clone)]
pub struct KfctlClient {
    client: Client,
    base_url: String,
    token_source: Option<Arc<dyn TokenSource>>,
}

impl fmt::Debug for KfctlClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KfctlClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token_source.is_some())
            .finish()
    }
}

impl KfctlClient {
    /// Create a client for `address`.
    ///
    /// Accepts `host:port` (as published by the server) or an `http://` /
    /// `https://` URL. No connection is made here.
    pub fn new(address: &str) -> ClientResult<Self> {
        let base_url = parse_base_url(address)?;
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url,
            token_source: None,
        })
    }

    /// Send `Authorization` on every request, taken from `token_source`.
    ///
    /// The client's source is its own; it is never shared with the server.
    pub fn with_token_source(mut self, token_source: Arc<dyn TokenSource>) -> Self {
        self.token_source = Some(token_source);
        self
    }

    /// Base URL requests are sent to, without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask the server to create a deployment from `kfdef`
    pub async fn create_deployment(&self, ctx: &CallContext, kfdef: &KfDef) -> ClientResult<KfDef> {
        tracing::debug!(
            app = kfdef.app_name(),
            server = %self.base_url,
            "Sending create deployment request"
        );
        ctx.run(self.post(CREATE_DEPLOYMENT_PATH, kfdef)).await
    }

    /// Check server health
    pub async fn health_check(&self, ctx: &CallContext) -> ClientResult<HealthResponse> {
        ctx.run(self.get(HEALTH_PATH)).await
    }

    /// Poll [`KfctlClient::health_check`] under `policy` until the server answers.
    pub async fn wait_ready(&self, policy: &ExponentialBackoff) -> ClientResult<HealthResponse> {
        let started = std::time::Instant::now();
        retry_notify(
            policy,
            || async {
                let ctx = CallContext::with_timeout(HEALTH_ATTEMPT_TIMEOUT);
                self.health_check(&ctx).await
            },
            |err, delay| {
                tracing::warn!(
                    error = %err,
                    delay_ms = delay.as_millis() as u64,
                    "Server not ready, retrying"
                );
            },
        )
        .await
        .map_err(|err| {
            tracing::error!(error = %err, server = %self.base_url, "Server never became ready");
            ClientError::NotReady {
                waited_ms: started.elapsed().as_millis() as u64,
                last_error: Box::new(err),
            }
        })
    }

    // ========== Helper methods ==========

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.authorize(self.client.get(&url)).await?.send().await?;
        self.handle_response(response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> ClientResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let request = self.authorize(self.client.post(&url).json(body)).await?;
        let response = request.send().await?;
        self.handle_response(response).await
    }

    async fn authorize(&self, request: RequestBuilder) -> ClientResult<RequestBuilder> {
        match &self.token_source {
            Some(source) => {
                let token = source.token().await?;
                Ok(request.header(AUTHORIZATION, token.authorization()))
            }
            None => Ok(request),
        }
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> ClientResult<T> {
        let status = response.status();
        let body = response.bytes().await?;

        if status.is_success() {
            return serde_json::from_slice(&body).map_err(|e| ClientError::Decode {
                status: status.as_u16(),
                reason: e.to_string(),
            });
        }

        match serde_json::from_slice::<ErrorBody>(&body) {
            Ok(error) => Err(ClientError::Server {
                status: status.as_u16(),
                code: error.code,
                message: error.message,
            }),
            Err(e) => Err(ClientError::Decode {
                status: status.as_u16(),
                reason: format!("{}: {}", e, String::from_utf8_lossy(&body)),
            }),
        }
    }
}

fn parse_base_url(address: &str) -> ClientResult<String> {
    let invalid = |reason: &str| ClientError::InvalidAddress {
        address: address.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(invalid("empty address"));
    }

    let has_scheme = trimmed.contains("://");
    let candidate = if has_scheme {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };

    let url = Url::parse(&candidate).map_err(|e| invalid(&e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host"));
    }
    if !has_scheme && !has_port(trimmed) {
        return Err(invalid("expected host:port"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("query and fragment are not allowed"));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

fn has_port(address: &str) -> bool {
    address
        .rsplit_once(':')
        .map_or(false, |(_, port)| port.parse::<u16>().is_ok())
}
