//! Token source implementations

use crate::error::AuthError;
use crate::token::Token;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};

/// Value returned by [`FakeTokenSource`]
pub const FAKE_TOKEN: &str = "fake-access-token";

/// Tokens this close to expiry are treated as expired
pub const DEFAULT_REFRESH_SKEW_SECS: i64 = 60;

/// Supplies a current access token.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Current token, fetching or renewing it if needed
    async fn token(&self) -> Result<Token, AuthError>;

    /// Replace the held token with a fresher one supplied by the caller
    async fn refresh(&self, token: Token) -> Result<(), AuthError>;
}

/// Backend a [`CachedTokenSource`] calls when its cache is stale.
///
/// Real implementations talk to a cloud identity provider.
#[async_trait]
pub trait TokenFetcher: Send + Sync {
    async fn fetch(&self) -> Result<Token, AuthError>;
}

/// Token source that always returns the same token
#[derive(Debug, Clone)]
pub struct FakeTokenSource {
    token: Token,
}

impl FakeTokenSource {
    pub fn new() -> Self {
        Self::with_value(FAKE_TOKEN)
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            token: Token::bearer(value),
        }
    }
}

impl Default for FakeTokenSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenSource for FakeTokenSource {
    async fn token(&self) -> Result<Token, AuthError> {
        Ok(self.token.clone())
    }

    async fn refresh(&self, _token: Token) -> Result<(), AuthError> {
        Ok(())
    }
}

/// Token source holding the last token it was given
#[derive(Debug, Default)]
pub struct StaticTokenSource {
    token: RwLock<Option<Token>>,
}

impl StaticTokenSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: Token) -> Self {
        Self {
            token: RwLock::new(Some(token)),
        }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn token(&self) -> Result<Token, AuthError> {
        let guard = self.token.read().await;
        let token = guard.as_ref().ok_or(AuthError::NoToken)?;
        match token.expiry {
            Some(expiry) if !token.is_valid_at(Utc::now()) => Err(AuthError::Expired(expiry)),
            _ if token.access_token.is_empty() => Err(AuthError::NoToken),
            _ => Ok(token.clone()),
        }
    }

    async fn refresh(&self, token: Token) -> Result<(), AuthError> {
        *self.token.write().await = Some(token);
        Ok(())
    }
}

/// Caches fetched tokens until they come within `refresh_skew` of expiry.
///
/// The cache lock is held across a fetch so concurrent callers wait for a
/// single fetch instead of racing the backend.
pub struct CachedTokenSource<F> {
    fetcher: F,
    cached: Mutex<Option<Token>>,
    refresh_skew: chrono::Duration,
}

impl<F: TokenFetcher> CachedTokenSource<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            cached: Mutex::new(None),
            refresh_skew: chrono::Duration::seconds(DEFAULT_REFRESH_SKEW_SECS),
        }
    }

    pub fn with_refresh_skew(mut self, skew: chrono::Duration) -> Self {
        self.refresh_skew = skew;
        self
    }
}

#[async_trait]
impl<F: TokenFetcher> TokenSource for CachedTokenSource<F> {
    async fn token(&self) -> Result<Token, AuthError> {
        let mut cached = self.cached.lock().await;
        let horizon = Utc::now() + self.refresh_skew;

        if let Some(token) = cached.as_ref() {
            if token.is_valid_at(horizon) {
                return Ok(token.clone());
            }
        }

        tracing::debug!("Fetching access token");
        let token = self.fetcher.fetch().await?;
        if !token.is_valid_at(Utc::now()) {
            return Err(AuthError::Fetch(
                "backend returned an empty or expired token".to_string(),
            ));
        }
        *cached = Some(token.clone());
        Ok(token)
    }

    async fn refresh(&self, token: Token) -> Result<(), AuthError> {
        *self.cached.lock().await = Some(token);
        Ok(())
    }
}
