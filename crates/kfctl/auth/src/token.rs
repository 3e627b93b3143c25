//! Bearer tokens

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An OAuth2-style bearer token
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,

    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// `None` means the token does not expire
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl Token {
    /// A bearer token without expiry
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: default_token_type(),
            expiry: None,
        }
    }

    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// True when the token is non-empty and unexpired at `at`
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        !self.access_token.is_empty() && self.expiry.map_or(true, |expiry| at < expiry)
    }

    /// Value for an `Authorization` header
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expiry", &self.expiry)
            .finish()
    }
}

fn default_token_type() -> String {
    "Bearer".to_string()
}
