use thiserror::Error;

/// Token source errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Nothing has supplied a token yet
    #[error("no access token available")]
    NoToken,

    /// The held token has expired and cannot be renewed
    #[error("access token expired at {0}")]
    Expired(chrono::DateTime<chrono::Utc>),

    /// The credential backend failed
    #[error("failed to fetch access token: {0}")]
    Fetch(String),
}
