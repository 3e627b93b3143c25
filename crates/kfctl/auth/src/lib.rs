//! Access token sources for kfctl
//!
//! A [`TokenSource`] hands out a bearer credential on demand and accepts a
//! fresher one when a caller has it. The bootstrap server holds one instance
//! and never shares it across unrelated servers, so implementations only
//! need the locking their own state requires.
//!
//! - [`FakeTokenSource`]: fixed value, for tests
//! - [`StaticTokenSource`]: whatever was last handed to `refresh`
//! - [`CachedTokenSource`]: caches a fetched token until it nears expiry

#![deny(unsafe_code)]

mod error;
mod source;
mod token;

pub use error::AuthError;
pub use source::{
    CachedTokenSource, FakeTokenSource, StaticTokenSource, TokenFetcher, TokenSource,
    DEFAULT_REFRESH_SKEW_SECS, FAKE_TOKEN,
};
pub use token::Token;
