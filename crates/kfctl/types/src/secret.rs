//! Secrets embedded in a deployment definition
//!
//! A secret names a credential and says where its value comes from. The
//! wire form keeps the field-per-source layout (`literalSource`,
//! `envSource`) but exactly one of them must be present; anything else is
//! rejected while decoding.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named credential reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Secret {
    /// Secret name, unique within a `KfDefSpec`
    pub name: String,

    /// Where the value comes from
    pub secret_source: SecretSource,
}

impl Secret {
    /// Create a secret with an inline value
    pub fn literal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            secret_source: SecretSource::Literal(LiteralSource {
                value: value.into(),
            }),
        }
    }

    /// Create a secret read from an environment variable
    pub fn from_env(name: impl Into<String>, var: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            secret_source: SecretSource::Env(EnvSource { name: var.into() }),
        }
    }
}

/// Source of a secret value
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSecretSource", into = "RawSecretSource")]
pub enum SecretSource {
    /// Value carried inline
    Literal(LiteralSource),

    /// Value read from the process environment where it is resolved
    Env(EnvSource),
}

impl SecretSource {
    /// The inline value, if this is a literal source
    pub fn literal_value(&self) -> Option<&str> {
        match self {
            SecretSource::Literal(source) => Some(&source.value),
            SecretSource::Env(_) => None,
        }
    }

    /// Resolve to the plain value
    pub fn resolve(&self) -> Result<String, ValidationError> {
        match self {
            SecretSource::Literal(source) => Ok(source.value.clone()),
            SecretSource::Env(source) => std::env::var(&source.name)
                .map_err(|_| ValidationError::MissingEnv(source.name.clone())),
        }
    }
}

// Secret values never show up in logs.
impl fmt::Debug for SecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretSource::Literal(_) => f.write_str("Literal(<redacted>)"),
            SecretSource::Env(source) => f.debug_tuple("Env").field(source).finish(),
        }
    }
}

/// Inline secret value
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiteralSource {
    pub value: String,
}

/// Secret value taken from an environment variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvSource {
    /// Variable name
    pub name: String,
}

/// Field-per-source wire layout
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawSecretSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    literal_source: Option<LiteralSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    env_source: Option<EnvSource>,
}

impl TryFrom<RawSecretSource> for SecretSource {
    type Error = String;

    fn try_from(raw: RawSecretSource) -> Result<Self, Self::Error> {
        match (raw.literal_source, raw.env_source) {
            (Some(literal), None) => Ok(SecretSource::Literal(literal)),
            (None, Some(env)) => Ok(SecretSource::Env(env)),
            (None, None) => Err("secretSource must set exactly one of literalSource, envSource; none set".to_string()),
            (Some(_), Some(_)) => Err("secretSource must set exactly one of literalSource, envSource; both set".to_string()),
        }
    }
}

impl From<SecretSource> for RawSecretSource {
    fn from(source: SecretSource) -> Self {
        match source {
            SecretSource::Literal(literal) => RawSecretSource {
                literal_source: Some(literal),
                env_source: None,
            },
            SecretSource::Env(env) => RawSecretSource {
                literal_source: None,
                env_source: Some(env),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_wire_format() {
        let secret = Secret::literal("gcp-access-token", "1234");
        let json = serde_json::to_value(&secret).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "gcp-access-token",
                "secretSource": { "literalSource": { "value": "1234" } }
            })
        );
    }

    #[test]
    fn test_empty_source_rejected() {
        let err = serde_json::from_str::<Secret>(r#"{"name":"a","secretSource":{}}"#)
            .unwrap_err()
            .to_string();
        assert!(err.contains("none set"), "{err}");
    }

    #[test]
    fn test_missing_source_rejected() {
        assert!(serde_json::from_str::<Secret>(r#"{"name":"a"}"#).is_err());
    }

    #[test]
    fn test_both_sources_rejected() {
        let raw = r#"{"name":"a","secretSource":{
            "literalSource":{"value":"x"},
            "envSource":{"name":"HOME"}}}"#;
        let err = serde_json::from_str::<Secret>(raw).unwrap_err().to_string();
        assert!(err.contains("both set"), "{err}");
    }

    #[test]
    fn test_unknown_source_rejected() {
        let raw = r#"{"name":"a","secretSource":{"vaultSource":{"path":"x"}}}"#;
        assert!(serde_json::from_str::<Secret>(raw).is_err());
    }

    #[test]
    fn test_debug_redacts_literal() {
        let secret = Secret::literal("token", "hunter2");
        let rendered = format!("{:?}", secret);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn test_resolve_env_missing() {
        let source = SecretSource::Env(EnvSource {
            name: "KFCTL_TYPES_TEST_UNSET_VARIABLE".to_string(),
        });
        assert_eq!(
            source.resolve(),
            Err(ValidationError::MissingEnv(
                "KFCTL_TYPES_TEST_UNSET_VARIABLE".to_string()
            ))
        );
    }
}
