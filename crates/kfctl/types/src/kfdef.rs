//! The deployment definition (`KfDef`)
//!
//! A `KfDef` describes a cluster deployment declaratively. Clients send one
//! to the bootstrap server; the server hands it to the deployment builder
//! and returns the builder's view of it, typically with `status` filled in.

use crate::error::ValidationError;
use crate::secret::Secret;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// API version written into new definitions
pub const API_VERSION: &str = "kfdef.apps.kubeflow.org/v1alpha1";

/// Kind written into new definitions
pub const KIND: &str = "KfDef";

/// Name used when the metadata carries none
pub const DEFAULT_APP_NAME: &str = "kfapp";

/// Declarative description of a deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KfDef {
    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_kind")]
    pub kind: String,

    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: KfDefSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<KfDefStatus>,
}

impl Default for KfDef {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            metadata: ObjectMeta::default(),
            spec: KfDefSpec::default(),
            status: None,
        }
    }
}

impl KfDef {
    /// Create a definition with the given name and spec
    pub fn new(name: impl Into<String>, spec: KfDefSpec) -> Self {
        Self {
            metadata: ObjectMeta {
                name: name.into(),
                namespace: None,
            },
            spec,
            ..Default::default()
        }
    }

    /// Name of the app directory this definition maps to
    pub fn app_name(&self) -> &str {
        if self.metadata.name.is_empty() {
            DEFAULT_APP_NAME
        } else {
            &self.metadata.name
        }
    }

    /// Check the structural invariants the server relies on
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.metadata.name.is_empty() && !is_dns_label(&self.metadata.name) {
            return Err(ValidationError::InvalidName(self.metadata.name.clone()));
        }
        self.spec.validate()
    }

    /// Record a condition, replacing any earlier one of the same type
    pub fn set_condition(&mut self, condition: KfDefCondition) {
        let status = self.status.get_or_insert_with(KfDefStatus::default);
        status
            .conditions
            .retain(|c| c.condition_type != condition.condition_type);
        status.conditions.push(condition);
    }
}

/// Object metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Desired state of a deployment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KfDefSpec {
    /// Directory the app is generated into, relative to the server's work dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_dir: Option<String>,

    /// Cloud project to deploy into
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Target platform, e.g. `gcp`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    #[serde(default)]
    pub use_basic_auth: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<String>,

    /// Ordered; downstream logic may refer to entries by position
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<Secret>,
}

impl KfDefSpec {
    /// Find a secret by name
    pub fn secret(&self, name: &str) -> Option<&Secret> {
        self.secrets.iter().find(|s| s.name == name)
    }

    /// Inline value of a literal secret
    pub fn literal_secret(&self, name: &str) -> Option<&str> {
        self.secret(name)
            .and_then(|s| s.secret_source.literal_value())
    }

    /// Secret names must be non-empty and unique
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut seen = HashSet::with_capacity(self.secrets.len());
        for (index, secret) in self.secrets.iter().enumerate() {
            if secret.name.is_empty() {
                return Err(ValidationError::EmptySecretName(index));
            }
            if !seen.insert(secret.name.as_str()) {
                return Err(ValidationError::DuplicateSecret(secret.name.clone()));
            }
        }
        Ok(())
    }
}

/// Observed state reported back by the builder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KfDefStatus {
    #[serde(default)]
    pub conditions: Vec<KfDefCondition>,
}

impl KfDefStatus {
    pub fn condition(&self, condition_type: ConditionType) -> Option<&KfDefCondition> {
        self.conditions
            .iter()
            .find(|c| c.condition_type == condition_type)
    }
}

/// A single status condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KfDefCondition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,

    pub status: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    pub last_update_time: chrono::DateTime<chrono::Utc>,
}

impl KfDefCondition {
    pub fn new(condition_type: ConditionType, status: bool) -> Self {
        Self {
            condition_type,
            status,
            reason: None,
            message: None,
            last_update_time: chrono::Utc::now(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>, message: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self.message = Some(message.into());
        self
    }
}

/// Condition types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionType {
    Available,
    Degraded,
    Failed,
}

fn default_api_version() -> String {
    API_VERSION.to_string()
}

fn default_kind() -> String {
    KIND.to_string()
}

fn is_dns_label(name: &str) -> bool {
    name.len() <= 63
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        && !name.starts_with('-')
        && !name.ends_with('-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GCP_ACCESS_TOKEN_NAME;

    fn spec_with_secrets(secrets: Vec<Secret>) -> KfDefSpec {
        KfDefSpec {
            secrets,
            ..Default::default()
        }
    }

    #[test]
    fn test_secrets_keep_order() {
        let spec = spec_with_secrets(vec![
            Secret::literal("b", "2"),
            Secret::literal("a", "1"),
            Secret::literal("c", "3"),
        ]);
        let json = serde_json::to_string(&spec).unwrap();
        let decoded: KfDefSpec = serde_json::from_str(&json).unwrap();
        let names: Vec<_> = decoded.secrets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_duplicate_secret_rejected() {
        let spec = spec_with_secrets(vec![
            Secret::literal("token", "1"),
            Secret::literal("token", "2"),
        ]);
        assert_eq!(
            spec.validate(),
            Err(ValidationError::DuplicateSecret("token".to_string()))
        );
    }

    #[test]
    fn test_empty_secret_name_rejected() {
        let spec = spec_with_secrets(vec![Secret::literal("ok", "1"), Secret::literal("", "2")]);
        assert_eq!(spec.validate(), Err(ValidationError::EmptySecretName(1)));
    }

    #[test]
    fn test_literal_secret_lookup() {
        let spec = spec_with_secrets(vec![
            Secret::from_env("other", "HOME"),
            Secret::literal(GCP_ACCESS_TOKEN_NAME, "1234"),
        ]);
        assert_eq!(spec.literal_secret(GCP_ACCESS_TOKEN_NAME), Some("1234"));
        assert_eq!(spec.literal_secret("other"), None);
        assert!(spec.secret("missing").is_none());
    }

    #[test]
    fn test_minimal_document_decodes() {
        let kfdef: KfDef = serde_json::from_str("{}").unwrap();
        assert_eq!(kfdef.api_version, API_VERSION);
        assert_eq!(kfdef.kind, KIND);
        assert_eq!(kfdef.app_name(), DEFAULT_APP_NAME);
        assert!(kfdef.status.is_none());
    }

    #[test]
    fn test_yaml_app_file_decodes() {
        let yaml = r#"
apiVersion: kfdef.apps.kubeflow.org/v1alpha1
kind: KfDef
metadata:
  name: my-app
spec:
  project: my-project
  zone: us-east1-d
  useBasicAuth: true
  secrets:
    - name: gcp-access-token
      secretSource:
        literalSource:
          value: "1234"
"#;
        let kfdef: KfDef = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(kfdef.app_name(), "my-app");
        assert_eq!(kfdef.spec.project.as_deref(), Some("my-project"));
        assert!(kfdef.spec.use_basic_auth);
        assert_eq!(kfdef.spec.literal_secret(GCP_ACCESS_TOKEN_NAME), Some("1234"));
        assert!(kfdef.validate().is_ok());
    }

    #[test]
    fn test_invalid_name_rejected() {
        let kfdef = KfDef::new("../etc", KfDefSpec::default());
        assert!(matches!(
            kfdef.validate(),
            Err(ValidationError::InvalidName(_))
        ));
        assert!(KfDef::new("-app", KfDefSpec::default()).validate().is_err());
        assert!(KfDef::new("app-1", KfDefSpec::default()).validate().is_ok());
    }

    #[test]
    fn test_set_condition_replaces_same_type() {
        let mut kfdef = KfDef::default();
        kfdef.set_condition(KfDefCondition::new(ConditionType::Available, false));
        kfdef.set_condition(KfDefCondition::new(ConditionType::Available, true));
        kfdef.set_condition(KfDefCondition::new(ConditionType::Degraded, false));

        let status = kfdef.status.unwrap();
        assert_eq!(status.conditions.len(), 2);
        assert!(status.condition(ConditionType::Available).unwrap().status);
    }
}
