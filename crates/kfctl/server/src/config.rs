//! Configuration for kfctld

use kfctl_backoff::BackoffConfig;
use kfctl_types::RegistryConfig;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listener configuration
    #[serde(default)]
    pub http: HttpConfig,

    /// Directory apps are created under
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Registries handed to the deployment builder
    #[serde(default)]
    pub registries: Vec<RegistryConfig>,

    /// GitHub token for registry downloads
    #[serde(default)]
    pub github_token: Option<String>,

    /// Running inside the target cluster
    #[serde(default)]
    pub in_cluster: bool,

    /// Readiness wait kfctld applies after binding
    #[serde(default)]
    pub readiness: BackoffConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            work_dir: default_work_dir(),
            registries: Vec::new(),
            github_token: None,
            in_cluster: false,
            readiness: BackoffConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Interface to bind
    #[serde(default = "default_listen_host")]
    pub listen_host: IpAddr,

    /// Port to bind; 0 picks an ephemeral port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound on one create call, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen_host: default_listen_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            max_body_size: default_max_body_size(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("kfctl-apps")
}

fn default_listen_host() -> IpAddr {
    IpAddr::from([127, 0, 0, 1])
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    600
}

fn default_max_body_size() -> usize {
    2 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ServerConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `KFCTL_` environment variables (`KFCTL_HTTP__PORT=9000`).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&ServerConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("KFCTL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.http.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http.port, 8080);
        assert!(config.http.listen_host.is_loopback());
        assert!(config.registries.is_empty());
        assert!(!config.in_cluster);
    }

    #[test]
    fn test_load_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kfctld.yaml");
        std::fs::write(
            &path,
            r#"
http:
  port: 9090
  request_timeout_secs: 5
work_dir: /srv/kfctl
registries:
  - name: kubeflow
    repo: https://github.com/kubeflow/kubeflow
    version: master
    path: kubeflow
"#,
        )
        .unwrap();

        let config = ServerConfig::load(path.to_str()).unwrap();
        assert_eq!(config.http.port, 9090);
        assert_eq!(config.request_timeout(), std::time::Duration::from_secs(5));
        assert_eq!(config.work_dir, PathBuf::from("/srv/kfctl"));
        assert_eq!(config.registries.len(), 1);
        assert_eq!(config.registries[0].name, "kubeflow");
        assert_eq!(config.logging.level, "info");
    }
}
