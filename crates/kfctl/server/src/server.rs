//! Server setup and lifecycle management

use crate::api::{create_router, AppState};
use crate::builder::{AppDirBuilder, DeploymentBuilder};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use kfctl_auth::{StaticTokenSource, TokenSource};
use kfctl_backoff::{retry_notify, ExponentialBackoff};
use kfctl_types::RegistryConfig;
use parking_lot::RwLock;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// kfctl bootstrap server.
///
/// Cheap to clone; clones share one listener, one address and one set of
/// collaborators. Typical use spawns [`Server::start_http`] on a clone and
/// waits with [`Server::wait_ready`] on the original.
#[derive(Clone)]
pub struct Server {
    shared: Arc<Shared>,
}

struct Shared {
    work_dir: PathBuf,
    registries: Arc<[RegistryConfig]>,
    github_token: Option<String>,
    in_cluster: bool,
    settings: RwLock<Settings>,
    addr: watch::Sender<Option<SocketAddr>>,
    shutdown: CancellationToken,
}

/// Adjustable until serving starts. The lifecycle flags live under the
/// same lock so registration and startup observe each other atomically.
struct Settings {
    listen_host: IpAddr,
    request_timeout: Duration,
    max_body_size: usize,
    token_source: Arc<dyn TokenSource>,
    builder: Arc<dyn DeploymentBuilder>,
    endpoints_registered: bool,
    serving: bool,
}

impl Server {
    /// Create a server that builds apps under `work_dir`.
    ///
    /// Fails if `work_dir` is not an existing, writable directory.
    pub fn new(
        work_dir: impl AsRef<Path>,
        registries: Vec<RegistryConfig>,
        github_token: Option<String>,
        in_cluster: bool,
    ) -> ServerResult<Self> {
        let work_dir = check_work_dir(work_dir.as_ref())?;
        let defaults = ServerConfig::default();
        let (addr, _) = watch::channel(None);

        tracing::debug!(
            work_dir = %work_dir.display(),
            registries = registries.len(),
            in_cluster,
            "Created server"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                work_dir,
                registries: registries.into(),
                github_token,
                in_cluster,
                settings: RwLock::new(Settings {
                    listen_host: defaults.http.listen_host,
                    request_timeout: defaults.request_timeout(),
                    max_body_size: defaults.http.max_body_size,
                    token_source: Arc::new(StaticTokenSource::new()),
                    builder: Arc::new(AppDirBuilder::new()),
                    endpoints_registered: false,
                    serving: false,
                }),
                addr,
                shutdown: CancellationToken::new(),
            }),
        })
    }

    /// Create a server from loaded configuration
    pub fn with_config(config: &ServerConfig) -> ServerResult<Self> {
        let server = Self::new(
            &config.work_dir,
            config.registries.clone(),
            config.github_token.clone(),
            config.in_cluster,
        )?;
        {
            let mut settings = server.shared.settings.write();
            settings.listen_host = config.http.listen_host;
            settings.request_timeout = config.request_timeout();
            settings.max_body_size = config.http.max_body_size;
        }
        Ok(server)
    }

    /// Replace the token source handed to the builder
    pub fn set_token_source(&self, token_source: Arc<dyn TokenSource>) {
        self.shared.settings.write().token_source = token_source;
    }

    /// Replace the deployment builder
    pub fn set_builder(&self, builder: Arc<dyn DeploymentBuilder>) {
        self.shared.settings.write().builder = builder;
    }

    /// Bound on a single create call, including time queued behind others
    pub fn set_request_timeout(&self, timeout: Duration) {
        self.shared.settings.write().request_timeout = timeout;
    }

    pub fn set_listen_host(&self, host: IpAddr) {
        self.shared.settings.write().listen_host = host;
    }

    pub fn work_dir(&self) -> &Path {
        &self.shared.work_dir
    }

    /// Wire the create deployment endpoint.
    ///
    /// Call once, before [`Server::start_http`]. A second call is an error.
    pub fn register_endpoints(&self) -> ServerResult<()> {
        let mut settings = self.shared.settings.write();
        if settings.serving {
            return Err(ServerError::AlreadyServing);
        }
        if settings.endpoints_registered {
            return Err(ServerError::EndpointsRegistered);
        }
        settings.endpoints_registered = true;
        drop(settings);

        tracing::debug!(path = kfctl_types::CREATE_DEPLOYMENT_PATH, "Registered endpoints");
        Ok(())
    }

    /// Bind `port` (0 for an ephemeral port) and serve until [`Server::shutdown`].
    ///
    /// The bound address becomes visible through [`Server::addr`] as soon as
    /// the listener is bound, before the first connection is accepted.
    pub async fn start_http(&self, port: u16) -> ServerResult<()> {
        let (state, bind_addr, max_body_size, with_deployments) = {
            let mut settings = self.shared.settings.write();
            if settings.serving {
                return Err(ServerError::AlreadyServing);
            }
            settings.serving = true;

            let mut state = AppState::new(
                self.shared.work_dir.clone(),
                self.shared.registries.clone(),
                settings.token_source.clone(),
                settings.builder.clone(),
                settings.request_timeout,
            );
            state.github_token = self.shared.github_token.clone();
            state.in_cluster = self.shared.in_cluster;
            (
                state,
                SocketAddr::new(settings.listen_host, port),
                settings.max_body_size,
                settings.endpoints_registered,
            )
        };

        let app = create_router(state, with_deployments, max_body_size);

        let listener = match TcpListener::bind(bind_addr).await {
            Ok(listener) => listener,
            Err(source) => {
                self.abandon_start();
                return Err(ServerError::Bind {
                    addr: bind_addr,
                    source,
                });
            }
        };
        let local_addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                self.abandon_start();
                return Err(ServerError::Io(e));
            }
        };

        self.shared.addr.send_replace(Some(local_addr));
        tracing::info!(addr = %local_addr, "kfctl server listening");

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(self.shared.shutdown.clone().cancelled_owned())
            .await
            .map_err(ServerError::Serve);

        self.shared.addr.send_replace(None);
        tracing::info!(addr = %local_addr, "kfctl server stopped");

        result
    }

    /// Startup failed before serving; allow another `start_http`
    fn abandon_start(&self) {
        self.shared.settings.write().serving = false;
    }

    /// Bound address, or `None` when not listening
    pub fn addr(&self) -> Option<SocketAddr> {
        *self.shared.addr.borrow()
    }

    /// Watch the bound address
    pub fn subscribe_addr(&self) -> watch::Receiver<Option<SocketAddr>> {
        self.shared.addr.subscribe()
    }

    /// Poll [`Server::addr`] under `policy` until the server is listening.
    pub async fn wait_ready(&self, policy: &ExponentialBackoff) -> ServerResult<SocketAddr> {
        let started = std::time::Instant::now();
        retry_notify(
            policy,
            || async { self.addr().ok_or(()) },
            |_, delay| {
                tracing::warn!(delay_ms = delay.as_millis() as u64, "Server not listening yet, retrying");
            },
        )
        .await
        .map_err(|()| ServerError::NotReady {
            waited_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Stop accepting connections and let in-flight requests finish
    pub fn shutdown(&self) {
        tracing::info!("kfctl server shutting down");
        self.shared.shutdown.cancel();
    }

    /// Token that fires on [`Server::shutdown`]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shared.shutdown.clone()
    }
}

fn check_work_dir(path: &Path) -> ServerResult<PathBuf> {
    let unusable = |reason: &str| ServerError::WorkDir {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let metadata = std::fs::metadata(path).map_err(|e| unusable(&e.to_string()))?;
    if !metadata.is_dir() {
        return Err(unusable("not a directory"));
    }
    // Mode bits do not reflect ACLs or read-only mounts
    tempfile::tempfile_in(path).map_err(|e| unusable(&format!("not writable: {e}")))?;
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_policy() -> ExponentialBackoff {
        ExponentialBackoff::new(
            Duration::from_millis(10),
            Duration::from_millis(50),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_missing_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = Server::new(&missing, Vec::new(), None, false).err().unwrap();
        assert!(matches!(err, ServerError::WorkDir { .. }));
    }

    #[test]
    fn test_work_dir_must_be_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file");
        std::fs::write(&file, b"x").unwrap();
        let err = Server::new(&file, Vec::new(), None, false).err().unwrap();
        assert!(matches!(err, ServerError::WorkDir { .. }));
    }

    #[test]
    fn test_writability_check_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        Server::new(dir.path(), Vec::new(), None, false).unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_unwritable_work_dir() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();

        // Privileged users write through mode bits; the check must agree with reality
        let writable = std::fs::write(locked.join("canary"), b"x").is_ok();
        let result = Server::new(&locked, Vec::new(), None, false);

        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        if writable {
            assert!(result.is_ok());
        } else {
            match result {
                Err(ServerError::WorkDir { reason, .. }) => assert!(reason.contains("not writable")),
                Err(other) => panic!("unexpected error: {other:?}"),
                Ok(_) => panic!("unwritable work dir accepted"),
            }
        }
    }

    #[tokio::test]
    async fn test_failed_bind_allows_restart() {
        let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = occupied.local_addr().unwrap().port();

        let dir = tempfile::tempdir().unwrap();
        let server = Server::new(dir.path(), Vec::new(), None, false).unwrap();
        assert!(matches!(
            server.start_http(port).await,
            Err(ServerError::Bind { .. })
        ));
        assert_eq!(server.addr(), None);

        // Registration is still open and a second start succeeds
        server.register_endpoints().unwrap();
        let background = server.clone();
        let handle = tokio::spawn(async move { background.start_http(0).await });
        server.wait_ready(&quick_policy()).await.unwrap();

        server.shutdown();
        handle.await.unwrap().unwrap();
    }

    #[test]
    fn test_register_endpoints_twice() {
        let dir = tempfile::tempdir().unwrap();
        let server = Server::new(dir.path(), Vec::new(), None, false).unwrap();
        server.register_endpoints().unwrap();
        assert!(matches!(
            server.register_endpoints(),
            Err(ServerError::EndpointsRegistered)
        ));
    }

    #[tokio::test]
    async fn test_addr_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let server = Server::new(dir.path(), Vec::new(), None, false).unwrap();
        assert_eq!(server.addr(), None);

        let background = server.clone();
        let handle = tokio::spawn(async move { background.start_http(0).await });

        let addr = server.wait_ready(&quick_policy()).await.unwrap();
        assert_ne!(addr.port(), 0);
        for _ in 0..3 {
            assert_eq!(server.addr(), Some(addr));
        }

        server.shutdown();
        handle.await.unwrap().unwrap();
        assert_eq!(server.addr(), None);
    }

    #[tokio::test]
    async fn test_start_twice_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let server = Server::new(dir.path(), Vec::new(), None, false).unwrap();

        let background = server.clone();
        let handle = tokio::spawn(async move { background.start_http(0).await });
        server.wait_ready(&quick_policy()).await.unwrap();

        assert!(matches!(
            server.start_http(0).await,
            Err(ServerError::AlreadyServing)
        ));
        assert!(matches!(
            server.register_endpoints(),
            Err(ServerError::AlreadyServing)
        ));

        server.shutdown();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_wait_ready_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let server = Server::new(dir.path(), Vec::new(), None, false).unwrap();
        let policy = ExponentialBackoff::new(
            Duration::from_millis(5),
            Duration::from_millis(10),
            Duration::from_millis(40),
        );
        assert!(matches!(
            server.wait_ready(&policy).await,
            Err(ServerError::NotReady { .. })
        ));
    }
}
