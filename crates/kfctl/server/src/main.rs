//! kfctld - kfctl deployment bootstrap daemon
//!
//! Serves `POST /kfctl/apps/v1alpha2/create` and writes each accepted
//! `KfDef` into an app directory under the configured working directory.

use anyhow::Context;
use clap::Parser;
use kfctl_auth::StaticTokenSource;
use kfctl_backoff::ExponentialBackoff;
use kfctl_server::{Server, ServerConfig, ServerError};
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// kfctl daemon CLI
#[derive(Parser)]
#[command(name = "kfctld")]
#[command(about = "kfctl deployment bootstrap server", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "KFCTL_CONFIG")]
    config: Option<String>,

    /// Listen host
    #[arg(long, env = "KFCTL_HOST")]
    host: Option<IpAddr>,

    /// Listen port, 0 for an ephemeral port
    #[arg(short, long, env = "KFCTL_PORT")]
    port: Option<u16>,

    /// Directory apps are created under
    #[arg(short, long, env = "KFCTL_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// Running inside the target cluster
    #[arg(long, env = "KFCTL_IN_CLUSTER")]
    in_cluster: bool,

    /// Log level
    #[arg(long, env = "KFCTL_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "KFCTL_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ServerConfig::load(cli.config.as_deref())
        .map_err(|e| ServerError::Config(e.to_string()))?;

    // CLI flags win over file and environment layers
    if let Some(host) = cli.host {
        config.http.listen_host = host;
    }
    if let Some(port) = cli.port {
        config.http.port = port;
    }
    if let Some(work_dir) = cli.work_dir {
        config.work_dir = work_dir;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.in_cluster |= cli.in_cluster;
    config.logging.json |= cli.json;

    init_tracing(&config);

    let readiness = ExponentialBackoff::from(&config.readiness);
    readiness
        .validate()
        .map_err(|e| ServerError::Config(format!("Invalid readiness backoff: {}", e)))?;

    std::fs::create_dir_all(&config.work_dir)
        .with_context(|| format!("creating work dir {}", config.work_dir.display()))?;

    let server = Server::with_config(&config)?;
    server.set_token_source(Arc::new(StaticTokenSource::new()));
    server.register_endpoints()?;

    tokio::spawn(shutdown_signal(server.clone()));

    let port = config.http.port;
    let background = server.clone();
    let serving = tokio::spawn(async move { background.start_http(port).await });

    match server.wait_ready(&readiness).await {
        Ok(addr) => tracing::info!(
            addr = %addr,
            work_dir = %server.work_dir().display(),
            version = env!("CARGO_PKG_VERSION"),
            "kfctld ready"
        ),
        Err(e) => tracing::warn!(error = %e, "kfctld not ready yet"),
    }

    serving.await.context("server task panicked")??;
    Ok(())
}

fn init_tracing(config: &ServerConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn shutdown_signal(server: Server) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    server.shutdown();
}
