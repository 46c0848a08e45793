//! tgbridge-gateway - Main entry point
//!
//! HTTP gateway for QR-authorized Telegram accounts.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tgbridge_common::config::{load_or_default, QrRetentionMode};
use tgbridge_gateway::client::ClientFactory;
use tgbridge_gateway::config::{Config, Overrides};
use tgbridge_gateway::qr::QrStore;
use tgbridge_gateway::session_store::MemorySessionStore;
use tgbridge_gateway::{build_router, AppState};

/// Command-line arguments for tgbridge-gateway
#[derive(Parser, Debug)]
#[command(name = "tgbridge-gateway")]
#[command(about = "HTTP gateway for QR-authorized Telegram accounts")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long, env = "TGBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "TGBRIDGE_BIND")]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "TGBRIDGE_PORT")]
    port: Option<u16>,

    /// Telegram application id
    #[arg(long, env = "TELEGRAM_API_ID")]
    api_id: Option<i32>,

    /// Telegram application hash
    #[arg(long, env = "TELEGRAM_API_HASH", hide_env_values = true)]
    api_hash: Option<String>,

    /// Connection attempts per client
    #[arg(long)]
    connection_retries: Option<u32>,

    /// Directory for QR code images
    #[arg(long, env = "TGBRIDGE_QR_DIR")]
    qr_dir: Option<PathBuf>,

    /// Give up on a QR login after this many seconds
    #[arg(long)]
    login_timeout_secs: Option<u64>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            bind_address: self.bind.clone(),
            port: self.port,
            api_id: self.api_id,
            api_hash: self.api_hash.clone(),
            connection_retries: self.connection_retries,
            qr_directory: self.qr_dir.clone(),
            login_timeout_secs: self.login_timeout_secs,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tgbridge_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting tgbridge-gateway v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let file = load_or_default(args.config.as_deref()).context("Failed to load config file")?;
    let config = Config::resolve(args.overrides(), file).context("Invalid configuration")?;

    let qr = Arc::new(
        QrStore::init(&config.qr_directory, config.qr_retention, config.qr_ttl)
            .await
            .with_context(|| {
                format!("Failed to create QR directory {}", config.qr_directory.display())
            })?,
    );
    info!("QR codes directory: {}", config.qr_directory.display());

    let sweeper = match config.qr_retention {
        QrRetentionMode::KeepForTtl => {
            info!(
                "QR codes kept for {}s, sweeping every {}s",
                config.qr_ttl.as_secs(),
                config.sweep_interval.as_secs()
            );
            Some(Arc::clone(&qr).spawn_sweeper(config.sweep_interval))
        }
        QrRetentionMode::DeleteOnCompletion => None,
    };

    let clients = client_factory(&config)?;

    let state = AppState::new(
        Arc::new(MemorySessionStore::new()),
        clients,
        qr,
        config.login_timeout,
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.listen_addr))?;
    info!("tgbridge-gateway listening on http://{}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(handle) = sweeper {
        handle.abort();
    }

    info!("Server shutdown complete");
    Ok(())
}

#[cfg(feature = "telegram")]
fn client_factory(config: &Config) -> Result<Arc<dyn ClientFactory>> {
    use tgbridge_gateway::telegram::LayerClientFactory;

    info!(
        "Telegram backend: api_id {}, {} connection retries",
        config.credentials.api_id, config.connection_retries
    );
    Ok(Arc::new(LayerClientFactory::new(
        config.credentials.clone(),
        config.connection_retries,
    )))
}

#[cfg(not(feature = "telegram"))]
fn client_factory(_config: &Config) -> Result<Arc<dyn ClientFactory>> {
    warn!("No messaging backend compiled in");
    Err(tgbridge_gateway::Error::Config(
        "built without a messaging backend; rebuild with `--features telegram`".into(),
    )
    .into())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
