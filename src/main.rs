//! oddsfeed - upstream odds feed poller and client state server

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use oddsfeed_backend::{
    api::{create_router, AppState},
    config::Config,
    feed::{HttpFeedClient, SynchronizedFetcher},
    pipeline::Pipeline,
};

#[derive(Parser, Debug)]
#[command(name = "oddsfeed")]
#[command(about = "Polls the upstream odds feed and serves the reconciled event state")]
struct Args {
    /// Listen port
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Upstream base URL
    #[arg(long, env = "API_BASE_URL")]
    base_url: Option<String>,

    /// Cycle trigger interval in ms
    #[arg(long, env = "POLL_INTERVAL_MS")]
    poll_interval_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env first so clap sees the same variables as Config
    dotenv::dotenv().ok();
    let args = Args::parse();
    let config = load_config(args);

    init_tracing();

    info!("🚀 oddsfeed starting");
    let client = HttpFeedClient::new(config.base_url.clone(), config.request_timeout())?;
    info!(
        base_url = %client.base_url(),
        max_retries = config.max_retries,
        retry_delay_ms = config.retry_delay_ms,
        poll_interval_ms = config.poll_interval_ms,
        "Configuration loaded"
    );

    let fetcher = SynchronizedFetcher::new(
        Arc::new(client),
        config.max_retries,
        config.retry_delay(),
    );
    let pipeline = Arc::new(Pipeline::new(fetcher));

    // Bind before polling so a taken port fails fast
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller = tokio::spawn(
        Arc::clone(&pipeline).run_polling(config.poll_interval(), shutdown_rx),
    );

    let app = create_router(AppState {
        snapshot: pipeline.snapshot(),
        status: pipeline.clone(),
    });

    info!("🎯 API server listening on {}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error");

    let _ = shutdown_tx.send(true);
    if let Err(e) = poller.await {
        error!(error = %e, "Polling task failed");
    }

    info!("👋 oddsfeed stopped");
    served
}

fn load_config(args: Args) -> Config {
    let mut config = Config::from_env();
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(base_url) = args.base_url {
        config.base_url = base_url.trim_end_matches('/').to_string();
    }
    if let Some(ms) = args.poll_interval_ms.filter(|&ms| ms > 0) {
        config.poll_interval_ms = ms;
    }
    config
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "oddsfeed=info,oddsfeed_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
        // Keep serving; never resolve
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down");
}
