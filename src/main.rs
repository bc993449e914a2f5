use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use newswire::{
    config::Config,
    export::ArticleExporter,
    feed::FeedClient,
    http::{self, AppState},
    hub::ClientHub,
    logging,
    poller::FeedPoller,
    shutdown::shutdown_signal,
    store,
};

/// Ports tried after the requested one before giving up.
const PORT_FALLBACKS: u16 = 3;

#[derive(Parser)]
#[command(name = "newswire")]
#[command(about = "Crypto news feed aggregator with HTTP and SSE delivery")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    #[arg(short, long, env = "PORT", default_value = "8000")]
    port: u16,

    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::from_env()?;

    let filter_level = if args.debug {
        "debug"
    } else {
        config.log_level.as_str()
    };
    logging::init(filter_level, Some(&config.log_dir));

    info!("Starting RSS feed service in {} mode", config.env);

    let store = store::from_config(&config)
        .await
        .context("Failed to initialize article store")?;
    let hub = Arc::new(ClientHub::new());
    let client = FeedClient::new(&config)?;

    let poller = Arc::new(FeedPoller::new(&config, client, store, Arc::clone(&hub)));
    poller.setup().await?;

    let exporter = Arc::new(ArticleExporter::new(&config.export_dir)?);

    let cancel = CancellationToken::new();
    let polling_task = tokio::spawn({
        let poller = Arc::clone(&poller);
        let cancel = cancel.clone();
        async move { poller.run(cancel, None).await }
    });

    let app = http::router(
        AppState {
            poller,
            hub: Arc::clone(&hub),
            exporter,
        },
        &config.cors_origin,
    )
    .context("Invalid CORS_ORIGIN")?;

    let listener = bind(&args.host, args.port).await?;
    info!("Server started on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown(cancel, hub))
        .await
        .context("server error")?;

    if let Err(e) = polling_task.await {
        warn!("Polling task ended abnormally: {}", e);
    }
    info!("Cleanup completed successfully");

    Ok(())
}

async fn bind(host: &str, port: u16) -> anyhow::Result<TcpListener> {
    let last = port.saturating_add(PORT_FALLBACKS);
    let mut candidate = port;

    loop {
        match TcpListener::bind((host, candidate)).await {
            Ok(listener) => return Ok(listener),
            Err(e) if candidate < last => {
                warn!("Port {} is in use ({}), trying {}", candidate, e, candidate + 1);
                candidate += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Could not bind to any port in {port}-{last} on {host}")
                })
            }
        }
    }
}

/// Resolves on Ctrl-C or SIGTERM, after stopping the poller and telling
/// stream clients to disconnect.
async fn shutdown(cancel: CancellationToken, hub: Arc<ClientHub>) {
    shutdown_signal().await;

    info!("Starting graceful shutdown...");
    cancel.cancel();
    hub.shutdown();
}
