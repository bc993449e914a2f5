use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use newswire::{
    config::Config,
    export::{ArticleExporter, RepositorySnapshots},
    feed::FeedClient,
    hub::ClientHub,
    logging,
    poller::FeedPoller,
    shutdown::shutdown_signal,
    store,
};

/// Background exporter next to the API. By default it only snapshots the
/// shared repository; `--ingest` polls the feeds itself, for deployments
/// without the API process.
#[derive(Parser)]
#[command(name = "newswire-poller")]
#[command(about = "Export article snapshots every polling interval")]
struct Args {
    /// Fetch feeds into the repository instead of reading what the API stored
    #[arg(long)]
    ingest: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::from_env()?;
    logging::init(&config.log_level, Some(&config.log_dir));

    let store = store::from_config(&config)
        .await
        .context("Failed to initialize article store")?;
    let exporter = ArticleExporter::new(&config.export_dir)?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            cancel.cancel();
        }
    });

    if args.ingest {
        let poller = FeedPoller::new(
            &config,
            FeedClient::new(&config)?,
            store,
            Arc::new(ClientHub::new()),
        );
        poller.setup().await?;
        poller.run(cancel, Some(&exporter)).await;
    } else {
        RepositorySnapshots::new(
            store,
            exporter,
            config.articles_buffer_size,
            config.polling_interval,
        )
        .run(cancel)
        .await;
    }

    info!("Poller stopped");
    Ok(())
}
