use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::export::{ArticleExporter, ExportError};
use crate::store::ArticleRepository;

/// Periodic exports of the newest stored articles. Reads the repository an
/// ingesting poller writes to and never writes article keys itself.
pub struct RepositorySnapshots {
    store: Arc<dyn ArticleRepository>,
    exporter: ArticleExporter,
    limit: usize,
    interval: Duration,
}

impl RepositorySnapshots {
    pub fn new(
        store: Arc<dyn ArticleRepository>,
        exporter: ArticleExporter,
        limit: usize,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            exporter,
            limit,
            interval,
        }
    }

    /// Export the newest `limit` stored articles. `None` when the repository
    /// holds nothing yet.
    pub async fn export_once(&self) -> Result<Option<PathBuf>, ExportError> {
        let articles = self.store.recent(self.limit).await?;
        if articles.is_empty() {
            debug!("No stored articles to export yet");
            return Ok(None);
        }

        self.exporter.save(&articles).await.map(Some)
    }

    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            "Exporting up to {} stored articles every {:?}",
            self.limit, self.interval
        );

        loop {
            if let Err(e) = self.export_once().await {
                error!("Failed to export articles: {}", e);
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Snapshot export cancelled");
                    return;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}
