pub mod buffer;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::article::{Article, BufferStatus};
use crate::config::Config;
use crate::export::ArticleExporter;
use crate::feed::{build_article, FeedClient};
use crate::hub::{ClientHub, HubMessage};
use crate::store::{ArticleRepository, StoreError};

pub use buffer::ArticleBuffer;

const FILL_RETRY_DELAY: Duration = Duration::from_secs(5);
const MAX_ARTICLE_AGE_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedStatus {
    Initializing,
    Ready,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitialArticles {
    pub articles: Vec<Article>,
    pub status: FeedStatus,
}

pub struct FeedPoller {
    feeds: Vec<String>,
    regular_feeds: Vec<String>,
    cloudflare_feeds: Vec<String>,
    polling_interval: Duration,
    cloudflare_polling_interval: Duration,
    clear_on_start: bool,
    client: FeedClient,
    store: Arc<dyn ArticleRepository>,
    hub: Arc<ClientHub>,
    buffer: RwLock<ArticleBuffer>,
    ready: AtomicBool,
}

impl FeedPoller {
    pub fn new(
        config: &Config,
        client: FeedClient,
        store: Arc<dyn ArticleRepository>,
        hub: Arc<ClientHub>,
    ) -> Self {
        let (cloudflare_feeds, regular_feeds): (Vec<String>, Vec<String>) = config
            .rss_feeds
            .iter()
            .cloned()
            .partition(|feed| config.is_cloudflare_feed(feed));

        info!("Feed poller initialized with {} feeds", config.rss_feeds.len());
        Self {
            feeds: config.rss_feeds.clone(),
            regular_feeds,
            cloudflare_feeds,
            polling_interval: config.polling_interval,
            cloudflare_polling_interval: config.cloudflare_polling_interval,
            clear_on_start: config.redis_clear_on_start,
            client,
            store,
            hub,
            buffer: RwLock::new(ArticleBuffer::new(config.articles_buffer_size)),
            ready: AtomicBool::new(false),
        }
    }

    /// Either wipe the repository or warm the buffer from it.
    pub async fn setup(&self) -> Result<(), StoreError> {
        if self.clear_on_start {
            info!("Clearing article cache on startup");
            self.store.clear().await?;
        } else {
            self.initialize_buffer().await;
        }
        info!("Feed poller setup completed");
        Ok(())
    }

    pub async fn initialize_buffer(&self) {
        let capacity = self.capacity();
        match self.store.recent(capacity).await {
            Ok(articles) if !articles.is_empty() => {
                let count = articles.len();
                self.buffer.write().replace(articles);
                self.ready.store(true, Ordering::SeqCst);
                info!("Buffer initialized with {} articles from cache", count);
            }
            Ok(_) => info!("No existing articles found in cache"),
            Err(e) => {
                error!("Error initializing buffer: {}", e);
                self.buffer.write().clear();
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub fn capacity(&self) -> usize {
        self.buffer.read().capacity()
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.read().len()
    }

    pub fn buffer_status(&self) -> BufferStatus {
        let buffer = self.buffer.read();
        BufferStatus::new(buffer.capacity(), buffer.len())
    }

    pub fn snapshot(&self) -> Vec<Article> {
        self.buffer.read().articles().to_vec()
    }

    pub fn initial_articles(&self) -> InitialArticles {
        if !self.is_ready() {
            debug!("Service not ready - still collecting initial articles");
            return InitialArticles {
                articles: Vec::new(),
                status: FeedStatus::Initializing,
            };
        }

        let articles = self.snapshot();
        debug!("Returning {} initial articles", articles.len());
        InitialArticles {
            articles,
            status: FeedStatus::Ready,
        }
    }

    pub async fn ping_store(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }

    /// Reset the repository and the buffer, back to the initializing state.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.clear().await?;
        self.buffer.write().clear();
        self.ready.store(false, Ordering::SeqCst);
        Ok(())
    }

    pub fn cleanup_old_articles(&self) -> usize {
        let dropped = self
            .buffer
            .write()
            .prune_older_than(chrono::Duration::days(MAX_ARTICLE_AGE_DAYS));
        if dropped > 0 {
            info!("Pruned {} articles older than {} days", dropped, MAX_ARTICLE_AGE_DAYS);
        }
        dropped
    }

    async fn should_skip(&self, url: &str) -> bool {
        let full = {
            let buffer = self.buffer.read();
            if buffer.contains(url) {
                return true;
            }
            buffer.is_full()
        };

        if !full {
            return false;
        }

        match self.store.exists(url).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!("Could not check cache for {}: {}", url, e);
                false
            }
        }
    }

    /// Fetch one feed, store unseen articles, and push the newest one to
    /// connected clients. Returns the number of new articles.
    pub async fn process_feed(&self, feed_url: &str) -> usize {
        let Some(entries) = self.client.fetch(feed_url).await else {
            debug!("Skipping feed processing for {}", feed_url);
            return 0;
        };

        debug!("Processing {} entries from {}", entries.len(), feed_url);

        let mut fresh: Vec<Article> = Vec::new();
        for entry in &entries {
            let Some(article) = build_article(entry, feed_url) else {
                continue;
            };

            if fresh.iter().any(|a| a.url == article.url) || self.should_skip(&article.url).await {
                continue;
            }

            if let Err(e) = self.store.save(&article.url, &article).await {
                error!("Failed to cache article {}: {}", article.url, e);
            }

            info!("New article: {}", article.title);
            fresh.push(article);
        }

        self.ingest(fresh)
    }

    fn ingest(&self, fresh: Vec<Article>) -> usize {
        let Some(latest) = fresh.first().cloned() else {
            return 0;
        };
        let count = fresh.len();

        let (len, full) = {
            let mut buffer = self.buffer.write();
            buffer.extend(fresh);
            (buffer.len(), buffer.is_full())
        };

        info!("Added {} new articles (buffer size: {})", count, len);

        if full && !self.ready.swap(true, Ordering::SeqCst) {
            info!("Service ready! Buffer contains {} articles", len);
        }

        self.hub.broadcast(HubMessage::articles(vec![latest]));
        count
    }

    /// Process `feeds` concurrently. Returns the number of new articles.
    pub async fn poll_cycle(&self, feeds: &[String]) -> usize {
        join_all(feeds.iter().map(|feed| self.process_feed(feed)))
            .await
            .into_iter()
            .sum()
    }

    /// Poll until cancelled. When `exporter` is given, the buffer is
    /// exported after every cycle that leaves it non-empty.
    pub async fn run(&self, cancel: CancellationToken, exporter: Option<&ArticleExporter>) {
        tokio::select! {
            _ = cancel.cancelled() => info!("Polling task cancelled"),
            _ = self.poll_forever(exporter) => {}
        }
    }

    async fn poll_forever(&self, exporter: Option<&ArticleExporter>) {
        let regular = &self.regular_feeds;
        let cloudflare = &self.cloudflare_feeds;

        info!(
            "Starting RSS feed polling: {} regular feeds every {:?}, {} Cloudflare-protected feeds every {:?}",
            regular.len(),
            self.polling_interval,
            cloudflare.len(),
            self.cloudflare_polling_interval
        );

        if self.feeds.is_empty() {
            warn!("No feeds configured, the buffer will never fill");
        }

        while !self.buffer.read().is_full() {
            info!(
                "Collecting articles ({}/{})",
                self.buffer_len(),
                self.capacity()
            );
            self.poll_cycle(&self.feeds).await;
            self.export_snapshot(exporter).await;

            if !self.buffer.read().is_full() {
                time::sleep(FILL_RETRY_DELAY).await;
            }
        }

        if !self.ready.swap(true, Ordering::SeqCst) {
            info!("Service ready! Buffer contains {} articles", self.buffer_len());
        }

        let mut last_cloudflare_poll = Instant::now();
        loop {
            if !regular.is_empty() {
                self.poll_cycle(regular).await;
            }

            if !cloudflare.is_empty()
                && last_cloudflare_poll.elapsed() >= self.cloudflare_polling_interval
            {
                info!("Polling Cloudflare-protected feeds");
                self.poll_cycle(cloudflare).await;
                last_cloudflare_poll = Instant::now();
            }

            self.cleanup_old_articles();
            self.export_snapshot(exporter).await;

            info!(
                "Polling cycle complete - buffer contains {} articles",
                self.buffer_len()
            );
            time::sleep(self.polling_interval).await;
        }
    }

    async fn export_snapshot(&self, exporter: Option<&ArticleExporter>) {
        let Some(exporter) = exporter else {
            return;
        };

        let articles = self.snapshot();
        if articles.is_empty() {
            return;
        }
        if let Err(e) = exporter.save(&articles).await {
            error!("Failed to export articles: {}", e);
        }
    }
}
