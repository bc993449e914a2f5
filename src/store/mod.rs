pub mod error;
pub mod memory;
pub mod redis_store;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::article::Article;
use crate::config::{Config, StoreBackend};

pub use error::StoreError;
pub use memory::MemoryArticleStore;
pub use redis_store::RedisArticleStore;

/// Articles expire from the repository after a day.
pub const ARTICLE_TTL: Duration = Duration::from_secs(86_400);
pub const KEY_PREFIX: &str = "article:";

pub fn article_key(url: &str) -> String {
    format!("{KEY_PREFIX}{url}")
}

/// Persistent de-duplication and warm-start source for ingested articles,
/// keyed by article link.
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    async fn exists(&self, url: &str) -> Result<bool, StoreError>;

    async fn save(&self, url: &str, article: &Article) -> Result<(), StoreError>;

    /// Newest `count` stored articles, newest first.
    async fn recent(&self, count: usize) -> Result<Vec<Article>, StoreError>;

    async fn clear(&self) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

pub async fn from_config(config: &Config) -> Result<Arc<dyn ArticleRepository>, StoreError> {
    match config.store_backend {
        StoreBackend::Redis => {
            let store = RedisArticleStore::connect(config).await?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => Ok(Arc::new(MemoryArticleStore::new())),
    }
}
