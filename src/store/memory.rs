use async_trait::async_trait;
use moka::future::Cache;
use tracing::info;

use crate::article::{sort_newest_first, Article};
use crate::store::{ArticleRepository, StoreError, ARTICLE_TTL};

/// In-process repository with the same expiry as the Redis one.
#[derive(Clone)]
pub struct MemoryArticleStore {
    articles: Cache<String, Article>,
}

impl Default for MemoryArticleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryArticleStore {
    pub fn new() -> Self {
        Self {
            articles: Cache::builder().time_to_live(ARTICLE_TTL).build(),
        }
    }
}

#[async_trait]
impl ArticleRepository for MemoryArticleStore {
    async fn exists(&self, url: &str) -> Result<bool, StoreError> {
        Ok(self.articles.contains_key(url))
    }

    async fn save(&self, url: &str, article: &Article) -> Result<(), StoreError> {
        self.articles.insert(url.to_string(), article.clone()).await;
        Ok(())
    }

    async fn recent(&self, count: usize) -> Result<Vec<Article>, StoreError> {
        let mut articles: Vec<Article> = self.articles.iter().map(|(_, a)| a).collect();
        sort_newest_first(&mut articles);
        articles.truncate(count);
        Ok(articles)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.articles.invalidate_all();
        self.articles.run_pending_tasks().await;
        info!("Cache cleared");
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
