use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{info, warn};

use crate::article::{sort_newest_first, Article};
use crate::config::Config;
use crate::retry::doubling_backoff;
use crate::store::{article_key, ArticleRepository, StoreError, ARTICLE_TTL, KEY_PREFIX};

const SCAN_BATCH: usize = 200;

pub struct RedisArticleStore {
    redis: ConnectionManager,
}

impl RedisArticleStore {
    /// Connect and ping, retrying until `REDIS_CONNECT_TIMEOUT` runs out so a
    /// Redis that is still starting up is waited for.
    pub async fn connect(config: &Config) -> Result<Self, StoreError> {
        let url = config.redis_url();
        let client = redis::Client::open(url.as_str())
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        let backoff = doubling_backoff(
            config.initial_retry_delay,
            config.max_retry_delay,
            config.redis_connect_timeout,
        );

        let redis = backoff::future::retry_notify(
            backoff,
            || {
                let client = client.clone();
                async move {
                    let mut conn = ConnectionManager::new(client)
                        .await
                        .map_err(|e| backoff::Error::transient(StoreError::Redis(e)))?;
                    redis::cmd("PING")
                        .query_async::<_, ()>(&mut conn)
                        .await
                        .map_err(|e| backoff::Error::transient(StoreError::Redis(e)))?;
                    Ok(conn)
                }
            },
            |e: StoreError, delay: Duration| warn!("Redis not reachable ({}), retrying in {:?}", e, delay),
        )
        .await
        .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        info!(
            "Connected to Redis at {}:{} (db {})",
            config.redis_host, config.redis_port, config.redis_db
        );

        Ok(Self { redis })
    }

    async fn article_keys(&self) -> Result<Vec<String>, StoreError> {
        let mut conn = self.redis.clone();
        let pattern = format!("{KEY_PREFIX}*");

        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(keys)
    }
}

#[async_trait]
impl ArticleRepository for RedisArticleStore {
    async fn exists(&self, url: &str) -> Result<bool, StoreError> {
        let mut conn = self.redis.clone();
        Ok(conn.exists::<_, bool>(article_key(url)).await?)
    }

    async fn save(&self, url: &str, article: &Article) -> Result<(), StoreError> {
        let serialized = serde_json::to_string(article)?;
        let mut conn = self.redis.clone();
        redis::cmd("SET")
            .arg(article_key(url))
            .arg(serialized)
            .arg("EX")
            .arg(ARTICLE_TTL.as_secs())
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn recent(&self, count: usize) -> Result<Vec<Article>, StoreError> {
        let keys = self.article_keys().await?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.redis.clone();
        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await?;

        // expired between SCAN and MGET, or not an article: skip
        let mut articles: Vec<Article> = values
            .into_iter()
            .flatten()
            .filter_map(|raw| serde_json::from_str(&raw).ok())
            .collect();

        sort_newest_first(&mut articles);
        articles.truncate(count);
        Ok(articles)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let keys = self.article_keys().await?;
        if !keys.is_empty() {
            let mut conn = self.redis.clone();
            conn.del::<_, ()>(&keys).await?;
        }
        info!("Cache cleared ({} articles)", keys.len());
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.redis.clone();
        redis::cmd("PING").query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }
}
