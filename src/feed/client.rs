use std::time::Duration;

use backoff::ExponentialBackoff;
use http::{header, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::feed::error::FeedError;
use crate::feed::parser::{parse_feed, FeedEntry};
use crate::retry::doubling_backoff;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const MIN_BODY_LEN: usize = 100;
const BLOCKED_HOSTS: &[&str] = &["coinpaprika.com"];

/// Fetches feeds over HTTP with retry on transport failures.
#[derive(Clone)]
pub struct FeedClient {
    client: Client,
    initial_retry_delay: Duration,
    max_retry_delay: Duration,
    retry_budget: Duration,
}

impl FeedClient {
    pub fn new(config: &Config) -> Result<Self, FeedError> {
        let client = Client::builder()
            .default_headers(browser_headers())
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            initial_retry_delay: config.initial_retry_delay,
            max_retry_delay: config.max_retry_delay,
            retry_budget: config.feed_retry_budget,
        })
    }

    /// Fetch and parse a feed. Every failure is logged and reported as `None`
    /// so one bad feed never stalls a polling cycle.
    pub async fn fetch(&self, feed_url: &str) -> Option<Vec<FeedEntry>> {
        match self.try_fetch(feed_url).await {
            Ok(entries) => Some(entries),
            Err(FeedError::Blocked(url)) => {
                warn!("Skipping Cloudflare-protected feed: {}", url);
                None
            }
            Err(e) => {
                warn!("Skipping feed {}: {}", feed_url, e);
                None
            }
        }
    }

    pub async fn try_fetch(&self, feed_url: &str) -> Result<Vec<FeedEntry>, FeedError> {
        if BLOCKED_HOSTS.iter().any(|host| feed_url.contains(host)) {
            return Err(FeedError::Blocked(feed_url.to_string()));
        }

        debug!("Fetching feed from: {}", feed_url);

        let body = backoff::future::retry_notify(
            self.backoff(),
            || async move {
                let response = self
                    .client
                    .get(feed_url)
                    .send()
                    .await
                    .map_err(|e| backoff::Error::transient(FeedError::Request(e)))?;

                let status = response.status();
                debug!("Got response from {} (status: {})", feed_url, status);
                if status != StatusCode::OK {
                    return Err(backoff::Error::permanent(FeedError::Status(status.as_u16())));
                }

                response
                    .text()
                    .await
                    .map_err(|e| backoff::Error::transient(FeedError::Request(e)))
            },
            |e: FeedError, delay: Duration| {
                info!(
                    "Error fetching {} ({}), retrying after {:?}",
                    feed_url, e, delay
                );
            },
        )
        .await?;

        if body.len() < MIN_BODY_LEN {
            let preview: String = body.chars().take(MIN_BODY_LEN).collect();
            warn!("Very short content from {}: {:?}", feed_url, preview);
            return Err(FeedError::TooShort(body.len()));
        }

        let entries = parse_feed(body.as_bytes())?;
        debug!("Found {} entries in {}", entries.len(), feed_url);

        Ok(entries)
    }

    fn backoff(&self) -> ExponentialBackoff {
        doubling_backoff(
            self.initial_retry_delay,
            self.max_retry_delay,
            self.retry_budget,
        )
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.5"),
    );
    headers.insert(header::DNT, HeaderValue::from_static("1"));
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers
}
