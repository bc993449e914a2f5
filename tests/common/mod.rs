#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use newswire::{
    config::{Config, StoreBackend},
    feed::FeedClient,
    hub::ClientHub,
    poller::FeedPoller,
    store::{ArticleRepository, MemoryArticleStore},
    Article, Category,
};

pub fn config(capacity: usize, feeds: Vec<String>) -> Config {
    Config {
        articles_buffer_size: capacity,
        rss_feeds: feeds,
        store_backend: StoreBackend::Memory,
        initial_retry_delay: Duration::from_millis(10),
        max_retry_delay: Duration::from_millis(20),
        feed_retry_budget: Duration::from_millis(100),
        polling_interval: Duration::from_secs(60),
        ..Config::default()
    }
}

pub fn article(url: &str, timestamp: &str) -> Article {
    Article {
        id: url.to_string(),
        title: format!("Title for {url}"),
        content: "content".to_string(),
        source: "example.com".to_string(),
        timestamp: timestamp.to_string(),
        url: url.to_string(),
        image_url: String::new(),
        categories: vec![Category::new("Cryptocurrency".to_string())],
    }
}

pub struct Harness {
    pub poller: Arc<FeedPoller>,
    pub hub: Arc<ClientHub>,
    pub store: Arc<MemoryArticleStore>,
}

/// A poller over a memory store pre-filled with `stored`, after `setup`.
pub async fn harness(config: &Config, stored: &[Article]) -> Harness {
    let store = Arc::new(MemoryArticleStore::new());
    for article in stored {
        store.save(&article.url, article).await.unwrap();
    }

    let hub = Arc::new(ClientHub::new());
    let repository: Arc<dyn ArticleRepository> = store.clone();
    let poller = Arc::new(FeedPoller::new(
        config,
        FeedClient::new(config).unwrap(),
        repository,
        Arc::clone(&hub),
    ));
    poller.setup().await.unwrap();

    Harness { poller, hub, store }
}

/// RSS 2.0 document with one item per `(link, pubDate)`, in order.
pub fn rss(items: &[(&str, &str)]) -> String {
    let items: String = items
        .iter()
        .enumerate()
        .map(|(i, (link, date))| {
            format!(
                r#"
    <item>
      <title>Story {i}</title>
      <link>{link}</link>
      <description><![CDATA[<p>Body of story {i}</p>]]></description>
      <pubDate>{date}</pubDate>
      <category>Bitcoin</category>
      <media:content url="https://img.example.com/{i}.jpg" type="image/jpeg"/>
    </item>"#
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>Test feed</title>
    <link>https://news.example.com</link>{items}
  </channel>
</rss>"#
    )
}
