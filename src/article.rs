use chrono::{DateTime, FixedOffset};
use derive_more::Constructor;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CATEGORY: &str = "Cryptocurrency";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Constructor)]
pub struct Category {
    pub term: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub content: String,
    pub source: String,
    /// RFC 3339 with the publisher's offset preserved.
    pub timestamp: String,
    pub url: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl Article {
    pub fn published_at(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.timestamp).ok()
    }
}

/// Orders newest first; articles with an unreadable timestamp sink to the end.
pub fn sort_newest_first(articles: &mut [Article]) {
    articles.sort_by(|a, b| b.published_at().cmp(&a.published_at()));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Constructor)]
pub struct BufferStatus {
    pub required: usize,
    pub current: usize,
}

#[cfg(test)]
pub(crate) fn sample(url: &str, timestamp: &str) -> Article {
    Article {
        id: uuid::Uuid::new_v4().to_string(),
        title: format!("Title for {url}"),
        content: "content".to_string(),
        source: "example.com".to_string(),
        timestamp: timestamp.to_string(),
        url: url.to_string(),
        image_url: String::new(),
        categories: vec![Category::new(DEFAULT_CATEGORY.to_string())],
    }
}
