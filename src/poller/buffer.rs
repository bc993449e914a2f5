use chrono::{Duration, Utc};

use crate::article::{sort_newest_first, Article};

/// The newest `capacity` articles, newest first, at most one per link.
#[derive(Debug, Clone)]
pub struct ArticleBuffer {
    articles: Vec<Article>,
    capacity: usize,
}

impl ArticleBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            articles: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.articles.len() >= self.capacity
    }

    pub fn contains(&self, url: &str) -> bool {
        self.articles.iter().any(|a| a.url == url)
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    /// Merge `incoming`, keeping the newest copy of each link, then re-sort
    /// and cut back to capacity.
    pub fn extend(&mut self, incoming: Vec<Article>) {
        for article in incoming {
            self.articles.retain(|existing| existing.url != article.url);
            self.articles.push(article);
        }
        sort_newest_first(&mut self.articles);
        self.articles.truncate(self.capacity);
    }

    pub fn replace(&mut self, articles: Vec<Article>) {
        self.articles.clear();
        self.extend(articles);
    }

    pub fn clear(&mut self) {
        self.articles.clear();
    }

    /// Drop articles published more than `max_age` ago. Articles whose
    /// timestamp cannot be read are kept. Returns how many were dropped.
    pub fn prune_older_than(&mut self, max_age: Duration) -> usize {
        let cutoff = Utc::now() - max_age;
        let before = self.articles.len();

        self.articles.retain(|article| {
            article
                .published_at()
                .is_none_or(|published| published > cutoff)
        });

        before - self.articles.len()
    }
}
