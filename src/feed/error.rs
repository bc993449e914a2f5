use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {0} from feed")]
    Status(u16),

    #[error("Feed body suspiciously short ({0} bytes)")]
    TooShort(usize),

    #[error("Feed '{0}' is behind Cloudflare bot protection, skipping")]
    Blocked(String),

    #[error("Failed to parse feed: {0}")]
    Parse(String),
}
