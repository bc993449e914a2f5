pub mod client;
pub mod error;
pub mod normalize;
pub mod parser;

pub use client::FeedClient;
pub use error::FeedError;
pub use normalize::build_article;
pub use parser::{parse_feed, FeedEntry, MediaRef};
