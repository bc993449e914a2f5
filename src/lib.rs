pub mod analysis;
pub mod article;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod export;
pub mod feed;
pub mod http;
pub mod hub;
pub mod logging;
pub mod poller;
pub mod retry;
pub mod seed;
pub mod shutdown;
pub mod store;

pub use article::{Article, BufferStatus, Category};
pub use config::Config;
pub use error::ApiError;
