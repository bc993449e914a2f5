use std::{path::PathBuf, str::FromStr, time::Duration};

use smart_default::SmartDefault;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}")]
    Invalid { key: &'static str, value: String },

    #[error("Unknown store backend '{0}', expected 'redis' or 'memory'")]
    UnknownBackend(String),
}

const DEFAULT_FEEDS: &[&str] = &[
    "https://cointelegraph.com/rss",
    "https://news.bitcoin.com/feed/",
    "https://ambcrypto.com/feed/",
    "https://decrypt.co/feed",
    "https://www.coindesk.com/arc/outboundfeeds/rss/",
];

const DEFAULT_CLOUDFLARE_HOSTS: &[&str] = &["coinpaprika.com", "cryptoslate.com"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    #[default]
    Redis,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, SmartDefault)]
pub struct Config {
    #[default("development".to_string())]
    pub env: String,

    #[default("127.0.0.1".to_string())]
    pub redis_host: String,
    #[default(6379)]
    pub redis_port: u16,
    #[default(0)]
    pub redis_db: i64,
    #[default(false)]
    pub redis_clear_on_start: bool,
    #[default(Duration::from_secs(30))]
    pub redis_connect_timeout: Duration,
    pub store_backend: StoreBackend,

    #[default(Duration::from_secs(120))]
    pub polling_interval: Duration,
    #[default(Duration::from_secs(300))]
    pub cloudflare_polling_interval: Duration,
    #[default(15)]
    pub articles_buffer_size: usize,
    #[default(Duration::from_secs(1))]
    pub initial_retry_delay: Duration,
    #[default(Duration::from_secs(60))]
    pub max_retry_delay: Duration,
    #[default(Duration::from_secs(120))]
    pub feed_retry_budget: Duration,

    #[default(DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect())]
    pub rss_feeds: Vec<String>,
    #[default(DEFAULT_CLOUDFLARE_HOSTS.iter().map(|s| s.to_string()).collect())]
    pub cloudflare_hosts: Vec<String>,

    #[default("http://localhost:3000".to_string())]
    pub cors_origin: String,

    #[default(PathBuf::from("article_exports"))]
    pub export_dir: PathBuf,
    #[default(PathBuf::from("analysis_outputs"))]
    pub analysis_dir: PathBuf,
    #[default(PathBuf::from("logs"))]
    pub log_dir: PathBuf,
    #[default("info".to_string())]
    pub log_level: String,

    #[default("http://localhost:11434/api/generate".to_string())]
    pub ollama_url: String,
    #[default("llama2".to_string())]
    pub ollama_model: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        Ok(Self {
            env: string_var("ENV", defaults.env),
            redis_host: string_var("REDIS_HOST", defaults.redis_host),
            redis_port: parsed_var("REDIS_PORT", defaults.redis_port)?,
            redis_db: parsed_var("REDIS_DB", defaults.redis_db)?,
            redis_clear_on_start: std::env::var("REDIS_CLEAR_ON_START")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.redis_clear_on_start),
            redis_connect_timeout: seconds_var(
                "REDIS_CONNECT_TIMEOUT",
                defaults.redis_connect_timeout,
            )?,
            store_backend: match std::env::var("STORE_BACKEND") {
                Ok(value) => value.parse()?,
                Err(_) => defaults.store_backend,
            },
            polling_interval: seconds_var("POLLING_INTERVAL", defaults.polling_interval)?,
            cloudflare_polling_interval: seconds_var(
                "CLOUDFLARE_POLLING_INTERVAL",
                defaults.cloudflare_polling_interval,
            )?,
            articles_buffer_size: parsed_var("ARTICLES_BUFFER_SIZE", defaults.articles_buffer_size)?,
            initial_retry_delay: seconds_var("INITIAL_RETRY_DELAY", defaults.initial_retry_delay)?,
            max_retry_delay: seconds_var("MAX_RETRY_DELAY", defaults.max_retry_delay)?,
            feed_retry_budget: seconds_var("FEED_RETRY_BUDGET", defaults.feed_retry_budget)?,
            rss_feeds: list_var("RSS_FEEDS", defaults.rss_feeds),
            cloudflare_hosts: list_var("CLOUDFLARE_FEEDS", defaults.cloudflare_hosts),
            cors_origin: string_var("CORS_ORIGIN", defaults.cors_origin),
            export_dir: path_var("ARTICLE_EXPORT_DIR", defaults.export_dir),
            analysis_dir: path_var("ANALYSIS_OUTPUT_DIR", defaults.analysis_dir),
            log_dir: path_var("LOG_DIR", defaults.log_dir),
            log_level: string_var("LOG_LEVEL", defaults.log_level).to_lowercase(),
            ollama_url: string_var("OLLAMA_URL", defaults.ollama_url),
            ollama_model: string_var("OLLAMA_MODEL", defaults.ollama_model),
        })
    }

    pub fn redis_url(&self) -> String {
        format!(
            "redis://{}:{}/{}",
            self.redis_host, self.redis_port, self.redis_db
        )
    }

    pub fn is_cloudflare_feed(&self, url: &str) -> bool {
        self.cloudflare_hosts
            .iter()
            .any(|host| url.contains(host.as_str()))
    }
}

fn string_var(key: &'static str, default: String) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
}

fn path_var(key: &'static str, default: PathBuf) -> PathBuf {
    std::env::var_os(key).map(PathBuf::from).unwrap_or(default)
}

fn parsed_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            value: value.clone(),
        }),
        Err(_) => Ok(default),
    }
}

fn seconds_var(key: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    parsed_var(key, default.as_secs()).map(Duration::from_secs)
}

fn list_var(key: &'static str, default: Vec<String>) -> Vec<String> {
    match std::env::var(key) {
        Ok(value) => {
            let items: Vec<String> = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if items.is_empty() {
                warn!("{} is set but empty, using defaults", key);
                default
            } else {
                items
            }
        }
        Err(_) => default,
    }
}
