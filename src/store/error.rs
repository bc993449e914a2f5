use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Redis operation failed: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Error encoding article")]
    Serialization(#[from] serde_json::Error),
}
