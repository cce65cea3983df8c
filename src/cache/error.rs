//! Cache store errors.
//!
//! None of these reach a request path: [`CacheManager`](super::CacheManager)
//! absorbs them. The split between store failures and invalid input decides
//! how loudly they are logged.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    Connection(String),

    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Invalid key pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Cached value could not be decoded: {0}")]
    Decode(String),
}

impl CacheError {
    /// Store-side failures expected during an outage. Anything else is a caller or data bug.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, CacheError::Connection(_) | CacheError::Backend(_))
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() || err.is_timeout() {
            CacheError::Connection(err.to_string())
        } else {
            CacheError::Backend(err.to_string())
        }
    }
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;
