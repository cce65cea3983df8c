//! 响应缓存模块：缓存键派生、外部键值存储适配与失败开放的缓存管理。
//!
//! # Response Caching Module
//!
//! Responses from the generation backend are cached in an external
//! key-value store (Redis in production) so identical requests are served
//! without another model call.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CacheKeyDeriver`] | Maps the semantically relevant request fields to a [`CacheKey`] |
//! | [`CacheStore`] | get / set-with-expiry / delete / scan / ping protocol |
//! | [`RedisStore`] | Redis implementation over a managed connection |
//! | [`MemoryStore`] | In-process implementation with expiry and cursor scans |
//! | [`CacheManager`] | Fail-open facade: store outages degrade to cache misses |
//!
//! ## Example
//!
//! ```rust
//! use llm_gateway::cache::{CacheConfig, CacheManager, MemoryStore};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let mut cache = CacheManager::new(CacheConfig::new());
//! cache.attach(Arc::new(MemoryStore::new()));
//!
//! let key = cache.derive_key("m1", "hello", 0.7, None);
//! cache.set(&key, "{\"response\":\"hi\"}", None).await;
//! assert!(cache.get(&key).await.is_some());
//! # });
//! ```
//!
//! ## Cache Key Derivation
//!
//! Keys cover model, prompt and temperature, plus the agent id and the
//! seven bounded personality / mental-state scalars when a profile is
//! present. Everything else (other decoding knobs, free-text profile
//! fields, the `no_cache` flag) is ignored.

mod error;
mod key;
mod manager;
mod redis_store;
mod store;

pub use error::{CacheError, CacheResult};
pub use key::{CacheKey, CacheKeyDeriver, DEFAULT_NAMESPACE};
pub(crate) use key::render_float;
pub use manager::{CacheConfig, CacheManager, CacheStats};
pub use redis_store::RedisStore;
pub use store::{CacheStore, MemoryStore};
