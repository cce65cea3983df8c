//! Cache manager.

use super::error::CacheError;
use super::key::{CacheKey, CacheKeyDeriver};
use super::redis_store::{redact_url, RedisStore};
use super::store::CacheStore;
use crate::types::AgentProfile;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub redis_url: String,
    pub default_ttl: Duration,
    pub enabled: bool,
    /// Keys examined per incremental scan step in [`CacheManager::clear_pattern`].
    pub scan_page_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://redis:6379".to_string(),
            default_ttl: Duration::from_secs(3600),
            enabled: true,
            scan_page_size: 100,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self { Self::default() }
    pub fn with_redis_url(mut self, url: impl Into<String>) -> Self { self.redis_url = url.into(); self }
    pub fn with_ttl(mut self, ttl: Duration) -> Self { self.default_ttl = ttl; self }
    pub fn with_enabled(mut self, enabled: bool) -> Self { self.enabled = enabled; self }
    pub fn with_scan_page_size(mut self, size: usize) -> Self { self.scan_page_size = size.max(1); self }
}

#[derive(Debug, Clone, Default)]
pub struct CacheStats { pub hits: u64, pub misses: u64, pub sets: u64, pub deletes: u64, pub errors: u64 }

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 { let total = self.hits + self.misses; if total == 0 { 0.0 } else { self.hits as f64 / total as f64 } }
}

struct AtomicStats { hits: AtomicU64, misses: AtomicU64, sets: AtomicU64, deletes: AtomicU64, errors: AtomicU64 }
impl AtomicStats {
    fn new() -> Self { Self { hits: AtomicU64::new(0), misses: AtomicU64::new(0), sets: AtomicU64::new(0), deletes: AtomicU64::new(0), errors: AtomicU64::new(0) } }
    fn to_stats(&self) -> CacheStats { CacheStats { hits: self.hits.load(Ordering::Relaxed), misses: self.misses.load(Ordering::Relaxed), sets: self.sets.load(Ordering::Relaxed), deletes: self.deletes.load(Ordering::Relaxed), errors: self.errors.load(Ordering::Relaxed) } }
}

/// Fail-open response cache.
///
/// Holds the process-wide store handle. Without a live store every
/// operation is a no-op that reports a miss, and store errors on a live
/// store are logged and absorbed: nothing here can fail a request.
pub struct CacheManager {
    config: CacheConfig,
    deriver: CacheKeyDeriver,
    store: Option<Arc<dyn CacheStore>>,
    stats: Arc<AtomicStats>,
}

impl CacheManager {
    /// A manager with no store attached yet; call [`connect`](Self::connect) or [`attach`](Self::attach).
    pub fn new(config: CacheConfig) -> Self {
        Self { config, deriver: CacheKeyDeriver::new(), store: None, stats: Arc::new(AtomicStats::new()) }
    }

    pub fn with_deriver(mut self, deriver: CacheKeyDeriver) -> Self {
        self.deriver = deriver;
        self
    }

    /// Connect to the configured Redis store. On failure the manager stays disabled.
    pub async fn connect(&mut self) {
        if !self.config.enabled {
            info!("Response cache disabled by configuration");
            return;
        }
        match RedisStore::connect(&self.config.redis_url).await {
            Ok(store) => {
                info!(url = %redact_url(&self.config.redis_url), "Connected to Redis cache");
                self.store = Some(Arc::new(store));
            }
            Err(e) => {
                error!(url = %redact_url(&self.config.redis_url), error = %e, "Failed to connect to Redis, caching disabled");
                self.store = None;
            }
        }
    }

    /// Use an already-open store.
    pub fn attach(&mut self, store: Arc<dyn CacheStore>) {
        if self.config.enabled {
            self.store = Some(store);
        }
    }

    pub fn disconnect(&mut self) {
        if let Some(store) = self.store.take() {
            info!(backend = store.name(), "Cache store disconnected");
        }
    }

    pub fn is_enabled(&self) -> bool { self.store.is_some() }
    pub fn config(&self) -> &CacheConfig { &self.config }
    pub fn stats(&self) -> CacheStats { self.stats.to_stats() }
    pub fn backend_name(&self) -> Option<&'static str> { self.store.as_ref().map(|s| s.name()) }

    pub fn derive_key(&self, model: &str, prompt: &str, temperature: f64, profile: Option<&AgentProfile>) -> CacheKey {
        self.deriver.derive(model, prompt, temperature, profile)
    }

    pub async fn get(&self, key: &CacheKey) -> Option<String> {
        let store = self.store.as_ref()?;
        match store.get(key.as_str()).await {
            Ok(Some(data)) => match String::from_utf8(data) {
                Ok(value) => {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, "Cache hit");
                    Some(value)
                }
                Err(e) => {
                    self.absorb("get", &CacheError::Decode(e.to_string()));
                    None
                }
            },
            Ok(None) => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "Cache miss");
                None
            }
            Err(e) => {
                self.absorb("get", &e);
                None
            }
        }
    }

    pub async fn set(&self, key: &CacheKey, value: &str, ttl: Option<Duration>) {
        let Some(store) = self.store.as_ref() else { return };
        let ttl = ttl.unwrap_or(self.config.default_ttl);
        match store.set_ex(key.as_str(), value.as_bytes(), ttl).await {
            Ok(()) => {
                self.stats.sets.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, ttl_secs = ttl.as_secs(), "Cached response");
            }
            Err(e) => self.absorb("set", &e),
        }
    }

    pub async fn delete(&self, key: &CacheKey) {
        let Some(store) = self.store.as_ref() else { return };
        match store.delete(&[key.as_str().to_string()]).await {
            Ok(n) => { self.stats.deletes.fetch_add(n, Ordering::Relaxed); }
            Err(e) => self.absorb("delete", &e),
        }
    }

    /// Typed read: an undecodable entry counts as a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let raw = self.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                self.absorb("get", &CacheError::Decode(e.to_string()));
                None
            }
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Option<Duration>) {
        if self.store.is_none() {
            return;
        }
        match serde_json::to_string(value) {
            Ok(raw) => self.set(key, &raw, ttl).await,
            Err(e) => self.absorb("set", &CacheError::Decode(e.to_string())),
        }
    }

    /// Remove every key matching a glob, scanning incrementally.
    ///
    /// Returns the number of keys removed before completion or the first
    /// failure. A pattern the store rejects is logged at `error` and counted,
    /// like any other cache error.
    pub async fn clear_pattern(&self, pattern: &str) -> u64 {
        let Some(store) = self.store.as_ref() else { return 0 };
        match self.scan_and_delete(store.as_ref(), pattern).await {
            Ok(removed) => {
                info!(pattern, removed, "Cleared cache keys");
                removed
            }
            Err((removed, e)) => {
                self.absorb("clear_pattern", &e);
                removed
            }
        }
    }

    async fn scan_and_delete(&self, store: &dyn CacheStore, pattern: &str) -> std::result::Result<u64, (u64, CacheError)> {
        let mut cursor = 0u64;
        let mut removed = 0u64;
        loop {
            let (next, keys) = store.scan(cursor, pattern, self.config.scan_page_size).await.map_err(|e| (removed, e))?;
            if !keys.is_empty() {
                let n = store.delete(&keys).await.map_err(|e| (removed, e))?;
                removed += n;
                self.stats.deletes.fetch_add(n, Ordering::Relaxed);
            }
            if next == 0 {
                return Ok(removed);
            }
            cursor = next;
        }
    }

    /// True only when a live round-trip to the store succeeds.
    pub async fn health_check(&self) -> bool {
        let Some(store) = self.store.as_ref() else { return false };
        match store.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Cache health probe failed");
                false
            }
        }
    }

    fn absorb(&self, op: &'static str, err: &CacheError) {
        self.stats.errors.fetch_add(1, Ordering::Relaxed);
        if err.is_store_failure() {
            warn!(op, error = %err, "Cache store error, continuing without cache");
        } else {
            error!(op, error = %err, "Unexpected cache error, continuing without cache");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheResult, MemoryStore};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct DownStore;

    #[async_trait]
    impl CacheStore for DownStore {
        async fn get(&self, _: &str) -> CacheResult<Option<Vec<u8>>> { Err(CacheError::Connection("refused".into())) }
        async fn set_ex(&self, _: &str, _: &[u8], _: Duration) -> CacheResult<()> { Err(CacheError::Connection("refused".into())) }
        async fn delete(&self, _: &[String]) -> CacheResult<u64> { Err(CacheError::Connection("refused".into())) }
        async fn scan(&self, _: u64, _: &str, _: usize) -> CacheResult<(u64, Vec<String>)> { Err(CacheError::Connection("refused".into())) }
        async fn ping(&self) -> CacheResult<()> { Err(CacheError::Connection("refused".into())) }
        fn name(&self) -> &'static str { "down" }
    }

    struct CountingStore {
        inner: MemoryStore,
        scans: AtomicUsize,
    }

    #[async_trait]
    impl CacheStore for CountingStore {
        async fn get(&self, k: &str) -> CacheResult<Option<Vec<u8>>> { self.inner.get(k).await }
        async fn set_ex(&self, k: &str, v: &[u8], t: Duration) -> CacheResult<()> { self.inner.set_ex(k, v, t).await }
        async fn delete(&self, k: &[String]) -> CacheResult<u64> { self.inner.delete(k).await }
        async fn scan(&self, c: u64, p: &str, n: usize) -> CacheResult<(u64, Vec<String>)> {
            self.scans.fetch_add(1, Ordering::SeqCst);
            self.inner.scan(c, p, n).await
        }
        async fn ping(&self) -> CacheResult<()> { Ok(()) }
        fn name(&self) -> &'static str { "counting" }
    }

    fn manager_with(store: Arc<dyn CacheStore>) -> CacheManager {
        let mut m = CacheManager::new(CacheConfig::new());
        m.attach(store);
        m
    }

    #[tokio::test]
    async fn test_disconnected_manager_is_noop() {
        let m = CacheManager::new(CacheConfig::new());
        let key = m.derive_key("m1", "hello", 0.7, None);
        assert!(!m.is_enabled());
        assert_eq!(m.get(&key).await, None);
        m.set(&key, "v", None).await;
        m.delete(&key).await;
        assert_eq!(m.clear_pattern("llm:cache:*").await, 0);
        assert!(!m.health_check().await);
        assert_eq!(m.stats().errors, 0);
    }

    #[tokio::test]
    async fn test_store_outage_is_absorbed() {
        let m = manager_with(Arc::new(DownStore));
        let key = CacheKey::from("llm:cache:k");
        assert_eq!(m.get(&key).await, None);
        m.set(&key, "v", Some(Duration::from_secs(5))).await;
        m.delete(&key).await;
        assert_eq!(m.clear_pattern("llm:cache:*").await, 0);
        assert!(!m.health_check().await);
        assert_eq!(m.stats().errors, 4);
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let m = manager_with(Arc::new(MemoryStore::new()));
        let key = m.derive_key("m1", "hello", 0.7, None);
        assert_eq!(m.get(&key).await, None);
        m.set(&key, "cached", None).await;
        assert_eq!(m.get(&key).await.as_deref(), Some("cached"));
        m.delete(&key).await;
        assert_eq!(m.get(&key).await, None);

        let stats = m.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.sets, 1);
        assert_eq!(stats.deletes, 1);
        assert!((stats.hit_ratio() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_json_helpers_treat_garbage_as_miss() {
        let m = manager_with(Arc::new(MemoryStore::new()));
        let key = CacheKey::from("llm:cache:json");
        m.set(&key, "not json", None).await;
        assert_eq!(m.get_json::<serde_json::Value>(&key).await, None);
        assert_eq!(m.stats().errors, 1);

        m.set_json(&key, &serde_json::json!({"a": 1}), None).await;
        assert_eq!(m.get_json::<serde_json::Value>(&key).await, Some(serde_json::json!({"a": 1})));
    }

    #[tokio::test]
    async fn test_clear_pattern_scans_in_pages() {
        let store = Arc::new(CountingStore { inner: MemoryStore::new(), scans: AtomicUsize::new(0) });
        let mut m = CacheManager::new(CacheConfig::new().with_scan_page_size(2));
        m.attach(store.clone());
        for i in 0..5 {
            m.set(&CacheKey::from(format!("llm:cache:{}", i)), "v", None).await;
        }
        m.set(&CacheKey::from("other:1"), "v", None).await;

        assert_eq!(m.clear_pattern("llm:cache:*").await, 5);
        assert_eq!(store.scans.load(Ordering::SeqCst), 3);
        assert_eq!(store.inner.len().await, 1);
        assert!(m.get(&CacheKey::from("other:1")).await.is_some());
    }

    #[tokio::test]
    async fn test_clear_pattern_absorbs_malformed_glob() {
        let m = manager_with(Arc::new(MemoryStore::new()));
        let key = m.derive_key("m1", "hello", 0.7, None);
        m.set(&key, "v", None).await;

        assert_eq!(m.clear_pattern("llm:cache:[").await, 0);
        assert_eq!(m.clear_pattern("").await, 0);
        assert_eq!(m.stats().errors, 2);
        assert!(m.get(&key).await.is_some());
    }

    #[tokio::test]
    async fn test_disabled_config_ignores_attach() {
        let mut m = CacheManager::new(CacheConfig::new().with_enabled(false));
        m.attach(Arc::new(MemoryStore::new()));
        assert!(!m.is_enabled());
        m.connect().await;
        assert!(!m.is_enabled());
    }

    #[tokio::test]
    async fn test_health_and_disconnect() {
        let mut m = manager_with(Arc::new(MemoryStore::new()));
        assert!(m.health_check().await);
        assert_eq!(m.backend_name(), Some("memory"));
        m.disconnect();
        assert!(!m.health_check().await);
        assert_eq!(m.backend_name(), None);
    }
}
