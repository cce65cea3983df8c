use crate::{Error, Result};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Buckets tracked before idle (full) ones are first pruned.
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone)]
pub struct RateLimiterSnapshot {
    pub rps: f64,
    pub burst: f64,
    pub tokens: f64,
    /// Estimated wait time until a token is available (ms), if currently empty.
    pub estimated_wait_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Tokens per second.
    pub rps: f64,
    /// Maximum burst size (tokens).
    pub burst: f64,
}

impl RateLimiterConfig {
    pub fn from_rps(rps: f64) -> Option<Self> {
        if !rps.is_finite() || rps < 0.0 {
            return None;
        }
        Some(Self {
            rps,
            burst: rps.max(1.0), // default burst: 1 second worth, at least 1
        })
    }

    /// `n` requests per minute, all of which may arrive in one burst.
    pub fn per_minute(n: u32) -> Self {
        Self {
            rps: f64::from(n) / 60.0,
            burst: f64::from(n),
        }
    }

    /// Set the maximum tokens (burst size)
    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.burst = tokens as f64;
        self
    }

    /// Set the refill rate (tokens per second)
    pub fn with_refill_rate(mut self, rate: f64) -> Self {
        self.rps = rate;
        self
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last: Instant,
}

impl Bucket {
    fn refill(&mut self, cfg: &RateLimiterConfig, now: Instant) {
        let elapsed = now.duration_since(self.last).as_secs_f64();
        if elapsed > 0.0 {
            self.tokens = (self.tokens + elapsed * cfg.rps).min(cfg.burst);
            self.last = now;
        }
    }

    fn wait_for_token(&self, cfg: &RateLimiterConfig) -> Duration {
        if cfg.rps <= 0.0 {
            return Duration::MAX;
        }
        Duration::from_secs_f64((1.0 - self.tokens).max(0.0) / cfg.rps)
    }
}

/// Token-bucket admission control keyed by caller identity.
///
/// Each identity (client address, API key, ...) gets its own bucket. A
/// rejected call reports how long until the next token.
pub struct KeyedRateLimiter {
    cfg: RateLimiterConfig,
    prune_threshold: usize,
    state: Mutex<State>,
}

struct State {
    buckets: HashMap<String, Bucket>,
    /// Map size that triggers the next prune pass; doubles past the survivors
    /// so a map full of draining buckets is not rescanned on every call.
    next_prune_at: usize,
}

impl KeyedRateLimiter {
    pub fn new(cfg: RateLimiterConfig) -> Self {
        Self {
            cfg,
            prune_threshold: PRUNE_THRESHOLD,
            state: Mutex::new(State {
                buckets: HashMap::new(),
                next_prune_at: PRUNE_THRESHOLD,
            }),
        }
    }

    pub fn with_prune_threshold(mut self, threshold: usize) -> Self {
        self.prune_threshold = threshold.max(1);
        self.state.get_mut().next_prune_at = self.prune_threshold;
        self
    }

    /// Admit one call for `identity`, or fail with [`Error::RateLimited`].
    pub async fn check(&self, identity: &str) -> Result<()> {
        let cfg = &self.cfg;
        let now = Instant::now();
        let mut state = self.state.lock().await;
        if state.buckets.len() >= state.next_prune_at {
            Self::prune_locked(cfg, &mut state.buckets, now);
            state.next_prune_at = self.prune_threshold.max(state.buckets.len() * 2);
        }

        let bucket = state.buckets.entry(identity.to_string()).or_insert(Bucket {
            tokens: cfg.burst,
            last: now,
        });
        bucket.refill(cfg, now);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            let retry_after = bucket.wait_for_token(cfg);
            tracing::debug!(
                identity,
                retry_after_ms = retry_after.as_millis() as u64,
                "Rate limit exceeded"
            );
            Err(Error::RateLimited { retry_after })
        }
    }

    pub async fn snapshot(&self, identity: &str) -> RateLimiterSnapshot {
        let cfg = &self.cfg;
        let now = Instant::now();
        let mut state = self.state.lock().await;
        let tokens = match state.buckets.get_mut(identity) {
            Some(bucket) => {
                bucket.refill(cfg, now);
                bucket.tokens
            }
            None => cfg.burst,
        };
        let estimated_wait_ms = if tokens < 1.0 && cfg.rps > 0.0 {
            Some(((1.0 - tokens) / cfg.rps * 1000.0) as u64)
        } else {
            None
        };
        RateLimiterSnapshot {
            rps: cfg.rps,
            burst: cfg.burst,
            tokens,
            estimated_wait_ms,
        }
    }

    /// Number of identities currently tracked.
    pub async fn tracked(&self) -> usize {
        self.state.lock().await.buckets.len()
    }

    fn prune_locked(cfg: &RateLimiterConfig, buckets: &mut HashMap<String, Bucket>, now: Instant) {
        buckets.retain(|_, b| {
            b.refill(cfg, now);
            b.tokens < cfg.burst
        });
    }
}
