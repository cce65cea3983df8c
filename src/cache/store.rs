//! Key-value store protocol and the in-process implementation.

use super::error::{CacheError, CacheResult};
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// The narrow get / set-with-expiry / delete / scan / ping protocol the
/// cache layer needs from its external store.
///
/// Each single-key operation is assumed atomic on its own; nothing here
/// relies on cross-key transactions.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, expiring after `ttl` (rounded up to whole seconds, min 1).
    async fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()>;

    /// Remove keys, returning how many existed.
    async fn delete(&self, keys: &[String]) -> CacheResult<u64>;

    /// One incremental scan step. Start with cursor 0; a returned cursor of 0 means done.
    async fn scan(&self, cursor: u64, pattern: &str, count: usize)
        -> CacheResult<(u64, Vec<String>)>;

    /// Liveness round-trip.
    async fn ping(&self) -> CacheResult<()>;

    fn name(&self) -> &'static str;
}

pub(crate) fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

struct StoredValue {
    data: Vec<u8>,
    expires_at: Instant,
    seq: u64,
}

impl StoredValue {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Default)]
struct Entries {
    values: HashMap<String, StoredValue>,
    last_seq: u64,
}

/// In-process [`CacheStore`] with per-entry expiry and cursor scans.
///
/// Every key gets an insertion sequence number and scans walk keys in that
/// order, so the cursor stays valid while keys are deleted mid-scan. Keys
/// written during a scan may or may not be returned.
pub struct MemoryStore {
    entries: Mutex<Entries>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
        }
    }

    /// Number of live (non-expired) entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .values
            .values()
            .filter(|e| !e.is_expired(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        match entries.values.get(key) {
            Some(e) if e.is_expired(now) => {
                entries.values.remove(key);
                Ok(None)
            }
            Some(e) => Ok(Some(e.data.clone())),
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        let expires_at = Instant::now() + Duration::from_secs(ttl_seconds(ttl));
        let mut entries = self.entries.lock().await;
        let existing = entries.values.get(key).map(|e| e.seq);
        let seq = match existing {
            Some(seq) => seq,
            None => {
                entries.last_seq += 1;
                entries.last_seq
            }
        };
        entries.values.insert(
            key.to_string(),
            StoredValue {
                data: value.to_vec(),
                expires_at,
                seq,
            },
        );
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<u64> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let mut removed = 0;
        for key in keys {
            if let Some(e) = entries.values.remove(key) {
                if !e.is_expired(now) {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    async fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> CacheResult<(u64, Vec<String>)> {
        let matcher = compile_glob(pattern)?;
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        entries.values.retain(|_, e| !e.is_expired(now));

        let mut window: Vec<(u64, &String)> = entries
            .values
            .iter()
            .filter(|(_, e)| e.seq >= cursor)
            .map(|(k, e)| (e.seq, k))
            .collect();
        window.sort_unstable_by_key(|(seq, _)| *seq);

        let count = count.max(1);
        let next = window.get(count).map(|(seq, _)| *seq).unwrap_or(0);
        let matched = window
            .iter()
            .take(count)
            .filter(|(_, k)| matcher.is_match(k))
            .map(|(_, k)| k.to_string())
            .collect();
        Ok((next, matched))
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Translate a Redis-style glob (`*`, `?`, `[...]`, `\x`) into an anchored regex.
pub(crate) fn compile_glob(pattern: &str) -> CacheResult<Regex> {
    let invalid = |reason: &str| CacheError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    };
    if pattern.is_empty() {
        return Err(invalid("pattern is empty"));
    }

    let mut re = String::with_capacity(pattern.len() * 2 + 2);
    re.push('^');
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            '\\' => match chars.next() {
                Some(escaped) => re.push_str(&regex::escape(&escaped.to_string())),
                None => return Err(invalid("trailing escape")),
            },
            '[' => {
                re.push('[');
                if chars.peek() == Some(&'^') {
                    chars.next();
                    re.push('^');
                }
                let mut closed = false;
                let mut empty = true;
                while let Some(inner) = chars.next() {
                    match inner {
                        ']' if !empty => {
                            closed = true;
                            break;
                        }
                        '\\' => match chars.next() {
                            Some(escaped) => re.push_str(&regex::escape(&escaped.to_string())),
                            None => return Err(invalid("trailing escape")),
                        },
                        '-' => re.push('-'),
                        other => re.push_str(&regex::escape(&other.to_string())),
                    }
                    empty = false;
                }
                if !closed {
                    return Err(invalid("unterminated character class"));
                }
                re.push(']');
            }
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).map_err(|e| invalid(&e.to_string()))
}
