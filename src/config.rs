//! Gateway configuration.
//!
//! Every field has a default, so an empty YAML document or an empty
//! environment yields a usable configuration. Environment variables use the
//! gateway's historical names (`OLLAMA_BASE_URL`, `REDIS_URL`, ...).

use crate::auth::ApiKeyGuard;
use crate::cache::CacheConfig;
use crate::resilience::{RateLimiterConfig, RetryPolicy, StatusRetry};
use crate::transport::HttpBackendConfig;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_secs: f64,
    pub max_delay_secs: f64,
    pub multiplier: u32,
    /// Upstream statuses worth retrying; ignored when `retry_all` is set.
    pub retry_on_status: Vec<u16>,
    /// Retry every failure alike, upstream statuses included.
    pub retry_all: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 4.0,
            max_delay_secs: 10.0,
            multiplier: 2,
            retry_on_status: Vec::new(),
            retry_all: false,
        }
    }
}

impl RetrySettings {
    pub fn to_policy(&self) -> RetryPolicy {
        let retry_on_status = if self.retry_all {
            StatusRetry::Always
        } else if self.retry_on_status.is_empty() {
            StatusRetry::Never
        } else {
            StatusRetry::Listed(self.retry_on_status.clone())
        };
        RetryPolicy::new()
            .with_max_attempts(self.max_attempts)
            .with_delays(
                secs_to_duration(self.base_delay_secs, Duration::ZERO),
                secs_to_duration(self.max_delay_secs, Duration::MAX),
            )
            .with_multiplier(self.multiplier)
            .with_retry_on_status(retry_on_status)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub backend_base_url: String,
    /// Expected `x-api-key`; `None` disables the check.
    pub api_key: Option<String>,
    pub redis_url: String,
    pub enable_cache: bool,
    pub cache_ttl_secs: u64,
    /// Per-batch bound on in-flight items.
    pub max_concurrent_requests: usize,
    /// Per-attempt backend timeout.
    pub request_timeout_secs: f64,
    pub rate_limit_per_minute: u32,
    pub batch_rate_limit_per_minute: u32,
    pub log_level: String,
    pub retry: RetrySettings,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            backend_base_url: "http://ollama:11434".to_string(),
            api_key: None,
            redis_url: "redis://redis:6379".to_string(),
            enable_cache: true,
            cache_ttl_secs: 3600,
            max_concurrent_requests: 10,
            request_timeout_secs: 120.0,
            rate_limit_per_minute: 60,
            batch_rate_limit_per_minute: 10,
            log_level: "info".to_string(),
            retry: RetrySettings::default(),
        }
    }
}

impl GatewayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable name.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(v) = lookup("OLLAMA_BASE_URL") {
            cfg.backend_base_url = v;
        }
        if let Some(v) = lookup("API_KEY") {
            cfg.api_key = Some(v).filter(|k| !k.is_empty());
        }
        if let Some(v) = lookup("REDIS_URL") {
            cfg.redis_url = v;
        }
        if let Some(v) = lookup("ENABLE_CACHE") {
            cfg.enable_cache = parse_bool("ENABLE_CACHE", &v)?;
        }
        if let Some(v) = lookup("CACHE_TTL") {
            cfg.cache_ttl_secs = parse_var("CACHE_TTL", &v)?;
        }
        if let Some(v) = lookup("MAX_CONCURRENT_REQUESTS") {
            cfg.max_concurrent_requests = parse_var("MAX_CONCURRENT_REQUESTS", &v)?;
        }
        if let Some(v) = lookup("REQUEST_TIMEOUT") {
            cfg.request_timeout_secs = parse_var("REQUEST_TIMEOUT", &v)?;
        }
        if let Some(v) = lookup("RATE_LIMIT_PER_MINUTE") {
            cfg.rate_limit_per_minute = parse_var("RATE_LIMIT_PER_MINUTE", &v)?;
        }
        if let Some(v) = lookup("BATCH_RATE_LIMIT_PER_MINUTE") {
            cfg.batch_rate_limit_per_minute = parse_var("BATCH_RATE_LIMIT_PER_MINUTE", &v)?;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            cfg.log_level = v.to_lowercase();
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let cfg: Self = serde_yaml::from_str(yaml).map_err(|e| {
            Error::configuration_with_context(
                "invalid gateway configuration",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("config_loader"),
            )
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        let backend = url::Url::parse(&self.backend_base_url)
            .map_err(|e| invalid("backend_base_url", e.to_string()))?;
        if !matches!(backend.scheme(), "http" | "https") {
            return Err(invalid("backend_base_url", "scheme must be http or https"));
        }
        if self.enable_cache {
            url::Url::parse(&self.redis_url).map_err(|e| invalid("redis_url", e.to_string()))?;
        }
        if self.cache_ttl_secs == 0 {
            return Err(invalid("cache_ttl_secs", "must be at least 1"));
        }
        if self.max_concurrent_requests == 0 {
            return Err(invalid("max_concurrent_requests", "must be at least 1"));
        }
        if !(self.request_timeout_secs.is_finite() && self.request_timeout_secs > 0.0) {
            return Err(invalid("request_timeout_secs", "must be a positive number"));
        }
        if self.rate_limit_per_minute == 0 || self.batch_rate_limit_per_minute == 0 {
            return Err(invalid("rate_limit_per_minute", "must be at least 1"));
        }
        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts", "must be at least 1"));
        }
        if !(self.retry.base_delay_secs.is_finite() && self.retry.max_delay_secs.is_finite())
            || self.retry.base_delay_secs < 0.0
            || self.retry.max_delay_secs < self.retry.base_delay_secs
        {
            return Err(invalid("retry", "delays must satisfy 0 <= base <= max"));
        }
        Ok(())
    }

    pub fn with_backend_base_url(mut self, url: impl Into<String>) -> Self {
        self.backend_base_url = url.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_enable_cache(mut self, enabled: bool) -> Self {
        self.enable_cache = enabled;
        self
    }

    pub fn with_max_concurrent_requests(mut self, n: usize) -> Self {
        self.max_concurrent_requests = n;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_secs = timeout.as_secs_f64();
        self
    }

    pub fn with_retry(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        secs_to_duration(self.request_timeout_secs, Duration::from_secs(120))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .with_redis_url(self.redis_url.clone())
            .with_ttl(self.cache_ttl())
            .with_enabled(self.enable_cache)
    }

    pub fn backend_config(&self) -> HttpBackendConfig {
        HttpBackendConfig::new(self.backend_base_url.clone())
            .with_request_timeout(self.request_timeout())
    }

    pub fn api_key_guard(&self) -> ApiKeyGuard {
        ApiKeyGuard::new(self.api_key.clone())
    }

    pub fn rate_limiter_config(&self) -> RateLimiterConfig {
        RateLimiterConfig::per_minute(self.rate_limit_per_minute)
    }

    pub fn batch_rate_limiter_config(&self) -> RateLimiterConfig {
        RateLimiterConfig::per_minute(self.batch_rate_limit_per_minute)
    }
}

// Negative or NaN values map to `fallback`, values past `Duration::MAX` saturate.
fn secs_to_duration(secs: f64, fallback: Duration) -> Duration {
    if secs.is_nan() || secs < 0.0 {
        return fallback;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

fn invalid(field: &str, details: impl Into<String>) -> Error {
    Error::configuration_with_context(
        format!("invalid value for {}", field),
        ErrorContext::new()
            .with_field_path(field)
            .with_details(details)
            .with_source("config_loader"),
    )
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| invalid(name, format!("{:?}: {}", raw, e)))
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(name, format!("{:?} is not a boolean", raw))),
    }
}
