//! 网关编排：校验、缓存、画像注入、带重试的后端调用与批量扇出。
//!
//! # Gateway
//!
//! [`Gateway`] ties the pieces together for one deployment: a
//! [`CacheManager`], a [`RetryingBackendClient`] and the [`GatewayConfig`]
//! they were built from. HTTP routing, admission (see
//! [`ApiKeyGuard`](crate::auth::ApiKeyGuard) and
//! [`KeyedRateLimiter`](crate::resilience::KeyedRateLimiter)) and response
//! rendering belong to the embedding service.
//!
//! ```no_run
//! use llm_gateway::{Gateway, GatewayConfig, GenerateRequest};
//!
//! # async fn run() -> llm_gateway::Result<()> {
//! let mut gateway = Gateway::new(GatewayConfig::from_env()?)?;
//! gateway.start().await;
//! let reply = gateway.generate(GenerateRequest::new("mistral:7b", "hello")).await?;
//! println!("{}", reply.response);
//! gateway.shutdown().await;
//! # Ok(())
//! # }
//! ```

use crate::batch::{BatchExecutor, BatchResult};
use crate::cache::{CacheManager, CacheStore};
use crate::client::RetryingBackendClient;
use crate::config::GatewayConfig;
use crate::prompt::{add_agent_context_to_messages, format_prompt_with_profile};
use crate::transport::{Backend, HttpBackend, CHAT_PATH, GENERATE_PATH, TAGS_PATH};
use crate::types::{
    BatchGenerateRequest, ChatRequest, ChatResponse, GenerateRequest, GenerateResponse,
};
use crate::Result;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Unhealthy,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceHealth {
    pub backend: ServiceStatus,
    pub cache: ServiceStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// `healthy` or `unhealthy`.
    pub status: ServiceStatus,
    pub timestamp: String,
    pub services: ServiceHealth,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == ServiceStatus::Healthy
    }
}

pub struct Gateway {
    config: GatewayConfig,
    cache: CacheManager,
    client: RetryingBackendClient,
}

impl Gateway {
    /// Build a gateway talking HTTP to the configured backend.
    ///
    /// The cache stays detached until [`start`](Self::start).
    pub fn new(config: GatewayConfig) -> Result<Self> {
        config.validate()?;
        let backend = HttpBackend::new(config.backend_config())?;
        Self::with_backend(config, Arc::new(backend))
    }

    /// Build a gateway over any [`Backend`] implementation.
    pub fn with_backend(config: GatewayConfig, backend: Arc<dyn Backend>) -> Result<Self> {
        config.validate()?;
        let client =
            RetryingBackendClient::new(backend, config.retry.to_policy(), config.request_timeout());
        let cache = CacheManager::new(config.cache_config());
        Ok(Self {
            config,
            cache,
            client,
        })
    }

    /// Use an already-open cache store instead of connecting to Redis.
    pub fn with_cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache.attach(store);
        self
    }

    /// Connect the cache store. A store that cannot be reached leaves caching
    /// disabled; startup itself never fails on it.
    pub async fn start(&mut self) {
        if !self.cache.is_enabled() {
            self.cache.connect().await;
        }
        info!(
            backend = %self.config.backend_base_url,
            cache = self.cache.backend_name().unwrap_or("disabled"),
            max_concurrent_requests = self.config.max_concurrent_requests,
            "LLM gateway started"
        );
    }

    pub async fn shutdown(&mut self) {
        self.cache.disconnect();
        info!("LLM gateway shut down");
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    pub fn client(&self) -> &RetryingBackendClient {
        &self.client
    }

    /// Generate a completion, serving from cache when possible.
    ///
    /// The key is derived from the caller's prompt, before persona injection.
    /// A hit returns the stored response as-is.
    pub async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        request.validate()?;

        let key = if request.no_cache {
            None
        } else {
            Some(self.cache.derive_key(
                &request.model,
                &request.prompt,
                request.temperature,
                request.agent_profile.as_ref(),
            ))
        };

        if let Some(key) = &key {
            if let Some(hit) = self.cache.get_json::<GenerateResponse>(key).await {
                debug!(model = %request.model, key = %key, "Serving cached generation");
                return Ok(hit);
            }
        }

        let prompt = match &request.agent_profile {
            Some(profile) => format_prompt_with_profile(&request.prompt, profile),
            None => request.prompt.clone(),
        };
        let payload = json!({
            "model": request.model,
            "prompt": prompt,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "top_p": request.top_p,
            "top_k": request.top_k,
            "stream": false,
        });

        let raw = self.client.call(GENERATE_PATH, &payload).await?;
        let response = GenerateResponse::from_backend(&request.model, &raw)?;

        if let Some(key) = &key {
            self.cache
                .set_json(key, &response, Some(self.config.cache_ttl()))
                .await;
        }
        Ok(response)
    }

    /// Chat completion. Never cached.
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        request.validate()?;

        let messages = match &request.agent_profile {
            Some(profile) => add_agent_context_to_messages(&request.messages, profile),
            None => request.messages.clone(),
        };
        let payload = json!({
            "model": request.model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "stream": false,
        });

        let raw = self.client.call(CHAT_PATH, &payload).await?;
        ChatResponse::from_backend(&request.model, &raw)
    }

    /// Run every request through [`generate`](Self::generate), at most
    /// `max_concurrent_requests` at a time (one at a time when the batch is
    /// not parallel). Failures are reported per index.
    pub async fn batch_generate(&self, batch: BatchGenerateRequest) -> BatchResult<GenerateResponse> {
        let executor = if batch.parallel {
            BatchExecutor::new(self.config.max_concurrent_requests)
        } else {
            BatchExecutor::sequential()
        };
        let this = self;
        executor
            .run(batch.requests, move |_, request| this.generate(request))
            .await
    }

    pub async fn health(&self) -> HealthReport {
        let backend_up = self.client.backend().is_healthy().await;
        let (cache, cache_ok) = if !self.config.enable_cache {
            (ServiceStatus::Disabled, true)
        } else if self.cache.health_check().await {
            (ServiceStatus::Healthy, true)
        } else {
            (ServiceStatus::Disabled, false)
        };

        let backend = if backend_up {
            ServiceStatus::Healthy
        } else {
            ServiceStatus::Unhealthy
        };
        let status = if backend_up && cache_ok {
            ServiceStatus::Healthy
        } else {
            ServiceStatus::Unhealthy
        };

        HealthReport {
            status,
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
            services: ServiceHealth { backend, cache },
        }
    }

    /// Raw model listing from the backend. Single attempt.
    pub async fn list_models(&self) -> Result<serde_json::Value> {
        self.client.backend().get_json(TAGS_PATH).await
    }
}
