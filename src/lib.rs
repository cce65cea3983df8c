//! # llm-gateway
//!
//! 本地大模型网关核心：缓存键派生、失败开放的响应缓存、带退避的后端重试与有界批量执行。
//!
//! Request orchestration core for a gateway sitting in front of a local LLM
//! backend (an Ollama-style `/api/generate` + `/api/chat` server), serving
//! many simulated agents.
//!
//! ## Overview
//!
//! The gateway answers repeated generation requests from a shared response
//! cache, retries transient backend failures with exponential backoff, and
//! fans batches of requests out under a concurrency bound while isolating
//! each item's failure.
//!
//! ## Core Behaviour
//!
//! - **Deterministic cache keys**: [`cache::CacheKeyDeriver`] hashes model,
//!   prompt, temperature and the numeric agent-profile fields
//! - **Fail-open caching**: [`cache::CacheManager`] never fails a request;
//!   an unreachable store reads as a miss and writes are dropped
//! - **Bounded retries**: [`client::RetryingBackendClient`] makes at most 3
//!   attempts, each with its own timeout, sleeping 4 s then 8 s between them
//! - **Batch isolation**: [`batch::BatchExecutor`] reports results and errors
//!   per index; one item's failure never touches its siblings
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use llm_gateway::{logging, BatchGenerateRequest, Gateway, GatewayConfig, GenerateRequest};
//!
//! #[tokio::main]
//! async fn main() -> llm_gateway::Result<()> {
//!     let config = GatewayConfig::from_env()?;
//!     logging::init_tracing(&config.log_level);
//!
//!     let mut gateway = Gateway::new(config)?;
//!     gateway.start().await;
//!
//!     let batch = BatchGenerateRequest::new(vec![
//!         GenerateRequest::new("mistral:7b", "Describe your morning."),
//!         GenerateRequest::new("mistral:7b", "What worries you today?"),
//!     ]);
//!     let outcome = gateway.batch_generate(batch).await;
//!     println!("{:?}", outcome.summary());
//!
//!     gateway.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Request, response and agent-profile types |
//! | [`cache`] | Key derivation, store protocol, fail-open manager |
//! | [`transport`] | Backend trait and its HTTP implementation |
//! | [`client`] | Retrying backend client |
//! | [`resilience`] | Retry policy and per-caller rate limiting |
//! | [`batch`] | Bounded, failure-isolating batch execution |
//! | [`prompt`] | Agent-profile context injection |
//! | [`gateway`] | The generate / chat / batch / health pipelines |
//! | [`config`] | Configuration from defaults, environment or YAML |

pub mod auth;
pub mod batch;
pub mod cache;
pub mod client;
pub mod config;
pub mod gateway;
pub mod logging;
pub mod prompt;
pub mod resilience;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use batch::{BatchExecutor, BatchResult, BatchSummary};
pub use cache::{CacheKey, CacheKeyDeriver, CacheManager};
pub use client::{CallStats, RetryingBackendClient};
pub use config::GatewayConfig;
pub use gateway::{Gateway, HealthReport, ServiceStatus};
pub use resilience::RetryPolicy;
pub use types::{
    AgentProfile, BatchGenerateRequest, ChatMessage, ChatRequest, ChatResponse, GenerateRequest,
    GenerateResponse, MessageRole,
};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
