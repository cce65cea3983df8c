//! 传输层模块：定义生成后端接口及其 HTTP 实现。
//!
//! # Backend Transport
//!
//! The [`Backend`] trait is the only way the core reaches the generation
//! backend. Implementations make exactly one attempt per call and classify
//! failures into [`Error::BackendTimeout`](crate::Error::BackendTimeout),
//! [`Error::BackendRejected`](crate::Error::BackendRejected) or
//! [`Error::BackendTransport`](crate::Error::BackendTransport); retries are
//! layered on top by [`RetryingBackendClient`](crate::client::RetryingBackendClient).

pub mod http;

pub use http::{HttpBackend, HttpBackendConfig};

use crate::Result;
use async_trait::async_trait;

/// Single-shot generation endpoint.
pub const GENERATE_PATH: &str = "/api/generate";
/// Conversational-turn endpoint.
pub const CHAT_PATH: &str = "/api/chat";
/// Model listing, also used as the liveness probe.
pub const TAGS_PATH: &str = "/api/tags";

#[async_trait]
pub trait Backend: Send + Sync {
    /// POST a JSON body and return the decoded JSON reply.
    async fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<serde_json::Value>;

    /// GET a JSON document.
    async fn get_json(&self, path: &str) -> Result<serde_json::Value>;

    /// Cheap liveness probe; never errors.
    async fn is_healthy(&self) -> bool;
}
