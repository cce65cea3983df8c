//! Mock Ollama-style HTTP server for integration tests

use llm_gateway::config::RetrySettings;
use llm_gateway::{Gateway, GatewayConfig};
use mockito::{Matcher, Mock, Server, ServerGuard};

/// Test fixture that owns a mock backend server
pub struct MockServerFixture {
    pub server: ServerGuard,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self { server, base_url }
    }

    /// Cache disabled, so nothing tries to reach Redis.
    pub fn config(&self) -> GatewayConfig {
        GatewayConfig::default()
            .with_backend_base_url(self.base_url.clone())
            .with_enable_cache(false)
    }

    /// Same as [`config`](Self::config) with millisecond backoff, retrying every failure.
    pub fn fast_retry_config(&self) -> GatewayConfig {
        self.config().with_retry(RetrySettings {
            base_delay_secs: 0.01,
            max_delay_secs: 0.02,
            retry_all: true,
            ..RetrySettings::default()
        })
    }

    pub fn gateway(&self, config: GatewayConfig) -> Gateway {
        Gateway::new(config).expect("gateway should build against the mock server")
    }

    /// `POST path` answering `status` with a JSON body, expected `hits` times.
    pub async fn mock_post(&mut self, path: &str, status: usize, body: &str, hits: usize) -> Mock {
        self.server
            .mock("POST", path)
            .match_header("content-type", Matcher::Regex("application/json".into()))
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }

    pub async fn mock_tags(&mut self, status: usize) -> Mock {
        self.server
            .mock("GET", "/api/tags")
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(r#"{"models":[{"name":"mistral:7b","size":4109865159}]}"#)
            .create_async()
            .await
    }
}
