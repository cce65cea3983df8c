use super::{Backend, TAGS_PATH};
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    pub base_url: String,
    /// Per-attempt request timeout.
    pub request_timeout: Duration,
    pub health_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: Duration,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://ollama:11434".to_string(),
            request_timeout: Duration::from_secs(120),
            health_timeout: Duration::from_secs(5),
            pool_max_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
        }
    }
}

impl HttpBackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }
}

/// HTTP client for the generation backend.
///
/// One pooled `reqwest::Client` is shared by every request; it is safe to
/// wrap in an `Arc` and call concurrently.
pub struct HttpBackend {
    client: reqwest::Client,
    config: HttpBackendConfig,
}

impl HttpBackend {
    pub fn new(config: HttpBackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Some(config.pool_idle_timeout))
            .build()
            .map_err(|e| Error::transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn read_json(&self, path: &str, resp: reqwest::Response) -> Result<serde_json::Value> {
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            error!(
                endpoint = path,
                http_status = status.as_u16(),
                "HTTP error from backend"
            );
            return Err(Error::BackendRejected {
                status: status.as_u16(),
                message,
            });
        }
        resp.json().await.map_err(|e| classify(path, e))
    }
}

/// Map a reqwest failure onto the backend error taxonomy.
fn classify(path: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        error!(endpoint = path, "Timeout calling backend");
        Error::BackendTimeout {
            endpoint: path.to_string(),
            attempts: 1,
        }
    } else {
        error!(endpoint = path, error = %err, "Unexpected error calling backend");
        Error::transport(err.to_string())
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<serde_json::Value> {
        let request_id = Uuid::new_v4().to_string();
        debug!(endpoint = path, request_id = request_id.as_str(), "Calling backend");
        let resp = self
            .client
            .post(self.url(path))
            .header("x-request-id", &request_id)
            .json(body)
            .send()
            .await
            .map_err(|e| classify(path, e))?;
        self.read_json(path, resp).await
    }

    async fn get_json(&self, path: &str) -> Result<serde_json::Value> {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| classify(path, e))?;
        self.read_json(path, resp).await
    }

    async fn is_healthy(&self) -> bool {
        match self
            .client
            .get(self.url(TAGS_PATH))
            .timeout(self.config.health_timeout)
            .send()
            .await
        {
            Ok(resp) => resp.status() == reqwest::StatusCode::OK,
            Err(e) => {
                debug!(error = %e, "Backend health probe failed");
                false
            }
        }
    }
}
