//! 重试调用逻辑：在固定次数上限内以指数退避重试单次后端调用。
//!
//! Retrying backend call wrapper.

use super::types::CallStats;
use crate::resilience::{Decision, RetryPolicy};
use crate::transport::Backend;
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, warn};

/// Wraps a [`Backend`] with the retry state machine.
///
/// Every attempt gets the full per-attempt timeout; the budget is not
/// shared across attempts. The attempt ceiling in [`RetryPolicy`] bounds
/// the call regardless of failure kind.
#[derive(Clone)]
pub struct RetryingBackendClient {
    backend: Arc<dyn Backend>,
    policy: RetryPolicy,
    attempt_timeout: Duration,
}

impl RetryingBackendClient {
    pub fn new(backend: Arc<dyn Backend>, policy: RetryPolicy, attempt_timeout: Duration) -> Self {
        Self {
            backend,
            policy,
            attempt_timeout,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub async fn call(&self, endpoint: &str, payload: &serde_json::Value) -> Result<serde_json::Value> {
        self.call_with_stats(endpoint, payload).await.0
    }

    pub async fn call_with_stats(
        &self,
        endpoint: &str,
        payload: &serde_json::Value,
    ) -> (Result<serde_json::Value>, CallStats) {
        let start = Instant::now();
        let mut stats = CallStats {
            endpoint: endpoint.to_string(),
            ..CallStats::default()
        };

        let result = loop {
            stats.attempts += 1;
            let attempt = stats.attempts;

            let outcome = match tokio::time::timeout(
                self.attempt_timeout,
                self.backend.post_json(endpoint, payload),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(Error::BackendTimeout {
                    endpoint: endpoint.to_string(),
                    attempts: attempt,
                }),
            };

            let err = match outcome {
                Ok(value) => break Ok(value),
                Err(e) => e,
            };

            match self.policy.decide(&err, attempt) {
                Decision::Retry { delay } => {
                    warn!(
                        endpoint,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Backend call failed, retrying"
                    );
                    stats.delays.push(delay);
                    tokio::time::sleep(delay).await;
                }
                Decision::Fail => {
                    error!(endpoint, attempts = attempt, error = %err, "Backend call failed");
                    break Err(finalize(err, attempt));
                }
            }
        };

        stats.duration = start.elapsed();
        (result, stats)
    }
}

// Timeouts report the total attempt count, not the attempt that produced them.
fn finalize(err: Error, attempts: u32) -> Error {
    match err {
        Error::BackendTimeout { endpoint, .. } => Error::BackendTimeout { endpoint, attempts },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::StatusRetry;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Replays a scripted sequence of outcomes, then repeats the last one.
    struct Scripted {
        script: Mutex<VecDeque<Result<serde_json::Value>>>,
        calls: AtomicU32,
        hang: bool,
    }

    impl Scripted {
        fn new(script: Vec<Result<serde_json::Value>>) -> Self {
            Self { script: Mutex::new(script.into()), calls: AtomicU32::new(0), hang: false }
        }
        fn hanging() -> Self {
            Self { script: Mutex::new(VecDeque::new()), calls: AtomicU32::new(0), hang: true }
        }
    }

    fn replay(r: &Result<serde_json::Value>) -> Result<serde_json::Value> {
        match r {
            Ok(v) => Ok(v.clone()),
            Err(Error::BackendRejected { status, message }) => {
                Err(Error::BackendRejected { status: *status, message: message.clone() })
            }
            Err(Error::BackendTimeout { endpoint, attempts }) => {
                Err(Error::BackendTimeout { endpoint: endpoint.clone(), attempts: *attempts })
            }
            Err(e) => Err(Error::transport(e.to_string())),
        }
    }

    #[async_trait]
    impl Backend for Scripted {
        async fn post_json(&self, _: &str, _: &serde_json::Value) -> Result<serde_json::Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                std::future::pending::<()>().await;
            }
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                let next = script.pop_front().unwrap();
                replay(&next)
            } else {
                replay(script.front().unwrap())
            }
        }
        async fn get_json(&self, _: &str) -> Result<serde_json::Value> {
            Ok(json!({}))
        }
        async fn is_healthy(&self) -> bool {
            true
        }
    }

    fn client(backend: Arc<Scripted>, policy: RetryPolicy) -> RetryingBackendClient {
        RetryingBackendClient::new(backend, policy, Duration::from_secs(120))
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_timing_out_makes_exactly_three_attempts() {
        let backend = Arc::new(Scripted::hanging());
        let c = client(backend.clone(), RetryPolicy::default());
        let start = Instant::now();

        let (result, stats) = c.call_with_stats("/api/generate", &json!({})).await;

        match result {
            Err(Error::BackendTimeout { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected timeout, got {:?}", other),
        }
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
        assert_eq!(stats.attempts, 3);
        assert_eq!(stats.delays, vec![Duration::from_secs(4), Duration::from_secs(8)]);
        assert!(stats.delays.windows(2).all(|w| w[0] <= w[1]));
        // three full attempt timeouts plus the two backoff sleeps
        assert_eq!(start.elapsed(), Duration::from_secs(3 * 120 + 12));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failure() {
        let backend = Arc::new(Scripted::new(vec![
            Err(Error::transport("connection reset")),
            Ok(json!({"response": "ok"})),
        ]));
        let c = client(backend.clone(), RetryPolicy::default());
        let (result, stats) = c.call_with_stats("/api/generate", &json!({})).await;
        assert_eq!(result.unwrap()["response"], "ok");
        assert_eq!(stats.attempts, 2);
        assert_eq!(stats.retries(), 1);
        assert_eq!(stats.total_backoff(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_upstream_status_is_terminal_by_default() {
        let backend = Arc::new(Scripted::new(vec![Err(Error::BackendRejected {
            status: 404,
            message: "model 'nope' not found".into(),
        })]));
        let c = client(backend.clone(), RetryPolicy::default());
        let err = c.call("/api/generate", &json!({})).await.unwrap_err();
        match err {
            Error::BackendRejected { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "model 'nope' not found");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_uniform_policy_exhausts_attempts_on_status() {
        let backend = Arc::new(Scripted::new(vec![Err(Error::BackendRejected {
            status: 500,
            message: "overloaded".into(),
        })]));
        let c = client(backend.clone(), RetryPolicy::uniform());
        let err = c.call("/api/generate", &json!({})).await.unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_listed_status_retried_then_succeeds() {
        let backend = Arc::new(Scripted::new(vec![
            Err(Error::BackendRejected { status: 503, message: String::new() }),
            Ok(json!({"message": {"role": "assistant", "content": "hi"}})),
        ]));
        let policy = RetryPolicy::new().with_retry_on_status(StatusRetry::Listed(vec![503]));
        let c = client(backend.clone(), policy);
        assert!(c.call("/api/chat", &json!({})).await.is_ok());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_surfaces_after_exhaustion() {
        let backend = Arc::new(Scripted::new(vec![Err(Error::transport("dns failure"))]));
        let c = client(backend.clone(), RetryPolicy::default());
        let err = c.call("/api/generate", &json!({})).await.unwrap_err();
        assert!(matches!(err, Error::BackendTransport { .. }));
        assert_eq!(err.status_code(), 500);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    }
}
