//! 弹性模式模块：提供重试退避策略与按调用方限流。
//!
//! # Resilience Primitives Module
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`RetryPolicy`] | Attempt ceiling, exponential backoff and failure classification |
//! | [`KeyedRateLimiter`] | Per-identity token bucket for request admission |
//!
//! ## Retry Policy
//!
//! ```rust
//! use llm_gateway::resilience::{Decision, RetryPolicy};
//! use llm_gateway::Error;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::default(); // 3 attempts, 4s base, 10s cap
//! let err = Error::transport("connection reset");
//! assert_eq!(
//!     policy.decide(&err, 1),
//!     Decision::Retry { delay: Duration::from_secs(4) }
//! );
//! assert_eq!(policy.decide(&err, 3), Decision::Fail);
//! ```

pub mod rate_limiter;
pub mod retry;

pub use rate_limiter::{KeyedRateLimiter, RateLimiterConfig, RateLimiterSnapshot};
pub use retry::{Decision, RetryPolicy, StatusRetry};
