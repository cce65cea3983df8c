//! 批处理模块：在并发上限内扇出多个请求，并按索引隔离成功与失败。
//!
//! # Batch Fan-out Module
//!
//! [`BatchExecutor`] dispatches a list of independent requests through the
//! same single-item pipeline used for standalone calls, with at most
//! `concurrency_limit` invocations in flight.
//!
//! ## Guarantees
//!
//! - Every item is submitted exactly once.
//! - One item's failure never cancels or alters another item.
//! - Results carry their original index; completion order is irrelevant.
//! - Counters (total / successful / failed / duration) are derived from the
//!   result, not tracked separately.
//!
//! ## Example
//!
//! ```rust
//! use llm_gateway::batch::BatchExecutor;
//!
//! # tokio_test::block_on(async {
//! let result = BatchExecutor::new(2)
//!     .run(vec![1, 2, 3], |_, x| async move { Ok(x * 2) })
//!     .await;
//! assert_eq!(result.successful(), 3);
//! assert_eq!(result.results, vec![(0, 2), (1, 4), (2, 6)]);
//! # });
//! ```

mod executor;

pub use executor::{BatchExecutor, BatchResult, BatchSummary};
