//! Backend client with bounded retries.
//!
//! Implementation details are split into submodules under `src/client/`.

pub mod retrying;
pub mod types;

pub use retrying::RetryingBackendClient;
pub use types::CallStats;
