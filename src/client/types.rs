use std::time::Duration;

/// Per-call facts, useful for logging and tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallStats {
    pub endpoint: String,
    /// Attempts actually made, including the first.
    pub attempts: u32,
    /// Backoff slept before each retry, in order.
    pub delays: Vec<Duration>,
    /// Wall time of the whole call, backoff included.
    pub duration: Duration,
}

impl CallStats {
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }

    pub fn total_backoff(&self) -> Duration {
        self.delays.iter().sum()
    }
}
