//! Tracing subscriber bootstrap.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, EnvFilter};

static INITIALIZED: OnceLock<bool> = OnceLock::new();

/// Install a `fmt` subscriber filtered at `default_level`.
///
/// `RUST_LOG`, when set, takes precedence. Safe to call more than once; only
/// the first call has an effect, and an already-installed global subscriber
/// (from an embedding application) is left alone. Returns whether this call
/// installed the subscriber.
pub fn init_tracing(default_level: &str) -> bool {
    let mut installed_now = false;
    INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_level))
            .unwrap_or_else(|_| EnvFilter::new("info"));
        installed_now = fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
            .is_ok();
        installed_now
    });
    installed_now
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_noop() {
        let _ = init_tracing("debug");
        assert!(!init_tracing("info"));
    }
}
