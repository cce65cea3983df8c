//! API key admission check.

use crate::{Error, Result};

/// Compares the caller's key header against the configured key.
///
/// With no key configured every caller is admitted.
#[derive(Debug, Clone, Default)]
pub struct ApiKeyGuard {
    expected: Option<String>,
}

impl ApiKeyGuard {
    pub fn new(expected: Option<String>) -> Self {
        Self {
            expected: expected.filter(|k| !k.is_empty()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.expected.is_some()
    }

    pub fn verify(&self, presented: Option<&str>) -> Result<()> {
        let Some(expected) = self.expected.as_deref() else {
            return Ok(());
        };
        match presented {
            Some(key) if constant_time_eq(key.as_bytes(), expected.as_bytes()) => Ok(()),
            _ => Err(Error::Unauthorized),
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_guard_admits_everyone() {
        let guard = ApiKeyGuard::new(None);
        assert!(!guard.is_enabled());
        assert!(guard.verify(None).is_ok());
        assert!(ApiKeyGuard::new(Some(String::new())).verify(None).is_ok());
    }

    #[test]
    fn test_key_checked() {
        let guard = ApiKeyGuard::new(Some("s3cret".into()));
        assert!(guard.verify(Some("s3cret")).is_ok());
        assert!(matches!(guard.verify(Some("s3cre")), Err(Error::Unauthorized)));
        assert!(matches!(guard.verify(Some("s3cres")), Err(Error::Unauthorized)));
        assert!(matches!(guard.verify(None), Err(Error::Unauthorized)));
    }
}
