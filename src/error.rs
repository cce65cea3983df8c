use crate::cache::CacheError;
use std::time::Duration;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path that caused the error (e.g., "request.temperature", "agent_profile.personality.openness")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., accepted range, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "request_validator", "config_loader")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the gateway core.
///
/// Backend failures are classified into timeout / rejected / transport so the
/// surrounding HTTP layer can pick a status code without inspecting messages.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Backend timeout calling {endpoint} after {attempts} attempt(s)")]
    BackendTimeout { endpoint: String, attempts: u32 },

    #[error("Backend rejected request: HTTP {status}: {message}")]
    BackendRejected { status: u16, message: String },

    #[error("Backend transport error: {message}")]
    BackendTransport { message: String },

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Invalid API key")]
    Unauthorized,

    #[error("Rate limit exceeded, retry after {}ms", .retry_after.as_millis())]
    RateLimited { retry_after: Duration },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new validation error with structured context
    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Error::BackendTransport {
            message: msg.into(),
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Validation { context, .. } | Error::Configuration { context, .. } => {
                Some(context)
            }
            _ => None,
        }
    }

    /// Whether this failure is a backend failure a retry could plausibly fix.
    ///
    /// Upstream statuses are not covered here: their eligibility is a
    /// [`RetryPolicy`](crate::resilience::RetryPolicy) decision.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::BackendTimeout { .. } | Error::BackendTransport { .. }
        )
    }

    /// HTTP status the surrounding layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::BackendTimeout { .. } => 504,
            Error::BackendRejected { status, .. } => *status,
            Error::Validation { .. } => 422,
            Error::Unauthorized => 401,
            Error::RateLimited { .. } => 429,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping() {
        let timeout = Error::BackendTimeout {
            endpoint: "/api/generate".into(),
            attempts: 3,
        };
        assert_eq!(timeout.status_code(), 504);

        let rejected = Error::BackendRejected {
            status: 404,
            message: "model not found".into(),
        };
        assert_eq!(rejected.status_code(), 404);

        assert_eq!(Error::transport("connection refused").status_code(), 500);
        assert_eq!(Error::Unauthorized.status_code(), 401);
    }

    #[test]
    fn test_transient_classification() {
        assert!(Error::transport("reset").is_transient());
        assert!(Error::BackendTimeout {
            endpoint: "/api/chat".into(),
            attempts: 1
        }
        .is_transient());
        assert!(!Error::BackendRejected {
            status: 503,
            message: String::new()
        }
        .is_transient());
    }

    #[test]
    fn test_validation_context_display() {
        let err = Error::validation_with_context(
            "temperature out of range",
            ErrorContext::new()
                .with_field_path("request.temperature")
                .with_details("expected 0..=2, got 2.5"),
        );
        let text = err.to_string();
        assert!(text.contains("temperature out of range"));
        assert!(text.contains("field: request.temperature"));
        assert!(text.contains("expected 0..=2"));
        assert_eq!(err.status_code(), 422);
    }
}
