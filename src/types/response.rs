//! Responses returned to callers, built from raw backend payloads.

use super::ChatMessage;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Text generation response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    pub model: String,
    pub created_at: String,
    #[serde(default)]
    pub total_duration: u64,
    #[serde(default)]
    pub load_duration: u64,
    #[serde(default)]
    pub eval_duration: u64,
    #[serde(default)]
    pub eval_count: u64,
}

impl GenerateResponse {
    /// Build from the backend's `/api/generate` body. Missing timing counters read as zero.
    pub fn from_backend(model: &str, payload: &serde_json::Value) -> Result<Self> {
        let response = payload
            .get("response")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::transport("backend payload missing `response` field"))?;
        Ok(Self {
            response: response.to_string(),
            model: model.to_string(),
            created_at: now_iso8601(),
            total_duration: counter(payload, "total_duration"),
            load_duration: counter(payload, "load_duration"),
            eval_duration: counter(payload, "eval_duration"),
            eval_count: counter(payload, "eval_count"),
        })
    }
}

/// Chat completion response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: ChatMessage,
    pub model: String,
    pub created_at: String,
    #[serde(default)]
    pub total_duration: u64,
}

impl ChatResponse {
    pub fn from_backend(model: &str, payload: &serde_json::Value) -> Result<Self> {
        let message = payload
            .get("message")
            .cloned()
            .ok_or_else(|| Error::transport("backend payload missing `message` field"))?;
        Ok(Self {
            message: serde_json::from_value(message)?,
            model: model.to_string(),
            created_at: now_iso8601(),
            total_duration: counter(payload, "total_duration"),
        })
    }
}

fn counter(payload: &serde_json::Value, field: &str) -> u64 {
    payload.get(field).and_then(|v| v.as_u64()).unwrap_or(0)
}

fn now_iso8601() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
