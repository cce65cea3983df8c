//! Inbound request shapes: single generation, chat and batch.

use super::{validate_range, AgentProfile, ChatMessage};
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    200
}

fn default_top_p() -> f64 {
    0.9
}

fn default_top_k() -> u32 {
    40
}

fn default_parallel() -> bool {
    true
}

/// Single-shot text generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_profile: Option<AgentProfile>,
    /// Bypass both cache lookup and cache write.
    #[serde(default)]
    pub no_cache: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            agent_profile: None,
            no_cache: false,
            metadata: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_agent_profile(mut self, profile: AgentProfile) -> Self {
        self.agent_profile = Some(profile);
        self
    }

    pub fn with_no_cache(mut self, no_cache: bool) -> Self {
        self.no_cache = no_cache;
        self
    }

    /// Schema bounds check, run before anything touches the cache or backend.
    pub fn validate(&self) -> Result<()> {
        validate_model(&self.model)?;
        validate_range("request.temperature", self.temperature, 0.0, 2.0)?;
        validate_range("request.max_tokens", f64::from(self.max_tokens), 1.0, 2000.0)?;
        validate_range("request.top_p", self.top_p, 0.0, 1.0)?;
        validate_range("request.top_k", f64::from(self.top_k), 1.0, 100.0)?;
        if let Some(profile) = &self.agent_profile {
            profile.validate()?;
        }
        Ok(())
    }
}

/// Chat completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_profile: Option<AgentProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            agent_profile: None,
            metadata: None,
        }
    }

    pub fn with_agent_profile(mut self, profile: AgentProfile) -> Self {
        self.agent_profile = Some(profile);
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_model(&self.model)?;
        validate_range("request.temperature", self.temperature, 0.0, 2.0)?;
        validate_range("request.max_tokens", f64::from(self.max_tokens), 1.0, 2000.0)?;
        if let Some(profile) = &self.agent_profile {
            profile.validate()?;
        }
        Ok(())
    }
}

/// Batch of generation requests, typically one per simulated agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchGenerateRequest {
    pub requests: Vec<GenerateRequest>,
    /// When false, items are processed one at a time.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

impl BatchGenerateRequest {
    pub fn new(requests: Vec<GenerateRequest>) -> Self {
        Self {
            requests,
            parallel: true,
        }
    }

    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

fn validate_model(model: &str) -> Result<()> {
    if model.trim().is_empty() {
        return Err(Error::validation_with_context(
            "model must not be empty",
            ErrorContext::new()
                .with_field_path("request.model")
                .with_source("request_validator"),
        ));
    }
    Ok(())
}
