//! 类型系统模块：定义网关请求、响应与智能体画像数据类型。
//!
//! # Types Module
//!
//! Request and response shapes understood by the gateway. All of them are
//! plain serde types: they are built once per call and never mutated by the
//! core afterwards.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`GenerateRequest`] | Single-shot generation request |
//! | [`ChatRequest`] | Conversational request with ordered turns |
//! | [`BatchGenerateRequest`] | Multiple generation requests fanned out together |
//! | [`AgentProfile`] | Persona data; its numeric fields take part in cache keys |
//! | [`GenerateResponse`] / [`ChatResponse`] | Responses built from backend payloads |

pub mod message;
pub mod profile;
pub mod request;
pub mod response;

pub use message::{ChatMessage, MessageRole};
pub use profile::{AgentProfile, MentalState, PersonalityTraits};
pub use request::{BatchGenerateRequest, ChatRequest, GenerateRequest};
pub use response::{ChatResponse, GenerateResponse};

use crate::{Error, ErrorContext, Result};

/// Inclusive range check. NaN never passes.
pub(crate) fn validate_range(field: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if value >= min && value <= max {
        return Ok(());
    }
    Err(Error::validation_with_context(
        format!("{} out of range", field),
        ErrorContext::new()
            .with_field_path(field)
            .with_details(format!("expected {}..={}, got {}", min, max, value))
            .with_source("request_validator"),
    ))
}

pub(crate) fn validate_unit(field: &str, value: f64) -> Result<()> {
    validate_range(field, value, 0.0, 1.0)
}
