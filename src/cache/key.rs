//! Cache key derivation.

use crate::types::AgentProfile;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Default namespace prepended to every derived key.
pub const DEFAULT_NAMESPACE: &str = "llm:cache:";

const FIELD_SEPARATOR: char = '|';

/// Opaque, fixed-length cache key: namespace + 64 lowercase hex chars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Maps the semantically relevant request fields to a [`CacheKey`].
///
/// Fields, in order: model, prompt, temperature, then (with a profile)
/// agent id, the five personality traits, stress level and life
/// satisfaction. Free-text profile fields, decoding knobs other than
/// temperature, and `no_cache` never take part.
#[derive(Debug, Clone)]
pub struct CacheKeyDeriver {
    namespace: String,
}

impl CacheKeyDeriver {
    pub fn new() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Glob matching every key this deriver can produce.
    pub fn namespace_pattern(&self) -> String {
        format!("{}*", self.namespace)
    }

    pub fn derive(
        &self,
        model: &str,
        prompt: &str,
        temperature: f64,
        profile: Option<&AgentProfile>,
    ) -> CacheKey {
        let mut parts = vec![escape(model), escape(prompt), render_float(temperature)];
        if let Some(p) = profile {
            parts.push(p.agent_id.to_string());
            parts.extend(p.personality.as_array().iter().map(|v| render_float(*v)));
            parts.push(render_float(p.mental_state.stress_level));
            parts.push(render_float(p.mental_state.life_satisfaction));
        }
        let joined = parts.join(&FIELD_SEPARATOR.to_string());

        let digest = Sha256::digest(joined.as_bytes());
        let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        CacheKey(format!("{}{}", self.namespace, hex))
    }
}

impl Default for CacheKeyDeriver {
    fn default() -> Self {
        Self::new()
    }
}

// Free-text fields are backslash-escaped so a separator inside one field can
// never shift a boundary. Text without `|` or `\` is left untouched.
fn escape(field: &str) -> String {
    if !field.contains([FIELD_SEPARATOR, '\\']) {
        return field.to_string();
    }
    let mut out = String::with_capacity(field.len() + 4);
    for c in field.chars() {
        if c == FIELD_SEPARATOR || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// Shortest round-trip digits, laid out the way Python's `repr(float)` does:
// whole numbers keep ".0", magnitudes below 1e-4 or from 1e16 up switch to
// exponent form with a signed, at least two-digit exponent (1e-05, 1.5e+16).
pub(crate) fn render_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let sci = format!("{:e}", value);
        if let Some((mantissa, exp)) = sci.split_once('e') {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            return format!("{}e{}{:02}", mantissa, sign, exp.abs());
        }
    }
    let s = value.to_string();
    if s.contains('.') {
        s
    } else {
        format!("{}.0", s)
    }
}
