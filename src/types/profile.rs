//! Agent profile carried alongside requests.
//!
//! The gateway only reads profiles: the numeric fields feed cache key
//! derivation and all fields feed persona prompt injection.

use super::validate_unit;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Big Five personality traits, each in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalityTraits {
    pub openness: f64,
    pub conscientiousness: f64,
    pub extraversion: f64,
    pub agreeableness: f64,
    pub neuroticism: f64,
}

impl PersonalityTraits {
    pub fn new(
        openness: f64,
        conscientiousness: f64,
        extraversion: f64,
        agreeableness: f64,
        neuroticism: f64,
    ) -> Self {
        Self {
            openness,
            conscientiousness,
            extraversion,
            agreeableness,
            neuroticism,
        }
    }

    /// Traits in key-derivation order.
    pub fn as_array(&self) -> [f64; 5] {
        [
            self.openness,
            self.conscientiousness,
            self.extraversion,
            self.agreeableness,
            self.neuroticism,
        ]
    }

    fn validate(&self) -> Result<()> {
        validate_unit("agent_profile.personality.openness", self.openness)?;
        validate_unit(
            "agent_profile.personality.conscientiousness",
            self.conscientiousness,
        )?;
        validate_unit("agent_profile.personality.extraversion", self.extraversion)?;
        validate_unit("agent_profile.personality.agreeableness", self.agreeableness)?;
        validate_unit("agent_profile.personality.neuroticism", self.neuroticism)
    }
}

/// Current mental state of an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentalState {
    pub stress_level: f64,
    pub life_satisfaction: f64,
    #[serde(default = "default_emotion")]
    pub current_emotion: String,
    #[serde(default = "default_energy")]
    pub energy_level: f64,
}

fn default_emotion() -> String {
    "neutral".to_string()
}

fn default_energy() -> f64 {
    0.7
}

impl MentalState {
    pub fn new(stress_level: f64, life_satisfaction: f64) -> Self {
        Self {
            stress_level,
            life_satisfaction,
            current_emotion: default_emotion(),
            energy_level: default_energy(),
        }
    }

    pub fn with_emotion(mut self, emotion: impl Into<String>) -> Self {
        self.current_emotion = emotion.into();
        self
    }

    fn validate(&self) -> Result<()> {
        validate_unit("agent_profile.mental_state.stress_level", self.stress_level)?;
        validate_unit(
            "agent_profile.mental_state.life_satisfaction",
            self.life_satisfaction,
        )?;
        validate_unit("agent_profile.mental_state.energy_level", self.energy_level)
    }
}

/// Complete agent profile used for persona context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub agent_id: i64,
    pub name: String,
    pub age: u32,
    pub occupation: String,
    pub personality: PersonalityTraits,
    pub mental_state: MentalState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_context: Option<HashMap<String, serde_json::Value>>,
}

impl AgentProfile {
    pub fn new(
        agent_id: i64,
        name: impl Into<String>,
        age: u32,
        occupation: impl Into<String>,
        personality: PersonalityTraits,
        mental_state: MentalState,
    ) -> Self {
        Self {
            agent_id,
            name: name.into(),
            age,
            occupation: occupation.into(),
            personality,
            mental_state,
            context: None,
            relationship_context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.personality.validate()?;
        self.mental_state.validate()
    }
}

#[cfg(test)]
pub(crate) fn sample_profile(agent_id: i64) -> AgentProfile {
    AgentProfile::new(
        agent_id,
        "Mara",
        34,
        "nurse",
        PersonalityTraits::new(0.6, 0.8, 0.4, 0.7, 0.3),
        MentalState::new(0.5, 0.6),
    )
}
