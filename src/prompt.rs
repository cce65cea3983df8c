//! Persona context injection.
//!
//! Runs after cache key derivation, so the injected text never influences
//! which cache entry a request maps to.

use crate::cache::render_float as num;
use crate::types::{AgentProfile, ChatMessage};

/// Prefix a generation prompt with the agent's persona.
pub fn format_prompt_with_profile(prompt: &str, profile: &AgentProfile) -> String {
    let p = &profile.personality;
    let m = &profile.mental_state;
    format!(
        "You are {name}, a {age}-year-old {occupation}.\n\
         \n\
         Personality traits:\n\
         - Openness: {o}\n\
         - Conscientiousness: {c}\n\
         - Extraversion: {e}\n\
         - Agreeableness: {a}\n\
         - Neuroticism: {n}\n\
         \n\
         Current state:\n\
         - Stress level: {stress}\n\
         - Life satisfaction: {life}\n\
         - Current emotion: {emotion}\n\
         \n\
         Context: {context}\n\
         \n\
         {prompt}",
        name = profile.name,
        age = profile.age,
        occupation = profile.occupation,
        o = num(p.openness),
        c = num(p.conscientiousness),
        e = num(p.extraversion),
        a = num(p.agreeableness),
        n = num(p.neuroticism),
        stress = num(m.stress_level),
        life = num(m.life_satisfaction),
        emotion = m.current_emotion,
        context = profile.context.as_deref().unwrap_or("None"),
        prompt = prompt,
    )
}

/// Prepend a system turn describing the agent's persona.
pub fn add_agent_context_to_messages(
    messages: &[ChatMessage],
    profile: &AgentProfile,
) -> Vec<ChatMessage> {
    let p = &profile.personality;
    let m = &profile.mental_state;
    let system = ChatMessage::system(format!(
        "You are {}, a {}-year-old {}.\n\
         Your personality: Openness={}, Conscientiousness={}, Extraversion={}, \
         Agreeableness={}, Neuroticism={}.\n\
         Current stress: {}, Life satisfaction: {}.\n\
         Respond naturally based on your personality and current state.",
        profile.name,
        profile.age,
        profile.occupation,
        num(p.openness),
        num(p.conscientiousness),
        num(p.extraversion),
        num(p.agreeableness),
        num(p.neuroticism),
        num(m.stress_level),
        num(m.life_satisfaction),
    ));

    let mut out = Vec::with_capacity(messages.len() + 1);
    out.push(system);
    out.extend_from_slice(messages);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::profile::sample_profile;
    use crate::types::MessageRole;

    #[test]
    fn test_prompt_preamble() {
        let profile = sample_profile(7).with_context("night shift");
        let out = format_prompt_with_profile("How was your day?", &profile);
        assert!(out.starts_with("You are Mara, a 34-year-old nurse.\n\n"));
        assert!(out.contains("- Openness: 0.6\n"));
        assert!(out.contains("- Current emotion: neutral\n"));
        assert!(out.contains("Context: night shift\n"));
        assert!(out.ends_with("\n\nHow was your day?"));
    }

    #[test]
    fn test_prompt_without_context() {
        let out = format_prompt_with_profile("hi", &sample_profile(1));
        assert!(out.contains("Context: None\n"));
    }

    #[test]
    fn test_whole_number_scalars_keep_decimal_point() {
        let mut profile = sample_profile(1);
        profile.personality.openness = 1.0;
        profile.mental_state.stress_level = 0.0;
        let out = format_prompt_with_profile("hi", &profile);
        assert!(out.contains("- Openness: 1.0\n"));
        assert!(out.contains("- Stress level: 0.0\n"));

        let system = &add_agent_context_to_messages(&[], &profile)[0];
        assert!(system.content.contains("Openness=1.0,"));
    }

    #[test]
    fn test_system_message_prepended() {
        let history = vec![ChatMessage::user("hello"), ChatMessage::assistant("hey")];
        let out = add_agent_context_to_messages(&history, &sample_profile(7));
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].role, MessageRole::System);
        assert!(out[0].content.contains("Neuroticism=0.3"));
        assert_eq!(&out[1..], &history[..]);
    }
}
