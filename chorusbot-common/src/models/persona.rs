// File: chorusbot-common/src/models/persona.rs

use serde::{Deserialize, Serialize};

/// Configuration of one bot persona. Supplied by the operator; read-only
/// to the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    pub name: String,
    pub model: String,
    pub system_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Exactly one persona in a roster should carry moderation authority.
    pub is_moderator: bool,
    /// Sent once when the persona joins the channel, if set.
    pub intro_message: Option<String>,
}

impl PersonaConfig {
    pub fn new(name: &str, model: &str, system_prompt: &str) -> Self {
        Self {
            name: name.to_string(),
            model: model.to_string(),
            system_prompt: system_prompt.to_string(),
            temperature: 0.8,
            max_tokens: 150,
            is_moderator: false,
            intro_message: None,
        }
    }

    /// Case-insensitive comparison against a chat username.
    pub fn matches_username(&self, username: &str) -> bool {
        self.name.eq_ignore_ascii_case(username)
    }
}
