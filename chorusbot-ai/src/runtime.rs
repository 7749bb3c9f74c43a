use std::sync::Arc;

use tracing::{debug, warn};

use chorusbot_common::models::{PersonaConfig, Violation};
use chorusbot_common::Error;

use crate::provider::{GenerationParams, ModelProvider, PromptMessage};

/// System prompt used for the moderation review batch. The reply must be a
/// JSON array of `{username, reason, duration_seconds}` objects.
const MODERATION_PROMPT: &str = "\
You are reviewing a live-stream chat log for rule violations (harassment, \
hate, spam, sharing personal information). Reply with ONLY a JSON array; \
one object per violating user: \
[{\"username\": \"...\", \"reason\": \"...\", \"duration_seconds\": 60}]. \
Reply with [] if nothing violates the rules.";

/// Facade over a completion provider carrying the two calls the core
/// needs: persona replies and violation classification.
pub struct PersonaRuntime {
    provider: Arc<dyn ModelProvider>,
}

impl PersonaRuntime {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self { provider }
    }

    fn params_for(persona: &PersonaConfig) -> GenerationParams {
        GenerationParams {
            model: persona.model.clone(),
            temperature: persona.temperature,
            max_tokens: persona.max_tokens,
        }
    }

    /// Generate one chat reply for `persona` reacting to `trigger_text`.
    /// `Ok(None)` means the model produced nothing usable; callers send no
    /// message in that case (no retry).
    pub async fn generate_reply(
        &self,
        persona: &PersonaConfig,
        trigger_text: &str,
    ) -> Result<Option<String>, Error> {
        let messages = vec![
            PromptMessage::system(&persona.system_prompt),
            PromptMessage::user(trigger_text),
        ];

        let reply = self
            .provider
            .chat(&Self::params_for(persona), messages)
            .await
            .map_err(|e| Error::Ai(format!("completion failed for '{}': {e}", persona.name)))?;

        if reply.is_empty() {
            debug!("persona '{}' produced an empty reply", persona.name);
            return Ok(None);
        }
        Ok(Some(reply))
    }

    /// Classify a batch of chat messages for rule violations using the
    /// moderator persona. Messages are rendered as `username: text` lines.
    pub async fn classify_violations(
        &self,
        persona: &PersonaConfig,
        batch: &[(String, String)],
    ) -> Result<Vec<Violation>, Error> {
        if batch.is_empty() {
            return Ok(vec![]);
        }

        let log = batch
            .iter()
            .map(|(username, text)| format!("{}: {}", username, text))
            .collect::<Vec<_>>()
            .join("\n");

        let messages = vec![
            PromptMessage::system(MODERATION_PROMPT),
            PromptMessage::user(log),
        ];

        let reply = self
            .provider
            .chat(&Self::params_for(persona), messages)
            .await
            .map_err(|e| Error::Ai(format!("violation classification failed: {e}")))?;

        Ok(parse_violations(&reply))
    }
}

/// Pull the JSON array out of a model reply, tolerating prose around it.
/// Anything unparseable counts as "no violations".
fn parse_violations(reply: &str) -> Vec<Violation> {
    let start = reply.find('[');
    let end = reply.rfind(']');
    let json = match (start, end) {
        (Some(s), Some(e)) if s < e => &reply[s..=e],
        _ => {
            warn!("violation reply carried no JSON array: {:?}", reply);
            return vec![];
        }
    };

    match serde_json::from_str::<Vec<Violation>>(json) {
        Ok(violations) => violations,
        Err(e) => {
            warn!("could not parse violation array: {e}");
            vec![]
        }
    }
}
