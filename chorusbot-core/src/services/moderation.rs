// File: src/services/moderation.rs
//
// Rule-violation review: a bounded time-expiring window of recent
// ordinary-user messages, the transient batch queue feeding the periodic
// review, and the evaluator that turns flagged violations into clamped
// timeout calls.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};

use chorusbot_ai::PersonaRuntime;
use chorusbot_common::models::{ChatMessage, ModerationConfig, PersonaConfig, Role};

use crate::platforms::ModerationApi;

/// One buffered message plus its fixed expiry. Later additions never
/// extend earlier entries' lifetimes, so expirations increase
/// monotonically with insertion order.
#[derive(Debug, Clone)]
pub struct WindowEntry {
    pub message: ChatMessage,
    pub expires_at: DateTime<Utc>,
}

/// Fixed-capacity, time-expiring ring of recent eligible messages.
pub struct ModerationWindow {
    entries: VecDeque<WindowEntry>,
    max_messages: usize,
    ttl: Duration,
}

impl ModerationWindow {
    pub fn new(max_messages: usize, ttl_secs: u64) -> Self {
        Self {
            entries: VecDeque::new(),
            max_messages,
            ttl: Duration::seconds(ttl_secs as i64),
        }
    }

    pub fn add(&mut self, message: ChatMessage) {
        self.add_at(message, Utc::now());
    }

    pub fn add_at(&mut self, message: ChatMessage, now: DateTime<Utc>) {
        self.entries.push_back(WindowEntry {
            message,
            expires_at: now + self.ttl,
        });
        if self.entries.len() > self.max_messages {
            self.entries.pop_front();
        }
        self.purge(now);
    }

    /// Read the surviving messages, oldest first, after purging expired
    /// entries.
    pub fn peek(&mut self) -> Vec<ChatMessage> {
        self.peek_at(Utc::now())
    }

    pub fn peek_at(&mut self, now: DateTime<Utc>) -> Vec<ChatMessage> {
        self.purge(now);
        self.entries.iter().map(|e| e.message.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Front-to-back eviction, stopping at the first unexpired entry.
    /// Correct because expirations are monotonic in insertion order.
    fn purge(&mut self, now: DateTime<Utc>) {
        while let Some(front) = self.entries.front() {
            if front.expires_at < now {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Periodic batch review of buffered chat, followed by clamped timeout
/// execution. Owns both the display window and the flush queue; shared
/// between the dispatch path (ingest) and the flush task (run_once).
pub struct ModerationEvaluator {
    moderator_persona: PersonaConfig,
    /// Lowercased names of every configured persona, for self-exclusion.
    persona_names: Vec<String>,
    runtime: Arc<PersonaRuntime>,
    moderation_api: Arc<dyn ModerationApi>,
    /// Broadcaster/channel id the timeouts execute against.
    channel_id: String,
    config: ModerationConfig,
    window: StdMutex<ModerationWindow>,
    queue: StdMutex<Vec<ChatMessage>>,
}

impl ModerationEvaluator {
    pub fn new(
        moderator_persona: PersonaConfig,
        all_personas: &[PersonaConfig],
        runtime: Arc<PersonaRuntime>,
        moderation_api: Arc<dyn ModerationApi>,
        channel_id: &str,
        config: ModerationConfig,
    ) -> Self {
        let persona_names = all_personas
            .iter()
            .map(|p| p.name.to_lowercase())
            .collect();
        let window = ModerationWindow::new(config.max_messages, config.ttl_secs);
        Self {
            moderator_persona,
            persona_names,
            runtime,
            moderation_api,
            channel_id: channel_id.to_string(),
            config,
            window: StdMutex::new(window),
            queue: StdMutex::new(Vec::new()),
        }
    }

    fn is_persona_name(&self, username: &str) -> bool {
        let lowered = username.to_lowercase();
        self.persona_names.iter().any(|n| *n == lowered)
    }

    /// Buffer one inbound message for review. Moderator and broadcaster
    /// messages are exempt, as is anything authored by a persona.
    pub fn ingest(&self, message: &ChatMessage) {
        if message.role != Role::User || self.is_persona_name(&message.username) {
            return;
        }
        self.window.lock().unwrap().add(message.clone());
        self.queue.lock().unwrap().push(message.clone());
    }

    /// Surviving window contents, oldest first.
    pub fn recent_messages(&self) -> Vec<ChatMessage> {
        self.window.lock().unwrap().peek()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    /// One flush tick. The queue is taken-and-cleared synchronously at
    /// hand-off, before any await, so ticks can never overlap on the same
    /// batch and a failed classification call drops the batch (at-most-once
    /// delivery).
    pub async fn run_once(&self) {
        let batch: Vec<ChatMessage> = std::mem::take(&mut *self.queue.lock().unwrap());
        if batch.is_empty() {
            return;
        }
        debug!("moderation flush: reviewing {} message(s)", batch.len());

        let lines: Vec<(String, String)> = batch
            .iter()
            .map(|m| (m.username.clone(), m.text.clone()))
            .collect();

        let violations = match self
            .runtime
            .classify_violations(&self.moderator_persona, &lines)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                error!("violation classification failed; batch dropped: {e}");
                return;
            }
        };

        // Each violation executes independently: a failure on one never
        // blocks or rolls back the others.
        for violation in violations {
            self.execute_violation(&batch, &violation).await;
        }
    }

    async fn execute_violation(
        &self,
        batch: &[ChatMessage],
        violation: &chorusbot_common::models::Violation,
    ) {
        // A persona can never be a timeout target, even if the classifier
        // hallucinates one.
        if self.is_persona_name(&violation.username) {
            warn!("classifier flagged persona '{}'; ignored", violation.username);
            return;
        }

        let Some(message) = batch
            .iter()
            .find(|m| m.username.eq_ignore_ascii_case(&violation.username))
        else {
            warn!(
                "violation target '{}' not present in the reviewed batch; skipped",
                violation.username
            );
            return;
        };

        // Resolution failure skips only this violation.
        let user_id = match self.moderation_api.resolve_user_id(&message.username).await {
            Ok(id) => id,
            Err(e) => {
                warn!("user id lookup for '{}' failed: {e}", message.username);
                return;
            }
        };

        let duration = violation.duration_seconds.min(self.config.max_timeout_secs);
        match self
            .moderation_api
            .timeout_user(&self.channel_id, &user_id, duration, &violation.reason)
            .await
        {
            Ok(()) => {
                info!(
                    "timed out '{}' for {}s: {}",
                    message.username, duration, violation.reason
                );
            }
            Err(e) => {
                error!("timeout of '{}' failed: {e}", message.username);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(username: &str, text: &str) -> ChatMessage {
        ChatMessage::new("#chan", username, text, Role::User)
    }

    #[test]
    fn window_capacity_evicts_oldest_first() {
        let mut window = ModerationWindow::new(3, 600);
        let now = Utc::now();
        for i in 0..5 {
            window.add_at(msg(&format!("user{i}"), "hello"), now);
        }
        let kept = window.peek_at(now);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0].username, "user2");
        assert_eq!(kept[2].username, "user4");
    }

    #[test]
    fn window_entries_expire_after_ttl() {
        let mut window = ModerationWindow::new(10, 600);
        let now = Utc::now();
        window.add_at(msg("early", "one"), now);
        window.add_at(msg("late", "two"), now + Duration::seconds(300));

        // Past the first entry's TTL but not the second's.
        let kept = window.peek_at(now + Duration::seconds(601));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].username, "late");

        // Past everything: fully empty.
        assert!(window.peek_at(now + Duration::seconds(1000)).is_empty());
    }

    #[test]
    fn ttl_is_fixed_at_insertion() {
        let mut window = ModerationWindow::new(10, 600);
        let now = Utc::now();
        window.add_at(msg("early", "one"), now);
        // A much later add must not refresh the first entry.
        window.add_at(msg("late", "two"), now + Duration::seconds(590));
        let kept = window.peek_at(now + Duration::seconds(605));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].username, "late");
    }
}
