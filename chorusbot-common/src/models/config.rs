// File: chorusbot-common/src/models/config.rs

use serde::{Deserialize, Serialize};

/// Tunables for the response orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Minimum delay before the first mentioned persona replies.
    pub base_delay_ms: u64,
    /// Extra delay added per subsequent mentioned persona.
    pub stagger_ms: u64,
    /// Upper bound of the uniform jitter added to every delay.
    pub jitter_max_ms: u64,
    /// Greeting replies land near this ceiling (0.8 * max_delay + jitter).
    pub max_delay_ms: u64,
    /// Probability that an un-mentioned greeting draws a reply at all.
    pub greeting_chance: f64,
    /// Hard cap on replies scheduled for one inbound message.
    pub max_bots_per_conversation: usize,
    /// Idle gap after which the conversation is considered over.
    pub conversation_timeout_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            stagger_ms: 2000,
            jitter_max_ms: 1000,
            max_delay_ms: 5000,
            greeting_chance: 0.2,
            max_bots_per_conversation: 3,
            conversation_timeout_ms: 30_000,
        }
    }
}

/// Tunables for the moderation window and evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// Capacity of the review window; oldest entry evicted beyond this.
    pub max_messages: usize,
    /// Lifetime of a window entry, fixed at insertion.
    pub ttl_secs: u64,
    /// Period of the batch review flush.
    pub flush_interval_secs: u64,
    /// Requested timeout durations are clamped to this cap.
    pub max_timeout_secs: u32,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            max_messages: 10,
            ttl_secs: 600,
            flush_interval_secs: 30,
            max_timeout_secs: 60,
        }
    }
}

/// Tunables for the two-level response queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// In-flight response tasks across all personas.
    pub global_concurrency: usize,
    /// In-flight response tasks per persona (serializes a persona's own
    /// replies at the default of 1).
    pub per_persona_concurrency: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            global_concurrency: 5,
            per_persona_concurrency: 1,
        }
    }
}
