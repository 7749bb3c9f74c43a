// File: chorusbot-common/src/models/moderation.rs

use serde::{Deserialize, Serialize};

/// One rule violation flagged by the moderator persona's classification
/// call. Parsed straight out of the model's JSON reply; ephemeral.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub username: String,
    pub reason: String,
    pub duration_seconds: u32,
}
