// File: chorusbot-common/src/models/message.rs

use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Chat role of the author of a message, as reported by the platform.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Role {
    User,
    Moderator,
    Broadcaster,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Moderator => write!(f, "moderator"),
            Role::Broadcaster => write!(f, "broadcaster"),
        }
    }
}

impl FromStr for Role {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "moderator" | "mod" => Ok(Role::Moderator),
            "broadcaster" => Ok(Role::Broadcaster),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// A single inbound chat message. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub message_id: Uuid,
    pub channel: String,
    pub username: String,
    pub text: String,
    pub role: Role,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(channel: &str, username: &str, text: &str, role: Role) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            channel: channel.to_string(),
            username: username.to_string(),
            text: text.to_string(),
            role,
            timestamp: Utc::now(),
        }
    }
}

/// Priority of a scheduled persona reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponsePriority {
    High,
    Low,
}

/// One reply decision produced by the orchestrator for a single inbound
/// message. Not persisted anywhere; it lives only until the response queue
/// picks it up.
#[derive(Debug, Clone)]
pub struct ScheduledResponse {
    pub persona_name: String,
    pub delay: Duration,
    pub priority: ResponsePriority,
}
