// File: chorusbot-common/src/models/mod.rs

pub mod config;
pub mod message;
pub mod moderation;
pub mod persona;

pub use config::{ModerationConfig, OrchestratorConfig, QueueConfig};
pub use message::{ChatMessage, ResponsePriority, Role, ScheduledResponse};
pub use moderation::Violation;
pub use persona::PersonaConfig;
