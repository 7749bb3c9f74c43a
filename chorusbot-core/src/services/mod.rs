// File: src/services/mod.rs

pub mod chat_service;
pub mod classifier;
pub mod conversation;
pub mod moderation;
pub mod orchestrator;
pub mod response_queue;

pub use chat_service::ChatService;
pub use classifier::{classify, Classification};
pub use conversation::ConversationTracker;
pub use moderation::{ModerationEvaluator, ModerationWindow};
pub use orchestrator::ResponseOrchestrator;
pub use response_queue::ResponseQueue;
