// File: src/tasks/mod.rs

pub mod moderation_flush;

pub use moderation_flush::spawn_moderation_flush_task;
