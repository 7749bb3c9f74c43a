// File: src/platforms/mod.rs

pub mod twitch;

use async_trait::async_trait;
use crate::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Reconnecting,
    Error(String),
}

/// Outbound chat surface. Connection management and credential handling
/// live behind this boundary; the core only joins and sends.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn connect(&self) -> Result<(), Error>;
    async fn disconnect(&self) -> Result<(), Error>;
    async fn join_channel(&self, channel: &str) -> Result<(), Error>;
    async fn send_message(&self, channel: &str, message: &str) -> Result<(), Error>;
    async fn get_connection_status(&self) -> Result<ConnectionStatus, Error>;
}

/// Platform moderation surface: login -> user id lookup and timeouts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModerationApi: Send + Sync {
    /// Resolve a chat login to the platform user id. An unknown login is
    /// `Error::UserNotFound`.
    async fn resolve_user_id(&self, username: &str) -> Result<String, Error>;

    /// Time out a user. `duration_seconds` must already be clamped by the
    /// caller; this call applies it verbatim.
    async fn timeout_user(
        &self,
        channel_id: &str,
        user_id: &str,
        duration_seconds: u32,
        reason: &str,
    ) -> Result<(), Error>;
}
