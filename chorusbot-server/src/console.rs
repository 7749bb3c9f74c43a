// chorusbot-server/src/console.rs
//
// Local-run stand-ins for the external platform surfaces: a transport
// that prints outbound chat to stdout, and a moderation API that logs
// what it would have done instead of calling Helix.

use async_trait::async_trait;
use tracing::info;

use chorusbot_core::platforms::{ChatTransport, ConnectionStatus, ModerationApi};
use chorusbot_core::Error;

/// Prints outbound messages instead of sending them to a chat platform.
pub struct ConsoleTransport;

#[async_trait]
impl ChatTransport for ConsoleTransport {
    async fn connect(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn join_channel(&self, channel: &str) -> Result<(), Error> {
        info!("joined {channel}");
        Ok(())
    }

    async fn send_message(&self, channel: &str, message: &str) -> Result<(), Error> {
        println!("[{channel}] {message}");
        Ok(())
    }

    async fn get_connection_status(&self) -> Result<ConnectionStatus, Error> {
        Ok(ConnectionStatus::Connected)
    }
}

/// Moderation API that resolves every login to itself and logs timeouts
/// without executing them. Used when no Helix credentials are supplied.
pub struct DryRunModerationApi;

#[async_trait]
impl ModerationApi for DryRunModerationApi {
    async fn resolve_user_id(&self, username: &str) -> Result<String, Error> {
        Ok(username.to_lowercase())
    }

    async fn timeout_user(
        &self,
        channel_id: &str,
        user_id: &str,
        duration_seconds: u32,
        reason: &str,
    ) -> Result<(), Error> {
        info!("[dry-run] would timeout '{user_id}' in {channel_id} for {duration_seconds}s: {reason}");
        Ok(())
    }
}
