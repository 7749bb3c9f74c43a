// File: src/platforms/twitch/client.rs

use std::sync::Arc;
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;

use crate::platforms::ModerationApi;
use crate::Error;

/// A small wrapper client for calling the Helix moderation endpoints.
///
/// Token acquisition and refresh happen elsewhere; this struct just holds
/// a valid bearer token and the ids Helix wants on every call.
pub struct TwitchHelixClient {
    http: Arc<ReqwestClient>,
    bearer_token: String,
    client_id: String,
    /// Acting moderator's user id (the moderator persona's account).
    moderator_id: String,
}

impl TwitchHelixClient {
    /// Create a new `TwitchHelixClient`.
    ///
    /// - `bearer_token`: an OAuth token with the `moderator:manage:banned_users` scope
    /// - `client_id`: the application client id
    /// - `moderator_id`: user id of the account executing timeouts
    pub fn new(bearer_token: &str, client_id: &str, moderator_id: &str) -> Self {
        Self {
            http: Arc::new(ReqwestClient::new()),
            bearer_token: bearer_token.to_string(),
            client_id: client_id.to_string(),
            moderator_id: moderator_id.to_string(),
        }
    }

    pub fn bearer_token(&self) -> &str {
        &self.bearer_token
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn moderator_id(&self) -> &str {
        &self.moderator_id
    }

    /// Returns an `Arc<ReqwestClient>` reference for advanced usage.
    pub fn http_client(&self) -> Arc<ReqwestClient> {
        self.http.clone()
    }
}

#[async_trait]
impl ModerationApi for TwitchHelixClient {
    async fn resolve_user_id(&self, username: &str) -> Result<String, Error> {
        self.fetch_user_id(username)
            .await?
            .ok_or_else(|| Error::UserNotFound(username.to_string()))
    }

    async fn timeout_user(
        &self,
        channel_id: &str,
        user_id: &str,
        duration_seconds: u32,
        reason: &str,
    ) -> Result<(), Error> {
        self.ban_user(
            channel_id,
            &self.moderator_id,
            user_id,
            Some(duration_seconds),
            Some(reason),
        )
        .await
    }
}
