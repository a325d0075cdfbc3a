//! Outbound notifications: DMs, channel replies, admin-log mirroring.
//!
//! Delivery is explicitly fallible but never load-bearing: every caller
//! logs a [`DeliveryError`] and carries on. A subscriber with DMs disabled
//! must not be able to stall a sweep or leave the registry inconsistent.

use crate::error::DeliveryError;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

/// Discord REST API base.
const API_BASE_URL: &str = "https://discord.com/api/v10";

/// Outbound delivery seam.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Direct-message a user.
    async fn dm(&self, user_id: &str, text: &str) -> Result<(), DeliveryError>;

    /// Post into a channel (command replies).
    async fn reply(&self, channel_id: &str, text: &str) -> Result<(), DeliveryError>;

    /// Mirror an admin-relevant event to the log channel. A no-op `Ok` when
    /// no log channel is configured.
    async fn admin_log(&self, text: &str) -> Result<(), DeliveryError>;
}

/// Log a failed delivery and discard it.
pub fn log_delivery_failure(target: &str, result: Result<(), DeliveryError>) {
    if let Err(e) = result {
        warn!(target_id = %target, error = %e, "Delivery failed");
    }
}

/// Production notifier backed by the Discord REST API.
pub struct DiscordNotifier {
    http: reqwest::Client,
    token: String,
    admin_log_channel: Option<String>,
    api_base: String,
}

#[derive(Deserialize)]
struct DmChannel {
    id: String,
}

impl DiscordNotifier {
    pub fn new(http: reqwest::Client, token: String, admin_log_channel: Option<String>) -> Self {
        Self {
            http,
            token,
            admin_log_channel,
            api_base: API_BASE_URL.to_string(),
        }
    }

    /// API base override for tests.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.token)
    }

    async fn post_message(&self, channel_id: &str, text: &str) -> Result<(), DeliveryError> {
        let url = format!("{}/channels/{}/messages", self.api_base, channel_id);
        let response = self
            .http
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&serde_json::json!({ "content": text }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(DeliveryError::Api(response.status().as_u16()));
        }
        Ok(())
    }

    /// Open (or reuse, server-side) the DM channel for `user_id`.
    async fn open_dm_channel(&self, user_id: &str) -> Result<String, DeliveryError> {
        let url = format!("{}/users/@me/channels", self.api_base);
        let response = self
            .http
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&serde_json::json!({ "recipient_id": user_id }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(DeliveryError::Api(response.status().as_u16()));
        }
        let channel: DmChannel = response.json().await?;
        Ok(channel.id)
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn dm(&self, user_id: &str, text: &str) -> Result<(), DeliveryError> {
        let channel_id = self.open_dm_channel(user_id).await?;
        self.post_message(&channel_id, text).await
    }

    async fn reply(&self, channel_id: &str, text: &str) -> Result<(), DeliveryError> {
        self.post_message(channel_id, text).await
    }

    async fn admin_log(&self, text: &str) -> Result<(), DeliveryError> {
        match &self.admin_log_channel {
            Some(channel_id) => self.post_message(channel_id, text).await,
            None => Ok(()),
        }
    }
}
