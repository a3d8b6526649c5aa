//! Outbound message delivery
//!
//! WhatsApp-Cloud-style HTTP sender. Delivery is retried with
//! exponential backoff; callers log exhausted retries and move on -
//! a failed send never rolls back a committed state change.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::ChannelConfig;
use crate::utils::errors::{ChowBuddyError, Result, SenderError};

use super::MessageSender;

const RETRY_BASE_DELAY_MS: u64 = 250;

/// HTTP client for the messaging channel's send API
#[derive(Clone)]
pub struct ChannelSender {
    client: Client,
    base_url: String,
    access_token: String,
    send_retries: u32,
}

impl ChannelSender {
    /// Create a new ChannelSender instance
    pub fn new(config: &ChannelConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent("ChowBuddy-Bot/1.0")
            .build()
            .map_err(ChowBuddyError::Http)?;

        Ok(Self {
            client,
            base_url: format!(
                "{}/{}",
                config.api_url.trim_end_matches('/'),
                config.phone_number_id
            ),
            access_token: config.access_token.clone(),
            send_retries: config.send_retries.max(1),
        })
    }

    async fn try_send(&self, user_id: &str, body: &str) -> Result<()> {
        let url = format!("{}/messages", self.base_url);
        let payload = json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": user_id,
            "type": "text",
            "text": { "body": body }
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChowBuddyError::Sender(SenderError::Timeout)
                } else {
                    ChowBuddyError::Sender(SenderError::RequestFailed(e.to_string()))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ChowBuddyError::Sender(SenderError::Rejected(format!(
                "HTTP {}: {}",
                status, error_text
            ))));
        }

        debug!(user_id = user_id, "Channel accepted outbound message");
        Ok(())
    }
}

#[async_trait]
impl MessageSender for ChannelSender {
    async fn send_text(&self, user_id: &str, body: &str) -> Result<()> {
        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);

        for attempt in 1..=self.send_retries {
            match self.try_send(user_id, body).await {
                Ok(()) => {
                    info!(user_id = user_id, attempt = attempt, "Outbound message sent");
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        user_id = user_id,
                        attempt = attempt,
                        error = %e,
                        "Outbound message attempt failed"
                    );
                    if attempt < self.send_retries {
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }

        Err(ChowBuddyError::Sender(SenderError::RetriesExhausted {
            attempts: self.send_retries,
        }))
    }
}

impl std::fmt::Debug for ChannelSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSender")
            .field("base_url", &self.base_url)
            .field("send_retries", &self.send_retries)
            .finish_non_exhaustive()
    }
}
