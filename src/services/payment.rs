//! Payment gateway client
//!
//! Paystack-style HTTP adapter: initializes transactions to obtain a
//! payment link, and verifies transaction status on demand (used by the
//! reconciliation sweep when no confirmation webhook arrived).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::PaymentConfig;
use crate::utils::errors::{ChowBuddyError, PaymentError, Result};

use super::PaymentClient;

/// A created payment link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentLink {
    pub url: String,
    pub gateway_ref: String,
}

/// Gateway-reported transaction state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifiedPayment {
    Paid,
    Failed,
    /// The gateway has no final status (never attempted, still open, or
    /// the reference is unknown)
    Unknown,
}

/// Gateway response envelope
#[derive(Debug, Clone, Deserialize, Serialize)]
struct GatewayResponse<T> {
    status: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<T>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
struct InitializeData {
    authorization_url: String,
    reference: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
struct VerifyData {
    status: String,
}

/// HTTP client for the payment gateway API
#[derive(Clone)]
pub struct PaymentGatewayClient {
    client: Client,
    base_url: String,
    secret_key: String,
}

impl PaymentGatewayClient {
    /// Create a new PaymentGatewayClient instance
    pub fn new(config: &PaymentConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent("ChowBuddy-Bot/1.0")
            .build()
            .map_err(ChowBuddyError::Http)?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }

    fn map_request_error(e: reqwest::Error) -> ChowBuddyError {
        if e.is_timeout() {
            ChowBuddyError::Payment(PaymentError::Timeout)
        } else {
            ChowBuddyError::Payment(PaymentError::RequestFailed(e.to_string()))
        }
    }
}

#[async_trait]
impl PaymentClient for PaymentGatewayClient {
    async fn create_payment_link(
        &self,
        order_ref: &str,
        amount_minor: u64,
        user_id: &str,
    ) -> Result<PaymentLink> {
        let url = format!("{}/transaction/initialize", self.base_url);
        // The gateway requires an email; chat users have none, so a
        // synthetic one is derived from the channel id
        let payload = json!({
            "email": format!("{}@chat.local", user_id),
            "amount": amount_minor,
            "reference": order_ref,
            "metadata": { "user_id": user_id }
        });

        debug!(order_ref = order_ref, amount_minor = amount_minor, "Initializing gateway transaction");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .json(&payload)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ChowBuddyError::Payment(PaymentError::RequestFailed(
                format!("HTTP {}: {}", status, error_text),
            )));
        }

        let body: GatewayResponse<InitializeData> = response
            .json()
            .await
            .map_err(|e| ChowBuddyError::Payment(PaymentError::InvalidResponse(e.to_string())))?;

        if !body.status {
            return Err(ChowBuddyError::Payment(PaymentError::Declined(
                body.message.unwrap_or_else(|| "gateway returned status false".to_string()),
            )));
        }

        let data = body.data.ok_or_else(|| {
            ChowBuddyError::Payment(PaymentError::InvalidResponse(
                "missing data in initialize response".to_string(),
            ))
        })?;

        info!(order_ref = order_ref, gateway_ref = %data.reference, "Payment link created");

        Ok(PaymentLink {
            url: data.authorization_url,
            gateway_ref: data.reference,
        })
    }

    async fn verify_transaction(&self, order_ref: &str) -> Result<VerifiedPayment> {
        let url = format!("{}/transaction/verify/{}", self.base_url, order_ref);

        debug!(order_ref = order_ref, "Verifying gateway transaction");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        // An unknown reference is a normal answer for never-attempted
        // payments, not an error
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(VerifiedPayment::Unknown);
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ChowBuddyError::Payment(PaymentError::RequestFailed(
                format!("HTTP {}: {}", status, error_text),
            )));
        }

        let body: GatewayResponse<VerifyData> = response
            .json()
            .await
            .map_err(|e| ChowBuddyError::Payment(PaymentError::InvalidResponse(e.to_string())))?;

        let verified = match body.data.as_ref().map(|d| d.status.as_str()) {
            Some("success") => VerifiedPayment::Paid,
            Some("failed") => VerifiedPayment::Failed,
            Some(other) => {
                debug!(order_ref = order_ref, gateway_status = other, "Gateway reports non-final status");
                VerifiedPayment::Unknown
            }
            None => {
                warn!(order_ref = order_ref, "Gateway verify response carried no data");
                VerifiedPayment::Unknown
            }
        };

        Ok(verified)
    }
}

impl std::fmt::Debug for PaymentGatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentGatewayClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
