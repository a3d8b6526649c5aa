//! Webhook HTTP endpoints
//!
//! Thin axum edge in front of the dispatcher. Both POST endpoints
//! acknowledge with 200 whatever the internal outcome - the platforms
//! retry on non-2xx, and the dispatcher's dedup layer is what makes
//! that safe. Only signature failures are rejected outright.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::dispatch::EventDispatcher;
use crate::utils::errors::Result;

use super::payload::{
    parse_channel_events, parse_gateway_event, ChannelWebhookPayload, GatewayWebhookPayload,
};
use super::signature::{verify_channel_signature, verify_gateway_signature};

/// Shared state for the webhook routes
#[derive(Clone)]
pub struct WebhookState {
    pub dispatcher: Arc<EventDispatcher>,
    pub verify_token: String,
    pub app_secret: String,
    pub gateway_secret: String,
}

impl WebhookState {
    pub fn new(dispatcher: Arc<EventDispatcher>, settings: &Settings) -> Self {
        Self {
            dispatcher,
            verify_token: settings.channel.verify_token.clone(),
            app_secret: settings.channel.app_secret.clone(),
            gateway_secret: settings.payment.secret_key.clone(),
        }
    }
}

/// Build the webhook router
pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhooks/channel", get(verify_channel).post(channel_webhook))
        .route("/webhooks/payment", post(payment_webhook))
        .route("/health", get(health))
        .with_state(state)
}

/// Bind and serve the webhook router
pub async fn serve(state: WebhookState, host: &str, port: u16) -> Result<()> {
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Webhook server listening on {}", addr);

    axum::serve(listener, router(state))
        .await
        .map_err(crate::utils::errors::ChowBuddyError::Io)?;

    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Platform verification challenge (hub.verify_token handshake)
async fn verify_channel(
    State(state): State<WebhookState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let mode = params.get("hub.mode").map(String::as_str);
    let token = params.get("hub.verify_token").map(String::as_str);
    let challenge = params.get("hub.challenge").cloned().unwrap_or_default();

    if mode == Some("subscribe") && !state.verify_token.is_empty() && token == Some(state.verify_token.as_str()) {
        info!("Channel webhook verified successfully");
        (StatusCode::OK, challenge).into_response()
    } else {
        warn!("Channel webhook verification failed: token mismatch");
        (StatusCode::FORBIDDEN, Json(json!({ "error": "Verification failed" }))).into_response()
    }
}

/// Incoming channel messages
async fn channel_webhook(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = header_str(&headers, "x-hub-signature-256");
    if !verify_channel_signature(&state.app_secret, signature, &body) {
        warn!("Invalid channel webhook signature");
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Invalid signature" })))
            .into_response();
    }

    let payload: ChannelWebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            // Acknowledge malformed payloads to stop pointless retries
            error!(error = %e, "Malformed channel webhook payload");
            return (StatusCode::OK, Json(json!({ "status": "error" }))).into_response();
        }
    };

    let events = parse_channel_events(&payload, Utc::now());
    for event in events {
        if let Err(e) = state.dispatcher.handle(event).await {
            // The platform retries on failure; dedup makes that safe
            error!(error = %e, "Failed to process channel event");
        }
    }

    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}

/// Payment gateway notifications
async fn payment_webhook(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = header_str(&headers, "x-paystack-signature");
    if !verify_gateway_signature(&state.gateway_secret, signature, &body) {
        warn!("Invalid gateway webhook signature");
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Invalid signature" })))
            .into_response();
    }

    let payload: GatewayWebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            error!(error = %e, "Malformed gateway webhook payload");
            return (StatusCode::OK, Json(json!({ "status": "error" }))).into_response();
        }
    };

    if let Some((order_ref, status)) = parse_gateway_event(&payload) {
        if let Err(e) = state
            .dispatcher
            .handle_payment_notice(&order_ref, status, Utc::now())
            .await
        {
            error!(order_ref = %order_ref, error = %e, "Failed to process payment notice");
        }
    }

    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
