//! Inbound event model
//!
//! Events arrive from the channel webhook (text and button messages) and
//! from the payment gateway webhook (payment confirmations). Event ids
//! are external and advisory: the platform may redeliver the same event,
//! so the dispatcher deduplicates against the session ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::order::PaymentStatus;

/// What kind of inbound event this is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    Text { body: String },
    Button { payload: String },
    PaymentConfirmation { order_ref: String, status: PaymentStatus },
}

/// An inbound webhook event admitted to the dispatcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    pub event_id: String,
    pub user_id: String,
    pub kind: EventKind,
    pub received_at: DateTime<Utc>,
}

impl InboundEvent {
    pub fn text(event_id: &str, user_id: &str, body: &str, received_at: DateTime<Utc>) -> Self {
        Self {
            event_id: event_id.to_string(),
            user_id: user_id.to_string(),
            kind: EventKind::Text { body: body.to_string() },
            received_at,
        }
    }

    /// Synthesize a payment confirmation event. Payment webhooks carry no
    /// event id of their own, so a stable id is derived from the order
    /// reference and status, which makes redeliveries dedup naturally.
    pub fn payment_confirmation(
        user_id: &str,
        order_ref: &str,
        status: PaymentStatus,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: format!("pay:{}:{}", order_ref, status),
            user_id: user_id.to_string(),
            kind: EventKind::PaymentConfirmation {
                order_ref: order_ref.to_string(),
                status,
            },
            received_at,
        }
    }

    /// The text the engine should process, if this is a user message.
    /// Button payloads are treated as text (single text+button
    /// abstraction).
    pub fn message_text(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Text { body } => Some(body),
            EventKind::Button { payload } => Some(payload),
            EventKind::PaymentConfirmation { .. } => None,
        }
    }
}

/// Result of dispatching one inbound event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    /// The transition was committed
    Applied,
    /// The event was already processed (or the order already final)
    DuplicateIgnored,
    /// Compare-and-swap retries were exhausted; the caller may redeliver
    StaleRejected,
}

impl HandleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandleOutcome::Applied => "applied",
            HandleOutcome::DuplicateIgnored => "duplicate_ignored",
            HandleOutcome::StaleRejected => "stale_rejected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_event_id_is_stable() {
        let now = Utc::now();
        let a = InboundEvent::payment_confirmation("u1", "ORD-1", PaymentStatus::Paid, now);
        let b = InboundEvent::payment_confirmation("u1", "ORD-1", PaymentStatus::Paid, now);
        assert_eq!(a.event_id, b.event_id);
        assert_eq!(a.event_id, "pay:ORD-1:paid");
    }

    #[test]
    fn test_button_payload_treated_as_text() {
        let event = InboundEvent {
            event_id: "e1".to_string(),
            user_id: "u1".to_string(),
            kind: EventKind::Button { payload: "checkout".to_string() },
            received_at: Utc::now(),
        };
        assert_eq!(event.message_text(), Some("checkout"));
    }
}
