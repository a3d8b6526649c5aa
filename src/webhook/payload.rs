//! Inbound webhook payload parsing
//!
//! The messaging platform delivers a nested envelope
//! (entry -> changes -> value -> messages/contacts); the payment gateway
//! delivers flat `{event, data}` notifications. Both are flattened here
//! into dispatcher inputs; unsupported message types are skipped.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::models::event::{EventKind, InboundEvent};
use crate::models::order::PaymentStatus;

/// Channel webhook envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelWebhookPayload {
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub value: ChangeValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub messages: Vec<IncomingMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    pub wa_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub id: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub text: Option<TextBody>,
    #[serde(default)]
    pub button: Option<ButtonBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextBody {
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ButtonBody {
    #[serde(default)]
    pub payload: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Flatten a channel webhook payload into inbound events, preserving
/// delivery order
pub fn parse_channel_events(
    payload: &ChannelWebhookPayload,
    received_at: DateTime<Utc>,
) -> Vec<InboundEvent> {
    let mut events = Vec::new();

    for entry in &payload.entry {
        for change in &entry.changes {
            let value = &change.value;
            let contact_id = value.contacts.first().map(|c| c.wa_id.as_str());

            for message in &value.messages {
                let Some(user_id) = message.from.as_deref().or(contact_id) else {
                    debug!(message_id = %message.id, "Message without sender - skipping");
                    continue;
                };

                let kind = match message.message_type.as_str() {
                    "text" => match &message.text {
                        Some(text) if !text.body.is_empty() => {
                            EventKind::Text { body: text.body.clone() }
                        }
                        _ => {
                            debug!(message_id = %message.id, "Empty text message - skipping");
                            continue;
                        }
                    },
                    "button" => {
                        let Some(button) = &message.button else {
                            continue;
                        };
                        let payload = button
                            .payload
                            .clone()
                            .or_else(|| button.text.clone())
                            .unwrap_or_default();
                        if payload.is_empty() {
                            continue;
                        }
                        EventKind::Button { payload }
                    }
                    other => {
                        debug!(message_id = %message.id, message_type = other, "Unhandled message type");
                        continue;
                    }
                };

                events.push(InboundEvent {
                    event_id: message.id.clone(),
                    user_id: user_id.to_string(),
                    kind,
                    received_at,
                });
            }
        }
    }

    events
}

/// Payment gateway webhook payload
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayWebhookPayload {
    pub event: String,
    pub data: GatewayEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayEventData {
    pub reference: String,
}

/// Map a gateway event to an order reference and payment status;
/// returns None for event types we do not act on
pub fn parse_gateway_event(payload: &GatewayWebhookPayload) -> Option<(String, PaymentStatus)> {
    let status = match payload.event.as_str() {
        "charge.success" => PaymentStatus::Paid,
        "charge.failed" => PaymentStatus::Failed,
        other => {
            debug!(event = other, "Unhandled gateway event type");
            return None;
        }
    };

    Some((payload.data.reference.clone(), status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_message() {
        let json = r#"{
            "entry": [{
                "changes": [{
                    "value": {
                        "contacts": [{"wa_id": "2348012345678"}],
                        "messages": [{
                            "id": "wamid.abc",
                            "from": "2348012345678",
                            "type": "text",
                            "text": {"body": "hi"}
                        }]
                    }
                }]
            }]
        }"#;
        let payload: ChannelWebhookPayload = serde_json::from_str(json).unwrap();
        let events = parse_channel_events(&payload, Utc::now());

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_id, "wamid.abc");
        assert_eq!(events[0].user_id, "2348012345678");
        assert_eq!(events[0].message_text(), Some("hi"));
    }

    #[test]
    fn test_parse_button_falls_back_to_text() {
        let json = r#"{
            "entry": [{
                "changes": [{
                    "value": {
                        "contacts": [{"wa_id": "234"}],
                        "messages": [{
                            "id": "wamid.btn",
                            "type": "button",
                            "button": {"text": "checkout"}
                        }]
                    }
                }]
            }]
        }"#;
        let payload: ChannelWebhookPayload = serde_json::from_str(json).unwrap();
        let events = parse_channel_events(&payload, Utc::now());

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message_text(), Some("checkout"));
    }

    #[test]
    fn test_unhandled_message_types_skipped() {
        let json = r#"{
            "entry": [{
                "changes": [{
                    "value": {
                        "contacts": [{"wa_id": "234"}],
                        "messages": [{"id": "wamid.img", "type": "image"}]
                    }
                }]
            }]
        }"#;
        let payload: ChannelWebhookPayload = serde_json::from_str(json).unwrap();
        assert!(parse_channel_events(&payload, Utc::now()).is_empty());
    }

    #[test]
    fn test_parse_gateway_events() {
        let success: GatewayWebhookPayload = serde_json::from_str(
            r#"{"event": "charge.success", "data": {"reference": "ORD-1"}}"#,
        )
        .unwrap();
        assert_eq!(
            parse_gateway_event(&success),
            Some(("ORD-1".to_string(), PaymentStatus::Paid))
        );

        let other: GatewayWebhookPayload = serde_json::from_str(
            r#"{"event": "transfer.success", "data": {"reference": "ORD-1"}}"#,
        )
        .unwrap();
        assert_eq!(parse_gateway_event(&other), None);
    }
}
