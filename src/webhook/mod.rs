//! Webhook edge module
//!
//! Signature verification, payload parsing, and the HTTP endpoints for
//! the channel and payment gateway webhooks

pub mod payload;
pub mod server;
pub mod signature;

pub use server::{router, serve, WebhookState};
