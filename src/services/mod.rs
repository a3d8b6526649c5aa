//! Services module
//!
//! External collaborator adapters: menu lookup, outbound message
//! delivery, and the payment gateway. Each sits behind a trait so the
//! dispatcher can be exercised without network access.

pub mod menu;
pub mod payment;
pub mod sender;

pub use menu::HttpMenuLookup;
pub use payment::{PaymentGatewayClient, PaymentLink, VerifiedPayment};
pub use sender::ChannelSender;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Settings;
use crate::models::catalog::{Category, MenuItem};
use crate::utils::errors::Result;

/// Read-only catalog lookup
#[async_trait]
pub trait MenuLookup: Send + Sync {
    async fn get_categories(&self) -> Result<Vec<Category>>;
    async fn get_items(&self, category_id: i64) -> Result<Vec<MenuItem>>;
}

/// Outbound text delivery with retry; failures are logged by the caller
/// and never block a state commit
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_text(&self, user_id: &str, body: &str) -> Result<()>;
}

/// Payment gateway operations
#[async_trait]
pub trait PaymentClient: Send + Sync {
    /// Create a payment link for an order; the confirmation arrives
    /// later through the webhook
    async fn create_payment_link(
        &self,
        order_ref: &str,
        amount_minor: u64,
        user_id: &str,
    ) -> Result<PaymentLink>;

    /// Ask the gateway for the transaction status directly; used by the
    /// reconciliation sweep when no webhook arrived
    async fn verify_transaction(&self, order_ref: &str) -> Result<VerifiedPayment>;
}

/// Service factory for creating all external adapters
#[derive(Clone)]
pub struct ServiceFactory {
    pub menu: Arc<dyn MenuLookup>,
    pub sender: Arc<dyn MessageSender>,
    pub payments: Arc<dyn PaymentClient>,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all adapters initialized
    pub fn new(settings: &Settings, redis_client: redis::Client) -> Result<Self> {
        let menu = HttpMenuLookup::new(&settings.menu)?
            .with_cache(redis_client, &settings.redis.prefix, settings.redis.ttl_seconds);
        let sender = ChannelSender::new(&settings.channel)?;
        let payments = PaymentGatewayClient::new(&settings.payment)?;

        Ok(Self {
            menu: Arc::new(menu),
            sender: Arc::new(sender),
            payments: Arc::new(payments),
        })
    }
}
