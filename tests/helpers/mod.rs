//! Shared test helpers
//!
//! In-memory harness wiring the dispatcher to fake collaborators so
//! integration tests run without network or database access.

pub mod fakes;

use std::sync::Arc;

use chrono::Utc;

use ChowBuddy::config::{DispatchConfig, ShopConfig};
use ChowBuddy::dispatch::EventDispatcher;
use ChowBuddy::models::event::{HandleOutcome, InboundEvent};
use ChowBuddy::models::session::Session;
use ChowBuddy::services::ServiceFactory;
use ChowBuddy::storage::memory::{InMemoryOrderStore, InMemorySessionStore};
use ChowBuddy::storage::{OrderStore, SessionStore};

use fakes::{FakeMenu, RecordingSender, ScriptedPaymentClient};

/// Dispatcher wired to in-memory stores and scripted collaborators
pub struct TestHarness {
    pub dispatcher: Arc<EventDispatcher>,
    pub sessions: Arc<InMemorySessionStore>,
    pub orders: Arc<InMemoryOrderStore>,
    pub sender: Arc<RecordingSender>,
    pub payments: Arc<ScriptedPaymentClient>,
}

impl TestHarness {
    pub fn new() -> Self {
        let sessions = Arc::new(InMemorySessionStore::new());
        let orders = Arc::new(InMemoryOrderStore::new());
        let sender = Arc::new(RecordingSender::new());
        let payments = Arc::new(ScriptedPaymentClient::new());

        let services = ServiceFactory {
            menu: Arc::new(FakeMenu::new()),
            sender: sender.clone(),
            payments: payments.clone(),
        };

        let dispatcher = Arc::new(EventDispatcher::new(
            sessions.clone() as Arc<dyn SessionStore>,
            orders.clone() as Arc<dyn OrderStore>,
            services,
            shop_config(),
            dispatch_config(),
        ));

        Self { dispatcher, sessions, orders, sender, payments }
    }

    /// Dispatch a text event and return the outcome
    pub async fn send_text(&self, user_id: &str, event_id: &str, body: &str) -> HandleOutcome {
        self.dispatcher
            .handle(InboundEvent::text(event_id, user_id, body, Utc::now()))
            .await
            .expect("dispatch failed")
    }

    /// Read the user's current session without mutating it
    pub async fn session(&self, user_id: &str) -> Session {
        self.sessions
            .load_or_create(user_id)
            .await
            .expect("session load failed")
    }

    /// Walk a user from IDLE to AWAITING_PAYMENT with one cheeseburger
    /// in the cart; returns the pending order reference
    pub async fn checkout_one_burger(&self, user_id: &str) -> String {
        self.send_text(user_id, &format!("{user_id}-hi"), "hi").await;
        self.send_text(user_id, &format!("{user_id}-cat"), "1").await;
        self.send_text(user_id, &format!("{user_id}-item"), "1").await;
        self.send_text(user_id, &format!("{user_id}-cart"), "cart").await;
        self.send_text(user_id, &format!("{user_id}-checkout"), "checkout").await;
        self.send_text(user_id, &format!("{user_id}-addr"), "12 Palm St").await;

        let session = self.session(user_id).await;
        session
            .pending_order_ref
            .expect("checkout did not produce a pending order")
    }
}

pub fn shop_config() -> ShopConfig {
    ShopConfig {
        name: "ChowBuddy".to_string(),
        currency_symbol: "$".to_string(),
    }
}

pub fn dispatch_config() -> DispatchConfig {
    DispatchConfig {
        dedup_window_minutes: 24 * 60,
        cas_retries: 3,
        reconcile_interval_seconds: 60,
    }
}
