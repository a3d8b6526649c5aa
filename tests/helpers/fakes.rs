//! Fake collaborator implementations
//!
//! Deterministic stand-ins for the menu, sender, and payment adapters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use ChowBuddy::models::catalog::{Category, MenuItem};
use ChowBuddy::services::{MenuLookup, MessageSender, PaymentClient, PaymentLink, VerifiedPayment};
use ChowBuddy::storage::{SaveOutcome, SessionStore};
use ChowBuddy::utils::errors::{ChowBuddyError, MenuError, Result};

/// Fixed two-category catalog: Burgers (Cheeseburger $5, Fries $2) and
/// Drinks (Cola $1.50)
pub struct FakeMenu {
    categories: Vec<Category>,
    items: HashMap<i64, Vec<MenuItem>>,
}

impl FakeMenu {
    pub fn new() -> Self {
        let categories = vec![
            Category { id: 10, name: "Burgers".to_string(), ordering: 0 },
            Category { id: 20, name: "Drinks".to_string(), ordering: 1 },
        ];

        let mut items = HashMap::new();
        items.insert(10, vec![
            MenuItem {
                id: 1,
                category_id: 10,
                name: "Cheeseburger".to_string(),
                price_minor: 500,
                is_available: true,
            },
            MenuItem {
                id: 2,
                category_id: 10,
                name: "Fries".to_string(),
                price_minor: 200,
                is_available: true,
            },
        ]);
        items.insert(20, vec![MenuItem {
            id: 3,
            category_id: 20,
            name: "Cola".to_string(),
            price_minor: 150,
            is_available: true,
        }]);

        Self { categories, items }
    }
}

#[async_trait]
impl MenuLookup for FakeMenu {
    async fn get_categories(&self) -> Result<Vec<Category>> {
        Ok(self.categories.clone())
    }

    async fn get_items(&self, category_id: i64) -> Result<Vec<MenuItem>> {
        Ok(self.items.get(&category_id).cloned().unwrap_or_default())
    }
}

/// Menu lookup that always fails, for upstream-unavailable paths
pub struct FailingMenu;

#[async_trait]
impl MenuLookup for FailingMenu {
    async fn get_categories(&self) -> Result<Vec<Category>> {
        Err(ChowBuddyError::Menu(MenuError::ServiceUnavailable))
    }

    async fn get_items(&self, _category_id: i64) -> Result<Vec<MenuItem>> {
        Err(ChowBuddyError::Menu(MenuError::ServiceUnavailable))
    }
}

/// Sender that records every message instead of delivering it
pub struct RecordingSender {
    messages: Mutex<Vec<(String, String)>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self { messages: Mutex::new(Vec::new()) }
    }

    pub fn messages_for(&self, user_id: &str) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| to == user_id)
            .map(|(_, body)| body.clone())
            .collect()
    }

    pub fn last_message_for(&self, user_id: &str) -> Option<String> {
        self.messages_for(user_id).pop()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send_text(&self, user_id: &str, body: &str) -> Result<()> {
        self.messages
            .lock()
            .unwrap()
            .push((user_id.to_string(), body.to_string()));
        Ok(())
    }
}

/// Payment client with scripted verification answers
pub struct ScriptedPaymentClient {
    link_requests: AtomicU32,
    verify_answer: Mutex<VerifiedPayment>,
}

impl ScriptedPaymentClient {
    pub fn new() -> Self {
        Self {
            link_requests: AtomicU32::new(0),
            verify_answer: Mutex::new(VerifiedPayment::Unknown),
        }
    }

    pub fn link_requests(&self) -> u32 {
        self.link_requests.load(Ordering::SeqCst)
    }

    pub fn set_verify_answer(&self, answer: VerifiedPayment) {
        *self.verify_answer.lock().unwrap() = answer;
    }
}

#[async_trait]
impl PaymentClient for ScriptedPaymentClient {
    async fn create_payment_link(
        &self,
        order_ref: &str,
        _amount_minor: u64,
        _user_id: &str,
    ) -> Result<PaymentLink> {
        self.link_requests.fetch_add(1, Ordering::SeqCst);
        Ok(PaymentLink {
            url: format!("https://pay.test/{order_ref}"),
            gateway_ref: format!("gw-{order_ref}"),
        })
    }

    async fn verify_transaction(&self, _order_ref: &str) -> Result<VerifiedPayment> {
        Ok(*self.verify_answer.lock().unwrap())
    }
}

/// Session store wrapper whose saves always lose the CAS race
pub struct AlwaysConflictingStore<S> {
    pub inner: S,
}

#[async_trait]
impl<S: SessionStore> SessionStore for AlwaysConflictingStore<S> {
    async fn load_or_create(&self, user_id: &str) -> Result<ChowBuddy::models::session::Session> {
        self.inner.load_or_create(user_id).await
    }

    async fn save(&self, _session: &ChowBuddy::models::session::Session) -> Result<SaveOutcome> {
        Ok(SaveOutcome::VersionConflict)
    }
}
