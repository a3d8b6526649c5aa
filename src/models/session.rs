//! Session model and conversation states
//!
//! Each user has exactly one session tracking their conversation state,
//! cart contents, and the dedup ledger of recently processed event ids.
//! Sessions are versioned records: every mutation goes through a
//! compare-and-swap on `version`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::catalog::MenuItem;

/// All possible conversation states.
///
/// The machine progresses through these states based on user input:
///
/// IDLE -> BROWSING_CATEGORIES -> BROWSING_ITEMS -> CART_REVIEW
///                                                      |
///        IDLE <- COMPLETED <- AWAITING_PAYMENT <- AWAITING_ADDRESS
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversationState {
    Idle,
    BrowsingCategories,
    BrowsingItems { category_id: i64 },
    CartReview,
    AwaitingAddress,
    AwaitingPayment { order_ref: String },
    /// Terminal for one ordering cycle; the dispatcher resets it to
    /// `Idle` in the same commit that records the confirmation.
    Completed,
}

impl ConversationState {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            ConversationState::Idle => "idle",
            ConversationState::BrowsingCategories => "browsing_categories",
            ConversationState::BrowsingItems { .. } => "browsing_items",
            ConversationState::CartReview => "cart_review",
            ConversationState::AwaitingAddress => "awaiting_address",
            ConversationState::AwaitingPayment { .. } => "awaiting_payment",
            ConversationState::Completed => "completed",
        }
    }

    /// Placeholder produced by the engine for the payment transition;
    /// the dispatcher fills the real reference after the payment link
    /// has been created.
    pub fn awaiting_payment_placeholder() -> Self {
        ConversationState::AwaitingPayment { order_ref: String::new() }
    }
}

/// One line in a user's cart.
///
/// `unit_price_minor` and `name` are snapshots taken when the item is
/// added, so later catalog changes do not alter an open cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub item_id: i64,
    pub name: String,
    pub quantity: u32,
    pub unit_price_minor: u64,
}

impl CartLine {
    /// Total price for this line
    pub fn subtotal_minor(&self) -> u64 {
        self.unit_price_minor * u64::from(self.quantity)
    }
}

/// Merge an item into a cart: bump quantity if a line for the item
/// already exists, otherwise append a new line with snapshot pricing.
pub fn merge_cart_line(cart: &mut Vec<CartLine>, item: &MenuItem, quantity: u32) {
    debug_assert!(quantity > 0);
    if let Some(line) = cart.iter_mut().find(|line| line.item_id == item.id) {
        line.quantity += quantity;
    } else {
        cart.push(CartLine {
            item_id: item.id,
            name: item.name.clone(),
            quantity,
            unit_price_minor: item.price_minor,
        });
    }
}

/// Sum of all line subtotals
pub fn cart_total_minor(cart: &[CartLine]) -> u64 {
    cart.iter().map(CartLine::subtotal_minor).sum()
}

/// Sum of all line quantities
pub fn cart_item_count(cart: &[CartLine]) -> u32 {
    cart.iter().map(|line| line.quantity).sum()
}

/// A processed inbound event id, kept for deduplication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedEvent {
    pub event_id: String,
    pub received_at: DateTime<Utc>,
}

/// Per-user conversation session.
///
/// Owned by the session store; the engine never mutates a session
/// directly, it proposes a transition that the dispatcher commits
/// through `SessionStore::save` (CAS on `version`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub state: ConversationState,
    pub cart: Vec<CartLine>,
    pub pending_order_ref: Option<String>,
    pub delivery_address: Option<String>,
    /// Dedup ledger of recently processed event ids, pruned to the
    /// configured window on every commit. Survives session resets.
    pub processed_events: Vec<ProcessedEvent>,
    /// Monotonic version for compare-and-swap updates
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a fresh session in the initial state
    pub fn new(user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            state: ConversationState::Idle,
            cart: Vec::new(),
            pending_order_ref: None,
            delivery_address: None,
            processed_events: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check whether an event id was already processed inside the window
    pub fn has_processed(&self, event_id: &str) -> bool {
        self.processed_events.iter().any(|e| e.event_id == event_id)
    }

    /// Record a processed event id and drop ledger entries older than
    /// the dedup window
    pub fn record_event(&mut self, event_id: &str, received_at: DateTime<Utc>, window: Duration) {
        let cutoff = received_at - window;
        self.processed_events.retain(|e| e.received_at > cutoff);
        self.processed_events.push(ProcessedEvent {
            event_id: event_id.to_string(),
            received_at,
        });
    }

    /// Reset to the initial state after order completion or explicit
    /// cancellation. The dedup ledger is preserved.
    pub fn reset(&mut self) {
        self.state = ConversationState::Idle;
        self.cart.clear();
        self.pending_order_ref = None;
        self.delivery_address = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn burger() -> MenuItem {
        MenuItem {
            id: 1,
            category_id: 10,
            name: "Cheeseburger".to_string(),
            price_minor: 500,
            is_available: true,
        }
    }

    #[test]
    fn test_merge_cart_line_merges_same_item() {
        let mut cart = Vec::new();
        merge_cart_line(&mut cart, &burger(), 1);
        merge_cart_line(&mut cart, &burger(), 1);

        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].quantity, 2);
        assert_eq!(cart_total_minor(&cart), 1000);
    }

    #[test]
    fn test_merge_cart_line_snapshots_price() {
        let mut cart = Vec::new();
        merge_cart_line(&mut cart, &burger(), 1);

        let mut pricier = burger();
        pricier.price_minor = 900;
        merge_cart_line(&mut cart, &pricier, 1);

        // Price snapshot of the first add wins for the merged line
        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].unit_price_minor, 500);
    }

    #[test]
    fn test_record_event_prunes_window() {
        let now = Utc::now();
        let mut session = Session::new("u1", now);
        session.record_event("old", now - Duration::hours(25), Duration::hours(24));
        session.record_event("fresh", now, Duration::hours(24));

        assert!(!session.has_processed("old"));
        assert!(session.has_processed("fresh"));
    }

    #[test]
    fn test_reset_keeps_ledger() {
        let now = Utc::now();
        let mut session = Session::new("u1", now);
        session.record_event("e1", now, Duration::hours(24));
        session.state = ConversationState::Completed;
        session.cart.push(CartLine {
            item_id: 1,
            name: "Fries".to_string(),
            quantity: 1,
            unit_price_minor: 200,
        });

        session.reset();

        assert_eq!(session.state, ConversationState::Idle);
        assert!(session.cart.is_empty());
        assert!(session.has_processed("e1"));
    }
}
