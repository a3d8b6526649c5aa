//! Order model
//!
//! An order is created when the user confirms checkout: a frozen copy of
//! the cart, the delivery address, and the amount due. It is immutable
//! except for `payment_status`, which moves monotonically out of PENDING
//! exactly once. Duplicate PAID webhooks are no-ops.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::session::CartLine;

/// Payment lifecycle of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Expired,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Expired => "expired",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            "failed" => Some(PaymentStatus::Failed),
            "expired" => Some(PaymentStatus::Expired),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A customer order awaiting or past payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique human-readable reference, e.g. "ORD-A1B2C3D4"
    pub order_ref: String,
    pub user_id: String,
    /// Frozen copy of the cart at confirmation time
    pub lines: Vec<CartLine>,
    pub address: String,
    pub amount_minor: u64,
    pub payment_status: PaymentStatus,
    /// Gateway transaction reference, recorded once the payment link
    /// is created or the confirmation webhook arrives
    pub payment_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Create a PENDING order from a cart snapshot
    pub fn new(user_id: &str, lines: Vec<CartLine>, address: &str, now: DateTime<Utc>) -> Self {
        let amount_minor = lines.iter().map(CartLine::subtotal_minor).sum();
        Self {
            order_ref: generate_order_ref(),
            user_id: user_id.to_string(),
            lines,
            address: address.to_string(),
            amount_minor,
            payment_status: PaymentStatus::Pending,
            payment_ref: None,
            created_at: now,
            paid_at: None,
        }
    }

    /// Whether the status transition is allowed. Only transitions out of
    /// PENDING are applied; once PENDING is left the record is final.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        self.payment_status == PaymentStatus::Pending && next != PaymentStatus::Pending
    }
}

/// Generate a unique, human-readable order reference
pub fn generate_order_ref() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("ORD-{}", hex[..8].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> CartLine {
        CartLine {
            item_id: 1,
            name: "Cheeseburger".to_string(),
            quantity: 2,
            unit_price_minor: 500,
        }
    }

    #[test]
    fn test_order_amount_from_lines() {
        let order = Order::new("u1", vec![line()], "12 Palm St", Utc::now());
        assert_eq!(order.amount_minor, 1000);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
    }

    #[test]
    fn test_status_monotonicity() {
        let mut order = Order::new("u1", vec![line()], "12 Palm St", Utc::now());
        assert!(order.can_transition_to(PaymentStatus::Paid));
        assert!(order.can_transition_to(PaymentStatus::Expired));

        order.payment_status = PaymentStatus::Paid;
        assert!(!order.can_transition_to(PaymentStatus::Paid));
        assert!(!order.can_transition_to(PaymentStatus::Failed));

        let mut expired = Order::new("u1", vec![line()], "12 Palm St", Utc::now());
        expired.payment_status = PaymentStatus::Expired;
        assert!(!expired.can_transition_to(PaymentStatus::Paid));
    }

    #[test]
    fn test_order_ref_format() {
        let order_ref = generate_order_ref();
        assert!(order_ref.starts_with("ORD-"));
        assert_eq!(order_ref.len(), 12);
    }

    #[test]
    fn test_payment_status_round_trip() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Paid,
            PaymentStatus::Failed,
            PaymentStatus::Expired,
        ] {
            assert_eq!(PaymentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PaymentStatus::parse("refunded"), None);
    }
}
