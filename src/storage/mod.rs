//! Storage module
//!
//! Session and order persistence behind trait seams. The session record
//! is the only mutable shared state in the core; all mutation goes
//! through a compare-and-swap on its `version`.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::order::{Order, PaymentStatus};
use crate::models::session::Session;
use crate::utils::errors::Result;

/// Outcome of a compare-and-swap session save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The record was written; the stored version is now `new_version`
    Committed { new_version: u64 },
    /// The stored version no longer matches; reload and retry
    VersionConflict,
}

/// Durable per-user session records with CAS updates
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the user's session, creating it lazily in the initial state
    /// on first contact
    async fn load_or_create(&self, user_id: &str) -> Result<Session>;

    /// Persist `session` if and only if the stored version still equals
    /// `session.version`. The stored version is incremented on success.
    async fn save(&self, session: &Session) -> Result<SaveOutcome>;
}

/// Result of a monotonic payment-status transition
#[derive(Debug, Clone)]
pub enum StatusTransition {
    /// The order left PENDING and now carries the new status
    Applied(Order),
    /// The order had already left PENDING; nothing changed
    AlreadyFinal(Order),
    /// No order with that reference exists
    NotFound,
}

/// Durable order records
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: &Order) -> Result<()>;

    async fn find_by_ref(&self, order_ref: &str) -> Result<Option<Order>>;

    /// Apply a payment-status transition. Only orders still PENDING are
    /// updated, which makes duplicate PAID confirmations no-ops.
    async fn transition_status(
        &self,
        order_ref: &str,
        status: PaymentStatus,
        payment_ref: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<StatusTransition>;

    /// PENDING orders created before `cutoff`, for the reconciliation
    /// sweep
    async fn list_pending_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>>;
}
