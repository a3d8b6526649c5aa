//! In-memory store implementations
//!
//! Map-backed stores with the same CAS semantics as the Postgres
//! adapter. Used by the test suite and suitable for single-process
//! deployments without durability requirements.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::models::order::{Order, PaymentStatus};
use crate::models::session::Session;
use crate::utils::errors::Result;

use super::{OrderStore, SaveOutcome, SessionStore, StatusTransition};

/// In-memory session store
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load_or_create(&self, user_id: &str) -> Result<Session> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(user_id.to_string())
            .or_insert_with(|| Session::new(user_id, Utc::now()));
        Ok(session.clone())
    }

    async fn save(&self, session: &Session) -> Result<SaveOutcome> {
        let mut sessions = self.sessions.write().await;
        let stored = sessions
            .entry(session.user_id.clone())
            .or_insert_with(|| Session::new(&session.user_id, Utc::now()));

        if stored.version != session.version {
            return Ok(SaveOutcome::VersionConflict);
        }

        let mut committed = session.clone();
        committed.version = session.version + 1;
        committed.updated_at = Utc::now();
        let new_version = committed.version;
        *stored = committed;

        Ok(SaveOutcome::Committed { new_version })
    }
}

/// In-memory order store
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<String, Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        orders.insert(order.order_ref.clone(), order.clone());
        Ok(())
    }

    async fn find_by_ref(&self, order_ref: &str) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(order_ref).cloned())
    }

    async fn transition_status(
        &self,
        order_ref: &str,
        status: PaymentStatus,
        payment_ref: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<StatusTransition> {
        let mut orders = self.orders.write().await;
        let Some(order) = orders.get_mut(order_ref) else {
            return Ok(StatusTransition::NotFound);
        };

        if !order.can_transition_to(status) {
            return Ok(StatusTransition::AlreadyFinal(order.clone()));
        }

        order.payment_status = status;
        if let Some(reference) = payment_ref {
            order.payment_ref = Some(reference.to_string());
        }
        if status == PaymentStatus::Paid {
            order.paid_at = Some(now);
        }

        Ok(StatusTransition::Applied(order.clone()))
    }

    async fn list_pending_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .filter(|o| o.payment_status == PaymentStatus::Pending && o.created_at < cutoff)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session::CartLine;
    use chrono::Duration;

    fn line() -> CartLine {
        CartLine {
            item_id: 1,
            name: "Cheeseburger".to_string(),
            quantity: 1,
            unit_price_minor: 500,
        }
    }

    #[tokio::test]
    async fn test_save_detects_version_conflict() {
        let store = InMemorySessionStore::new();

        let first = store.load_or_create("u1").await.unwrap();
        let second = first.clone();

        // First writer wins
        let outcome = store.save(&first).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Committed { new_version: 1 });

        // Second writer holds a stale version
        let outcome = store.save(&second).await.unwrap();
        assert_eq!(outcome, SaveOutcome::VersionConflict);

        // Reload picks up the committed version and succeeds
        let reloaded = store.load_or_create("u1").await.unwrap();
        assert_eq!(reloaded.version, 1);
        assert!(matches!(
            store.save(&reloaded).await.unwrap(),
            SaveOutcome::Committed { new_version: 2 }
        ));
    }

    #[tokio::test]
    async fn test_transition_status_is_monotonic() {
        let store = InMemoryOrderStore::new();
        let order = Order::new("u1", vec![line()], "12 Palm St", Utc::now());
        let order_ref = order.order_ref.clone();
        store.insert(&order).await.unwrap();

        let first = store
            .transition_status(&order_ref, PaymentStatus::Paid, Some("gw-1"), Utc::now())
            .await
            .unwrap();
        assert!(matches!(first, StatusTransition::Applied(_)));

        let second = store
            .transition_status(&order_ref, PaymentStatus::Paid, Some("gw-1"), Utc::now())
            .await
            .unwrap();
        assert!(matches!(second, StatusTransition::AlreadyFinal(_)));

        let missing = store
            .transition_status("ORD-NOPE", PaymentStatus::Paid, None, Utc::now())
            .await
            .unwrap();
        assert!(matches!(missing, StatusTransition::NotFound));
    }

    #[tokio::test]
    async fn test_list_pending_older_than() {
        let store = InMemoryOrderStore::new();
        let now = Utc::now();

        let mut stale = Order::new("u1", vec![line()], "12 Palm St", now - Duration::minutes(45));
        stale.created_at = now - Duration::minutes(45);
        let mut fresh = Order::new("u2", vec![line()], "3 Oak Ave", now);
        fresh.created_at = now;

        store.insert(&stale).await.unwrap();
        store.insert(&fresh).await.unwrap();

        let pending = store
            .list_pending_older_than(now - Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].order_ref, stale.order_ref);
    }
}
