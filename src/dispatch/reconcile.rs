//! Payment reconciliation sweep
//!
//! Confirmation webhooks cannot be trusted to always arrive, so a
//! scheduled sweep walks PENDING orders older than the payment timeout.
//! Each stale order is first verified against the gateway (a lost
//! webhook for a real payment must recover as PAID, not EXPIRED), then
//! the verdict is routed through the dispatcher as a synthetic
//! confirmation event so expiry follows the exact same serialization,
//! idempotency, and commit path as a real webhook.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::{DispatchConfig, PaymentConfig};
use crate::models::event::InboundEvent;
use crate::models::order::PaymentStatus;
use crate::services::{PaymentClient, VerifiedPayment};
use crate::storage::OrderStore;
use crate::utils::errors::Result;
use crate::utils::logging;

use super::dispatcher::EventDispatcher;

/// Results of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub scanned: usize,
    pub expired: u32,
    pub recovered: u32,
}

/// Sweeps stale PENDING orders into a final status
#[derive(Clone)]
pub struct PaymentReconciler {
    dispatcher: Arc<EventDispatcher>,
    orders: Arc<dyn OrderStore>,
    payments: Arc<dyn PaymentClient>,
    pending_timeout: chrono::Duration,
}

impl PaymentReconciler {
    pub fn new(
        dispatcher: Arc<EventDispatcher>,
        orders: Arc<dyn OrderStore>,
        payments: Arc<dyn PaymentClient>,
        config: &PaymentConfig,
    ) -> Self {
        Self {
            dispatcher,
            orders,
            payments,
            pending_timeout: chrono::Duration::minutes(config.pending_timeout_minutes),
        }
    }

    /// Run one sweep over stale PENDING orders
    pub async fn run_once(&self) -> Result<SweepStats> {
        let cutoff = Utc::now() - self.pending_timeout;
        let stale = self.orders.list_pending_older_than(cutoff).await?;

        let mut stats = SweepStats {
            scanned: stale.len(),
            ..SweepStats::default()
        };

        for order in stale {
            let verdict = match self.payments.verify_transaction(&order.order_ref).await {
                Ok(VerifiedPayment::Paid) => PaymentStatus::Paid,
                Ok(VerifiedPayment::Failed) => PaymentStatus::Failed,
                Ok(VerifiedPayment::Unknown) => PaymentStatus::Expired,
                Err(e) => {
                    // Gateway unreachable: leave the order for the next
                    // sweep rather than expiring a possibly-paid order
                    warn!(
                        order_ref = %order.order_ref,
                        error = %e,
                        "Gateway verification failed - deferring order to next sweep"
                    );
                    continue;
                }
            };

            let event = InboundEvent::payment_confirmation(
                &order.user_id,
                &order.order_ref,
                verdict,
                Utc::now(),
            );

            match self.dispatcher.handle(event).await {
                Ok(_) => {
                    if verdict == PaymentStatus::Paid {
                        info!(order_ref = %order.order_ref, "Recovered paid order missed by webhook");
                        stats.recovered += 1;
                    } else {
                        stats.expired += 1;
                    }
                }
                Err(e) => {
                    error!(
                        order_ref = %order.order_ref,
                        error = %e,
                        "Failed to apply reconciliation verdict"
                    );
                }
            }
        }

        logging::log_reconcile_sweep(stats.scanned, stats.expired, stats.recovered);
        Ok(stats)
    }
}

impl std::fmt::Debug for PaymentReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentReconciler")
            .field("pending_timeout", &self.pending_timeout)
            .finish_non_exhaustive()
    }
}

/// Reconciler with a managed background task
#[derive(Debug)]
pub struct ReconcileManager {
    reconciler: PaymentReconciler,
    interval: Duration,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl ReconcileManager {
    pub fn new(reconciler: PaymentReconciler, config: &DispatchConfig) -> Self {
        Self {
            reconciler,
            interval: Duration::from_secs(config.reconcile_interval_seconds),
            handle: None,
        }
    }

    /// Start the periodic sweep task
    pub fn start(&mut self) {
        if self.handle.is_some() {
            warn!("Reconciliation task is already running");
            return;
        }

        let reconciler = self.reconciler.clone();
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);

            loop {
                ticker.tick().await;

                if let Err(e) = reconciler.run_once().await {
                    error!(error = %e, "Reconciliation sweep failed");
                }
            }
        });

        self.handle = Some(handle);
        info!("Started payment reconciliation task with interval {:?}", self.interval);
    }

    /// Stop the periodic sweep task
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("Stopped payment reconciliation task");
        }
    }
}

impl Drop for ReconcileManager {
    fn drop(&mut self) {
        self.stop();
    }
}
