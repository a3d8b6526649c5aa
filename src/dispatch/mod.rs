//! Event dispatch module
//!
//! Dedup, per-user serialization, transactional apply, and the payment
//! reconciliation sweep

pub mod dispatcher;
pub mod locks;
pub mod reconcile;

pub use dispatcher::EventDispatcher;
pub use locks::UserLocks;
pub use reconcile::{PaymentReconciler, ReconcileManager, SweepStats};
