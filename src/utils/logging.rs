//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the ChowBuddy application.

use tracing::{info, warn, error, debug};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use crate::config::LoggingConfig;
use crate::utils::errors::Result;

/// Initialize logging based on configuration
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let file_appender = tracing_appender::rolling::daily(&config.file_path, "chowbuddy.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
        .init();

    info!("Logging initialized with level: {}", config.level);
    Ok(())
}

/// Log the outcome of a dispatched event with structured data
pub fn log_event_outcome(user_id: &str, event_id: &str, outcome: &str) {
    info!(
        user_id = user_id,
        event_id = event_id,
        outcome = outcome,
        "Event dispatched"
    );
}

/// Log order lifecycle transitions
pub fn log_order_transition(order_ref: &str, user_id: &str, status: &str) {
    info!(
        order_ref = order_ref,
        user_id = user_id,
        status = status,
        "Order status changed"
    );
}

/// Log a failed outbound message delivery
pub fn log_send_failure(user_id: &str, error: &str) {
    warn!(
        user_id = user_id,
        error = error,
        "Outbound message delivery failed"
    );
}

/// Log upstream API errors with context
pub fn log_api_error(api: &str, error: &str, context: Option<&str>) {
    error!(
        api = api,
        error = error,
        context = context,
        "API error occurred"
    );
}

/// Log reconciliation sweep results
pub fn log_reconcile_sweep(scanned: usize, expired: u32, recovered: u32) {
    if expired > 0 || recovered > 0 {
        info!(
            scanned = scanned,
            expired = expired,
            recovered = recovered,
            "Payment reconciliation sweep completed"
        );
    } else {
        debug!(scanned = scanned, "Payment reconciliation sweep found nothing stale");
    }
}
