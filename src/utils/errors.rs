//! Error handling for ChowBuddy
//!
//! This module defines the main error types used throughout the application
//! and provides a unified error handling strategy.

use thiserror::Error;

/// Main error type for ChowBuddy application
#[derive(Error, Debug)]
pub enum ChowBuddyError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Menu lookup error: {0}")]
    Menu(#[from] MenuError),

    #[error("Message sender error: {0}")]
    Sender(#[from] SenderError),

    #[error("Payment gateway error: {0}")]
    Payment(#[from] PaymentError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Duplicate event: {event_id}")]
    DuplicateEvent { event_id: String },

    #[error("Stale write conflict for user {user_id} after {attempts} attempts")]
    StaleWriteConflict { user_id: String, attempts: u32 },

    #[error("Order not found: {order_ref}")]
    OrderNotFound { order_ref: String },

    #[error("Invalid webhook signature")]
    SignatureInvalid,

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Menu lookup API specific errors
#[derive(Error, Debug)]
pub enum MenuError {
    #[error("Menu API request failed: {0}")]
    RequestFailed(String),

    #[error("Menu API timeout")]
    Timeout,

    #[error("Invalid menu response: {0}")]
    InvalidResponse(String),

    #[error("Menu service unavailable")]
    ServiceUnavailable,
}

/// Outbound message delivery errors
#[derive(Error, Debug)]
pub enum SenderError {
    #[error("Send request failed: {0}")]
    RequestFailed(String),

    #[error("Send request timeout")]
    Timeout,

    #[error("Channel rejected message: {0}")]
    Rejected(String),

    #[error("Retries exhausted after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
}

/// Payment gateway specific errors
#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Gateway request failed: {0}")]
    RequestFailed(String),

    #[error("Gateway timeout")]
    Timeout,

    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),

    #[error("Transaction initialization declined: {0}")]
    Declined(String),
}

/// Result type alias for ChowBuddy operations
pub type Result<T> = std::result::Result<T, ChowBuddyError>;

impl ChowBuddyError {
    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            ChowBuddyError::Database(_) => false,
            ChowBuddyError::Migration(_) => false,
            ChowBuddyError::Menu(_) => true,
            ChowBuddyError::Sender(_) => true,
            ChowBuddyError::Payment(_) => true,
            ChowBuddyError::Config(_) => false,
            ChowBuddyError::DuplicateEvent { .. } => true,
            ChowBuddyError::StaleWriteConflict { .. } => true,
            ChowBuddyError::OrderNotFound { .. } => false,
            ChowBuddyError::SignatureInvalid => false,
            ChowBuddyError::Redis(_) => true,
            ChowBuddyError::Http(_) => true,
            ChowBuddyError::Serialization(_) => false,
            ChowBuddyError::Io(_) => true,
            ChowBuddyError::InvalidInput(_) => false,
            ChowBuddyError::ServiceUnavailable(_) => true,
        }
    }

    /// Check if the failure left upstream state untouched and the user
    /// should simply be told to try again
    pub fn is_upstream_unavailable(&self) -> bool {
        matches!(
            self,
            ChowBuddyError::Menu(_)
                | ChowBuddyError::Payment(_)
                | ChowBuddyError::Http(_)
                | ChowBuddyError::Redis(_)
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ChowBuddyError::Database(_) => ErrorSeverity::Critical,
            ChowBuddyError::Migration(_) => ErrorSeverity::Critical,
            ChowBuddyError::Config(_) => ErrorSeverity::Critical,
            ChowBuddyError::SignatureInvalid => ErrorSeverity::Warning,
            ChowBuddyError::DuplicateEvent { .. } => ErrorSeverity::Info,
            ChowBuddyError::InvalidInput(_) => ErrorSeverity::Info,
            ChowBuddyError::StaleWriteConflict { .. } => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
