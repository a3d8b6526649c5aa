//! Data models module
//!
//! Core domain records: sessions, orders, inbound events, and the catalog

pub mod catalog;
pub mod event;
pub mod order;
pub mod session;

pub use catalog::{CatalogView, Category, MenuItem};
pub use event::{EventKind, HandleOutcome, InboundEvent};
pub use order::{Order, PaymentStatus};
pub use session::{CartLine, ConversationState, ProcessedEvent, Session};
