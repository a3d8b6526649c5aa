//! Conversation engine module
//!
//! The pure state machine driving the ordering conversation, plus the
//! message rendering it emits

pub mod render;
pub mod transition;

pub use transition::{transition, Action, EngineContext, Transition};
