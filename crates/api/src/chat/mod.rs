//! Chat session domain
//!
//! The state machine owns every mutation of a chat session; the event bus
//! decouples those mutations from real-time delivery.

pub mod engine;
pub mod events;

pub use engine::ChatEngine;
pub use events::{EventBus, SessionEvent};
