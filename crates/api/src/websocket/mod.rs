//! WebSocket support for real-time chat
//!
//! Provides the real-time surface of the chat domain:
//! - Session rooms (who is attached to which chat session)
//! - Live message delivery into rooms
//! - Typing indicator relay
//! - Session status updates (claimed, transferred, ended)
//!
//! # Architecture
//!
//! - **Connection**: an authenticated WebSocket connection
//! - **Room**: session-based pub/sub for broadcasting events
//! - **State**: global WebSocket state shared across all connections
//! - **Handler**: Axum WebSocket route handler
//! - **Fanout**: bridge from domain events to room broadcasts
//! - **Events**: type-safe client/server event definitions

pub mod connection;
pub mod events;
pub mod fanout;
pub mod handler;
pub mod room;
pub mod state;

pub use fanout::spawn_fanout;
pub use handler::ws_handler;
pub use state::WebSocketState;
