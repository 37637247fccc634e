//! Helpdesk API Library
//!
//! This crate contains the HTTP and real-time service components for the
//! helpdesk platform: the chat session state machine, the ticket
//! authorization gate, and the per-session broadcast rooms.

pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod response;
pub mod routes;
pub mod state;
pub mod tickets;
pub mod websocket;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
