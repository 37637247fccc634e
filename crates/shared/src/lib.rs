//! Helpdesk Shared Types and Utilities
//!
//! This crate contains the domain types, errors, and the in-memory entity
//! store shared across the helpdesk platform.

pub mod error;
pub mod store;
pub mod types;

pub use error::*;
pub use store::MemStore;
pub use types::*;
