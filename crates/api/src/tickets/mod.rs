//! Ticket domain
//!
//! The gate wraps the ticket store with role-based authorization so route
//! handlers never touch raw tickets.

pub mod gate;
pub mod patch;

pub use gate::{NewComment, NewTicket, TicketFilter, TicketGate, TicketPage};
pub use patch::{CustomerTicketPatch, StaffTicketPatch, TicketPatch};
