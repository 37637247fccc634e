//! Role capability policy
//!
//! One pure decision function consumed by the ticket gate, the chat routes
//! and the websocket handler, so every surface enforces identical rules.

use helpdesk_shared::Role;

/// Whether the target resource belongs to the acting user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Own,
    Other,
}

impl Ownership {
    pub fn of(actor_matches: bool) -> Self {
        if actor_matches {
            Ownership::Own
        } else {
            Ownership::Other
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ReadTicket,
    UpdateTicket,
    DeleteTicket,
    CommentTicket,
    ReadInternalComments,
    ListAllTickets,
    ReadSession,
    EndSession,
    SendChatMessage,
    ClaimSession,
    TransferSession,
    ListAllSessions,
}

pub struct Policy;

impl Policy {
    /// Capability check: may `role` perform `action` on a resource with the
    /// given ownership relation?
    pub fn allows(role: Role, action: Action, ownership: Ownership) -> bool {
        use Action::*;

        match action {
            // Staff touch any ticket/session; customers only their own
            ReadTicket | UpdateTicket | CommentTicket | ReadSession | EndSession
            | SendChatMessage => role.is_staff() || ownership == Ownership::Own,

            // Staff-only surfaces
            ReadInternalComments | ListAllTickets | ClaimSession | TransferSession
            | ListAllSessions => role.is_staff(),

            // Destructive: admin only
            DeleteTicket => role == Role::Admin,
        }
    }
}
