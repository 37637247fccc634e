//! Per-role ticket update payloads
//!
//! Customers and staff deserialize into different patch types, so fields a
//! role may not touch are dropped at the deserialization boundary instead of
//! being filtered by hand. Unknown fields are ignored, matching the partial-
//! update contract: send only what you want changed.

use serde::Deserialize;

use helpdesk_shared::{TicketPriority, TicketStatus, UserId};

/// Fields a customer may change on their own ticket
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerTicketPatch {
    pub subject: Option<String>,
    pub description: Option<String>,
}

/// Fields agents and admins may change on any ticket
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffTicketPatch {
    pub subject: Option<String>,
    pub description: Option<String>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    /// `Some(None)` clears the assignment, absent leaves it untouched
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_agent_id: Option<Option<UserId>>,
    pub tags: Option<Vec<String>>,
}

/// A patch normalized from either role's payload
#[derive(Debug, Clone, Default)]
pub struct TicketPatch {
    pub subject: Option<String>,
    pub description: Option<String>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub assigned_agent_id: Option<Option<UserId>>,
    pub tags: Option<Vec<String>>,
}

impl TicketPatch {
    pub fn is_empty(&self) -> bool {
        self.subject.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.assigned_agent_id.is_none()
            && self.tags.is_none()
    }
}

impl From<CustomerTicketPatch> for TicketPatch {
    fn from(patch: CustomerTicketPatch) -> Self {
        TicketPatch {
            subject: patch.subject,
            description: patch.description,
            ..TicketPatch::default()
        }
    }
}

impl From<StaffTicketPatch> for TicketPatch {
    fn from(patch: StaffTicketPatch) -> Self {
        TicketPatch {
            subject: patch.subject,
            description: patch.description,
            status: patch.status,
            priority: patch.priority,
            assigned_agent_id: patch.assigned_agent_id,
            tags: patch.tags,
        }
    }
}

/// Distinguishes an absent field from an explicit `null`
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<UserId>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<UserId>::deserialize(deserializer).map(Some)
}
