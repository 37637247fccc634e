//! Role-gated ticket operations
//!
//! Every ticket read and write passes through the gate. It resolves
//! ownership, asks the policy, and redacts internal comments before a
//! customer ever sees a ticket. Handlers never touch the store directly.

use time::OffsetDateTime;

use helpdesk_shared::{
    CommentId, HelpdeskError, HelpdeskResult, MemStore, Role, Ticket, TicketComment, TicketId,
    TicketPriority, TicketStatus, UserId,
};

use crate::auth::policy::{Action, Ownership, Policy};

use super::patch::TicketPatch;

const MAX_SUBJECT_LENGTH: usize = 500;
const MAX_CONTENT_LENGTH: usize = 50_000;

pub const DEFAULT_PAGE_LIMIT: usize = 20;
pub const MAX_PAGE_LIMIT: usize = 100;

/// Payload for creating a ticket
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub subject: String,
    pub description: String,
    pub priority: Option<TicketPriority>,
    pub tags: Vec<String>,
}

/// Payload for appending a comment
#[derive(Debug, Clone)]
pub struct NewComment {
    pub content: String,
    pub is_internal: bool,
}

/// One page of tickets plus the total matching count
#[derive(Debug, Clone)]
pub struct TicketPage {
    pub tickets: Vec<Ticket>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

/// Listing filters; staff may combine them freely, customers are scoped to
/// their own tickets regardless of what they ask for
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub customer_id: Option<UserId>,
    pub assigned_agent_id: Option<UserId>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

pub struct TicketGate {
    tickets: MemStore<Ticket>,
}

impl TicketGate {
    pub fn new() -> Self {
        Self {
            tickets: MemStore::new(),
        }
    }

    /// Create a ticket owned by the caller. Tags are trimmed and empties
    /// dropped; priority defaults to normal.
    pub async fn create(&self, customer_id: UserId, new: NewTicket) -> HelpdeskResult<Ticket> {
        validate_subject(&new.subject)?;
        validate_content(&new.description)?;

        let now = OffsetDateTime::now_utc();
        let ticket = Ticket {
            id: TicketId::new(),
            subject: new.subject.trim().to_string(),
            description: new.description,
            status: TicketStatus::Open,
            priority: new.priority.unwrap_or(TicketPriority::Normal),
            customer_id,
            assigned_agent_id: None,
            tags: normalize_tags(new.tags),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let snapshot = ticket.clone();
        self.tickets.upsert(ticket.id.0, ticket).await;

        tracing::info!(ticket_id = %snapshot.id, customer_id = %customer_id, "Ticket created");

        Ok(snapshot)
    }

    /// Fetch one ticket, redacted for the caller's role
    pub async fn get(&self, actor: UserId, role: Role, ticket_id: TicketId) -> HelpdeskResult<Ticket> {
        let ticket = self
            .tickets
            .snapshot(&ticket_id.0)
            .await
            .ok_or_else(|| HelpdeskError::not_found("Ticket", ticket_id))?;

        let ownership = Ownership::of(ticket.customer_id == actor);
        if !Policy::allows(role, Action::ReadTicket, ownership) {
            return Err(HelpdeskError::Forbidden);
        }

        Ok(redact_for(role, ticket))
    }

    /// List tickets visible to the caller, newest first, paginated
    pub async fn list(&self, actor: UserId, role: Role, filter: TicketFilter) -> TicketPage {
        let scope_customer = if Policy::allows(role, Action::ListAllTickets, Ownership::Other) {
            filter.customer_id
        } else {
            Some(actor)
        };

        let mut tickets = self
            .tickets
            .list(|t: &Ticket| {
                scope_customer.map_or(true, |c| t.customer_id == c)
                    && filter.status.map_or(true, |s| t.status == s)
                    && filter.priority.map_or(true, |p| t.priority == p)
                    && filter
                        .assigned_agent_id
                        .map_or(true, |a| t.assigned_agent_id == Some(a))
            })
            .await;
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = tickets.len();
        let page_number = filter.page.unwrap_or(1).max(1);
        let limit = filter
            .limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT);

        // Saturate: an absurd page number yields an empty page, never a panic
        let tickets: Vec<Ticket> = tickets
            .into_iter()
            .skip(page_number.saturating_sub(1).saturating_mul(limit))
            .take(limit)
            .map(|t| redact_for(role, t))
            .collect();

        TicketPage {
            tickets,
            total,
            page: page_number,
            limit,
        }
    }

    /// Apply a partial update. The patch type already dropped fields the
    /// caller's role may not touch; a patch with nothing left is rejected
    /// rather than silently succeeding.
    pub async fn update(
        &self,
        actor: UserId,
        role: Role,
        ticket_id: TicketId,
        patch: TicketPatch,
    ) -> HelpdeskResult<Ticket> {
        if patch.is_empty() {
            return Err(HelpdeskError::Validation(
                "No updatable fields in request".to_string(),
            ));
        }
        if let Some(subject) = &patch.subject {
            validate_subject(subject)?;
        }
        if let Some(description) = &patch.description {
            validate_content(description)?;
        }

        let entry = self
            .tickets
            .entry(&ticket_id.0)
            .await
            .ok_or_else(|| HelpdeskError::not_found("Ticket", ticket_id))?;
        let mut ticket = entry.write().await;

        let ownership = Ownership::of(ticket.customer_id == actor);
        if !Policy::allows(role, Action::UpdateTicket, ownership) {
            return Err(HelpdeskError::Forbidden);
        }

        if let Some(subject) = patch.subject {
            ticket.subject = subject.trim().to_string();
        }
        if let Some(description) = patch.description {
            ticket.description = description;
        }
        if let Some(status) = patch.status {
            ticket.status = status;
        }
        if let Some(priority) = patch.priority {
            ticket.priority = priority;
        }
        if let Some(assignment) = patch.assigned_agent_id {
            ticket.assigned_agent_id = assignment;
        }
        if let Some(tags) = patch.tags {
            ticket.tags = normalize_tags(tags);
        }
        ticket.updated_at = OffsetDateTime::now_utc();

        Ok(redact_for(role, ticket.clone()))
    }

    /// Delete a ticket and its comments. Admin only.
    pub async fn delete(&self, role: Role, ticket_id: TicketId) -> HelpdeskResult<()> {
        if !Policy::allows(role, Action::DeleteTicket, Ownership::Other) {
            return Err(HelpdeskError::Forbidden);
        }
        if !self.tickets.remove(&ticket_id.0).await {
            return Err(HelpdeskError::not_found("Ticket", ticket_id));
        }
        tracing::info!(ticket_id = %ticket_id, "Ticket deleted");
        Ok(())
    }

    /// Append a comment. Customers can never create internal comments;
    /// their flag is forced to false rather than rejected.
    pub async fn add_comment(
        &self,
        actor: UserId,
        role: Role,
        ticket_id: TicketId,
        new: NewComment,
    ) -> HelpdeskResult<TicketComment> {
        validate_content(&new.content)?;

        let entry = self
            .tickets
            .entry(&ticket_id.0)
            .await
            .ok_or_else(|| HelpdeskError::not_found("Ticket", ticket_id))?;
        let mut ticket = entry.write().await;

        let ownership = Ownership::of(ticket.customer_id == actor);
        if !Policy::allows(role, Action::CommentTicket, ownership) {
            return Err(HelpdeskError::Forbidden);
        }

        let is_internal = new.is_internal
            && Policy::allows(role, Action::ReadInternalComments, ownership);

        let comment = TicketComment {
            id: CommentId::new(),
            ticket_id,
            content: new.content,
            is_internal,
            author_id: actor,
            created_at: OffsetDateTime::now_utc(),
        };
        ticket.comments.push(comment.clone());
        ticket.updated_at = comment.created_at;

        Ok(comment)
    }
}

impl Default for TicketGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip internal comments from tickets going to customer-role callers
fn redact_for(role: Role, mut ticket: Ticket) -> Ticket {
    if !Policy::allows(role, Action::ReadInternalComments, Ownership::Own) {
        ticket.comments.retain(|c| !c.is_internal);
    }
    ticket
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn validate_subject(subject: &str) -> HelpdeskResult<()> {
    if subject.trim().is_empty() {
        return Err(HelpdeskError::Validation(
            "Subject cannot be empty".to_string(),
        ));
    }
    if subject.len() > MAX_SUBJECT_LENGTH {
        return Err(HelpdeskError::Validation(format!(
            "Subject too long (max {MAX_SUBJECT_LENGTH} characters)"
        )));
    }
    Ok(())
}

fn validate_content(content: &str) -> HelpdeskResult<()> {
    if content.trim().is_empty() {
        return Err(HelpdeskError::Validation(
            "Content cannot be empty".to_string(),
        ));
    }
    if content.len() > MAX_CONTENT_LENGTH {
        return Err(HelpdeskError::Validation(format!(
            "Content too long (max {MAX_CONTENT_LENGTH} characters)"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tickets::patch::{CustomerTicketPatch, StaffTicketPatch};

    fn new_ticket(subject: &str) -> NewTicket {
        NewTicket {
            subject: subject.to_string(),
            description: "Something is broken".to_string(),
            priority: None,
            tags: vec![],
        }
    }

    #[tokio::test]
    async fn test_create_defaults_and_tag_normalization() {
        let gate = TicketGate::new();
        let ticket = gate
            .create(
                UserId::new(),
                NewTicket {
                    subject: "  Printer on fire  ".to_string(),
                    description: "Smoke everywhere".to_string(),
                    priority: None,
                    tags: vec!["  hardware ".to_string(), "   ".to_string()],
                },
            )
            .await
            .unwrap();

        assert_eq!(ticket.subject, "Printer on fire");
        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!(ticket.priority, TicketPriority::Normal);
        assert_eq!(ticket.tags, vec!["hardware".to_string()]);
        assert!(ticket.comments.is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_oversized_subject() {
        let gate = TicketGate::new();
        let result = gate
            .create(UserId::new(), new_ticket(&"x".repeat(501)))
            .await;
        assert!(matches!(result, Err(HelpdeskError::Validation(_))));
    }

    #[tokio::test]
    async fn test_customer_reads_own_ticket_only() {
        let gate = TicketGate::new();
        let owner = UserId::new();
        let other = UserId::new();
        let ticket = gate.create(owner, new_ticket("Mine")).await.unwrap();

        assert!(gate.get(owner, Role::Customer, ticket.id).await.is_ok());
        assert!(matches!(
            gate.get(other, Role::Customer, ticket.id).await,
            Err(HelpdeskError::Forbidden)
        ));
        // Staff read anything
        assert!(gate.get(other, Role::Agent, ticket.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_internal_comments_hidden_from_customer() {
        let gate = TicketGate::new();
        let owner = UserId::new();
        let agent = UserId::new();
        let ticket = gate.create(owner, new_ticket("Help")).await.unwrap();

        gate.add_comment(
            agent,
            Role::Agent,
            ticket.id,
            NewComment {
                content: "internal note".to_string(),
                is_internal: true,
            },
        )
        .await
        .unwrap();
        gate.add_comment(
            owner,
            Role::Customer,
            ticket.id,
            NewComment {
                content: "public reply".to_string(),
                is_internal: false,
            },
        )
        .await
        .unwrap();

        let seen_by_customer = gate.get(owner, Role::Customer, ticket.id).await.unwrap();
        assert_eq!(seen_by_customer.comments.len(), 1);
        assert_eq!(seen_by_customer.comments[0].content, "public reply");

        let seen_by_agent = gate.get(agent, Role::Agent, ticket.id).await.unwrap();
        assert_eq!(seen_by_agent.comments.len(), 2);
    }

    #[tokio::test]
    async fn test_customer_internal_flag_forced_false() {
        let gate = TicketGate::new();
        let owner = UserId::new();
        let ticket = gate.create(owner, new_ticket("Help")).await.unwrap();

        let comment = gate
            .add_comment(
                owner,
                Role::Customer,
                ticket.id,
                NewComment {
                    content: "sneaky".to_string(),
                    is_internal: true,
                },
            )
            .await
            .unwrap();
        assert!(!comment.is_internal);
    }

    #[tokio::test]
    async fn test_customer_patch_cannot_change_status() {
        let gate = TicketGate::new();
        let owner = UserId::new();
        let ticket = gate.create(owner, new_ticket("Help")).await.unwrap();

        // Status-only payload deserializes to an empty customer patch
        let patch: CustomerTicketPatch =
            serde_json::from_str(r#"{"status": "closed"}"#).unwrap();
        let result = gate
            .update(owner, Role::Customer, ticket.id, patch.into())
            .await;
        assert!(matches!(result, Err(HelpdeskError::Validation(_))));

        let unchanged = gate.get(owner, Role::Customer, ticket.id).await.unwrap();
        assert_eq!(unchanged.status, TicketStatus::Open);
    }

    #[tokio::test]
    async fn test_staff_update_and_assignment_clear() {
        let gate = TicketGate::new();
        let owner = UserId::new();
        let agent = UserId::new();
        let ticket = gate.create(owner, new_ticket("Help")).await.unwrap();

        let patch: StaffTicketPatch = serde_json::from_str(&format!(
            r#"{{"status": "in_progress", "assignedAgentId": "{agent}"}}"#
        ))
        .unwrap();
        let updated = gate
            .update(agent, Role::Agent, ticket.id, patch.into())
            .await
            .unwrap();
        assert_eq!(updated.status, TicketStatus::InProgress);
        assert_eq!(updated.assigned_agent_id, Some(agent));

        let patch: StaffTicketPatch =
            serde_json::from_str(r#"{"assignedAgentId": null}"#).unwrap();
        let cleared = gate
            .update(agent, Role::Agent, ticket.id, patch.into())
            .await
            .unwrap();
        assert!(cleared.assigned_agent_id.is_none());
    }

    #[tokio::test]
    async fn test_delete_admin_only() {
        let gate = TicketGate::new();
        let owner = UserId::new();
        let ticket = gate.create(owner, new_ticket("Help")).await.unwrap();

        assert!(matches!(
            gate.delete(Role::Agent, ticket.id).await,
            Err(HelpdeskError::Forbidden)
        ));
        assert!(gate.delete(Role::Admin, ticket.id).await.is_ok());
        assert!(matches!(
            gate.delete(Role::Admin, ticket.id).await,
            Err(HelpdeskError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_scopes_customer_and_paginates() {
        let gate = TicketGate::new();
        let alice = UserId::new();
        let bob = UserId::new();
        for n in 0..25 {
            gate.create(alice, new_ticket(&format!("Alice {n}")))
                .await
                .unwrap();
        }
        gate.create(bob, new_ticket("Bob")).await.unwrap();

        // Customers see only their own, even when filtering for someone else
        let page = gate
            .list(
                alice,
                Role::Customer,
                TicketFilter {
                    customer_id: Some(bob),
                    ..TicketFilter::default()
                },
            )
            .await;
        assert_eq!(page.total, 25);
        assert_eq!(page.tickets.len(), DEFAULT_PAGE_LIMIT);
        assert_eq!(page.page, 1);

        let page_two = gate
            .list(
                alice,
                Role::Customer,
                TicketFilter {
                    page: Some(2),
                    ..TicketFilter::default()
                },
            )
            .await;
        assert_eq!(page_two.tickets.len(), 5);

        // Staff see everything, clamped limit
        let all = gate
            .list(
                UserId::new(),
                Role::Agent,
                TicketFilter {
                    limit: Some(1_000),
                    ..TicketFilter::default()
                },
            )
            .await;
        assert_eq!(all.total, 26);
        assert_eq!(all.limit, MAX_PAGE_LIMIT);
    }

    #[tokio::test]
    async fn test_list_with_huge_page_number_is_empty_not_panic() {
        let gate = TicketGate::new();
        let owner = UserId::new();
        gate.create(owner, new_ticket("Only one")).await.unwrap();

        let page = gate
            .list(
                owner,
                Role::Customer,
                TicketFilter {
                    page: Some(usize::MAX),
                    limit: Some(MAX_PAGE_LIMIT),
                    ..TicketFilter::default()
                },
            )
            .await;
        assert!(page.tickets.is_empty());
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let gate = TicketGate::new();
        let owner = UserId::new();
        let first = gate.create(owner, new_ticket("first")).await.unwrap();
        let second = gate.create(owner, new_ticket("second")).await.unwrap();

        let page = gate
            .list(owner, Role::Customer, TicketFilter::default())
            .await;
        let ids: Vec<_> = page.tickets.iter().map(|t| t.id).collect();
        // Newest first: the later ticket sorts at or before the earlier one
        let pos_first = ids.iter().position(|id| *id == first.id).unwrap();
        let pos_second = ids.iter().position(|id| *id == second.id).unwrap();
        assert!(pos_second <= pos_first);
    }
}
