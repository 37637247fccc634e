//! Ticket routes
//!
//! Thin handlers: parse the request, resolve the caller, delegate to the
//! ticket gate and wrap the result in the response envelope.

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde::Deserialize;

use helpdesk_shared::{
    Ticket, TicketComment, TicketId, TicketPriority, TicketStatus, UserId,
};

use crate::{
    auth::middleware::AuthUser,
    error::ApiResult,
    response::{ApiResponse, Pagination},
    state::AppState,
    tickets::{
        CustomerTicketPatch, NewComment, NewTicket, StaffTicketPatch, TicketFilter, TicketPatch,
    },
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketRequest {
    pub subject: String,
    pub description: String,
    pub priority: Option<TicketPriority>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTicketsQuery {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub customer_id: Option<UserId>,
    pub assigned_agent_id: Option<UserId>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCommentRequest {
    pub content: String,
    #[serde(default)]
    pub is_internal: bool,
}

pub async fn create_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateTicketRequest>,
) -> ApiResult<Json<ApiResponse<Ticket>>> {
    let ticket = state
        .tickets
        .create(
            UserId::from(user.user_id),
            NewTicket {
                subject: req.subject,
                description: req.description,
                priority: req.priority,
                tags: req.tags,
            },
        )
        .await?;

    Ok(Json(ApiResponse::ok(ticket)))
}

pub async fn list_tickets(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListTicketsQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Ticket>>>> {
    let page = state
        .tickets
        .list(
            UserId::from(user.user_id),
            user.role,
            TicketFilter {
                status: query.status,
                priority: query.priority,
                customer_id: query.customer_id,
                assigned_agent_id: query.assigned_agent_id,
                page: query.page,
                limit: query.limit,
            },
        )
        .await;

    let pagination = Pagination::new(page.page as i64, page.limit as i64, page.total as i64);
    Ok(Json(ApiResponse::paginated(page.tickets, pagination)))
}

pub async fn get_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(ticket_id): Path<TicketId>,
) -> ApiResult<Json<ApiResponse<Ticket>>> {
    let ticket = state
        .tickets
        .get(UserId::from(user.user_id), user.role, ticket_id)
        .await?;
    Ok(Json(ApiResponse::ok(ticket)))
}

/// Partial update. The caller's role picks the patch shape: fields outside
/// that shape are dropped before the gate ever sees them.
pub async fn update_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(ticket_id): Path<TicketId>,
    Json(body): Json<serde_json::Value>,
) -> ApiResult<Json<ApiResponse<Ticket>>> {
    let patch: TicketPatch = if user.role.is_staff() {
        serde_json::from_value::<StaffTicketPatch>(body)
            .map_err(|e| crate::error::ApiError::BadRequest(e.to_string()))?
            .into()
    } else {
        serde_json::from_value::<CustomerTicketPatch>(body)
            .map_err(|e| crate::error::ApiError::BadRequest(e.to_string()))?
            .into()
    };

    let ticket = state
        .tickets
        .update(UserId::from(user.user_id), user.role, ticket_id, patch)
        .await?;
    Ok(Json(ApiResponse::ok(ticket)))
}

pub async fn delete_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(ticket_id): Path<TicketId>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state.tickets.delete(user.role, ticket_id).await?;
    Ok(Json(ApiResponse::message("Ticket deleted successfully")))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(ticket_id): Path<TicketId>,
    Json(req): Json<AddCommentRequest>,
) -> ApiResult<Json<ApiResponse<TicketComment>>> {
    let comment = state
        .tickets
        .add_comment(
            UserId::from(user.user_id),
            user.role,
            ticket_id,
            NewComment {
                content: req.content,
                is_internal: req.is_internal,
            },
        )
        .await?;
    Ok(Json(ApiResponse::ok(comment)))
}
