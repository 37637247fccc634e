//! Chat session routes
//!
//! The HTTP surface of the chat domain. Real-time delivery happens over the
//! WebSocket fan-out; these handlers mutate through the same engine, so both
//! surfaces stay consistent.

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use helpdesk_shared::{
    ChatMessage, ChatSession, ChatStatus, HelpdeskError, MessageType, SenderType, SessionId,
    UserId,
};

use crate::{
    auth::middleware::AuthUser,
    auth::policy::{Action, Ownership, Policy},
    error::{ApiError, ApiResult},
    response::ApiResponse,
    state::AppState,
};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub message: String,
    /// Display name shown to agents; falls back to the caller's email
    pub customer_name: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSessionsQuery {
    pub status: Option<ChatStatus>,
    pub customer_id: Option<UserId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferSessionRequest {
    pub to_agent_id: UserId,
    pub to_agent_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub content: String,
    pub message_type: Option<MessageType>,
    pub sender_name: Option<String>,
}

/// Session plus the derived agent-side unread counter
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    #[serde(flatten)]
    pub session: ChatSession,
    pub unread_count: usize,
}

impl SessionView {
    fn from(session: ChatSession) -> Self {
        let unread_count = session.unread_count();
        Self {
            session,
            unread_count,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadResponse {
    pub updated: usize,
}

// =============================================================================
// Handlers
// =============================================================================

pub async fn create_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateSessionRequest>,
) -> ApiResult<Json<ApiResponse<ChatSession>>> {
    let customer_name = req.customer_name.unwrap_or_else(|| user.email.clone());
    let session = state
        .chat
        .create_session(
            UserId::from(user.user_id),
            &customer_name,
            req.message,
            req.metadata,
        )
        .await?;
    Ok(Json(ApiResponse::ok(session)))
}

/// List sessions visible to the caller. Customers are always scoped to their
/// own sessions; staff may filter by status and customer.
pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListSessionsQuery>,
) -> ApiResult<Json<ApiResponse<Vec<SessionView>>>> {
    let customer_scope = if Policy::allows(user.role, Action::ListAllSessions, Ownership::Other) {
        query.customer_id
    } else {
        Some(UserId::from(user.user_id))
    };

    let sessions = state.chat.list(query.status, customer_scope).await;
    let views = sessions.into_iter().map(SessionView::from).collect();
    Ok(Json(ApiResponse::ok(views)))
}

pub async fn get_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(session_id): Path<SessionId>,
) -> ApiResult<Json<ApiResponse<SessionView>>> {
    let session = authorized_session(&state, &user, session_id, Action::ReadSession).await?;
    Ok(Json(ApiResponse::ok(SessionView::from(session))))
}

/// Claim a waiting session for the calling agent. Exactly one concurrent
/// caller wins; the rest get a 409.
pub async fn claim_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(session_id): Path<SessionId>,
) -> ApiResult<Json<ApiResponse<ChatSession>>> {
    if !Policy::allows(user.role, Action::ClaimSession, Ownership::Other) {
        return Err(ApiError::Forbidden);
    }

    let session = state
        .chat
        .claim(session_id, UserId::from(user.user_id), &user.email)
        .await?;
    Ok(Json(ApiResponse::ok_with_message(
        session,
        "Session claimed",
    )))
}

pub async fn transfer_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(session_id): Path<SessionId>,
    Json(req): Json<TransferSessionRequest>,
) -> ApiResult<Json<ApiResponse<ChatSession>>> {
    if !Policy::allows(user.role, Action::TransferSession, Ownership::Other) {
        return Err(ApiError::Forbidden);
    }

    let to_agent_name = req
        .to_agent_name
        .unwrap_or_else(|| req.to_agent_id.to_string());
    let session = state
        .chat
        .transfer(
            session_id,
            UserId::from(user.user_id),
            req.to_agent_id,
            user.role,
            &to_agent_name,
        )
        .await?;
    Ok(Json(ApiResponse::ok_with_message(
        session,
        "Session transferred",
    )))
}

pub async fn end_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(session_id): Path<SessionId>,
) -> ApiResult<Json<ApiResponse<ChatSession>>> {
    authorized_session(&state, &user, session_id, Action::EndSession).await?;

    let session = state.chat.end(session_id).await?;
    Ok(Json(ApiResponse::ok_with_message(session, "Session ended")))
}

/// Full message history, readable even after the session has ended
pub async fn get_messages(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(session_id): Path<SessionId>,
) -> ApiResult<Json<ApiResponse<Vec<ChatMessage>>>> {
    let session = authorized_session(&state, &user, session_id, Action::ReadSession).await?;
    Ok(Json(ApiResponse::ok(session.messages)))
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(session_id): Path<SessionId>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<Json<ApiResponse<ChatMessage>>> {
    authorized_session(&state, &user, session_id, Action::SendChatMessage).await?;

    let sender_type = if user.role.is_staff() {
        SenderType::Agent
    } else {
        SenderType::Customer
    };
    let sender_name = req.sender_name.unwrap_or_else(|| user.email.clone());

    let message = state
        .chat
        .send_message(
            session_id,
            UserId::from(user.user_id),
            &sender_name,
            sender_type,
            req.content,
            req.message_type.unwrap_or(MessageType::Text),
        )
        .await?;
    Ok(Json(ApiResponse::ok(message)))
}

/// Mark the opposite side's messages as read
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(session_id): Path<SessionId>,
) -> ApiResult<Json<ApiResponse<MarkReadResponse>>> {
    authorized_session(&state, &user, session_id, Action::ReadSession).await?;

    let updated = state.chat.mark_read(session_id, user.role).await?;
    Ok(Json(ApiResponse::ok(MarkReadResponse { updated })))
}

/// Fetch the session and check the caller may perform `action` on it
async fn authorized_session(
    state: &AppState,
    user: &AuthUser,
    session_id: SessionId,
    action: Action,
) -> Result<ChatSession, HelpdeskError> {
    let session = state.chat.get(session_id).await?;
    let ownership = Ownership::of(session.customer_id == UserId::from(user.user_id));
    if !Policy::allows(user.role, action, ownership) {
        return Err(HelpdeskError::Forbidden);
    }
    Ok(session)
}
