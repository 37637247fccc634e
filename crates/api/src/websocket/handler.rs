//! WebSocket handler for Axum
//!
//! Upgrades the connection, authenticates the caller from the query-string
//! token and routes client events into the chat engine and session rooms.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::Response,
};
use futures::{stream::StreamExt, SinkExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use helpdesk_shared::{MessageType, Role, SenderType, SessionId, UserId};

use crate::auth::policy::{Action, Ownership, Policy};
use crate::state::AppState;

use super::{
    connection::Connection,
    events::{ClientEvent, ServerEvent},
    state::WebSocketState,
};

#[derive(Debug, Deserialize)]
pub struct WebSocketQuery {
    token: String,
}

/// WebSocket handler: upgrades the HTTP connection to a WebSocket.
///
/// Browsers cannot set an Authorization header on the upgrade request, so
/// the bearer token travels as a `token` query parameter instead.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
    Query(params): Query<WebSocketQuery>,
) -> Result<Response, StatusCode> {
    let claims = match app_state.auth.jwt_manager.validate(&params.token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!(error = ?e, "WebSocket auth failed: invalid token");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    let user_id = UserId::from(claims.sub);
    let role = claims.role;

    tracing::info!(user_id = %user_id, role = role.as_str(), "WebSocket connection upgrade requested");

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, user_id, role, app_state)))
}

/// Drive one WebSocket connection until it closes
async fn handle_socket(socket: WebSocket, user_id: UserId, role: Role, app_state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    // Channel feeding the outbound half of the socket
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    let ws_state = app_state.ws.clone();
    let conn = ws_state
        .add_connection(Connection::new(user_id, role, tx))
        .await;
    let connection_id = conn.connection_id;

    let _ = conn.send(ServerEvent::Connected { connection_id });

    // Outbound pump
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if sender.send(Message::Text(json)).await.is_err() {
                        break; // Connection closed
                    }
                }
                Err(e) => {
                    tracing::error!(error = ?e, "Failed to serialize WebSocket event");
                }
            }
        }
    });

    // Inbound loop
    while let Some(msg) = receiver.next().await {
        let Ok(msg) = msg else { break };
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => {
                    handle_client_event(event, Arc::clone(&conn), &ws_state, &app_state).await;
                }
                Err(e) => {
                    tracing::warn!(error = ?e, message = %text, "Failed to parse client event");
                    let _ = conn.send(ServerEvent::Error {
                        message: "Invalid event format".to_string(),
                    });
                }
            },
            Message::Close(_) => {
                tracing::info!(connection_id = %connection_id, "WebSocket close frame received");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {
                // Axum answers pings automatically
            }
            _ => {} // Ignore binary messages
        }
    }

    tracing::info!(connection_id = %connection_id, user_id = %user_id, "WebSocket connection closing");
    ws_state.remove_connection(&connection_id).await;
    send_task.abort();
}

async fn handle_client_event(
    event: ClientEvent,
    conn: Arc<Connection>,
    ws_state: &WebSocketState,
    app_state: &AppState,
) {
    use ClientEvent::*;

    match event {
        JoinChat { session_id } => {
            if !session_access_allowed(app_state, &conn, session_id).await {
                let _ = conn.send(ServerEvent::Error {
                    message: "Access denied to session".to_string(),
                });
                return;
            }
            conn.subscribe(session_id).await;
            ws_state.rooms.join(session_id, Arc::clone(&conn)).await;
        }

        LeaveChat { session_id } => {
            conn.unsubscribe(session_id).await;
            ws_state.rooms.leave(&session_id, &conn.connection_id).await;
        }

        ChatMessage {
            session_id,
            message,
            sender_name,
        } => {
            if !conn.is_subscribed(&session_id).await {
                let _ = conn.send(ServerEvent::Error {
                    message: "Join the session before sending messages".to_string(),
                });
                return;
            }

            let sender_type = if conn.role.is_staff() {
                SenderType::Agent
            } else {
                SenderType::Customer
            };

            // Delivery happens via the fan-out; nothing to echo here
            if let Err(e) = app_state
                .chat
                .send_message(
                    session_id,
                    conn.user_id,
                    &sender_name,
                    sender_type,
                    message,
                    MessageType::Text,
                )
                .await
            {
                let _ = conn.send(ServerEvent::Error {
                    message: e.to_string(),
                });
            }
        }

        Typing {
            session_id,
            is_typing,
            user_name,
        } => {
            if !conn.is_subscribed(&session_id).await {
                return;
            }
            ws_state
                .rooms
                .broadcast_except(
                    &session_id,
                    &conn.connection_id,
                    ServerEvent::UserTyping {
                        session_id,
                        user_name,
                        is_typing,
                    },
                )
                .await;
        }
    }
}

/// Customers may only attach to their own sessions; staff attach to any
async fn session_access_allowed(
    app_state: &AppState,
    conn: &Connection,
    session_id: SessionId,
) -> bool {
    match app_state.chat.get(session_id).await {
        Ok(session) => {
            let ownership = Ownership::of(session.customer_id == conn.user_id);
            Policy::allows(conn.role, Action::ReadSession, ownership)
        }
        Err(_) => false,
    }
}
