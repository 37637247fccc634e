//! Domain event fan-out
//!
//! Bridges the chat engine's event bus to session rooms: every mutation the
//! engine publishes becomes a room broadcast. Clients that joined a session
//! room see its messages and lifecycle changes live, whichever surface
//! (HTTP or WebSocket) caused the mutation.

use helpdesk_shared::ChatStatus;
use tokio::task::JoinHandle;

use crate::chat::{EventBus, SessionEvent};

use super::events::ServerEvent;
use super::state::WebSocketState;

/// Spawn the task that pumps domain events into session rooms
pub fn spawn_fanout(bus: &EventBus, ws_state: WebSocketState) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => deliver(&ws_state, event).await,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Fan-out lagged behind event bus, events dropped");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, fan-out stopping");
                    break;
                }
            }
        }
    })
}

async fn deliver(ws_state: &WebSocketState, event: SessionEvent) {
    let session_id = event.session_id();
    match event {
        SessionEvent::MessageAppended {
            message,
            sender_name,
        } => {
            ws_state
                .rooms
                .broadcast(&session_id, ServerEvent::new_message(&message, &sender_name))
                .await;
        }

        SessionEvent::Claimed { agent_id, .. } => {
            ws_state
                .rooms
                .broadcast(
                    &session_id,
                    ServerEvent::SessionUpdated {
                        session_id,
                        status: ChatStatus::Active,
                        agent_id: Some(agent_id),
                    },
                )
                .await;
        }

        SessionEvent::Transferred { to_agent_id, .. } => {
            ws_state
                .rooms
                .broadcast(
                    &session_id,
                    ServerEvent::SessionUpdated {
                        session_id,
                        status: ChatStatus::Active,
                        agent_id: Some(to_agent_id),
                    },
                )
                .await;
        }

        SessionEvent::Ended { .. } => {
            ws_state
                .rooms
                .broadcast(
                    &session_id,
                    ServerEvent::SessionUpdated {
                        session_id,
                        status: ChatStatus::Ended,
                        agent_id: None,
                    },
                )
                .await;
        }

        // No room exists before anyone has joined the new session
        SessionEvent::Created { .. } => {}
    }
}
