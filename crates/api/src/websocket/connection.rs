//! WebSocket connection management
//!
//! Represents an active WebSocket connection with its session subscriptions.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use helpdesk_shared::{Role, SessionId, UserId};

use super::events::ServerEvent;

/// An active, authenticated WebSocket connection
#[derive(Debug)]
pub struct Connection {
    /// Unique ID for this connection (one user may hold several)
    pub connection_id: Uuid,

    /// Authenticated user
    pub user_id: UserId,
    pub role: Role,

    /// Channel to send events to this connection
    pub sender: mpsc::UnboundedSender<ServerEvent>,

    /// Chat sessions this connection has joined
    pub subscriptions: Arc<RwLock<HashSet<SessionId>>>,
}

impl Connection {
    pub fn new(user_id: UserId, role: Role, sender: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self {
            connection_id: Uuid::new_v4(),
            user_id,
            role,
            sender,
            subscriptions: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Send an event to this connection; Err means the socket task is gone
    #[allow(clippy::result_large_err)]
    pub fn send(&self, event: ServerEvent) -> Result<(), mpsc::error::SendError<ServerEvent>> {
        self.sender.send(event)
    }

    pub async fn subscribe(&self, session_id: SessionId) {
        let mut subs = self.subscriptions.write().await;
        subs.insert(session_id);
        tracing::debug!(
            connection_id = %self.connection_id,
            session_id = %session_id,
            "Joined chat session"
        );
    }

    pub async fn unsubscribe(&self, session_id: SessionId) {
        let mut subs = self.subscriptions.write().await;
        subs.remove(&session_id);
        tracing::debug!(
            connection_id = %self.connection_id,
            session_id = %session_id,
            "Left chat session"
        );
    }

    pub async fn is_subscribed(&self, session_id: &SessionId) -> bool {
        let subs = self.subscriptions.read().await;
        subs.contains(session_id)
    }
}
