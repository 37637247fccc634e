//! Chat session room management for pub/sub
//!
//! Manages session "rooms" for broadcasting events to all attached
//! connections.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use helpdesk_shared::SessionId;

use super::connection::Connection;
use super::events::ServerEvent;

/// Manages chat session "rooms" for broadcasting events
pub struct RoomManager {
    /// Map of session_id -> attached connections
    rooms: Arc<RwLock<HashMap<SessionId, Vec<Arc<Connection>>>>>,
}

impl RoomManager {
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Add a connection to a session room
    pub async fn join(&self, session_id: SessionId, conn: Arc<Connection>) {
        let mut rooms = self.rooms.write().await;
        let room = rooms.entry(session_id).or_default();
        if !room
            .iter()
            .any(|c| c.connection_id == conn.connection_id)
        {
            room.push(Arc::clone(&conn));
        }

        tracing::debug!(
            session_id = %session_id,
            connection_id = %conn.connection_id,
            room_size = room.len(),
            "Connection joined session room"
        );
    }

    /// Remove a connection from a session room
    pub async fn leave(&self, session_id: &SessionId, connection_id: &Uuid) {
        let mut rooms = self.rooms.write().await;
        if let Some(conns) = rooms.get_mut(session_id) {
            conns.retain(|c| c.connection_id != *connection_id);

            // Clean up empty rooms
            if conns.is_empty() {
                rooms.remove(session_id);
                tracing::debug!(session_id = %session_id, "Removed empty session room");
            } else {
                tracing::debug!(
                    session_id = %session_id,
                    connection_id = %connection_id,
                    room_size = conns.len(),
                    "Connection left session room"
                );
            }
        }
    }

    /// Broadcast an event to every connection in a session room.
    ///
    /// Send errors are ignored; closed connections are cleaned up on
    /// disconnect.
    pub async fn broadcast(&self, session_id: &SessionId, event: ServerEvent) {
        self.broadcast_filtered(session_id, event, |_| true).await;
    }

    /// Broadcast to everyone in the room except one connection.
    ///
    /// Used for typing relay: the typist already knows they are typing.
    pub async fn broadcast_except(
        &self,
        session_id: &SessionId,
        except: &Uuid,
        event: ServerEvent,
    ) {
        let except = *except;
        self.broadcast_filtered(session_id, event, move |c| c.connection_id != except)
            .await;
    }

    async fn broadcast_filtered<F>(&self, session_id: &SessionId, event: ServerEvent, include: F)
    where
        F: Fn(&Connection) -> bool,
    {
        let rooms = self.rooms.read().await;
        let Some(conns) = rooms.get(session_id) else {
            tracing::debug!(session_id = %session_id, "No room for session, dropping event");
            return;
        };

        let mut delivered = 0;
        for conn in conns.iter().filter(|c| include(c)) {
            if conn.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                tracing::warn!(
                    connection_id = %conn.connection_id,
                    "Failed to send event to connection (likely closed)"
                );
            }
        }

        tracing::debug!(
            session_id = %session_id,
            recipients = delivered,
            "Broadcast event to session room"
        );
    }

    /// Remove a connection from every room it joined
    pub async fn remove_connection(&self, connection_id: &Uuid) {
        let mut rooms = self.rooms.write().await;
        for conns in rooms.values_mut() {
            conns.retain(|c| c.connection_id != *connection_id);
        }
        rooms.retain(|_, conns| !conns.is_empty());
    }

    pub async fn room_size(&self, session_id: &SessionId) -> usize {
        let rooms = self.rooms.read().await;
        rooms.get(session_id).map(|v| v.len()).unwrap_or(0)
    }

    pub async fn room_count(&self) -> usize {
        let rooms = self.rooms.read().await;
        rooms.len()
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpdesk_shared::{Role, UserId};
    use tokio::sync::mpsc;

    fn connection() -> (Arc<Connection>, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Connection::new(UserId::new(), Role::Agent, tx)), rx)
    }

    #[tokio::test]
    async fn test_room_join_and_leave() {
        let rooms = RoomManager::new();
        let session_id = SessionId::new();
        let (conn, _rx) = connection();

        assert_eq!(rooms.room_size(&session_id).await, 0);

        rooms.join(session_id, Arc::clone(&conn)).await;
        assert_eq!(rooms.room_size(&session_id).await, 1);

        // Joining twice does not duplicate the connection
        rooms.join(session_id, Arc::clone(&conn)).await;
        assert_eq!(rooms.room_size(&session_id).await, 1);

        rooms.leave(&session_id, &conn.connection_id).await;
        assert_eq!(rooms.room_size(&session_id).await, 0);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_whole_room() {
        let rooms = RoomManager::new();
        let session_id = SessionId::new();

        let (conn1, mut rx1) = connection();
        let (conn2, mut rx2) = connection();
        rooms.join(session_id, conn1).await;
        rooms.join(session_id, conn2).await;

        rooms
            .broadcast(
                &session_id,
                ServerEvent::Error {
                    message: "test".to_string(),
                },
            )
            .await;

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_broadcast_except_skips_sender() {
        let rooms = RoomManager::new();
        let session_id = SessionId::new();

        let (typist, mut typist_rx) = connection();
        let (other, mut other_rx) = connection();
        rooms.join(session_id, Arc::clone(&typist)).await;
        rooms.join(session_id, other).await;

        rooms
            .broadcast_except(
                &session_id,
                &typist.connection_id,
                ServerEvent::UserTyping {
                    session_id,
                    user_name: "Alice".to_string(),
                    is_typing: true,
                },
            )
            .await;

        assert!(typist_rx.try_recv().is_err());
        assert!(other_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_remove_connection_from_all_rooms() {
        let rooms = RoomManager::new();
        let session1 = SessionId::new();
        let session2 = SessionId::new();
        let (conn, _rx) = connection();

        rooms.join(session1, Arc::clone(&conn)).await;
        rooms.join(session2, Arc::clone(&conn)).await;
        assert_eq!(rooms.room_count().await, 2);

        rooms.remove_connection(&conn.connection_id).await;
        assert_eq!(rooms.room_count().await, 0);
    }
}
