//! Domain events published by the chat state machine
//!
//! Mutation and delivery are decoupled: the engine publishes typed events
//! onto a broadcast channel, and subscribers (the websocket fan-out, the
//! notification collaborator) turn them into whatever their consumers need.

use tokio::sync::broadcast;

use helpdesk_shared::{ChatMessage, SessionId, UserId};

/// Typed domain event emitted after a successful session mutation.
///
/// Events for one session are published in mutation order because the engine
/// publishes while still holding that session's write lock.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Created {
        session_id: SessionId,
        customer_id: UserId,
    },
    Claimed {
        session_id: SessionId,
        agent_id: UserId,
    },
    Transferred {
        session_id: SessionId,
        from_agent_id: UserId,
        to_agent_id: UserId,
    },
    Ended {
        session_id: SessionId,
    },
    MessageAppended {
        message: ChatMessage,
        sender_name: String,
    },
}

impl SessionEvent {
    pub fn session_id(&self) -> SessionId {
        match self {
            SessionEvent::Created { session_id, .. }
            | SessionEvent::Claimed { session_id, .. }
            | SessionEvent::Transferred { session_id, .. }
            | SessionEvent::Ended { session_id } => *session_id,
            SessionEvent::MessageAppended { message, .. } => message.session_id,
        }
    }
}

/// Broadcast bus for session events.
///
/// Delivery is at-most-once: publishing with no subscribers is not an error,
/// and a lagging subscriber drops the oldest events rather than blocking the
/// publisher.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: SessionEvent) {
        // No subscribers is a silent drop, consistent with at-most-once
        if self.tx.send(event).is_err() {
            tracing::debug!("Session event published with no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
