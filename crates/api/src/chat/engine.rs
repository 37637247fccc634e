//! Chat session state machine
//!
//! Every mutation of a session funnels through this engine and runs under
//! that session's write lock, so interleaved handlers never interleave
//! within one session. Domain events are published before the lock is
//! released, which keeps per-session event order equal to mutation order.
//!
//! Lifecycle: WAITING -> ACTIVE -> ENDED, with ACTIVE -> TRANSFERRED ->
//! ACTIVE hand-offs in between. Sessions are never physically deleted.

use std::sync::Arc;

use time::OffsetDateTime;

use helpdesk_shared::{
    ChatMessage, ChatSession, ChatStatus, HelpdeskError, HelpdeskResult, MemStore, MessageId,
    MessageType, Role, SenderType, SessionId, UserId,
};

use super::events::{EventBus, SessionEvent};

const MAX_CONTENT_LENGTH: usize = 50_000;

/// Owns chat session state and its lifecycle rules
pub struct ChatEngine {
    sessions: MemStore<ChatSession>,
    events: EventBus,
}

impl ChatEngine {
    pub fn new(events: EventBus) -> Self {
        Self {
            sessions: MemStore::new(),
            events,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Create a session in WAITING with the customer's opening message
    pub async fn create_session(
        &self,
        customer_id: UserId,
        customer_name: &str,
        initial_message: String,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> HelpdeskResult<ChatSession> {
        validate_content(&initial_message)?;

        let session_id = SessionId::new();
        let now = OffsetDateTime::now_utc();

        let session = ChatSession {
            id: session_id,
            customer_id,
            agent_id: None,
            status: ChatStatus::Waiting,
            started_at: now,
            ended_at: None,
            messages: vec![ChatMessage {
                id: MessageId::new(),
                session_id,
                sender_id: customer_id,
                sender_type: SenderType::Customer,
                content: initial_message,
                message_type: MessageType::Text,
                timestamp: now,
                is_read: false,
            }],
            metadata,
        };

        let snapshot = session.clone();
        self.sessions.upsert(session_id.0, session).await;

        self.events.publish(SessionEvent::Created {
            session_id,
            customer_id,
        });
        if let Some(message) = snapshot.messages.first() {
            self.events.publish(SessionEvent::MessageAppended {
                message: message.clone(),
                sender_name: customer_name.to_string(),
            });
        }

        tracing::info!(
            session_id = %session_id,
            customer_id = %customer_id,
            "Chat session created"
        );

        Ok(snapshot)
    }

    /// Claim a waiting (or transferred) session for an agent.
    ///
    /// At-most-one-winner: the per-session write lock serializes racing
    /// claims; the first caller transitions the session to ACTIVE and every
    /// later caller sees ACTIVE and gets a Conflict.
    pub async fn claim(
        &self,
        session_id: SessionId,
        agent_id: UserId,
        agent_name: &str,
    ) -> HelpdeskResult<ChatSession> {
        let entry = self.session_entry(session_id).await?;
        let mut session = entry.write().await;

        match session.status {
            ChatStatus::Waiting | ChatStatus::Transferred => {}
            ChatStatus::Active => {
                return Err(HelpdeskError::Conflict(format!(
                    "Session {session_id} already claimed"
                )));
            }
            ChatStatus::Ended => {
                return Err(HelpdeskError::Lifecycle(format!(
                    "Session {session_id} has ended"
                )));
            }
        }

        session.status = ChatStatus::Active;
        session.agent_id = Some(agent_id);

        let message = append_system_message(
            &mut session,
            format!("{agent_name} has joined the chat"),
        );

        self.events.publish(SessionEvent::Claimed {
            session_id,
            agent_id,
        });
        self.events.publish(SessionEvent::MessageAppended {
            message,
            sender_name: "System".to_string(),
        });

        tracing::info!(
            session_id = %session_id,
            agent_id = %agent_id,
            "Chat session claimed"
        );

        Ok(session.clone())
    }

    /// Hand an active session from its current agent to another.
    ///
    /// Only the current agent may transfer; admins may transfer on the
    /// current agent's behalf. The TRANSFERRED state is internal to the
    /// locked mutation: observers only ever see the session ACTIVE again
    /// under the new agent. Message history is untouched.
    pub async fn transfer(
        &self,
        session_id: SessionId,
        from_agent_id: UserId,
        to_agent_id: UserId,
        actor_role: Role,
        to_agent_name: &str,
    ) -> HelpdeskResult<ChatSession> {
        let entry = self.session_entry(session_id).await?;
        let mut session = entry.write().await;

        match session.status {
            ChatStatus::Active => {}
            ChatStatus::Ended => {
                return Err(HelpdeskError::Lifecycle(format!(
                    "Session {session_id} has ended"
                )));
            }
            ChatStatus::Waiting | ChatStatus::Transferred => {
                return Err(HelpdeskError::Lifecycle(format!(
                    "Session {session_id} is not active"
                )));
            }
        }

        if actor_role != Role::Admin && session.agent_id != Some(from_agent_id) {
            return Err(HelpdeskError::Forbidden);
        }

        // The hand-off happens atomically under the session lock, so the
        // intermediate TRANSFERRED state is never observable from outside:
        // the session lands ACTIVE under the new agent.
        session.status = ChatStatus::Active;
        session.agent_id = Some(to_agent_id);

        let message = append_system_message(
            &mut session,
            format!("Chat transferred to {to_agent_name}"),
        );

        self.events.publish(SessionEvent::Transferred {
            session_id,
            from_agent_id,
            to_agent_id,
        });
        self.events.publish(SessionEvent::MessageAppended {
            message,
            sender_name: "System".to_string(),
        });

        tracing::info!(
            session_id = %session_id,
            from_agent_id = %from_agent_id,
            to_agent_id = %to_agent_id,
            "Chat session transferred"
        );

        Ok(session.clone())
    }

    /// End a session. Idempotent: ending an ENDED session is a no-op and
    /// does not duplicate the terminal system message.
    pub async fn end(&self, session_id: SessionId) -> HelpdeskResult<ChatSession> {
        let entry = self.session_entry(session_id).await?;
        let mut session = entry.write().await;

        if session.status == ChatStatus::Ended {
            return Ok(session.clone());
        }

        session.status = ChatStatus::Ended;
        session.ended_at = Some(OffsetDateTime::now_utc());
        // agent_id is only set while a session is active or mid-transfer
        session.agent_id = None;

        let message = append_system_message(&mut session, "Chat session has ended".to_string());

        self.events.publish(SessionEvent::Ended { session_id });
        self.events.publish(SessionEvent::MessageAppended {
            message,
            sender_name: "System".to_string(),
        });

        tracing::info!(session_id = %session_id, "Chat session ended");

        Ok(session.clone())
    }

    /// Append a message to a session that has not ended
    pub async fn send_message(
        &self,
        session_id: SessionId,
        sender_id: UserId,
        sender_name: &str,
        sender_type: SenderType,
        content: String,
        message_type: MessageType,
    ) -> HelpdeskResult<ChatMessage> {
        validate_content(&content)?;

        let entry = self.session_entry(session_id).await?;
        let mut session = entry.write().await;

        if session.status == ChatStatus::Ended {
            return Err(HelpdeskError::Lifecycle(format!(
                "Session {session_id} has ended"
            )));
        }

        let message = append_message(&mut session, sender_id, sender_type, content, message_type);

        self.events.publish(SessionEvent::MessageAppended {
            message: message.clone(),
            sender_name: sender_name.to_string(),
        });

        Ok(message)
    }

    /// Bulk-mark messages from the opposite side as read.
    ///
    /// Agents and admins reading mark customer messages; a customer reading
    /// marks agent messages. Returns the number of messages flipped.
    pub async fn mark_read(
        &self,
        session_id: SessionId,
        reader_role: Role,
    ) -> HelpdeskResult<usize> {
        let other_side = match reader_role {
            Role::Agent | Role::Admin => SenderType::Customer,
            Role::Customer => SenderType::Agent,
        };

        let entry = self.session_entry(session_id).await?;
        let mut session = entry.write().await;

        let mut flipped = 0;
        for message in session
            .messages
            .iter_mut()
            .filter(|m| m.sender_type == other_side && !m.is_read)
        {
            message.is_read = true;
            flipped += 1;
        }

        Ok(flipped)
    }

    pub async fn get(&self, session_id: SessionId) -> HelpdeskResult<ChatSession> {
        self.sessions
            .snapshot(&session_id.0)
            .await
            .ok_or_else(|| HelpdeskError::not_found("Session", session_id))
    }

    /// List session snapshots, newest first
    pub async fn list(
        &self,
        status: Option<ChatStatus>,
        customer_id: Option<UserId>,
    ) -> Vec<ChatSession> {
        let mut sessions = self
            .sessions
            .list(|s: &ChatSession| {
                status.map_or(true, |wanted| s.status == wanted)
                    && customer_id.map_or(true, |c| s.customer_id == c)
            })
            .await;
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        sessions
    }

    pub async fn unread_count(&self, session_id: SessionId) -> HelpdeskResult<usize> {
        Ok(self.get(session_id).await?.unread_count())
    }

    async fn session_entry(
        &self,
        session_id: SessionId,
    ) -> HelpdeskResult<Arc<tokio::sync::RwLock<ChatSession>>> {
        self.sessions
            .entry(&session_id.0)
            .await
            .ok_or_else(|| HelpdeskError::not_found("Session", session_id))
    }
}

fn validate_content(content: &str) -> HelpdeskResult<()> {
    if content.trim().is_empty() {
        return Err(HelpdeskError::Validation(
            "Message content cannot be empty".to_string(),
        ));
    }
    if content.len() > MAX_CONTENT_LENGTH {
        return Err(HelpdeskError::Validation(format!(
            "Message content too long (max {MAX_CONTENT_LENGTH} characters)"
        )));
    }
    Ok(())
}

fn append_system_message(session: &mut ChatSession, content: String) -> ChatMessage {
    append_message(
        session,
        UserId::system(),
        SenderType::System,
        content,
        MessageType::System,
    )
}

/// Append with a timestamp clamped non-decreasing against the tail
fn append_message(
    session: &mut ChatSession,
    sender_id: UserId,
    sender_type: SenderType,
    content: String,
    message_type: MessageType,
) -> ChatMessage {
    let now = OffsetDateTime::now_utc();
    let timestamp = match session.messages.last() {
        Some(last) if last.timestamp > now => last.timestamp,
        _ => now,
    };

    let message = ChatMessage {
        id: MessageId::new(),
        session_id: session.id,
        sender_id,
        sender_type,
        content,
        message_type,
        timestamp,
        is_read: false,
    };
    session.messages.push(message.clone());
    message
}
