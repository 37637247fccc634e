//! Shared application state

use std::sync::Arc;

use crate::auth::jwt::JwtManager;
use crate::auth::middleware::AuthState;
use crate::chat::{ChatEngine, EventBus};
use crate::config::Config;
use crate::tickets::TicketGate;
use crate::websocket::WebSocketState;

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub chat: Arc<ChatEngine>,
    pub tickets: Arc<TicketGate>,
    pub ws: WebSocketState,
    pub auth: AuthState,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let jwt_manager = Arc::new(JwtManager::new(&config.jwt_secret, config.jwt_expiry_hours));
        Self {
            config: Arc::new(config),
            chat: Arc::new(ChatEngine::new(EventBus::default())),
            tickets: Arc::new(TicketGate::new()),
            ws: WebSocketState::new(),
            auth: AuthState::new(jwt_manager),
        }
    }
}
