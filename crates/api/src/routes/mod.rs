//! API routes

pub mod chat;
pub mod health;
pub mod tickets;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{auth::middleware::require_auth, state::AppState, websocket::ws_handler};

/// Create all API routes
pub fn create_router(state: AppState) -> Router {
    let auth_state = state.auth.clone();

    // Health check at root level for infrastructure monitoring
    let health_routes = Router::new().route("/health", get(health::health));

    // Protected API routes (auth required) - under /api
    let protected_api_routes = Router::new()
        // Ticket routes
        .route("/tickets", get(tickets::list_tickets))
        .route("/tickets", post(tickets::create_ticket))
        .route(
            "/tickets/:ticket_id",
            get(tickets::get_ticket)
                .put(tickets::update_ticket)
                .patch(tickets::update_ticket)
                .delete(tickets::delete_ticket),
        )
        .route("/tickets/:ticket_id/comments", post(tickets::add_comment))
        // Chat session routes
        .route("/chat/sessions", get(chat::list_sessions))
        .route("/chat/sessions", post(chat::create_session))
        .route("/chat/sessions/:session_id", get(chat::get_session))
        .route("/chat/sessions/:session_id/claim", post(chat::claim_session))
        .route(
            "/chat/sessions/:session_id/transfer",
            post(chat::transfer_session),
        )
        .route("/chat/sessions/:session_id/end", post(chat::end_session))
        .route("/chat/sessions/:session_id/messages", get(chat::get_messages))
        .route(
            "/chat/sessions/:session_id/messages",
            post(chat::send_message),
        )
        .route("/chat/sessions/:session_id/read", post(chat::mark_read))
        .layer(middleware::from_fn_with_state(auth_state, require_auth));

    // WebSocket route (auth handled in handler via query parameter)
    let websocket_routes = Router::new().route("/ws/chat", get(ws_handler));

    let origin = HeaderValue::from_str(&state.config.cors_origin)
        .unwrap_or_else(|_| HeaderValue::from_static("http://localhost:4200"));
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::exact(origin))
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(health_routes)
        .merge(websocket_routes)
        .nest("/api", protected_api_routes)
        .layer(DefaultBodyLimit::max(state.config.max_request_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
