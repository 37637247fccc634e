//! Health check endpoint

use axum::{extract::State, Json};
use serde::Serialize;
use time::OffsetDateTime;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub version: String,
    pub connections: usize,
}

/// Health check: always healthy while the process is serving requests
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        message: "Server is running".to_string(),
        timestamp: OffsetDateTime::now_utc(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        connections: state.ws.connection_count().await,
    })
}
