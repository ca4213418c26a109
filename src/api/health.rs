use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;

use crate::AppState;

pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "network": state.config.network_name(),
        "chainId": state.config.chain_id,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
