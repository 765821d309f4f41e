//! HTTP endpoints outside the WebSocket session.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::state::AppState;

/// Fetch one typing passage, independent of any room.
///
/// GET /gemini
///
/// Returns `{"text": string}` on success. Any gateway failure maps to a 500
/// with `{"error": "Failed to fetch news"}`; the generator is never retried.
pub async fn fetch_text(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let Some(gateway) = state.gateway.as_ref() else {
        tracing::warn!("passage requested but no text provider is configured");
        return failure();
    };

    match gateway.fetch_passage().await {
        Ok(text) => (StatusCode::OK, Json(json!({ "text": text }))),
        Err(e) => {
            tracing::error!("passage generation failed: {}", e);
            failure()
        }
    }
}

fn failure() -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Failed to fetch news" })),
    )
}
