use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::state::AppState;

/// Health check handler
/// Returns a simple JSON response indicating the server is running
pub async fn health_check() -> Result<Json<Value>, StatusCode> {
    Ok(Json(json!({
        "status": "OK"
    })))
}

/// Lists the gender to voice identity mapping currently configured for the
/// active synthesis provider.
pub async fn list_voices(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "provider": state.config.tts_provider,
        "voices": {
            "MALE": state.config.male_voice_id,
            "FEMALE": state.config.female_voice_id,
            "NEUTRAL": state.config.neutral_voice_id,
        }
    }))
}
