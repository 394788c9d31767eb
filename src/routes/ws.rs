use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::ws;
use crate::state::AppState;
use std::sync::Arc;

/// Create the WebSocket router.
///
/// The `/ws/session` endpoint is unauthenticated: sessions are short-lived,
/// hold no persistent data, and the audio they carry is ephemeral. Deploy
/// behind a reverse proxy if network-level protection is needed.
pub fn create_ws_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws/session", get(ws::ws_session_handler))
        .layer(TraceLayer::new_for_http())
}
