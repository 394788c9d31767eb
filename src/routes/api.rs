use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, scripts};
use crate::state::AppState;
use std::sync::Arc;

pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/voices", get(api::list_voices))
        .route("/scripts", post(scripts::upload_script))
        .layer(TraceLayer::new_for_http())
}
