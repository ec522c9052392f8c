//! API route definitions

use axum::routing::post;
use axum::Router;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::handlers::AppState;

/// The single channel endpoint
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/messages", post(handlers::messages))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
