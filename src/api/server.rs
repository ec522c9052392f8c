//! HTTP server implementation

use std::sync::Arc;

use tracing::info;

use crate::api::handlers::AppState;
use crate::api::routes;
use crate::channel::ChannelAdapter;
use crate::config::AppConfig;
use crate::Result;

/// Bind the listener and serve until the process exits.
///
/// The adapter, and every client inside it, is built before this is called,
/// so nothing is served with partial configuration.
pub async fn serve_api(config: &AppConfig, adapter: ChannelAdapter) -> Result<()> {
    let state = AppState {
        adapter: Arc::new(adapter),
    };
    let app = routes::api_routes(state);

    let addr = config.bind_address();
    println!("Starting server on port {}...", config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("API server listening on http://{}", addr);
    info!("  POST /api/messages - Channel activities");

    axum::serve(listener, app).await?;

    Ok(())
}
