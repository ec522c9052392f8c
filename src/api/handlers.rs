//! API request handlers
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use tracing::debug;

use super::error::ApiError;
use crate::channel::ChannelAdapter;
use crate::errors::CruxError;
use crate::models::Activity;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub adapter: Arc<ChannelAdapter>,
}

/// Inbound channel activity (POST /api/messages)
pub async fn messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let activity: Activity = serde_json::from_slice(&body)
        .map_err(|e| CruxError::InvalidActivity(format!("malformed activity body: {e}")))?;

    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    debug!(
        "POST /api/messages: type={:?} conversation={}",
        activity.activity_type,
        activity.conversation_id()
    );

    match state.adapter.process_activity(activity, auth_header).await? {
        Some(response) => {
            let status =
                StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            Ok((status, Json(response.body)).into_response())
        }
        None => Ok(StatusCode::CREATED.into_response()),
    }
}
