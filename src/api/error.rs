//! Mapping of crate errors onto HTTP responses

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde_json::json;
use tracing::error;
use tracing::warn;

use crate::errors::CruxError;

/// Error returned by HTTP handlers
#[derive(Debug)]
pub struct ApiError(pub CruxError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            CruxError::InvalidActivity(_) | CruxError::Serialization(_) => StatusCode::BAD_REQUEST,
            CruxError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CruxError> for ApiError {
    fn from(err: CruxError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Request rejected ({}): {}", status, self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
