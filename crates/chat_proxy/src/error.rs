use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use openrouter_api::OpenRouterError;
use serde_json::json;
use thiserror::Error;

/// Failures raised before the data stream starts. Once streaming, errors travel as `3:` parts.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("upstream client: {0}")]
    Upstream(#[from] OpenRouterError),
    #[error("failed to build response: {0}")]
    Response(String),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "chat request failed before streaming");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}
