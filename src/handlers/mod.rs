/// HTTP request handlers
use crate::domain::{Health, ProxyResponse};
use crate::errors::ApiError;
use crate::services::ProxyService;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::warn;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub proxy_service: Arc<ProxyService>,
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        match self.body {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        }
    }
}

/// Health check handler
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        now: Utc::now(),
    })
}

/// Chart proxy handler; accepts any method so the façade decides 204/405 itself
pub async fn chart_proxy(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<ProxyResponse, ApiError> {
    let body = body.map_err(|rejection| {
        warn!("request body rejected: {}", rejection);
        ApiError::from(rejection)
    })?;

    Ok(state
        .proxy_service
        .clone()
        .handle_guarded(method, headers, body)
        .await)
}

/// Unknown paths still answer with a JSON error envelope
pub async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not Found" })),
    )
}
