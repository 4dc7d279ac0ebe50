/// Unified error handling module
use crate::domain::ProxyResponse;
use axum::{
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Unified error response format
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Client-facing failures of a proxy invocation
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Method Not Allowed")]
    MethodNotAllowed,
    #[error("{message}")]
    BodyRejected { status: StatusCode, message: String },
    #[error("Invalid JSON body: {0}")]
    InvalidJson(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("Upstream fetch failed: {0}")]
    UpstreamExhausted(UpstreamError),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure of a single upstream attempt; recorded, then the next endpoint is tried
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Upstream {status}")]
    Status { status: u16, body: String },
    #[error("Upstream request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("Upstream transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("No upstream endpoints configured")]
    NoEndpoints,
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        ApiError::BodyRejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::BodyRejected { status, .. } => *status,
            ApiError::InvalidJson(_) | ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::UpstreamExhausted(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn envelope(&self) -> ErrorResponse {
        let mut envelope = ErrorResponse {
            error: self.to_string(),
            detail: None,
            status: None,
            body: None,
        };
        match self {
            ApiError::MethodNotAllowed
            | ApiError::BodyRejected { .. }
            | ApiError::InvalidInput(_) => {}
            ApiError::InvalidJson(e) => {
                envelope.error = "Invalid JSON body".to_string();
                envelope.detail = Some(e.clone());
            }
            ApiError::UpstreamExhausted(last) => {
                envelope.error = "Upstream fetch failed".to_string();
                envelope.detail = Some(last.to_string());
                if let UpstreamError::Status { status, body } = last {
                    envelope.status = Some(*status);
                    envelope.body = Some(body.clone()).filter(|b| !b.is_empty());
                }
            }
            ApiError::Internal(msg) => {
                envelope.error = "Internal error".to_string();
                envelope.detail = Some(msg.clone());
            }
        }
        envelope
    }
}

impl From<ApiError> for ProxyResponse {
    fn from(err: ApiError) -> Self {
        let body = serde_json::to_value(err.envelope())
            .unwrap_or_else(|_| serde_json::json!({ "error": err.to_string() }));
        ProxyResponse {
            status: err.status_code(),
            body: Some(body),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        ProxyResponse::from(self).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
