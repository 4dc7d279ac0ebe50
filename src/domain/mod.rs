/// Domain models for the application
use crate::utils::parse_utc_offset;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Normalized, validated chart request as forwarded upstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRequest {
    pub lat: f64,
    pub lon: f64,
    pub date: String,
    pub time: String,
    pub tz: TzOffset,
}

/// Timezone as sent by the client: an offset string or bare numeric hours
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TzOffset {
    Hours(serde_json::Number),
    Text(String),
}

impl TzOffset {
    /// Signed decimal hours, when the offset is parseable
    pub fn hours(&self) -> Option<f64> {
        match self {
            TzOffset::Hours(n) => n.as_f64().filter(|h| h.is_finite()),
            TzOffset::Text(s) => parse_utc_offset(s),
        }
    }
}

/// Outbound envelope: status plus an optional JSON body (`None` means no content)
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl ProxyResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: Some(body),
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            body: None,
        }
    }
}

/// Health check response
#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub now: DateTime<Utc>,
}
