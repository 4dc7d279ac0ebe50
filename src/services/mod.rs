/// Business logic services layer
use crate::clients::ChartUpstream;
use crate::config::UpstreamConfig;
use crate::domain::{ChartRequest, ProxyResponse, TzOffset};
use crate::errors::{ApiError, ApiResult, UpstreamError};
use crate::utils::{num, pick};
use axum::body::Bytes;
use axum::http::{header::CONTENT_TYPE, HeaderMap, Method};
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Chart proxy façade: validates client input and dispatches it upstream with fallback
pub struct ProxyService {
    config: UpstreamConfig,
    upstream: Arc<dyn ChartUpstream>,
}

impl ProxyService {
    pub fn new(config: UpstreamConfig, upstream: Arc<dyn ChartUpstream>) -> Self {
        Self { config, upstream }
    }

    /// Run `handle` on its own task so that a panic becomes a 500 envelope
    pub async fn handle_guarded(
        self: Arc<Self>,
        method: Method,
        headers: HeaderMap,
        body: Bytes,
    ) -> ProxyResponse {
        let task = tokio::spawn(async move { self.handle(&method, &headers, &body).await });
        match task.await {
            Ok(resp) => resp,
            Err(e) => {
                let reason = if e.is_panic() {
                    panic_message(e.into_panic())
                } else {
                    e.to_string()
                };
                error!("chart proxy task failed: {}", reason);
                ApiError::Internal(reason).into()
            }
        }
    }

    /// Handle one proxy invocation; every outcome becomes a `ProxyResponse`
    pub async fn handle(&self, method: &Method, headers: &HeaderMap, body: &[u8]) -> ProxyResponse {
        info!("chart proxy invoked: {}", method);

        match self.try_handle(method, headers, body).await {
            Ok(resp) => resp,
            Err(e) => {
                match &e {
                    ApiError::UpstreamExhausted(_) | ApiError::Internal(_) => {
                        error!("chart proxy failed: {}", e)
                    }
                    _ => info!("chart proxy rejected request: {}", e),
                }
                e.into()
            }
        }
    }

    async fn try_handle(
        &self,
        method: &Method,
        headers: &HeaderMap,
        body: &[u8],
    ) -> ApiResult<ProxyResponse> {
        if *method == Method::OPTIONS {
            return Ok(ProxyResponse::no_content());
        }
        if *method != Method::POST {
            return Err(ApiError::MethodNotAllowed);
        }

        match headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
            Some(ct) if ct.starts_with("application/json") => {}
            other => debug!("unexpected content-type {:?}, parsing body as JSON anyway", other),
        }

        let raw = parse_payload(body)?;
        debug!("parsed body: {}", raw);

        let request = normalize_input(&raw)?;
        debug!(
            "normalized chart request: {:?} (utc offset hours: {:?})",
            request,
            request.tz.hours()
        );

        let data = self.dispatch(&request).await?;
        Ok(ProxyResponse::ok(data))
    }

    /// Try each endpoint in order, one attempt each, stopping at the first success
    pub async fn dispatch(&self, request: &ChartRequest) -> ApiResult<Value> {
        let payload = serde_json::to_vec(request)
            .map_err(|e| ApiError::Internal(format!("failed to encode upstream payload: {e}")))?;

        let mut last_error = UpstreamError::NoEndpoints;
        for endpoint in self.config.endpoints() {
            info!("hitting upstream: {}", endpoint);
            match self
                .upstream
                .post_chart(endpoint, &payload, self.config.fetch_timeout)
                .await
            {
                Ok(data) => return Ok(data),
                Err(e) => {
                    warn!("upstream {} failed: {}", endpoint, e);
                    last_error = e;
                }
            }
        }

        Err(ApiError::UpstreamExhausted(last_error))
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("request handler panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("request handler panicked: {msg}")
    } else {
        "request handler panicked".to_string()
    }
}

/// Parse the raw body as a JSON object; an empty body counts as `{}`
pub fn parse_payload(body: &[u8]) -> ApiResult<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }

    let raw: Value =
        serde_json::from_slice(body).map_err(|e| ApiError::InvalidJson(e.to_string()))?;
    if !raw.is_object() {
        return Err(ApiError::InvalidInput(
            "request body must be a JSON object".to_string(),
        ));
    }
    Ok(raw)
}

/// Map either naming convention and date separator onto a validated `ChartRequest`
pub fn normalize_input(raw: &Value) -> ApiResult<ChartRequest> {
    let lat = pick(raw, &["lat", "latitude"])
        .and_then(num)
        .filter(|x| x.is_finite())
        .ok_or_else(|| ApiError::InvalidInput("lat must be a finite number".to_string()))?;
    let lon = pick(raw, &["lon", "longitude"])
        .and_then(num)
        .filter(|x| x.is_finite())
        .ok_or_else(|| ApiError::InvalidInput("lon must be a finite number".to_string()))?;

    let date = pick(raw, &["date"])
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(|s| s.replace('/', "-"))
        .ok_or_else(|| ApiError::InvalidInput("date is required (YYYY-MM-DD)".to_string()))?;

    let time = pick(raw, &["time"])
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::InvalidInput("time is required (HH:MM)".to_string()))?;

    let tz = match pick(raw, &["tz", "timezone"]) {
        Some(Value::String(s)) if !s.trim().is_empty() => TzOffset::Text(s.clone()),
        Some(Value::Number(n)) if n.as_f64().is_some_and(f64::is_finite) => {
            TzOffset::Hours(n.clone())
        }
        _ => {
            return Err(ApiError::InvalidInput(
                "tz is required (e.g. +08:00)".to_string(),
            ))
        }
    };

    Ok(ChartRequest {
        lat,
        lon,
        date,
        time,
        tz,
    })
}
