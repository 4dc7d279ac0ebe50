/// External API clients module
use crate::errors::UpstreamError;
use crate::utils::truncate_chars;
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

/// Max characters of an upstream error body kept for diagnostics
const ERROR_BODY_LIMIT: usize = 500;

/// One chart calculation call against a single upstream endpoint
#[async_trait]
pub trait ChartUpstream: Send + Sync {
    async fn post_chart(
        &self,
        endpoint: &str,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Value, UpstreamError>;
}

/// HTTP client wrapper with common configuration
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .user_agent("astro-proxy/0.1")
            .build()?;
        Ok(Self { client })
    }

    pub fn get_client(&self) -> &Client {
        &self.client
    }
}

/// OpenAstro chart API client
pub struct HttpChartUpstream {
    http_client: HttpClient,
}

impl HttpChartUpstream {
    pub fn new() -> Result<Self, UpstreamError> {
        Ok(Self {
            http_client: HttpClient::new()?,
        })
    }

    async fn send(&self, endpoint: &str, payload: &[u8]) -> Result<Value, UpstreamError> {
        let resp = self
            .http_client
            .get_client()
            .post(endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_vec())
            .send()
            .await?;

        let status = resp.status();

        if !status.is_success() {
            // An unreadable error body must not hide the upstream status.
            let text = resp.text().await.unwrap_or_default();
            warn!(
                "upstream {} returned {}: {}",
                endpoint,
                status,
                truncate_chars(&text, ERROR_BODY_LIMIT)
            );
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: truncate_chars(&text, ERROR_BODY_LIMIT).to_string(),
            });
        }

        let text = resp.text().await?;
        info!("upstream {} returned {}", endpoint, status);
        Ok(parse_body(text))
    }
}

#[async_trait]
impl ChartUpstream for HttpChartUpstream {
    async fn post_chart(
        &self,
        endpoint: &str,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Value, UpstreamError> {
        // Dropping the send future on expiry aborts the in-flight request.
        match tokio::time::timeout(timeout, self.send(endpoint, payload)).await {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::Timeout(timeout)),
        }
    }
}

/// Upstream body as JSON; non-JSON text is wrapped as `{"raw": text}`
pub fn parse_body(text: String) -> Value {
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => json,
        Err(e) => {
            warn!("upstream body is not JSON ({}), wrapping as raw text", e);
            serde_json::json!({ "raw": text })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn payload() -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "lat": 25.03,
            "lon": 121.56,
            "date": "2024-01-07",
            "time": "13:30",
            "tz": "+08:00"
        }))
        .unwrap()
    }

    #[test]
    fn parse_body_wraps_non_json() {
        assert_eq!(
            parse_body("<html>oops</html>".to_string()),
            serde_json::json!({"raw": "<html>oops</html>"})
        );
    }

    #[test]
    fn parse_body_passes_json_through() {
        assert_eq!(
            parse_body(r#"{"planets":{"Sun":{"lon":290.1}}}"#.to_string()),
            serde_json::json!({"planets": {"Sun": {"lon": 290.1}}})
        );
    }

    #[test]
    fn parse_body_keeps_number_text_and_key_order() {
        let text = r#"{"planets":{"Sun":{"lon":290.10}},"id":123456789012345678901234567890,"asc":1.0}"#;
        let body = parse_body(text.to_string());
        assert_eq!(serde_json::to_string(&body).unwrap(), text);
    }

    #[tokio::test]
    async fn posts_json_payload_and_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chart"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({
                "lat": 25.03,
                "lon": 121.56,
                "date": "2024-01-07",
                "time": "13:30",
                "tz": "+08:00"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"planets": {"Sun": {"lon": 290.1}}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let upstream = HttpChartUpstream::new().unwrap();
        let body = upstream
            .post_chart(
                &format!("{}/api/chart", server.uri()),
                &payload(),
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        assert_eq!(body, serde_json::json!({"planets": {"Sun": {"lon": 290.1}}}));
    }

    #[tokio::test]
    async fn non_success_status_captures_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("ephemeris offline"))
            .mount(&server)
            .await;

        let upstream = HttpChartUpstream::new().unwrap();
        let err = upstream
            .post_chart(&server.uri(), &payload(), Duration::from_secs(5))
            .await
            .unwrap_err();

        match err {
            UpstreamError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "ephemeris offline");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let upstream = HttpChartUpstream::new().unwrap();
        let started = std::time::Instant::now();
        let err = upstream
            .post_chart(&server.uri(), &payload(), Duration::from_millis(100))
            .await
            .unwrap_err();

        assert!(matches!(err, UpstreamError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn connection_refused_is_transport_error() {
        let upstream = HttpChartUpstream::new().unwrap();
        let err = upstream
            .post_chart("http://127.0.0.1:1/api/chart", &payload(), Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, UpstreamError::Transport(_)));
    }

    #[tokio::test]
    async fn truncated_error_body_keeps_upstream_status() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            // Drain the full request so closing the socket is a clean EOF.
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_lowercase();
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
            }
            socket
                .write_all(b"HTTP/1.1 503 Service Unavailable\r\ncontent-length: 100\r\n\r\npartial")
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
        });

        let upstream = HttpChartUpstream::new().unwrap();
        let err = upstream
            .post_chart(&format!("http://{addr}/api/chart"), &payload(), Duration::from_secs(5))
            .await
            .unwrap_err();

        match err {
            UpstreamError::Status { status, .. } => assert_eq!(status, 503),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
