/// Application routes configuration
use crate::handlers::{chart_proxy, health, not_found, AppState};
use axum::{
    http::{header, HeaderValue},
    middleware,
    response::Response,
    routing::{any, get},
    Router,
};

/// Pre-flight cache lifetime, in seconds
const CORS_MAX_AGE: &str = "600";

/// Build the application router with all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health))
        // Chart proxy
        .route("/api/chart", any(chart_proxy))
        .route("/proxy", any(chart_proxy))
        .fallback(not_found)
        .layer(middleware::map_response(apply_cors))
        .with_state(state)
}

/// Attach the permissive CORS header set to every response
async fn apply_cors(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static(CORS_MAX_AGE),
    );
    response
}
