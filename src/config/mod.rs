/// Application configuration module
use std::env;
use std::time::Duration;

const DEFAULT_PRIMARY_ENDPOINT: &str = "https://openastro.vercel.app/api/chart";
const DEFAULT_FALLBACK_ENDPOINTS: &[&str] = &["https://openastro.fly.dev/api/chart"];
const DEFAULT_FETCH_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub upstream: UpstreamConfig,
}

/// Upstream chart endpoints, tried in order: primary first, then each fallback
#[derive(Clone, Debug, PartialEq)]
pub struct UpstreamConfig {
    pub primary: String,
    pub fallbacks: Vec<String>,
    pub fetch_timeout: Duration,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let primary = env::var("OA_ENDPOINT")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_PRIMARY_ENDPOINT.to_string());

        let fallbacks = match env::var("OA_FALLBACK_ENDPOINTS") {
            Ok(list) => parse_endpoint_list(&list),
            Err(_) => DEFAULT_FALLBACK_ENDPOINTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };

        let upstream = UpstreamConfig {
            primary,
            fallbacks,
            fetch_timeout: Duration::from_millis(env_u64(
                "OA_FETCH_TIMEOUT_MS",
                DEFAULT_FETCH_TIMEOUT_MS,
            )),
        };
        upstream.validate()?;

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

        Ok(Self {
            bind_addr,
            upstream,
        })
    }
}

impl UpstreamConfig {
    pub fn new(primary: impl Into<String>, fallbacks: Vec<String>, fetch_timeout: Duration) -> Self {
        Self {
            primary: primary.into(),
            fallbacks,
            fetch_timeout,
        }
    }

    /// All endpoints in dispatch order
    pub fn endpoints(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary.as_str()).chain(self.fallbacks.iter().map(String::as_str))
    }

    /// Every endpoint must be an absolute http(s) URL and the timeout non-zero
    pub fn validate(&self) -> anyhow::Result<()> {
        for endpoint in self.endpoints() {
            let url = reqwest::Url::parse(endpoint)
                .map_err(|e| anyhow::anyhow!("invalid upstream endpoint {endpoint:?}: {e}"))?;
            if !matches!(url.scheme(), "http" | "https") {
                anyhow::bail!("upstream endpoint {endpoint:?} must use http or https");
            }
        }
        if self.fetch_timeout.is_zero() {
            anyhow::bail!("OA_FETCH_TIMEOUT_MS must be greater than zero");
        }
        Ok(())
    }
}

/// Split a comma-separated endpoint list, dropping blank entries
fn parse_endpoint_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
