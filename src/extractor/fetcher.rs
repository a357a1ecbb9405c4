use crate::extractor::{ExtractError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Public CORS proxies, rotated round-robin across attempts
pub const DEFAULT_PROXIES: &[&str] = &[
    "https://corsproxy.io/?",
    "https://api.allorigins.win/raw?url=",
    "https://api.codetabs.com/v1/proxy?url=",
    "https://proxy.cors.sh/",
];

/// Substrings that mark an anti-bot interstitial rather than real content
const BLOCK_MARKERS: &[&str] = &["Cloudflare", "Access Denied"];

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

/// Raw HTTP exchange result, decoupled from any concrete client
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Low-level GET seam under the proxy fetcher
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<TransportResponse>;
}

/// reqwest-backed transport with cache-busting headers
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent("Cinematex/0.1.0")
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse> {
        let response = self
            .client
            .get(url)
            .header("Accept", ACCEPT_HTML)
            .header("Cache-Control", "no-cache")
            .header("Pragma", "no-cache")
            .send()
            .await
            .map_err(ExtractError::Network)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(ExtractError::Network)?;

        Ok(TransportResponse { status, body })
    }
}

/// Page-fetch seam consumed by the resolution chain
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a page and return its HTML body
    async fn fetch_html(&self, url: &str) -> Result<String>;
}

/// Fetcher configuration
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Proxy prefixes, attempt `k` uses proxy `k % len`
    pub proxies: Vec<String>,
    /// Attempt `k > 0` sleeps `k × backoff_unit` before firing
    pub backoff_unit: Duration,
    /// Bodies shorter than this are treated as blocked
    pub min_body_chars: usize,
    /// Full rotations through the proxy list before giving up
    pub rounds: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            proxies: DEFAULT_PROXIES.iter().map(|p| (*p).to_string()).collect(),
            backoff_unit: Duration::from_millis(500),
            min_body_chars: 200,
            rounds: 2,
        }
    }
}

/// HTML fetcher that tunnels requests through rotating CORS proxies.
///
/// Every failure mode retries with the next proxy: transport errors,
/// 403/429 statuses, and bodies that look like anti-bot pages. After
/// `rounds` full rotations the fetch is declared exhausted.
pub struct ProxyFetcher {
    transport: Arc<dyn Transport>,
    config: FetcherConfig,
}

impl ProxyFetcher {
    pub fn new(config: FetcherConfig) -> Self {
        Self {
            transport: Arc::new(ReqwestTransport::new()),
            config,
        }
    }

    /// Swap the transport, used to script exchanges in tests
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    fn max_attempts(&self) -> usize {
        self.config.rounds * self.config.proxies.len().max(1)
    }

    fn proxied_url(&self, attempt: usize, target: &str) -> String {
        let proxy = &self.config.proxies[attempt % self.config.proxies.len()];
        format!("{proxy}{}", urlencoding::encode(target))
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let target = url.trim();
        let max_attempts = self.max_attempts();

        for attempt in 0..max_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.config.backoff_unit * attempt as u32).await;
            }

            let proxied = self.proxied_url(attempt, target);
            debug!(attempt, url = target, "Fetching through proxy");

            match self.transport.get(&proxied).await {
                Ok(response) => {
                    if response.status == 403 || response.status == 429 {
                        warn!(
                            attempt,
                            status = response.status,
                            "Proxy blocked, rotating to next"
                        );
                        continue;
                    }
                    if !(200..300).contains(&response.status) {
                        warn!(
                            attempt,
                            status = response.status,
                            "Unexpected status, rotating to next proxy"
                        );
                        continue;
                    }
                    if Self::looks_blocked(&response.body, self.config.min_body_chars) {
                        warn!(attempt, "Response looks like an anti-bot page, retrying");
                        continue;
                    }
                    return Ok(response.body);
                }
                Err(e) => {
                    warn!(attempt, url = target, error = %e, "Proxy attempt failed");
                }
            }
        }

        Err(ExtractError::FetchExhausted {
            url: target.to_string(),
            attempts: max_attempts,
        })
    }

    fn looks_blocked(body: &str, min_chars: usize) -> bool {
        body.chars().count() < min_chars || BLOCK_MARKERS.iter().any(|m| body.contains(m))
    }
}

impl Default for ProxyFetcher {
    fn default() -> Self {
        Self::new(FetcherConfig::default())
    }
}

#[async_trait]
impl PageFetcher for ProxyFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        self.fetch(url).await
    }
}
