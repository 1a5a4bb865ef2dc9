use std::time::{Duration, Instant};

use anyhow::Result;
use reqwest::redirect::Policy;
use tracing::debug;

const USER_AGENT: &str = concat!("navwatch/", env!("CARGO_PKG_VERSION"));
const MAX_REDIRECTS: usize = 10;

/// Classified result of one probe. Failures are data, never errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// Final HTTP status, absent when no response arrived
    pub status_code: Option<u16>,
    /// True only for a 2xx final status
    pub reachable: bool,
    /// Wall-clock time from dispatch to response or failure
    pub elapsed_ms: u64,
}

impl ProbeOutcome {
    /// No response: network error, DNS failure, timeout, or a URL never dispatched.
    pub fn unreachable(elapsed_ms: u64) -> Self {
        Self { status_code: None, reachable: false, elapsed_ms }
    }

    pub fn from_status(status: reqwest::StatusCode, elapsed_ms: u64) -> Self {
        Self { status_code: Some(status.as_u16()), reachable: status.is_success(), elapsed_ms }
    }
}

/// Reachability probe for one URL
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    /// Probe `url`, giving up after `timeout`
    async fn probe(&self, url: &str, timeout: Duration) -> ProbeOutcome;
}

/// HTTP GET prober sharing one connection pool across probes
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()?;

        Ok(Self { client })
    }

    /// Use a preconfigured client (proxy settings, TLS roots, ...).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str, timeout: Duration) -> ProbeOutcome {
        let start = Instant::now();
        let request = self.client.get(url).timeout(timeout).send();

        // Dropping the request future on expiry cancels it client-side, so a
        // silent server cannot hold the probe past `timeout`.
        match tokio::time::timeout(timeout, request).await {
            Ok(Ok(response)) => {
                ProbeOutcome::from_status(response.status(), elapsed_ms(start))
            }
            Ok(Err(e)) => {
                debug!(url, error = %e, "Probe request failed");
                ProbeOutcome::unreachable(elapsed_ms(start))
            }
            Err(_) => {
                debug!(url, timeout_ms = timeout.as_millis() as u64, "Probe timed out");
                ProbeOutcome::unreachable(elapsed_ms(start))
            }
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
