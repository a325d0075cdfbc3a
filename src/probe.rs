//! Instagram availability probe.
//!
//! One GET per check against the public profile URL. Classification is
//! heuristic: a 404, or a 2xx page carrying one of the not-found markers,
//! means the username is unregistered. A bare 2xx means taken. Everything
//! else is a [`ProbeError`], which callers treat like taken (fail safe:
//! keep monitoring rather than falsely declare a name available).
//!
//! No retries here; backoff policy belongs to the scheduler.

use crate::error::ProbeError;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

/// Default profile URL base.
const PROFILE_BASE_URL: &str = "https://www.instagram.com";

/// Per-request timeout.
const PROBE_TIMEOUT: Duration = Duration::from_secs(12);

/// Referer sent with every probe; direct profile hits get blocked sooner.
const REFERER: &str = "https://www.google.com/";

/// Rotated user-agent pool.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/122.0",
];

/// Body substrings that mark a profile page as "no such user".
const NOT_FOUND_MARKERS: &[&str] = &[
    "\"user\":null",
    "Sorry, this page isn't available",
    "The link you followed may be broken",
    "Page Not Found",
];

/// Probe verdict for a well-formed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    Taken,
}

/// The availability check seam.
///
/// The scheduler and the watch command depend on this trait so tests can
/// substitute scripted probers.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn check(&self, username: &str) -> Result<Availability, ProbeError>;
}

/// Production prober backed by reqwest.
pub struct HttpProber {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProber {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, PROFILE_BASE_URL)
    }

    /// Base URL override for tests.
    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn pick_user_agent() -> &'static str {
        USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(USER_AGENTS[0])
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn check(&self, username: &str) -> Result<Availability, ProbeError> {
        let url = format!("{}/{}/", self.base_url.trim_end_matches('/'), username);

        let response = self
            .client
            .get(&url)
            .timeout(PROBE_TIMEOUT)
            .header("User-Agent", Self::pick_user_agent())
            .header("Accept-Language", "en-US,en;q=0.9")
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            )
            .header("Referer", REFERER)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProbeError::RateLimited);
        }
        if status == StatusCode::NOT_FOUND {
            debug!(username, "Profile returned 404");
            return Ok(Availability::Available);
        }
        if !status.is_success() {
            return Err(ProbeError::UnexpectedStatus(status.as_u16()));
        }

        let body = response.text().await?;
        Ok(classify_body(&body))
    }
}

/// Classify a 2xx profile page body.
fn classify_body(body: &str) -> Availability {
    if NOT_FOUND_MARKERS.iter().any(|m| body.contains(m)) {
        Availability::Available
    } else {
        Availability::Taken
    }
}
