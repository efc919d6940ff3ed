//! HTTP session shared by the catalog client and the aggregator fetcher.
//!
//! One `reqwest::Client` per run: a cookie jar (optionally pre-seeded with
//! the aggregator's anti-bot cookie), a request timeout and an optional
//! pinned TLS version. `HttpFetcher` adds the fixed inter-request delay and
//! a random user agent per request.

use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::Rng;
use reqwest::cookie::Jar;
use reqwest::header::USER_AGENT;
use reqwest::tls::Version;
use reqwest::{Client, Url};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::PageFetcher;
use crate::config::AppConfig;

/// Build the shared HTTP client.
///
/// `challenge_cookie` is the value of a previously issued anti-bot cookie;
/// when present it is planted in the jar for the aggregator's domain.
pub fn build_client(cfg: &AppConfig, challenge_cookie: Option<&str>) -> Result<Client> {
    let jar = Arc::new(Jar::default());

    if let Some(value) = challenge_cookie.filter(|v| !v.is_empty()) {
        let url = Url::parse(&cfg.market.search_url)
            .with_context(|| format!("Invalid search URL: {}", cfg.market.search_url))?;
        jar.add_cookie_str(&challenge_cookie_header(cfg, value), &url);
        debug!(name = %cfg.market.challenge_cookie_name, "Challenge cookie planted");
    }

    let mut builder = Client::builder()
        .cookie_provider(jar)
        .timeout(Duration::from_secs(cfg.general.request_timeout_secs));

    if let Some(ref version) = cfg.market.tls_version {
        let version = match version.as_str() {
            "1.2" => Version::TLS_1_2,
            "1.3" => Version::TLS_1_3,
            other => anyhow::bail!("Unsupported TLS version: {other}"),
        };
        builder = builder.min_tls_version(version).max_tls_version(version);
    }

    builder.build().context("Failed to build HTTP client")
}

/// `Set-Cookie`-style line for the anti-bot cookie.
fn challenge_cookie_header(cfg: &AppConfig, value: &str) -> String {
    let mut cookie = format!("{}={}", cfg.market.challenge_cookie_name, value);
    if let Some(ref domain) = cfg.market.challenge_cookie_domain {
        cookie.push_str(&format!("; Domain={domain}"));
    }
    cookie
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

pub struct HttpFetcher {
    http: Client,
    delay: Duration,
    user_agents: Vec<String>,
}

impl HttpFetcher {
    /// Blank user agents are dropped; at least one must remain.
    pub fn new(http: Client, delay: Duration, user_agents: Vec<String>) -> Result<Self> {
        let user_agents: Vec<String> = user_agents
            .into_iter()
            .filter(|ua| !ua.trim().is_empty())
            .collect();
        if user_agents.is_empty() {
            anyhow::bail!("User agent pool is empty");
        }
        Ok(Self {
            http,
            delay,
            user_agents,
        })
    }

    pub fn from_config(http: Client, cfg: &AppConfig) -> Result<Self> {
        Self::new(
            http,
            Duration::from_secs(cfg.general.request_delay_secs),
            cfg.market.user_agents.clone(),
        )
    }

    fn pick_user_agent(&self) -> &str {
        let index = rand::thread_rng().gen_range(0..self.user_agents.len());
        &self.user_agents[index]
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        debug!(secs = self.delay.as_secs(), "Sleeping before request");
        tokio::time::sleep(self.delay).await;

        let user_agent = self.pick_user_agent().to_string();
        debug!(url, user_agent = %user_agent, "Opening page");

        let resp = self
            .http
            .get(url)
            .header(USER_AGENT, user_agent)
            .send()
            .await
            .with_context(|| format!("Request to {url} failed"))?;

        // Challenge pages are often served with an error status; the body
        // is still returned so the scanner can recognise them.
        let status = resp.status();
        debug!(final_url = %resp.url(), %status, "Response received");
        if !status.is_success() {
            warn!(url, %status, "Aggregator answered with a non-success status");
        }

        resp.text()
            .await
            .with_context(|| format!("Failed to read body of {url}"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
