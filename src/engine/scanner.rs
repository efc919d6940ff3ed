//! Market scanner.
//!
//! Searches the aggregator for a catalog product by name and resolves the
//! single detail page that lists its offers. Before looking at results it
//! checks whether the aggregator answered with its bot challenge page; that
//! means the session has been flagged and the rest of the batch must stop.

use anyhow::Result;
use reqwest::Url;
use scraper::{Html, Selector};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, trace};

use super::compile_selector;
use crate::config::MarketConfig;
use crate::market::PageFetcher;

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Location of a product's detail page on the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailPageHandle {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(DetailPageHandle),
    NotFound,
    /// The aggregator flagged the session as automated.
    ChallengeDetected,
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

pub struct MarketScanner {
    fetcher: Arc<dyn PageFetcher>,
    search_url: String,
    search_param: String,
    challenge_title: String,
    result_link: Selector,
    title: Selector,
}

impl MarketScanner {
    pub fn new(fetcher: Arc<dyn PageFetcher>, market: &MarketConfig) -> Result<Self> {
        Ok(Self {
            fetcher,
            search_url: market.search_url.trim_end_matches('/').to_string(),
            search_param: market.search_param.clone(),
            challenge_title: market.challenge_title.clone(),
            result_link: compile_selector(
                &market.selectors.search_result_link,
                "selectors.search_result_link",
            )?,
            title: compile_selector("title", "title")?,
        })
    }

    /// Search URL for a product name.
    pub fn search_url_for(&self, product_name: &str) -> String {
        format!(
            "{}/?{}={}",
            self.search_url,
            urlencoding::encode(&self.search_param),
            urlencoding::encode(product_name),
        )
    }

    /// Search the aggregator and resolve the product's detail page.
    pub async fn resolve(&self, product_name: &str) -> Result<Resolution> {
        let url = self.search_url_for(product_name);
        let html = self.fetcher.fetch(&url).await?;
        Ok(self.inspect_search_page(&html, product_name))
    }

    /// Fetch a resolved detail page.
    pub async fn fetch_detail(&self, handle: &DetailPageHandle) -> Result<String> {
        self.fetcher.fetch(&handle.url).await
    }

    /// Classify a search result page.
    pub fn inspect_search_page(&self, html: &str, product_name: &str) -> Resolution {
        let doc = Html::parse_document(html);

        if self.is_challenge_page(&doc) {
            trace!(page = html, "Challenge page body");
            return Resolution::ChallengeDetected;
        }

        for link in doc.select(&self.result_link) {
            let text: String = link.text().collect();
            if !text.contains(product_name) {
                continue;
            }
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            if self.is_valid_product_url(href) {
                debug!(product_name, url = href, "Detail page resolved");
                return Resolution::Found(DetailPageHandle {
                    url: href.to_string(),
                });
            }
            debug!(product_name, url = href, "Skipping unusable result link");
        }

        Resolution::NotFound
    }

    fn is_challenge_page(&self, doc: &Html) -> bool {
        doc.select(&self.title)
            .next()
            .map(|t| t.text().collect::<String>())
            .is_some_and(|title| title.trim() == self.challenge_title)
    }

    /// Absolute http(s) URL with a real host, and not an aggregator exit redirect.
    pub fn is_valid_product_url(&self, href: &str) -> bool {
        let Ok(url) = Url::parse(href) else {
            return false;
        };
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        let host_ok = url.host_str().is_some_and(is_plausible_host);
        host_ok && !href.contains(&format!("{}/exit", self.search_url))
    }
}

/// `localhost`, an IP address, or a dotted domain name.
fn is_plausible_host(host: &str) -> bool {
    if host == "localhost" {
        return true;
    }
    if host.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>().is_ok() {
        return true;
    }
    let labels: Vec<&str> = host.trim_end_matches('.').split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
