//! Access to the price-comparison aggregator.
//!
//! Every aggregator page goes through a `PageFetcher`, which owns request
//! pacing and outbound identity. The scanner and offer parser only ever
//! see page bodies.

pub mod http;

use anyhow::Result;
use async_trait::async_trait;

/// Fetches aggregator pages as HTML text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}
