//! In-memory catalog and aggregator for integration testing.
//!
//! The catalog records every price update it receives; the site serves
//! canned HTML keyed by URL and remembers which URLs were requested.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;

use repricer::catalog::{CatalogClient, Credentials, SessionToken, UpdateAck};
use repricer::market::PageFetcher;
use repricer::types::Product;

pub const TOKEN: &str = "integration-token";

pub struct InMemoryCatalog {
    products: Vec<Product>,
    accept_updates: bool,
    updates: Mutex<Vec<(String, Decimal)>>,
}

impl InMemoryCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            products,
            accept_updates: true,
            updates: Mutex::new(Vec::new()),
        }
    }

    /// Answer every update with `success: false`.
    pub fn rejecting(mut self) -> Self {
        self.accept_updates = false;
        self
    }

    pub fn updates(&self) -> Vec<(String, Decimal)> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogClient for InMemoryCatalog {
    async fn login(&self, credentials: &Credentials) -> Result<SessionToken> {
        if credentials.username.is_empty() {
            return Err(anyhow!("Login failed"));
        }
        Ok(SessionToken::new(TOKEN))
    }

    async fn list_products(&self, token: &SessionToken) -> Result<Vec<Product>> {
        if token.as_str() != TOKEN {
            return Err(anyhow!("Invalid token"));
        }
        Ok(self.products.clone())
    }

    async fn update_price(
        &self,
        token: &SessionToken,
        product_id: &str,
        new_price: Decimal,
    ) -> Result<UpdateAck> {
        if token.as_str() != TOKEN {
            return Err(anyhow!("Invalid token"));
        }
        self.updates
            .lock()
            .unwrap()
            .push((product_id.to_string(), new_price));
        Ok(UpdateAck {
            success: self.accept_updates,
        })
    }
}

#[derive(Default)]
pub struct FakeSite {
    pages: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl FakeSite {
    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for FakeSite {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.requests.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("404 Not Found: {url}"))
    }
}

// ---------------------------------------------------------------------------
// Page builders
// ---------------------------------------------------------------------------

pub fn search_url(name: &str) -> String {
    format!("https://compare.example.com/?q={}", urlencoding::encode(name))
}

pub fn detail_url(slug: &str) -> String {
    format!("https://compare.example.com/{slug}/")
}

pub fn search_page(name: &str, slug: &str) -> String {
    format!(
        r#"<html><head><title>{name} - search</title></head><body>
        <div class="c-product-list">
          <a class="c-product__link" href="https://compare.example.com/exit?to={slug}">{name}</a>
          <a class="c-product__link" href="{}">{name}</a>
        </div></body></html>"#,
        detail_url(slug)
    )
}

pub fn challenge_page() -> String {
    "<html><head><title>Are you a robot?</title></head><body>Please wait</body></html>".into()
}

pub fn detail_page(name: &str, offers: &[(&str, &str)]) -> String {
    let blocks: String = offers
        .iter()
        .map(|(price, seller)| {
            format!(
                r#"<div class="c-offer"><span class="c-offer__price">{price}</span>
                   <a class="c-offer__shop-name">{seller}</a></div>"#
            )
        })
        .collect();
    format!(r#"<html><body><h1 class="e-heading">{name}</h1>{blocks}</body></html>"#)
}
