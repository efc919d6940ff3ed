//! Shop backend API client.
//!
//! Endpoints (all relative to `api.base_url`):
//! - `login_path`: POST form `username`, `password` → `{"token": "..."}`
//! - `product_list_path`: GET `?token=` → `{"products": [...]}`
//! - `product_update_path`: POST `?token=`, form `product_id`, `price`
//!   → a JSON object carrying a `success` key when the change was accepted
//!
//! The underlying `reqwest::Client` is shared with the market fetcher so
//! both use one cookie jar for the whole run.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use tracing::{debug, info, warn};

use super::{CatalogClient, Credentials, SessionToken, UpdateAck};
use crate::config::ApiConfig;
use crate::types::{CatalogRecord, Product};

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
}

/// Records stay untyped here so one malformed entry cannot sink the list.
#[derive(Debug, Deserialize)]
struct ProductListResponse {
    #[serde(default)]
    products: Vec<Value>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct ShopApiClient {
    http: Client,
    api: ApiConfig,
}

impl ShopApiClient {
    pub fn new(http: Client, api: ApiConfig) -> Self {
        Self { http, api }
    }

    /// Read a response body, failing on non-2xx statuses.
    async fn checked_text(resp: reqwest::Response, what: &str) -> Result<String> {
        let status = resp.status();
        let body = describe_body(resp.text().await);
        if !status.is_success() {
            anyhow::bail!("{what} failed {status}: {body}");
        }
        Ok(body)
    }
}

fn describe_body<E: fmt::Display>(body: Result<String, E>) -> String {
    body.unwrap_or_else(|e| format!("<unreadable body: {e}>"))
}

/// Decode raw product list entries, dropping the ones that cannot be priced.
pub fn products_from_values(values: Vec<Value>) -> Vec<Product> {
    let records = values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<CatalogRecord>(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "Skipping malformed catalog record");
                None
            }
        })
        .collect();
    products_from_records(records)
}

/// Convert raw catalog records, dropping the ones that cannot be priced.
pub fn products_from_records(records: Vec<CatalogRecord>) -> Vec<Product> {
    records
        .into_iter()
        .filter_map(|record| match Product::try_from(record) {
            Ok(product) => Some(product),
            Err(e) => {
                warn!(error = %e, "Skipping catalog record");
                None
            }
        })
        .collect()
}

/// Interpret an update response body.
///
/// The backend signals acceptance with a `success` key; an explicit
/// `"success": false` counts as a rejection.
pub fn ack_from_body(body: &Value) -> UpdateAck {
    let success = match body.get("success") {
        Some(Value::Bool(false)) => false,
        Some(_) => true,
        None => false,
    };
    UpdateAck { success }
}

#[async_trait]
impl CatalogClient for ShopApiClient {
    async fn login(&self, credentials: &Credentials) -> Result<SessionToken> {
        let url = self.api.endpoint(&self.api.login_path);
        info!(url = %url, username = %credentials.username, "Logging in to catalog API");

        let resp = self
            .http
            .post(&url)
            .form(&[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.expose_secret().as_str()),
            ])
            .send()
            .await
            .context("Catalog login request failed")?;

        let body = Self::checked_text(resp, "Catalog login").await?;
        let login: LoginResponse =
            serde_json::from_str(&body).context("Failed to parse catalog login response")?;

        let token = login
            .token
            .filter(|t| !t.is_empty())
            .context("Catalog login succeeded but no token returned")?;

        debug!("Catalog session established");
        Ok(SessionToken::new(token))
    }

    async fn list_products(&self, token: &SessionToken) -> Result<Vec<Product>> {
        let url = self.api.endpoint(&self.api.product_list_path);
        debug!(url = %url, "Fetching product list");

        let resp = self
            .http
            .get(&url)
            .query(&[("token", token.as_str())])
            .send()
            .await
            .context("Product list request failed")?;

        let body = Self::checked_text(resp, "Product list").await?;
        let list: ProductListResponse =
            serde_json::from_str(&body).context("Failed to parse product list response")?;

        let received = list.products.len();
        let products = products_from_values(list.products);
        info!(received, usable = products.len(), "Product list fetched");
        Ok(products)
    }

    async fn update_price(
        &self,
        token: &SessionToken,
        product_id: &str,
        new_price: Decimal,
    ) -> Result<UpdateAck> {
        let url = self.api.endpoint(&self.api.product_update_path);

        let resp = self
            .http
            .post(&url)
            .query(&[("token", token.as_str())])
            .form(&[
                ("product_id", product_id.to_string()),
                ("price", format!("{new_price:.2}")),
            ])
            .send()
            .await
            .context("Price update request failed")?;

        let body = Self::checked_text(resp, "Price update").await?;
        let parsed: Value =
            serde_json::from_str(&body).context("Failed to parse price update response")?;

        debug!(product_id, body = %parsed, "Price update response");
        Ok(ack_from_body(&parsed))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
