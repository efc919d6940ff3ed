//! Merchant catalog integration.
//!
//! Defines the `CatalogClient` trait the repricer talks to and provides the
//! HTTP implementation for the shop's internal API:
//! - `shop_api`: token login, product listing and price updates

pub mod shop_api;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use secrecy::SecretString;
use std::fmt;

use crate::types::Product;

/// Login credentials for the catalog API.
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Session token returned by a successful login. Valid for the whole run.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken([REDACTED])")
    }
}

/// The catalog's answer to a price update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateAck {
    pub success: bool,
}

/// Abstraction over the merchant's catalog backend.
///
/// `login` and `list_products` failures are fatal for the run;
/// `update_price` failures only affect the product being updated.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Authenticate and obtain a session token.
    async fn login(&self, credentials: &Credentials) -> Result<SessionToken>;

    /// Fetch every product that should be evaluated, in catalog order.
    async fn list_products(&self, token: &SessionToken) -> Result<Vec<Product>>;

    /// Submit a new price for one product.
    async fn update_price(
        &self,
        token: &SessionToken,
        product_id: &str,
        new_price: Decimal,
    ) -> Result<UpdateAck>;
}
