//! Shared types for the repricer.
//!
//! Products come in from the catalog API, offers come out of the
//! aggregator's detail pages, and a `Decision` is what the pricing engine
//! derives from the two. Everything here is a read-only snapshot for a
//! single run; nothing is mutated after construction.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Money helpers
// ---------------------------------------------------------------------------

/// Round a price to cents, half away from zero.
pub fn round_price(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Best-effort numeric read of a loosely typed JSON field.
///
/// Accepts JSON numbers and numeric strings; everything else (null, empty
/// strings, garbage) yields `None`.
pub fn lenient_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .ok()
            .or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Product
// ---------------------------------------------------------------------------

/// One catalog item under management.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub product_id: String,
    /// Display name, also the search key on the aggregator.
    pub name: String,
    pub list_price: Decimal,
    /// Discounted price; only meaningful when `0 < promo < list`.
    pub promo_price: Option<Decimal>,
    /// MRP. `None` when the catalog sent nothing usable.
    pub reference_price: Option<Decimal>,
    /// Per-product undercut amount, honored when `>= 0`.
    pub price_floor_override: Option<Decimal>,
}

impl Product {
    /// The price shoppers currently see, rounded to cents.
    pub fn effective_price(&self) -> Decimal {
        match self.promo_price {
            Some(promo) if promo > Decimal::ZERO && promo < self.list_price => round_price(promo),
            _ => round_price(self.list_price),
        }
    }

    /// Identification used in every log line.
    pub fn label(&self) -> String {
        format!("{} (product ID: {})", self.name, self.product_id)
    }

    #[cfg(test)]
    pub fn sample() -> Self {
        Product {
            product_id: "1001".to_string(),
            name: "Acme Kettle 2000".to_string(),
            list_price: rust_decimal_macros::dec!(150.00),
            promo_price: None,
            reference_price: Some(rust_decimal_macros::dec!(100)),
            price_floor_override: None,
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Raw product record as the catalog API returns it.
///
/// Numeric fields arrive as numbers, numeric strings or null depending on
/// how the shop backend filled them in, so they stay untyped until
/// conversion into a `Product`.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogRecord {
    #[serde(default)]
    pub product_id: Value,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Value,
    #[serde(default)]
    pub special: Value,
    #[serde(default)]
    pub mrp_price: Value,
    #[serde(default)]
    pub limit: Value,
}

impl TryFrom<CatalogRecord> for Product {
    type Error = RepricerError;

    fn try_from(record: CatalogRecord) -> Result<Self, Self::Error> {
        let product_id = match &record.product_id {
            Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            other => {
                return Err(RepricerError::InvalidRecord {
                    product_id: other.to_string(),
                    reason: "missing product id".into(),
                })
            }
        };

        let name = match record.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                return Err(RepricerError::InvalidRecord {
                    product_id,
                    reason: "missing product name".into(),
                })
            }
        };

        let list_price = lenient_decimal(&record.price).ok_or_else(|| {
            RepricerError::InvalidRecord {
                product_id: product_id.clone(),
                reason: format!("list price is not numeric ({})", record.price),
            }
        })?;

        Ok(Product {
            product_id,
            name,
            list_price,
            promo_price: lenient_decimal(&record.special),
            reference_price: lenient_decimal(&record.mrp_price),
            price_floor_override: lenient_decimal(&record.limit),
        })
    }
}

// ---------------------------------------------------------------------------
// Offers
// ---------------------------------------------------------------------------

/// One seller's listing on the aggregator's detail page.
#[derive(Debug, Clone, PartialEq)]
pub struct Offer {
    pub price: Decimal,
    pub currency: String,
    pub seller: String,
}

impl fmt::Display for Offer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {} from {}", self.price, self.currency, self.seller)
    }
}

/// Offers for one product, cheapest first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RankedOfferSet {
    offers: Vec<Offer>,
    /// Product name as the aggregator displays it. Diagnostics only.
    pub listing_name: Option<String>,
}

impl RankedOfferSet {
    /// Rank offers ascending by price. Equal prices keep their input order.
    pub fn new(mut offers: Vec<Offer>, listing_name: Option<String>) -> Self {
        offers.sort_by(|a, b| a.price.cmp(&b.price));
        Self {
            offers,
            listing_name,
        }
    }

    pub fn offers(&self) -> &[Offer] {
        &self.offers
    }

    pub fn len(&self) -> usize {
        self.offers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    pub fn best(&self) -> Option<&Offer> {
        self.offers.first()
    }

    pub fn second_best(&self) -> Option<&Offer> {
        self.offers.get(1)
    }

    /// Whether any seller name contains `shop`.
    pub fn has_seller(&self, shop: &str) -> bool {
        self.offers.iter().any(|o| o.seller.contains(shop))
    }

    /// Number of offers whose seller name contains `shop`.
    pub fn seller_count(&self, shop: &str) -> usize {
        self.offers.iter().filter(|o| o.seller.contains(shop)).count()
    }

    /// Whether `shop` is exactly the seller of the cheapest offer.
    pub fn is_best_seller(&self, shop: &str) -> bool {
        self.best().is_some_and(|o| o.seller.trim() == shop)
    }
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Why the engine did (or did not) propose a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rationale {
    /// Proposal accepted; the executor should apply it.
    Update,
    OfferMissing,
    ReferencePriceNotSet,
    /// Reference price so large the floor cannot be computed.
    ReferencePriceOutOfRange,
    /// Merchant holds the best offer and nobody else is listed.
    NoSecondOffer,
    PriceUnchanged,
    /// Candidate price fell under the minimum accepted price.
    BelowFloor { candidate: Decimal },
}

impl fmt::Display for Rationale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rationale::Update => write!(f, "price update proposed"),
            Rationale::OfferMissing => write!(f, "offer does not exist"),
            Rationale::ReferencePriceNotSet => write!(f, "reference price not set"),
            Rationale::ReferencePriceOutOfRange => write!(f, "reference price out of range"),
            Rationale::NoSecondOffer => write!(f, "no second offer to react to"),
            Rationale::PriceUnchanged => write!(f, "price unchanged"),
            Rationale::BelowFloor { candidate } => {
                write!(f, "below floor, update to {candidate:.2} rejected")
            }
        }
    }
}

/// Outcome of evaluating one product. Built fresh every run, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub product_id: String,
    pub current_price: Decimal,
    /// Never below `min_accepted_price`.
    pub proposed_price: Option<Decimal>,
    pub min_accepted_price: Decimal,
    pub undercut_amount: Decimal,
    pub rationale: Rationale,
}

impl Decision {
    /// The price to apply, if the decision calls for an update.
    pub fn update_to(&self) -> Option<Decimal> {
        match self.rationale {
            Rationale::Update => self.proposed_price,
            _ => None,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.update_to().is_none()
    }
}

// ---------------------------------------------------------------------------
// Update outcome
// ---------------------------------------------------------------------------

/// Result of handing an approved price to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    /// The catalog answered but did not acknowledge the change.
    Rejected,
    /// Price updates are switched off for this run.
    Disabled,
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateOutcome::Applied => write!(f, "applied"),
            UpdateOutcome::Rejected => write!(f, "rejected"),
            UpdateOutcome::Disabled => write!(f, "disabled"),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum RepricerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid catalog record {product_id}: {reason}")]
    InvalidRecord { product_id: String, reason: String },

    #[error("Catalog API error: {0}")]
    Catalog(String),
}

/// Why a detail page could not be turned into offers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("no offer blocks found")]
    NoOffers,

    #[error("offer block without a price")]
    MissingPrice,

    #[error("unreadable price text {0:?}")]
    Price(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
