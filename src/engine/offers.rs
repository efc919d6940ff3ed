//! Offer aggregator.
//!
//! Turns a product detail page into a `RankedOfferSet`. All assumptions
//! about the aggregator's markup live in the configured selectors; this
//! module only knows that a page has offer blocks, each with a price node
//! and a seller node.
//!
//! Prices are printed in the aggregator's locale: comma as the decimal
//! point, a plain or non-breaking space as the thousands separator, and the
//! currency after the amount ("1 299,90 €").

use anyhow::Result;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use std::str::FromStr;
use tracing::{debug, warn};

use super::compile_selector;
use crate::config::SelectorConfig;
use crate::types::{Offer, ParseError, RankedOfferSet};

pub struct OfferAggregator {
    shop_name: String,
    offer: Selector,
    offer_price: Selector,
    offer_seller: Selector,
    product_name: Selector,
}

impl OfferAggregator {
    pub fn new(selectors: &SelectorConfig, shop_name: &str) -> Result<Self> {
        Ok(Self {
            shop_name: shop_name.to_string(),
            offer: compile_selector(&selectors.offer, "selectors.offer")?,
            offer_price: compile_selector(&selectors.offer_price, "selectors.offer_price")?,
            offer_seller: compile_selector(&selectors.offer_seller, "selectors.offer_seller")?,
            product_name: compile_selector(&selectors.product_name, "selectors.product_name")?,
        })
    }

    /// Parse every offer block on a detail page, cheapest first.
    pub fn parse(&self, html: &str) -> Result<RankedOfferSet, ParseError> {
        let doc = Html::parse_document(html);

        let mut offers = Vec::new();
        for block in doc.select(&self.offer) {
            offers.push(self.parse_block(block)?);
        }
        if offers.is_empty() {
            return Err(ParseError::NoOffers);
        }

        let listing_name = doc
            .select(&self.product_name)
            .next()
            .map(element_text)
            .filter(|name| !name.is_empty());

        let ranked = RankedOfferSet::new(offers, listing_name);

        let own_offers = ranked.seller_count(&self.shop_name);
        if own_offers > 1 {
            warn!(
                shop = %self.shop_name,
                count = own_offers,
                "Shop appears more than once among the offers"
            );
        }
        debug!(
            listing = ranked.listing_name.as_deref().unwrap_or("?"),
            offers = ranked.len(),
            own_offer = own_offers > 0,
            "Detail page parsed"
        );

        Ok(ranked)
    }

    fn parse_block(&self, block: ElementRef<'_>) -> Result<Offer, ParseError> {
        let price_text = block
            .select(&self.offer_price)
            .next()
            .map(element_text)
            .ok_or(ParseError::MissingPrice)?;
        let (price, currency) = parse_price_text(&price_text)?;

        let seller = block
            .select(&self.offer_seller)
            .next()
            .map(element_text)
            .unwrap_or_default();

        Ok(Offer {
            price,
            currency,
            seller,
        })
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Split "1 299,90 €" into `(1299.90, "€")`.
pub fn parse_price_text(text: &str) -> Result<(Decimal, String), ParseError> {
    let text = text.trim();
    let end = text
        .rfind(|c: char| c.is_ascii_digit())
        .ok_or_else(|| ParseError::Price(text.to_string()))?;
    let (amount, currency) = text.split_at(end + 1);

    let normalized: String = amount
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}'))
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    let price = Decimal::from_str(&normalized).map_err(|_| ParseError::Price(text.to_string()))?;
    Ok((price, currency.trim().to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
