//! Price decision engine.
//!
//! Given a product and the ranked offers for it, decides whether the
//! product's price should move and to what. The minimum accepted price
//!
//!   min = reference × (1 + vat_rate) × (1 + minimum_discount)
//!
//! is a hard floor: no proposal below it ever leaves this module.

use rust_decimal::Decimal;
use tracing::debug;

use crate::config::AppConfig;
use crate::types::{round_price, Decision, Product, RankedOfferSet, Rationale};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Run-wide pricing parameters.
#[derive(Debug, Clone)]
pub struct PricingPolicy {
    /// Seller name identifying the merchant's own offer.
    pub shop_name: String,
    pub vat_rate: Decimal,
    pub minimum_discount: Decimal,
    /// Default amount to go under a competitor's price.
    pub under_best_price_amount: Decimal,
}

impl PricingPolicy {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            shop_name: cfg.general.shop_name.clone(),
            vat_rate: cfg.pricing.vat_rate,
            minimum_discount: cfg.pricing.minimum_discount,
            under_best_price_amount: cfg.pricing.under_best_price_amount,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct PriceDecisionEngine {
    policy: PricingPolicy,
}

impl PriceDecisionEngine {
    pub fn new(policy: PricingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PricingPolicy {
        &self.policy
    }

    /// Floor below which no price is proposed. Zero without a reference
    /// price, `None` when the reference is too large to compute with.
    pub fn min_accepted_price(&self, product: &Product) -> Option<Decimal> {
        let vat = Decimal::ONE.checked_add(self.policy.vat_rate)?;
        let discount = Decimal::ONE.checked_add(self.policy.minimum_discount)?;
        product
            .reference_price
            .unwrap_or(Decimal::ZERO)
            .checked_mul(vat)?
            .checked_mul(discount)
    }

    /// Per-product override when set and non-negative, else the run default.
    pub fn undercut_amount(&self, product: &Product) -> Decimal {
        match product.price_floor_override {
            Some(amount) if amount >= Decimal::ZERO => amount,
            _ => self.policy.under_best_price_amount,
        }
    }

    /// Evaluate one product against its competitors.
    pub fn decide(&self, product: &Product, offers: &RankedOfferSet) -> Decision {
        let shop = self.policy.shop_name.as_str();
        let floor = self.min_accepted_price(product);
        let mut decision = Decision {
            product_id: product.product_id.clone(),
            current_price: product.effective_price(),
            proposed_price: None,
            min_accepted_price: floor.unwrap_or(Decimal::ZERO),
            undercut_amount: self.undercut_amount(product),
            rationale: Rationale::OfferMissing,
        };

        if !offers.has_seller(shop) {
            return decision;
        }

        if product.reference_price.unwrap_or(Decimal::ZERO) <= Decimal::ZERO {
            decision.rationale = Rationale::ReferencePriceNotSet;
            return decision;
        }

        if floor.is_none() {
            decision.rationale = Rationale::ReferencePriceOutOfRange;
            return decision;
        }

        // Holding the best offer means reacting to the runner-up instead.
        let reference_offer = if offers.is_best_seller(shop) {
            match offers.second_best() {
                Some(offer) => offer,
                None => {
                    decision.rationale = Rationale::NoSecondOffer;
                    return decision;
                }
            }
        } else {
            match offers.best() {
                Some(offer) => offer,
                None => return decision,
            }
        };

        let candidate = round_price(reference_offer.price - decision.undercut_amount);

        debug!(
            product_id = %product.product_id,
            against = %reference_offer,
            candidate = %candidate,
            floor = %decision.min_accepted_price,
            "Candidate price computed"
        );

        if candidate < decision.min_accepted_price {
            decision.rationale = Rationale::BelowFloor { candidate };
        } else if candidate == decision.current_price {
            decision.proposed_price = Some(candidate);
            decision.rationale = Rationale::PriceUnchanged;
        } else {
            decision.proposed_price = Some(candidate);
            decision.rationale = Rationale::Update;
        }

        decision
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
