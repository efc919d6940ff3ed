//! Batch runner.
//!
//! Walks the catalog in order, one product at a time. Each product yields a
//! `Result<ProductOutcome, ProductError>`; every error except a challenge
//! page is logged and the loop moves on. A challenge page ends the batch
//! cleanly, because every further request would be answered the same way.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::executor::UpdateExecutor;
use super::offers::OfferAggregator;
use super::pricing::{PriceDecisionEngine, PricingPolicy};
use super::scanner::{MarketScanner, Resolution};
use crate::catalog::{CatalogClient, SessionToken};
use crate::config::AppConfig;
use crate::market::PageFetcher;
use crate::types::{Decision, ParseError, Product, RankedOfferSet, UpdateOutcome};

// ---------------------------------------------------------------------------
// Per-product results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ProductOutcome {
    /// The engine decided not to touch the price.
    NoChange(Decision),
    /// An update was proposed and handed to the executor.
    Updated {
        decision: Decision,
        outcome: UpdateOutcome,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ProductError {
    #[error("challenge page served by the aggregator")]
    ChallengeDetected,

    #[error("product URL has not been found")]
    NotFound,

    #[error("error parsing product offers: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

// ---------------------------------------------------------------------------
// Run report
// ---------------------------------------------------------------------------

/// Summary of one pass over the catalog.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub products_listed: usize,
    /// Products that went through the pipeline (whatever the result).
    pub evaluated: usize,
    pub applied: usize,
    pub rejected: usize,
    pub disabled: usize,
    pub no_change: usize,
    pub not_found: usize,
    pub parse_failures: usize,
    pub errors: usize,
    /// Products left untouched because a challenge page ended the run.
    pub skipped: usize,
    pub aborted_by_challenge: bool,
}

impl RunReport {
    fn new(products_listed: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            products_listed,
            evaluated: 0,
            applied: 0,
            rejected: 0,
            disabled: 0,
            no_change: 0,
            not_found: 0,
            parse_failures: 0,
            errors: 0,
            skipped: 0,
            aborted_by_challenge: false,
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Run {}: listed={} evaluated={} applied={} rejected={} disabled={} unchanged={} \
             not_found={} parse_failures={} errors={} skipped={}{}",
            self.run_id,
            self.products_listed,
            self.evaluated,
            self.applied,
            self.rejected,
            self.disabled,
            self.no_change,
            self.not_found,
            self.parse_failures,
            self.errors,
            self.skipped,
            if self.aborted_by_challenge { " (aborted: challenge page)" } else { "" },
        )
    }
}

// ---------------------------------------------------------------------------
// Repricer
// ---------------------------------------------------------------------------

/// Ties scanner → aggregator → engine → executor together.
pub struct Repricer {
    scanner: MarketScanner,
    aggregator: OfferAggregator,
    engine: PriceDecisionEngine,
    executor: UpdateExecutor,
    max_products: Option<usize>,
}

impl Repricer {
    pub fn new(
        scanner: MarketScanner,
        aggregator: OfferAggregator,
        engine: PriceDecisionEngine,
        executor: UpdateExecutor,
        max_products: Option<usize>,
    ) -> Self {
        Self {
            scanner,
            aggregator,
            engine,
            executor,
            max_products,
        }
    }

    /// Wire up all components from configuration and an open session.
    pub fn from_config(
        cfg: &AppConfig,
        fetcher: Arc<dyn PageFetcher>,
        catalog: Arc<dyn CatalogClient>,
        token: SessionToken,
    ) -> Result<Self> {
        Ok(Self::new(
            MarketScanner::new(fetcher, &cfg.market)?,
            OfferAggregator::new(&cfg.market.selectors, &cfg.general.shop_name)?,
            PriceDecisionEngine::new(PricingPolicy::from_config(cfg)),
            UpdateExecutor::new(catalog, token, cfg.general.price_update_enabled),
            cfg.general.max_products,
        ))
    }

    /// Evaluate the catalog in order.
    pub async fn run(&self, products: &[Product]) -> RunReport {
        let mut report = RunReport::new(products.len());
        let span = info_span!("run", run_id = %report.run_id);
        self.run_batch(products, &mut report).instrument(span).await;
        report.finished_at = Some(Utc::now());
        report
    }

    async fn run_batch(&self, products: &[Product], report: &mut RunReport) {
        let batch = match self.max_products {
            Some(limit) if limit < products.len() => {
                info!(limit, listed = products.len(), "Evaluating a limited batch");
                &products[..limit]
            }
            _ => products,
        };

        info!(
            products = batch.len(),
            updates_enabled = self.executor.is_enabled(),
            "Starting"
        );

        for (index, product) in batch.iter().enumerate() {
            let span = info_span!("product", id = %product.product_id);
            let result = self.process_product(product).instrument(span).await;

            if let Err(ProductError::ChallengeDetected) = result {
                warn!(
                    product = %product.label(),
                    remaining = batch.len() - index,
                    "Challenge page has occurred, stopping the batch"
                );
                report.aborted_by_challenge = true;
                report.skipped = batch.len() - index;
                break;
            }

            report.evaluated += 1;
            match result {
                Ok(ProductOutcome::NoChange(_)) => report.no_change += 1,
                Ok(ProductOutcome::Updated { outcome, .. }) => match outcome {
                    UpdateOutcome::Applied => report.applied += 1,
                    UpdateOutcome::Rejected => report.rejected += 1,
                    UpdateOutcome::Disabled => report.disabled += 1,
                },
                Err(ProductError::NotFound) => {
                    error!(product = %product.label(), "URL for product has not been found");
                    report.not_found += 1;
                }
                Err(ProductError::Parse(e)) => {
                    error!(product = %product.label(), error = %e, "Error parsing product offers");
                    report.parse_failures += 1;
                }
                Err(ProductError::Unexpected(e)) => {
                    error!(product = %product.label(), error = format!("{e:#}"), "Product evaluation failed");
                    report.errors += 1;
                }
                Err(ProductError::ChallengeDetected) => {}
            }
        }

        info!("End");
    }

    /// Run the full pipeline for a single product.
    pub async fn process_product(&self, product: &Product) -> Result<ProductOutcome, ProductError> {
        let handle = match self.scanner.resolve(&product.name).await? {
            Resolution::Found(handle) => handle,
            Resolution::NotFound => return Err(ProductError::NotFound),
            Resolution::ChallengeDetected => return Err(ProductError::ChallengeDetected),
        };

        let html = self.scanner.fetch_detail(&handle).await?;
        let offers = self.aggregator.parse(&html)?;
        let decision = self.engine.decide(product, &offers);
        self.log_market(product, &offers, &decision);

        match decision.update_to() {
            Some(new_price) => {
                let outcome = self.executor.apply(product, new_price).await?;
                Ok(ProductOutcome::Updated { decision, outcome })
            }
            None => {
                info!(
                    product = %product.label(),
                    current = format!("{:.2}", decision.current_price),
                    proposed = ?decision.proposed_price,
                    "No price change: {}",
                    decision.rationale
                );
                Ok(ProductOutcome::NoChange(decision))
            }
        }
    }

    fn log_market(&self, product: &Product, offers: &RankedOfferSet, decision: &Decision) {
        let shop = self.engine.policy().shop_name.as_str();
        let Some(best) = offers.best() else {
            return;
        };

        info!(
            product = %product.label(),
            best = %best,
            min_accepted = format!("{:.2}", decision.min_accepted_price),
            limit = format!("{:.2}", decision.undercut_amount),
            "Best price found"
        );

        if offers.is_best_seller(shop) {
            if let Some(second) = offers.second_best() {
                info!(product = %product.label(), second = %second, "Second best price");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
