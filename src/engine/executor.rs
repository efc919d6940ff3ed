//! Price update executor.
//!
//! Pushes approved prices to the catalog. With price updates disabled the
//! executor only logs what it would have done and never touches the
//! network, so a staging run is distinguishable from a rejected update.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::catalog::{CatalogClient, SessionToken};
use crate::types::{Product, UpdateOutcome};

pub struct UpdateExecutor {
    catalog: Arc<dyn CatalogClient>,
    token: SessionToken,
    enabled: bool,
}

impl UpdateExecutor {
    pub fn new(catalog: Arc<dyn CatalogClient>, token: SessionToken, enabled: bool) -> Self {
        Self {
            catalog,
            token,
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Apply a new price to one product. Not retried.
    pub async fn apply(&self, product: &Product, new_price: Decimal) -> Result<UpdateOutcome> {
        info!(
            product = %product.label(),
            from = format!("{:.2}", product.effective_price()),
            to = format!("{:.2}", new_price),
            "Price changing"
        );

        if !self.enabled {
            warn!(product = %product.label(), "[DRY RUN] Price update is disabled");
            return Ok(UpdateOutcome::Disabled);
        }

        let ack = self
            .catalog
            .update_price(&self.token, &product.product_id, new_price)
            .await
            .with_context(|| format!("Price update for {} failed", product.label()))?;

        if ack.success {
            info!(product = %product.label(), "Price update has been successful");
            Ok(UpdateOutcome::Applied)
        } else {
            error!(product = %product.label(), "Price update has been unsuccessful");
            Ok(UpdateOutcome::Rejected)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
