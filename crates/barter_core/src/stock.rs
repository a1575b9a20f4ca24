//! Stock ceiling guard.
//!
//! Aggregates incoming items by pricing SKU and rejects when any capped SKU
//! would end above its ceiling. Pure currency and foreign items are exempt.
//! Craft hats without their own listing count against the bucket SKU, same as
//! valuation.

use std::collections::BTreeMap;

use crate::catalog::{CatalogView, PricingStore};
use crate::item::{Item, ItemClass, Sku, classify};
use crate::telemetry::emit_metric_line;

// --- Result --------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockBreach {
    pub sku: Sku,
    pub in_stock: u32,
    pub incoming: u32,
    pub max_stock: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockGuardResult {
    Allowed,
    Rejected(StockBreach),
}

// --- Metrics -------------------------------------------------------------

#[derive(Debug)]
pub struct StockGuardMetrics {
    allowed_total: u64,
    rejected_total: u64,
}

impl StockGuardMetrics {
    pub fn new() -> Self {
        Self {
            allowed_total: 0,
            rejected_total: 0,
        }
    }

    fn record_allowed(&mut self) {
        self.allowed_total += 1;
    }

    fn record_rejected(&mut self) {
        self.rejected_total += 1;
    }

    pub fn allowed_total(&self) -> u64 {
        self.allowed_total
    }

    pub fn rejected_total(&self) -> u64 {
        self.rejected_total
    }
}

impl Default for StockGuardMetrics {
    fn default() -> Self {
        Self::new()
    }
}

// --- Guard ---------------------------------------------------------------

/// Unit count per pricing SKU, pure currency and foreign items excluded.
pub fn count_by_pricing_sku<S: PricingStore + ?Sized>(
    items: &[Item],
    view: &CatalogView<'_, S>,
) -> BTreeMap<Sku, u32> {
    let mut counts = BTreeMap::new();
    for item in items {
        let sku = match classify(item, view) {
            ItemClass::Foreign | ItemClass::Key | ItemClass::Metal(_) => continue,
            ItemClass::Bucketed => Sku::craft_hat_bucket(),
            ItemClass::Listed(sku) => sku,
            ItemClass::Unlisted => item.sku.clone(),
        };
        *counts.entry(sku).or_insert(0u32) += 1;
    }
    counts
}

/// Check `incoming` against every finite ceiling.
pub fn evaluate_stock_ceiling<S: PricingStore + ?Sized>(
    incoming: &[Item],
    view: &CatalogView<'_, S>,
    metrics: &mut StockGuardMetrics,
) -> StockGuardResult {
    for (sku, incoming) in count_by_pricing_sku(incoming, view) {
        let level = view.store().stock(&sku);
        let Some(max_stock) = level.ceiling() else {
            continue;
        };
        if u64::from(level.in_stock) + u64::from(incoming) > u64::from(max_stock) {
            metrics.record_rejected();
            emit_metric_line(
                "stock_guard_total",
                &format!(
                    "result=rejected sku={sku} in_stock={} incoming={incoming} max_stock={max_stock}",
                    level.in_stock
                ),
            );
            return StockGuardResult::Rejected(StockBreach {
                sku,
                in_stock: level.in_stock,
                incoming,
                max_stock,
            });
        }
    }
    metrics.record_allowed();
    emit_metric_line("stock_guard_total", "result=allowed");
    StockGuardResult::Allowed
}

/// `true` when accepting `incoming` would push any capped SKU past its ceiling.
pub fn exceeds_ceiling<S: PricingStore + ?Sized>(
    incoming: &[Item],
    view: &CatalogView<'_, S>,
) -> bool {
    let mut metrics = StockGuardMetrics::new();
    matches!(
        evaluate_stock_ceiling(incoming, view, &mut metrics),
        StockGuardResult::Rejected(_)
    )
}
