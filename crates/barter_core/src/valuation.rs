//! Item valuation.
//!
//! Sums one side of an offer in scrap. Their items are valued at our buy
//! prices, ours at our sell prices. The key price is read once per call and
//! never carried across offers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogView, Intent, PricingStore};
use crate::currency::format_refined;
use crate::item::{Item, ItemClass, Sku, classify};

// --- Errors --------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValuationError {
    /// The key SKU has no usable price for this intent.
    MissingKeyPrice { intent: Intent },
}

impl fmt::Display for ValuationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValuationError::MissingKeyPrice { intent } => {
                write!(f, "no {} price for key", intent.as_str())
            }
        }
    }
}

impl std::error::Error for ValuationError {}

// --- Valuation -----------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Valuation {
    pub total_scrap: i64,
    /// An item could not be priced. On the sell side this stops valuation.
    pub has_unpriced: bool,
    /// Key value used for this call.
    pub key_scrap: i64,
}

/// Scrap value of one key for `intent`.
pub fn key_price_scrap<S: PricingStore + ?Sized>(
    store: &S,
    intent: Intent,
) -> Result<i64, ValuationError> {
    store
        .price(&Sku::key(), intent)
        .filter(|p| p.is_valid())
        .map(|p| crate::currency::to_scrap(p.metal))
        .filter(|scrap| *scrap > 0)
        .ok_or(ValuationError::MissingKeyPrice { intent })
}

/// Scrap value of an already-classified item. Zero when unpriced.
pub fn item_value<S: PricingStore + ?Sized>(
    class: &ItemClass,
    intent: Intent,
    store: &S,
    key_scrap: i64,
) -> i64 {
    match class {
        ItemClass::Foreign | ItemClass::Unlisted => 0,
        ItemClass::Key => key_scrap,
        ItemClass::Metal(grade) => grade.value_scrap(),
        ItemClass::Listed(_) | ItemClass::Bucketed => class
            .pricing_sku()
            .and_then(|sku| store.price(&sku, intent))
            .filter(|p| p.is_valid())
            .map(|p| p.to_scrap(key_scrap))
            .unwrap_or(0),
    }
}

/// Total value of `items` for `intent`.
pub fn valuate<S: PricingStore + ?Sized>(
    items: &[Item],
    intent: Intent,
    view: &CatalogView<'_, S>,
) -> Result<Valuation, ValuationError> {
    let key_scrap = key_price_scrap(view.store(), intent)?;
    let mut total_scrap = 0;

    for item in items {
        let class = classify(item, view);
        if class == ItemClass::Foreign {
            if intent == Intent::Sell {
                tracing::warn!(asset_id = %item.asset_id, "foreign item on our side");
                return Ok(Valuation {
                    total_scrap,
                    has_unpriced: true,
                    key_scrap,
                });
            }
            continue;
        }

        let value = item_value(&class, intent, view.store(), key_scrap);
        tracing::debug!(
            asset_id = %item.asset_id,
            sku = %item.sku,
            class = class.label(),
            value_scrap = value,
            "valued item"
        );
        if value == 0 && intent == Intent::Sell {
            tracing::warn!(sku = %item.sku, "unpriced item on our side");
            return Ok(Valuation {
                total_scrap,
                has_unpriced: true,
                key_scrap,
            });
        }
        total_scrap += value;
    }

    Ok(Valuation {
        total_scrap,
        has_unpriced: false,
        key_scrap,
    })
}

// --- Summary -------------------------------------------------------------

/// Both sides of a decision, in scrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValuationSummary {
    pub their_scrap: i64,
    pub our_scrap: i64,
}

impl ValuationSummary {
    pub fn new(their_scrap: i64, our_scrap: i64) -> Self {
        Self {
            their_scrap,
            our_scrap,
        }
    }

    /// Positive when they overpay.
    pub fn difference_scrap(&self) -> i64 {
        self.their_scrap - self.our_scrap
    }

    pub fn line(&self) -> String {
        format!(
            "Their value: {} ref, our value: {} ref, difference: {} ref",
            format_refined(self.their_scrap),
            format_refined(self.our_scrap),
            format_refined(self.difference_scrap())
        )
    }
}

impl fmt::Display for ValuationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line())
    }
}
