//! Read-only view of the pricing store.
//!
//! The catalog itself lives outside the core; decisions only ever see it
//! through [`PricingStore`]. A [`CatalogView`] captures the listed SKU set
//! once per decision so every component evaluating the same offer agrees on
//! what is listed.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::currency::to_scrap;
use crate::item::Sku;

/// `max_stock` sentinel meaning "no ceiling".
pub const UNLIMITED_STOCK: i32 = -1;

// --- Intent --------------------------------------------------------------

/// Which side of the book a price is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// We acquire the item.
    Buy,
    /// We give the item away.
    Sell,
}

impl Intent {
    /// The counterpart intent.
    pub fn swap(self) -> Self {
        match self {
            Intent::Buy => Intent::Sell,
            Intent::Sell => Intent::Buy,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Buy => "buy",
            Intent::Sell => "sell",
        }
    }
}

// --- Price ---------------------------------------------------------------

/// A catalog price expressed as keys plus refined metal.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Price {
    pub keys: u32,
    /// Refined metal, two-decimal resolution (`1.33` = 1 ref + 1 rec).
    pub metal: f64,
}

impl Price {
    pub fn new(keys: u32, metal: f64) -> Self {
        Self { keys, metal }
    }

    /// Metal-only price.
    pub fn metal(metal: f64) -> Self {
        Self { keys: 0, metal }
    }

    /// Finite and non-negative.
    pub fn is_valid(&self) -> bool {
        self.metal.is_finite() && self.metal >= 0.0
    }

    /// Total value in scrap, given the scrap value of one key.
    pub fn to_scrap(&self, key_scrap: i64) -> i64 {
        i64::from(self.keys) * key_scrap + to_scrap(self.metal)
    }
}

// --- Stock ---------------------------------------------------------------

/// Current holdings and ceiling for one SKU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockLevel {
    pub in_stock: u32,
    /// `-1` ([`UNLIMITED_STOCK`]) means unlimited.
    pub max_stock: i32,
}

impl StockLevel {
    pub fn unlimited(in_stock: u32) -> Self {
        Self {
            in_stock,
            max_stock: UNLIMITED_STOCK,
        }
    }

    pub fn capped(in_stock: u32, max_stock: u32) -> Self {
        Self {
            in_stock,
            max_stock: i32::try_from(max_stock).unwrap_or(i32::MAX),
        }
    }

    /// Finite ceiling, if any. Any negative value is treated as unlimited.
    pub fn ceiling(&self) -> Option<u32> {
        u32::try_from(self.max_stock).ok()
    }
}

impl Default for StockLevel {
    fn default() -> Self {
        Self::unlimited(0)
    }
}

// --- Pricing store -------------------------------------------------------

/// Read access to the pricing store.
///
/// Implementations must answer from their current state on every call;
/// callers never cache prices across offers.
pub trait PricingStore {
    /// Price for `sku` on the `intent` side, `None` when unpriced.
    fn price(&self, sku: &Sku, intent: Intent) -> Option<Price>;

    /// Whether `sku` carries a usable price on both sides.
    fn has_price(&self, sku: &Sku) -> bool;

    /// Holdings and ceiling. Unknown SKUs report `(0, unlimited)`.
    fn stock(&self, sku: &Sku) -> StockLevel;

    /// Every listed SKU.
    fn skus(&self) -> Vec<Sku>;
}

/// A pricing store plus the listed SKU set captured for one decision.
pub struct CatalogView<'a, S: PricingStore + ?Sized> {
    store: &'a S,
    listed: HashSet<Sku>,
    craft_hat_bucket: bool,
}

impl<'a, S: PricingStore + ?Sized> CatalogView<'a, S> {
    /// Snapshot the listed SKUs of `store`.
    pub fn capture(store: &'a S, craft_hat_bucket: bool) -> Self {
        Self {
            listed: store.skus().into_iter().collect(),
            store,
            craft_hat_bucket,
        }
    }

    pub fn store(&self) -> &'a S {
        self.store
    }

    pub fn is_listed(&self, sku: &Sku) -> bool {
        self.listed.contains(sku)
    }

    /// Whether the flag-gated craft-hat fallback bucket is enabled.
    pub fn craft_hat_bucket(&self) -> bool {
        self.craft_hat_bucket
    }

    pub fn listed_len(&self) -> usize {
        self.listed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_to_scrap_combines_keys_and_metal() {
        assert_eq!(Price::new(1, 1.33).to_scrap(450), 462);
        assert_eq!(Price::metal(0.11).to_scrap(450), 1);
        assert_eq!(Price::default().to_scrap(450), 0);
    }

    #[test]
    fn negative_or_nan_metal_is_invalid() {
        assert!(Price::metal(0.0).is_valid());
        assert!(!Price::metal(-0.11).is_valid());
        assert!(!Price::metal(f64::NAN).is_valid());
    }

    #[test]
    fn stock_ceiling_treats_negative_as_unlimited() {
        assert_eq!(StockLevel::unlimited(3).ceiling(), None);
        assert_eq!(StockLevel::capped(3, 5).ceiling(), Some(5));
        let odd = StockLevel {
            in_stock: 0,
            max_stock: -7,
        };
        assert_eq!(odd.ceiling(), None);
    }

    #[test]
    fn intent_swap_is_involutive() {
        assert_eq!(Intent::Buy.swap(), Intent::Sell);
        assert_eq!(Intent::Buy.swap().swap(), Intent::Buy);
    }
}
