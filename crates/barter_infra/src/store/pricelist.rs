//! In-memory pricelist.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use barter_core::catalog::{Intent, Price, PricingStore, StockLevel, UNLIMITED_STOCK};
use barter_core::item::Sku;
use serde::{Deserialize, Serialize};

use super::lock;
use crate::collaborators::{CatalogStore, CatalogWriteError};

fn unlimited() -> i32 {
    UNLIMITED_STOCK
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub sku: Sku,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub buy: Option<Price>,
    #[serde(default)]
    pub sell: Option<Price>,
    #[serde(default)]
    pub in_stock: u32,
    /// `-1` for unlimited.
    #[serde(default = "unlimited")]
    pub max_stock: i32,
    /// Prices follow the price feed.
    #[serde(default)]
    pub autoprice: bool,
}

impl CatalogEntry {
    pub fn new(sku: impl Into<Sku>, buy: Price, sell: Price) -> Self {
        Self {
            sku: sku.into(),
            name: String::new(),
            buy: Some(buy),
            sell: Some(sell),
            in_stock: 0,
            max_stock: UNLIMITED_STOCK,
            autoprice: false,
        }
    }

    pub fn with_stock(mut self, in_stock: u32, max_stock: i32) -> Self {
        self.in_stock = in_stock;
        self.max_stock = max_stock;
        self
    }

    pub fn autopriced(mut self) -> Self {
        self.autoprice = true;
        self
    }
}

#[derive(Debug, Default)]
pub struct Pricelist {
    entries: Mutex<BTreeMap<Sku, CatalogEntry>>,
}

impl Pricelist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        Self {
            entries: Mutex::new(entries.into_iter().map(|e| (e.sku.clone(), e)).collect()),
        }
    }

    /// Load a JSON array of entries.
    pub fn load_json(path: impl AsRef<Path>) -> io::Result<Self> {
        let raw = fs::read_to_string(path)?;
        let entries: Vec<CatalogEntry> = serde_json::from_str(&raw)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(Self::from_entries(entries))
    }

    pub fn upsert(&self, entry: CatalogEntry) {
        lock(&self.entries).insert(entry.sku.clone(), entry);
    }

    pub fn remove(&self, sku: &Sku) -> Option<CatalogEntry> {
        lock(&self.entries).remove(sku)
    }

    pub fn entry(&self, sku: &Sku) -> Option<CatalogEntry> {
        lock(&self.entries).get(sku).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PricingStore for Pricelist {
    fn price(&self, sku: &Sku, intent: Intent) -> Option<Price> {
        let entries = lock(&self.entries);
        let entry = entries.get(sku)?;
        match intent {
            Intent::Buy => entry.buy,
            Intent::Sell => entry.sell,
        }
    }

    fn has_price(&self, sku: &Sku) -> bool {
        lock(&self.entries)
            .get(sku)
            .is_some_and(|e| e.buy.is_some() && e.sell.is_some())
    }

    fn stock(&self, sku: &Sku) -> StockLevel {
        lock(&self.entries)
            .get(sku)
            .map(|e| StockLevel {
                in_stock: e.in_stock,
                max_stock: e.max_stock,
            })
            .unwrap_or_default()
    }

    fn skus(&self) -> Vec<Sku> {
        lock(&self.entries).keys().cloned().collect()
    }
}

impl CatalogStore for Pricelist {
    fn is_autopriced(&self, sku: &Sku) -> bool {
        lock(&self.entries).get(sku).is_some_and(|e| e.autoprice)
    }

    fn update_price(&self, sku: &Sku, buy: Price, sell: Price) -> Result<(), CatalogWriteError> {
        for price in [buy, sell] {
            if !price.is_valid() {
                return Err(CatalogWriteError::InvalidPrice {
                    sku: sku.clone(),
                    reason: "metal must be finite and non-negative",
                });
            }
        }
        let mut entries = lock(&self.entries);
        let entry = entries
            .get_mut(sku)
            .ok_or_else(|| CatalogWriteError::NotListed(sku.clone()))?;
        if !entry.autoprice {
            return Err(CatalogWriteError::NotAutopriced(sku.clone()));
        }
        entry.buy = Some(buy);
        entry.sell = Some(sell);
        Ok(())
    }

    fn set_stock(&self, counts: &BTreeMap<Sku, u32>) {
        let mut entries = lock(&self.entries);
        for (sku, entry) in entries.iter_mut() {
            entry.in_stock = counts.get(sku).copied().unwrap_or(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_entries_reject_feed_updates() {
        let list = Pricelist::from_entries([CatalogEntry::new(
            "378;6",
            Price::metal(1.0),
            Price::metal(1.11),
        )]);
        let sku = Sku::new("378;6");
        assert_eq!(
            list.update_price(&sku, Price::metal(2.0), Price::metal(2.11)),
            Err(CatalogWriteError::NotAutopriced(sku.clone()))
        );
        assert_eq!(list.price(&sku, Intent::Buy), Some(Price::metal(1.0)));
    }

    #[test]
    fn entries_deserialize_with_defaults() {
        let raw = r#"[{"sku":"5021;6","buy":{"keys":0,"metal":50.0},"sell":{"keys":0,"metal":52.0}}]"#;
        let entries: Vec<CatalogEntry> = serde_json::from_str(raw).unwrap();
        assert_eq!(entries[0].max_stock, UNLIMITED_STOCK);
        assert!(!entries[0].autoprice);
    }
}
