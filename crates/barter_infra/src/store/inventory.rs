//! Local snapshot of our inventory.
//!
//! Mutated only after a trade is confirmed (receipt reconciliation) or when
//! the whole snapshot is refreshed from the inventory provider.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use barter_core::catalog::{CatalogView, PricingStore};
use barter_core::item::{Item, Sku};
use barter_core::stock::count_by_pricing_sku;

use super::lock;
use crate::collaborators::TradeReceipt;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// A received item has no entry in the receipt.
    #[error("received asset {0} missing from trade receipt")]
    UnmappedItem(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    pub removed: usize,
    pub added: usize,
}

#[derive(Debug, Default)]
pub struct InventoryBook {
    items: Mutex<Vec<Item>>,
}

impl InventoryBook {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }

    pub fn replace(&self, items: Vec<Item>) {
        *lock(&self.items) = items;
    }

    pub fn snapshot(&self) -> Vec<Item> {
        lock(&self.items).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop what we sent and add what we received under its new asset id
    /// and a freshly composed SKU. All-or-nothing: an unmapped item leaves
    /// the snapshot untouched.
    pub fn apply_receipt(
        &self,
        sent: &[Item],
        received: &[Item],
        receipt: &TradeReceipt,
    ) -> Result<ReconcileReport, ReconcileError> {
        let mut incoming = Vec::with_capacity(received.len());
        for item in received {
            let mapped = receipt
                .received
                .iter()
                .find(|r| r.original_asset_id == item.asset_id)
                .ok_or_else(|| ReconcileError::UnmappedItem(item.asset_id.clone()))?;
            incoming.push(Item {
                asset_id: mapped.new_asset_id.clone(),
                sku: mapped.attributes.to_sku(),
                craftable: mapped.attributes.craftable,
                ..item.clone()
            });
        }

        let sent_ids: HashSet<&str> = sent.iter().map(|i| i.asset_id.as_str()).collect();
        let mut items = lock(&self.items);
        let before = items.len();
        items.retain(|i| !sent_ids.contains(i.asset_id.as_str()));
        let removed = before - items.len();
        let added = incoming.len();
        items.extend(incoming);
        Ok(ReconcileReport { removed, added })
    }

    /// Tradable units per pricing SKU.
    pub fn stock_counts<S: PricingStore + ?Sized>(
        &self,
        view: &CatalogView<'_, S>,
    ) -> BTreeMap<Sku, u32> {
        let tradable: Vec<Item> = lock(&self.items)
            .iter()
            .filter(|i| i.tradable)
            .cloned()
            .collect();
        count_by_pricing_sku(&tradable, view)
    }
}
