#![allow(dead_code)]

use std::collections::HashMap;

use barter_core::catalog::{Intent, Price, PricingStore, StockLevel};
use barter_core::item::{Item, KEY_SKU, RECLAIMED_SKU, REFINED_SKU, SCRAP_SKU, Sku};
use barter_core::offer::{Offer, OfferId, OfferState, PartnerId};

/// In-memory catalog for tests.
#[derive(Default)]
pub struct FixtureCatalog {
    prices: HashMap<Sku, (Price, Price)>,
    stock: HashMap<Sku, StockLevel>,
}

impl FixtureCatalog {
    /// Key at buy 50.00 / sell 52.00 ref.
    pub fn with_key() -> Self {
        Self::default().priced(KEY_SKU, Price::metal(50.0), Price::metal(52.0))
    }

    pub fn priced(mut self, sku: &str, buy: Price, sell: Price) -> Self {
        self.prices.insert(Sku::new(sku), (buy, sell));
        self
    }

    pub fn stocked(mut self, sku: &str, in_stock: u32, max_stock: i32) -> Self {
        self.stock
            .insert(Sku::new(sku), StockLevel { in_stock, max_stock });
        self
    }
}

impl PricingStore for FixtureCatalog {
    fn price(&self, sku: &Sku, intent: Intent) -> Option<Price> {
        self.prices.get(sku).map(|(buy, sell)| match intent {
            Intent::Buy => *buy,
            Intent::Sell => *sell,
        })
    }

    fn has_price(&self, sku: &Sku) -> bool {
        self.prices.contains_key(sku)
    }

    fn stock(&self, sku: &Sku) -> StockLevel {
        self.stock.get(sku).copied().unwrap_or_default()
    }

    fn skus(&self) -> Vec<Sku> {
        self.prices.keys().cloned().collect()
    }
}

pub fn items(prefix: &str, sku: &str, n: usize) -> Vec<Item> {
    (0..n)
        .map(|i| Item::new(format!("{prefix}{i}"), sku))
        .collect()
}

pub fn keys(prefix: &str, n: usize) -> Vec<Item> {
    items(prefix, KEY_SKU, n)
}

pub fn refined(prefix: &str, n: usize) -> Vec<Item> {
    items(prefix, REFINED_SKU, n)
}

pub fn reclaimed(prefix: &str, n: usize) -> Vec<Item> {
    items(prefix, RECLAIMED_SKU, n)
}

pub fn scrap(prefix: &str, n: usize) -> Vec<Item> {
    items(prefix, SCRAP_SKU, n)
}

pub fn offer(id: &str, their_items: Vec<Item>, our_items: Vec<Item>) -> Offer {
    Offer {
        offer_id: OfferId::new(id),
        partner_id: PartnerId::new("76561198000000001"),
        their_items,
        our_items,
        state: OfferState::Active,
        is_ours: false,
        message: None,
    }
}
