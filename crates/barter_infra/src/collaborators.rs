//! External collaborators consumed by the engine.
//!
//! Every call through these traits is a suspension point. Implementations are
//! expected to make each platform action safe to retry.

use std::collections::BTreeMap;

use async_trait::async_trait;
use barter_core::catalog::{Price, PricingStore};
use barter_core::item::{Item, ItemAttributes, Sku};
use barter_core::offer::{Offer, OfferId, PartnerId};
use barter_core::policy::CounterOffer;

// --- Errors --------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    /// Timeouts, rate limits, platform hiccups. Safe to retry.
    #[error("transient platform error: {0}")]
    Transient(String),
    /// The platform refused the request; retrying will not help.
    #[error("platform rejected request: {0}")]
    Rejected(String),
}

impl PlatformError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlatformError::Transient(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InventoryError {
    #[error("inventory unavailable for {0}")]
    Unavailable(String),
    #[error("inventory for {0} is private")]
    Private(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogWriteError {
    #[error("{0} is not listed")]
    NotListed(Sku),
    #[error("{0} is not autopriced")]
    NotAutopriced(Sku),
    #[error("invalid price for {sku}: {reason}")]
    InvalidPrice { sku: Sku, reason: &'static str },
}

// --- Receipt -------------------------------------------------------------

/// One item we received, as reported after the trade completed.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedItem {
    /// Asset id the item had in the offer.
    pub original_asset_id: String,
    /// Asset id it now has in our inventory.
    pub new_asset_id: String,
    pub attributes: ItemAttributes,
}

/// Post-trade receipt for an accepted offer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TradeReceipt {
    pub received: Vec<ReceivedItem>,
}

// --- Traits --------------------------------------------------------------

#[async_trait]
pub trait PlatformTransport: Send + Sync {
    async fn accept(&self, offer_id: &OfferId) -> Result<(), PlatformError>;

    async fn decline(&self, offer_id: &OfferId) -> Result<(), PlatformError>;

    async fn cancel(&self, offer_id: &OfferId) -> Result<(), PlatformError>;

    /// Replace `offer_id` with a counter offer; returns the new offer id.
    async fn counter(
        &self,
        offer_id: &OfferId,
        counter: &CounterOffer,
    ) -> Result<OfferId, PlatformError>;

    /// Whether trades with `partner` would be held in escrow.
    async fn trade_hold(&self, partner: &PartnerId) -> Result<bool, PlatformError>;

    async fn receipt(&self, offer_id: &OfferId) -> Result<TradeReceipt, PlatformError>;

    async fn notify(&self, partner: &PartnerId, message: &str) -> Result<(), PlatformError>;
}

#[async_trait]
pub trait InventoryProvider: Send + Sync {
    async fn our_inventory(&self) -> Result<Vec<Item>, InventoryError>;

    async fn fetch_their_inventory(&self, partner: &PartnerId) -> Result<Vec<Item>, InventoryError>;
}

#[async_trait]
pub trait ReputationCheck: Send + Sync {
    async fn is_banned(&self, partner: &PartnerId) -> Result<bool, PlatformError>;
}

#[async_trait]
pub trait ArbitrageDesk: Send + Sync {
    /// Take over `offer`. The engine does nothing further with it.
    async fn route(&self, offer: &Offer, sku: &Sku);
}

/// Pricing store with the writes the engine and price feed perform.
///
/// Prices are written only by the price feed, stock only after a confirmed
/// trade.
pub trait CatalogStore: PricingStore + Send + Sync {
    fn is_autopriced(&self, sku: &Sku) -> bool;

    fn update_price(&self, sku: &Sku, buy: Price, sell: Price) -> Result<(), CatalogWriteError>;

    /// Replace `in_stock` for every listed SKU. Listed SKUs absent from
    /// `counts` drop to zero.
    fn set_stock(&self, counts: &BTreeMap<Sku, u32>);
}
