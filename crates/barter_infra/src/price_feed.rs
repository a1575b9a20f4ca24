//! Price feed into the catalog.
//!
//! Updates travel over a bounded channel to a single [`PriceFeed`] task, the
//! only writer of catalog prices. Only autopriced SKUs accept updates. The
//! [`WarmupGate`] opens once the first full price pass has been applied; the
//! engine evaluates nothing before that.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use barter_core::catalog::Price;
use barter_core::item::Sku;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};

use crate::collaborators::{CatalogStore, CatalogWriteError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub sku: Sku,
    pub buy: Option<Price>,
    pub sell: Option<Price>,
}

impl PriceUpdate {
    pub fn new(sku: impl Into<Sku>, buy: Price, sell: Price) -> Self {
        Self {
            sku: sku.into(),
            buy: Some(buy),
            sell: Some(sell),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PriceUpdateError {
    #[error("price update for {0} is missing a side")]
    MissingSide(Sku),
    #[error(transparent)]
    Catalog(#[from] CatalogWriteError),
    #[error("price feed channel is full")]
    Full,
    #[error("price feed is closed")]
    Closed,
}

// --- Gate ----------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct WarmupGate {
    rx: watch::Receiver<bool>,
}

impl WarmupGate {
    /// Already open. For engines whose catalog needs no warm-up.
    pub fn open() -> Self {
        let (_tx, rx) = watch::channel(true);
        Self { rx }
    }

    pub fn is_ready(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for the first price pass. `false` if the feed went away first.
    pub async fn wait_ready(&self) -> bool {
        let mut rx = self.rx.clone();
        rx.wait_for(|ready| *ready).await.is_ok()
    }
}

// --- Sender --------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PriceFeedSender {
    tx: mpsc::Sender<PriceUpdate>,
}

impl PriceFeedSender {
    pub async fn publish(&self, update: PriceUpdate) -> Result<(), PriceUpdateError> {
        self.tx
            .send(update)
            .await
            .map_err(|_| PriceUpdateError::Closed)
    }

    /// Non-blocking publish; a full channel is reported, not awaited.
    pub fn try_publish(&self, update: PriceUpdate) -> Result<(), PriceUpdateError> {
        self.tx.try_send(update).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => PriceUpdateError::Full,
            mpsc::error::TrySendError::Closed(_) => PriceUpdateError::Closed,
        })
    }
}

// --- Feed ----------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WarmupReport {
    pub applied: usize,
    pub skipped: usize,
    pub rejected: usize,
}

#[derive(Debug, Default)]
pub struct PriceFeedMetrics {
    applied_total: AtomicU64,
    skipped_total: AtomicU64,
    rejected_total: AtomicU64,
}

impl PriceFeedMetrics {
    /// Updates written to autopriced entries.
    pub fn applied_total(&self) -> u64 {
        self.applied_total.load(Ordering::Relaxed)
    }

    /// Updates for unlisted or manually priced SKUs.
    pub fn skipped_total(&self) -> u64 {
        self.skipped_total.load(Ordering::Relaxed)
    }

    /// Malformed updates or catalog write failures.
    pub fn rejected_total(&self) -> u64 {
        self.rejected_total.load(Ordering::Relaxed)
    }
}

pub struct PriceFeed {
    rx: mpsc::Receiver<PriceUpdate>,
    catalog: Arc<dyn CatalogStore>,
    ready: watch::Sender<bool>,
    metrics: PriceFeedMetrics,
}

/// Build the bounded channel, the consuming feed and its warm-up gate.
pub fn price_feed(
    capacity: usize,
    catalog: Arc<dyn CatalogStore>,
) -> (PriceFeedSender, PriceFeed, WarmupGate) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let (ready, ready_rx) = watch::channel(false);
    let feed = PriceFeed {
        rx,
        catalog,
        ready,
        metrics: PriceFeedMetrics::default(),
    };
    (PriceFeedSender { tx }, feed, WarmupGate { rx: ready_rx })
}

impl PriceFeed {
    /// Apply one update. `Ok(false)` when the SKU is not autopriced.
    pub fn apply(&self, update: &PriceUpdate) -> Result<bool, PriceUpdateError> {
        let (Some(buy), Some(sell)) = (update.buy, update.sell) else {
            self.metrics.rejected_total.fetch_add(1, Ordering::Relaxed);
            return Err(PriceUpdateError::MissingSide(update.sku.clone()));
        };
        if !self.catalog.is_autopriced(&update.sku) {
            self.metrics.skipped_total.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(sku = %update.sku, "ignoring price for manually priced sku");
            return Ok(false);
        }
        if let Err(err) = self.catalog.update_price(&update.sku, buy, sell) {
            self.metrics.rejected_total.fetch_add(1, Ordering::Relaxed);
            return Err(err.into());
        }
        self.metrics.applied_total.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            sku = %update.sku,
            buy_keys = buy.keys,
            buy_metal = buy.metal,
            sell_keys = sell.keys,
            sell_metal = sell.metal,
            "price updated"
        );
        Ok(true)
    }

    /// Apply the initial full price pass, then open the gate.
    pub fn warm_up(&self, snapshot: &[PriceUpdate]) -> WarmupReport {
        let mut report = WarmupReport::default();
        for update in snapshot {
            match self.apply(update) {
                Ok(true) => report.applied += 1,
                Ok(false) => report.skipped += 1,
                Err(err) => {
                    report.rejected += 1;
                    tracing::warn!(sku = %update.sku, %err, "rejected price during warm-up");
                }
            }
        }
        self.ready.send_replace(true);
        tracing::info!(
            applied = report.applied,
            skipped = report.skipped,
            rejected = report.rejected,
            "price warm-up complete"
        );
        report
    }

    pub fn gate(&self) -> WarmupGate {
        WarmupGate {
            rx: self.ready.subscribe(),
        }
    }

    pub fn metrics(&self) -> &PriceFeedMetrics {
        &self.metrics
    }

    /// Drain updates until every sender is dropped.
    pub async fn run(mut self) {
        while let Some(update) = self.rx.recv().await {
            if let Err(err) = self.apply(&update) {
                tracing::warn!(sku = %update.sku, %err, "rejected price update");
            }
        }
        tracing::info!("price feed closed");
    }
}
