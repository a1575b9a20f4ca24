#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use barter_core::catalog::Price;
use barter_core::item::{Item, KEY_SKU, REFINED_SKU, SCRAP_SKU};
use barter_core::lifecycle::RetryPolicy;
use barter_core::offer::{Offer, OfferId, OfferState, PartnerId};
use barter_core::policy::CounterOffer;
use barter_infra::collaborators::{
    InventoryError, InventoryProvider, PlatformError, PlatformTransport, TradeReceipt,
};
use barter_infra::config::{EngineOptions, EngineSettings};
use barter_infra::engine::{Collaborators, OfferEngine};
use barter_infra::price_feed::WarmupGate;
use barter_infra::store::{CatalogEntry, Pricelist, TradeLedger};

pub const PARTNER: &str = "76561198000000001";
pub const HAT_SKU: &str = "200;6";

// --- Platform ------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Accept(OfferId),
    Decline(OfferId),
    Cancel(OfferId),
    Counter(OfferId, Box<CounterOffer>),
    Notify(PartnerId, String),
}

#[derive(Default)]
pub struct FakePlatform {
    calls: Mutex<Vec<Call>>,
    failures: Mutex<VecDeque<PlatformError>>,
    receipts: Mutex<HashMap<OfferId, TradeReceipt>>,
    trade_hold: Mutex<bool>,
    counters_issued: Mutex<u32>,
}

impl FakePlatform {
    /// The next `errors.len()` accept/decline/cancel/counter calls fail, in order.
    pub fn fail_next(&self, errors: impl IntoIterator<Item = PlatformError>) {
        self.failures.lock().unwrap().extend(errors);
    }

    pub fn set_trade_hold(&self, hold: bool) {
        *self.trade_hold.lock().unwrap() = hold;
    }

    pub fn set_receipt(&self, offer_id: &str, receipt: TradeReceipt) {
        self.receipts
            .lock()
            .unwrap()
            .insert(OfferId::new(offer_id), receipt);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Platform actions only, notifications excluded.
    pub fn actions(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::Notify(..)))
            .collect()
    }

    pub fn notifications(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Notify(_, message) => Some(message),
                _ => None,
            })
            .collect()
    }

    fn attempt(&self, call: Call) -> Result<(), PlatformError> {
        self.calls.lock().unwrap().push(call);
        match self.failures.lock().unwrap().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PlatformTransport for FakePlatform {
    async fn accept(&self, offer_id: &OfferId) -> Result<(), PlatformError> {
        self.attempt(Call::Accept(offer_id.clone()))
    }

    async fn decline(&self, offer_id: &OfferId) -> Result<(), PlatformError> {
        self.attempt(Call::Decline(offer_id.clone()))
    }

    async fn cancel(&self, offer_id: &OfferId) -> Result<(), PlatformError> {
        self.attempt(Call::Cancel(offer_id.clone()))
    }

    async fn counter(
        &self,
        offer_id: &OfferId,
        counter: &CounterOffer,
    ) -> Result<OfferId, PlatformError> {
        self.attempt(Call::Counter(offer_id.clone(), Box::new(counter.clone())))?;
        let mut issued = self.counters_issued.lock().unwrap();
        *issued += 1;
        Ok(OfferId::new(format!("counter-{issued}")))
    }

    async fn trade_hold(&self, _partner: &PartnerId) -> Result<bool, PlatformError> {
        Ok(*self.trade_hold.lock().unwrap())
    }

    async fn receipt(&self, offer_id: &OfferId) -> Result<TradeReceipt, PlatformError> {
        self.receipts
            .lock()
            .unwrap()
            .get(offer_id)
            .cloned()
            .ok_or_else(|| PlatformError::Transient("receipt not ready".into()))
    }

    async fn notify(&self, partner: &PartnerId, message: &str) -> Result<(), PlatformError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Notify(partner.clone(), message.to_string()));
        Ok(())
    }
}

// --- Inventory -----------------------------------------------------------

#[derive(Default)]
pub struct FakeInventory {
    pub ours: Mutex<Vec<Item>>,
    pub theirs: Mutex<Vec<Item>>,
}

impl FakeInventory {
    pub fn new(ours: Vec<Item>, theirs: Vec<Item>) -> Self {
        Self {
            ours: Mutex::new(ours),
            theirs: Mutex::new(theirs),
        }
    }
}

#[async_trait]
impl InventoryProvider for FakeInventory {
    async fn our_inventory(&self) -> Result<Vec<Item>, InventoryError> {
        Ok(self.ours.lock().unwrap().clone())
    }

    async fn fetch_their_inventory(&self, partner: &PartnerId) -> Result<Vec<Item>, InventoryError> {
        let theirs = self.theirs.lock().unwrap().clone();
        if theirs.is_empty() {
            return Err(InventoryError::Private(partner.to_string()));
        }
        Ok(theirs)
    }
}

// --- Fixtures ------------------------------------------------------------

/// Key at 50/52 ref and one hat bought at 10, sold at 12 ref.
pub fn pricelist() -> Arc<Pricelist> {
    Arc::new(Pricelist::from_entries([
        CatalogEntry::new(KEY_SKU, Price::metal(50.0), Price::metal(52.0)),
        CatalogEntry::new(HAT_SKU, Price::metal(10.0), Price::metal(12.0)),
    ]))
}

pub fn options() -> EngineOptions {
    EngineOptions {
        account_id: "76561198999999999".into(),
        ..EngineOptions::default()
    }
}

/// Short backoff so paused-clock tests stay readable.
pub fn settings() -> EngineSettings {
    EngineSettings {
        retry: RetryPolicy::new(3, Duration::from_millis(100), 2.0),
        ..EngineSettings::default()
    }
}

pub struct Harness {
    pub engine: OfferEngine,
    pub platform: Arc<FakePlatform>,
    pub inventory: Arc<FakeInventory>,
    pub catalog: Arc<Pricelist>,
}

pub fn harness(options: EngineOptions) -> Harness {
    harness_with(options, settings(), pricelist(), FakeInventory::default())
}

pub fn harness_with(
    options: EngineOptions,
    settings: EngineSettings,
    catalog: Arc<Pricelist>,
    inventory: FakeInventory,
) -> Harness {
    harness_with_ledger(options, settings, catalog, inventory, TradeLedger::new(1000))
}

pub fn harness_with_ledger(
    options: EngineOptions,
    settings: EngineSettings,
    catalog: Arc<Pricelist>,
    inventory: FakeInventory,
    ledger: TradeLedger,
) -> Harness {
    let platform = Arc::new(FakePlatform::default());
    let inventory = Arc::new(inventory);
    let engine = OfferEngine::new(
        Collaborators {
            catalog: catalog.clone(),
            inventory: inventory.clone(),
            platform: platform.clone(),
            reputation: None,
            arbitrage: None,
        },
        options,
        settings,
        WarmupGate::open(),
        ledger,
    )
    .expect("engine construction");
    Harness {
        engine,
        platform,
        inventory,
        catalog,
    }
}

pub fn items(prefix: &str, sku: &str, n: usize) -> Vec<Item> {
    (0..n)
        .map(|i| Item::new(format!("{prefix}{i}"), sku))
        .collect()
}

pub fn refined(prefix: &str, n: usize) -> Vec<Item> {
    items(prefix, REFINED_SKU, n)
}

pub fn scrap(prefix: &str, n: usize) -> Vec<Item> {
    items(prefix, SCRAP_SKU, n)
}

pub fn offer(id: &str, their_items: Vec<Item>, our_items: Vec<Item>) -> Offer {
    Offer {
        offer_id: OfferId::new(id),
        partner_id: PartnerId::new(PARTNER),
        their_items,
        our_items,
        state: OfferState::Active,
        is_ours: false,
        message: None,
    }
}

pub fn with_state(mut offer: Offer, state: OfferState) -> Offer {
    offer.state = state;
    offer
}
