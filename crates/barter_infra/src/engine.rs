//! Offer engine.
//!
//! `process_offer` flow for one received offer:
//! 1. Skip offers that are not active or were issued by us.
//! 2. Open the offer record (synchronous, before any suspension point).
//!    A second sighting is a NOOP.
//! 3. Wait for the price warm-up gate.
//! 4. Gather partner facts (operator, blacklist, reputation, trade hold).
//! 5. Run the decision policy against a fresh catalog view.
//! 6. Perform at most one outbound action through the retrying dispatcher.
//!
//! `process_offer_terminal_state` writes a ledger entry for accepted trades
//! only (exactly-once guard), reconciles inventory and stock, notifies the
//! partner and destroys the record. Other terminal states skip the ledger.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use barter_core::catalog::{CatalogView, Intent};
use barter_core::item::{Item, Sku};
use barter_core::lifecycle::{
    InsertResult, OfferRecord, OfferRecordTable, OutboundAction, RecordEvent,
};
use barter_core::offer::{Offer, OfferId, OfferState, PartnerId};
use barter_core::policy::{
    CounterError, CounterRequest, CounterTarget, Decision, DecisionInput, DecisionMetrics,
    DecisionReason, PartnerFacts, Verdict, build_counter, decide,
};
use barter_core::valuation::ValuationSummary;
use tokio::time::Instant;

use crate::collaborators::{
    ArbitrageDesk, CatalogStore, InventoryError, InventoryProvider, PlatformTransport,
    ReputationCheck,
};
use crate::config::{ConfigurationError, EngineOptions, EngineSettings, validate_startup};
use crate::dispatch::{DispatchMetrics, DispatchOutcome, dispatch_with_retry};
use crate::price_feed::WarmupGate;
use crate::store::ledger::{self, KeyPrices, LedgerEntry, TradeLedger};
use crate::store::{InventoryBook, lock};

// --- Wiring --------------------------------------------------------------

pub struct Collaborators {
    pub catalog: Arc<dyn CatalogStore>,
    pub inventory: Arc<dyn InventoryProvider>,
    pub platform: Arc<dyn PlatformTransport>,
    pub reputation: Option<Arc<dyn ReputationCheck>>,
    pub arbitrage: Option<Arc<dyn ArbitrageDesk>>,
}

// --- Outcome -------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Accepted,
    Declined,
    Countered,
    Ignored,
    /// Handed to the arbitrage collaborator.
    Routed,
    /// Already being processed.
    Duplicate,
    /// Not active, or issued by us.
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionOutcome {
    pub offer_id: OfferId,
    pub kind: OutcomeKind,
    pub reason: Option<DecisionReason>,
    pub valuation: Option<ValuationSummary>,
    pub dispatch: Option<DispatchOutcome>,
    /// Why a counter could not be built.
    pub counter_error: Option<CounterError>,
    /// Replacement offer created by a counter.
    pub counter_offer_id: Option<OfferId>,
}

impl DecisionOutcome {
    fn bare(offer_id: &OfferId, kind: OutcomeKind) -> Self {
        Self {
            offer_id: offer_id.clone(),
            kind,
            reason: None,
            valuation: None,
            dispatch: None,
            counter_error: None,
            counter_offer_id: None,
        }
    }

    fn decided(offer_id: &OfferId, kind: OutcomeKind, decision: &Decision) -> Self {
        Self {
            reason: Some(decision.reason.clone()),
            valuation: decision.valuation,
            ..Self::bare(offer_id, kind)
        }
    }
}

// --- Engine --------------------------------------------------------------

pub struct OfferEngine {
    pub(crate) collab: Collaborators,
    pub(crate) options: EngineOptions,
    pub(crate) settings: EngineSettings,
    warmup: WarmupGate,
    pub(crate) records: Mutex<OfferRecordTable>,
    our_inventory: InventoryBook,
    ledger: TradeLedger,
    arbitrage_skus: Mutex<HashSet<Sku>>,
    decision_metrics: Mutex<DecisionMetrics>,
    pub(crate) dispatch_metrics: DispatchMetrics,
    epoch: Instant,
}

impl OfferEngine {
    /// Fails when the account credential or the key price is missing.
    pub fn new(
        collab: Collaborators,
        options: EngineOptions,
        settings: EngineSettings,
        warmup: WarmupGate,
        ledger: TradeLedger,
    ) -> Result<Self, ConfigurationError> {
        validate_startup(&options, &*collab.catalog)?;
        Ok(Self {
            collab,
            options,
            settings,
            warmup,
            records: Mutex::new(OfferRecordTable::new()),
            our_inventory: InventoryBook::default(),
            ledger,
            arbitrage_skus: Mutex::new(HashSet::new()),
            decision_metrics: Mutex::new(DecisionMetrics::new()),
            dispatch_metrics: DispatchMetrics::new(),
            epoch: Instant::now(),
        })
    }

    pub(crate) fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn ledger(&self) -> &TradeLedger {
        &self.ledger
    }

    pub fn dispatch_metrics(&self) -> &DispatchMetrics {
        &self.dispatch_metrics
    }

    pub fn with_decision_metrics<R>(&self, f: impl FnOnce(&DecisionMetrics) -> R) -> R {
        f(&lock(&self.decision_metrics))
    }

    pub fn record(&self, offer_id: &OfferId) -> Option<OfferRecord> {
        lock(&self.records).get(offer_id).cloned()
    }

    pub fn tracked_offers(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn our_inventory(&self) -> Vec<Item> {
        self.our_inventory.snapshot()
    }

    pub fn set_arbitrage_skus(&self, skus: impl IntoIterator<Item = Sku>) {
        *lock(&self.arbitrage_skus) = skus.into_iter().collect();
    }

    /// Replace the local inventory snapshot and recount stock.
    pub async fn refresh_our_inventory(&self) -> Result<usize, InventoryError> {
        let items = self.collab.inventory.our_inventory().await?;
        let count = items.len();
        self.our_inventory.replace(items);
        self.recount_stock();
        tracing::info!(items = count, "inventory refreshed");
        Ok(count)
    }

    fn view(&self) -> CatalogView<'_, dyn CatalogStore> {
        CatalogView::capture(&*self.collab.catalog, self.options.enable_craft_hats)
    }

    // --- Incoming offers -------------------------------------------------

    #[tracing::instrument(skip_all, fields(offer_id = %offer.offer_id, partner_id = %offer.partner_id))]
    pub async fn process_offer(&self, offer: &Offer) -> DecisionOutcome {
        if !offer.is_active() || offer.is_ours {
            tracing::debug!(state = offer.state.as_str(), is_ours = offer.is_ours, "skipping offer");
            return DecisionOutcome::bare(&offer.offer_id, OutcomeKind::Skipped);
        }

        let opened = lock(&self.records).try_open(&offer.offer_id, &offer.partner_id, self.now_ms());
        if opened == InsertResult::Duplicate {
            tracing::debug!("offer already tracked");
            return DecisionOutcome::bare(&offer.offer_id, OutcomeKind::Duplicate);
        }

        if !self.warmup.wait_ready().await {
            tracing::warn!("price feed closed before warm-up; leaving offer untouched");
            self.park(&offer.offer_id);
            return DecisionOutcome::bare(&offer.offer_id, OutcomeKind::Ignored);
        }

        let partner = self.partner_facts(offer).await;
        let decision = {
            let view = self.view();
            let arbitrage_skus = lock(&self.arbitrage_skus).clone();
            let mut metrics = lock(&self.decision_metrics);
            decide(
                &DecisionInput {
                    offer,
                    partner,
                    arbitrage_skus: &arbitrage_skus,
                },
                &view,
                &self.options.policy_settings(),
                &mut metrics,
            )
        };
        if let Some(summary) = decision.valuation {
            lock(&self.records).set_valuation(&offer.offer_id, summary);
            tracing::info!("{}", summary.line());
        }

        match decision.verdict.clone() {
            Verdict::Accept => {
                self.act(offer, OutboundAction::Accept, OutcomeKind::Accepted, &decision)
                    .await
            }
            Verdict::Decline => {
                self.act(offer, OutboundAction::Decline, OutcomeKind::Declined, &decision)
                    .await
            }
            Verdict::Ignore => {
                self.park(&offer.offer_id);
                DecisionOutcome::decided(&offer.offer_id, OutcomeKind::Ignored, &decision)
            }
            Verdict::RouteArbitrage(sku) => {
                self.park(&offer.offer_id);
                match &self.collab.arbitrage {
                    Some(desk) => desk.route(offer, &sku).await,
                    None => tracing::warn!(%sku, "arbitrage enabled without a desk"),
                }
                DecisionOutcome::decided(&offer.offer_id, OutcomeKind::Routed, &decision)
            }
            Verdict::Counter(target) => self.counter(offer, &target, &decision).await,
        }
    }

    async fn partner_facts(&self, offer: &Offer) -> PartnerFacts {
        let partner = &offer.partner_id;
        let is_operator = self.options.is_operator(partner);
        let is_blacklisted = !is_operator && self.options.is_blacklisted(partner);

        let mut is_banned = false;
        if !is_operator && !is_blacklisted {
            if let Some(reputation) = &self.collab.reputation {
                is_banned = reputation.is_banned(partner).await.unwrap_or_else(|err| {
                    tracing::warn!(%err, "reputation check failed; treating partner as not banned");
                    false
                });
            }
        }

        let mut has_trade_hold = false;
        let gated = is_operator || is_blacklisted || is_banned || offer.is_gift();
        if self.options.decline_trade_hold && !gated {
            has_trade_hold = self.collab.platform.trade_hold(partner).await.unwrap_or_else(|err| {
                tracing::warn!(%err, "trade hold lookup failed");
                false
            });
        }

        PartnerFacts {
            is_operator,
            is_blacklisted,
            is_banned,
            has_trade_hold,
        }
    }

    fn park(&self, offer_id: &OfferId) {
        lock(&self.records).apply(offer_id, RecordEvent::Decided(None), self.now_ms());
    }

    async fn act(
        &self,
        offer: &Offer,
        action: OutboundAction,
        kind: OutcomeKind,
        decision: &Decision,
    ) -> DecisionOutcome {
        lock(&self.records).apply(
            &offer.offer_id,
            RecordEvent::Decided(Some(action.clone())),
            self.now_ms(),
        );
        let outcome = self.deliver(&offer.offer_id, &offer.partner_id, &action).await;
        DecisionOutcome {
            dispatch: Some(outcome),
            ..DecisionOutcome::decided(&offer.offer_id, kind, decision)
        }
    }

    async fn counter(
        &self,
        offer: &Offer,
        target: &CounterTarget,
        decision: &Decision,
    ) -> DecisionOutcome {
        let their_inventory = match self
            .collab
            .inventory
            .fetch_their_inventory(&offer.partner_id)
            .await
        {
            Ok(items) => items,
            Err(err) => {
                tracing::warn!(%err, "cannot counter without partner inventory");
                self.park(&offer.offer_id);
                return DecisionOutcome::decided(&offer.offer_id, OutcomeKind::Ignored, decision);
            }
        };
        if self.our_inventory.is_empty() {
            if let Err(err) = self.refresh_our_inventory().await {
                tracing::warn!(%err, "our inventory unavailable for counter");
            }
        }
        let our_inventory = self.our_inventory.snapshot();

        let built = {
            let view = self.view();
            build_counter(
                &CounterRequest {
                    offer,
                    target,
                    their_inventory: &their_inventory,
                    our_inventory: &our_inventory,
                    message: &self.options.messages.counter,
                },
                &view,
            )
        };

        let counter = match built {
            Ok(counter) => counter,
            Err(err) => {
                tracing::warn!(%err, intent = target.intent.as_str(), "counter aborted");
                self.park(&offer.offer_id);
                if let Some(message) = err.partner_message() {
                    self.notify(&offer.partner_id, &message).await;
                }
                return DecisionOutcome {
                    counter_error: Some(err),
                    ..DecisionOutcome::decided(&offer.offer_id, OutcomeKind::Ignored, decision)
                };
            }
        };

        let action = OutboundAction::Counter(Box::new(counter));
        let mut outcome = self
            .act(offer, action, OutcomeKind::Countered, decision)
            .await;
        if let Some(DispatchOutcome::Delivered { new_offer_id, .. }) = &outcome.dispatch {
            outcome.counter_offer_id = new_offer_id.clone();
        }
        outcome
    }

    /// Dispatch `action` and move the record accordingly. A delivered counter
    /// registers the replacement offer as self-issued.
    pub(crate) async fn deliver(
        &self,
        offer_id: &OfferId,
        partner_id: &PartnerId,
        action: &OutboundAction,
    ) -> DispatchOutcome {
        let outcome = dispatch_with_retry(
            &*self.collab.platform,
            &self.settings.retry,
            offer_id,
            action,
            &self.dispatch_metrics,
        )
        .await;

        let now = self.now_ms();
        let mut records = lock(&self.records);
        match &outcome {
            DispatchOutcome::Delivered { new_offer_id, .. } => {
                records.apply(offer_id, RecordEvent::ActionSent, now);
                if let (OutboundAction::Counter(counter), Some(new_id)) = (action, new_offer_id) {
                    records.register_issued(new_id, partner_id, counter.summary(), now);
                }
                tracing::info!(action = action.label(), "action delivered");
            }
            DispatchOutcome::Exhausted { .. } => {
                records.apply(offer_id, RecordEvent::ActionFailed, now);
            }
            DispatchOutcome::Rejected { .. } => {
                records.apply(offer_id, RecordEvent::ActionAbandoned, now);
            }
        }
        outcome
    }

    async fn notify(&self, partner: &PartnerId, message: &str) {
        if !self.options.send_messages || message.is_empty() {
            return;
        }
        if let Err(err) = self.collab.platform.notify(partner, message).await {
            tracing::debug!(%err, "partner notification failed");
        }
    }

    // --- Terminal offers -------------------------------------------------

    /// Finalize an offer the platform reports as terminal.
    ///
    /// Only accepted trades are written to the ledger, and the entry is
    /// returned only when this call inserted it. Other terminal states close
    /// a tracked record and notify the partner. A failed ledger write still
    /// reconciles inventory and closes the record.
    #[tracing::instrument(skip_all, fields(offer_id = %offer.offer_id, state = offer.state.as_str()))]
    pub async fn process_offer_terminal_state(&self, offer: &Offer) -> Option<LedgerEntry> {
        if !offer.is_terminal() {
            return None;
        }

        let record = lock(&self.records).get(&offer.offer_id).cloned();
        let mut inserted = None;
        if offer.state == OfferState::Accepted {
            let entry = self.ledger_entry(offer, record.as_ref());
            match self.ledger.insert_if_absent(entry.clone()) {
                Ok(ledger::InsertResult::Inserted) => inserted = Some(entry),
                Ok(ledger::InsertResult::Duplicate) => {
                    tracing::debug!("terminal state already recorded");
                    return None;
                }
                Err(err) if record.is_none() => {
                    tracing::warn!(%err, "ledger write failed for untracked offer");
                    return None;
                }
                Err(err) => tracing::warn!(%err, "ledger write failed; finalizing from record"),
            }
            self.reconcile(offer).await;
        } else if record.is_none() {
            tracing::debug!("terminal offer not tracked");
            return None;
        }

        if let Some(message) = self.terminal_message(offer) {
            self.notify(&offer.partner_id, &message).await;
        }
        lock(&self.records).close(&offer.offer_id);
        let valuation = record.and_then(|r| r.valuation);
        tracing::info!(
            their_scrap = ?valuation.map(|v| v.their_scrap),
            our_scrap = ?valuation.map(|v| v.our_scrap),
            recorded = inserted.is_some(),
            "offer finalized"
        );
        inserted
    }

    fn ledger_entry(&self, offer: &Offer, record: Option<&OfferRecord>) -> LedgerEntry {
        let valuation = record.and_then(|r| r.valuation);
        LedgerEntry {
            offer_id: offer.offer_id.clone(),
            partner_id: offer.partner_id.clone(),
            state: offer.state,
            is_ours: offer.is_ours,
            message: offer.message.clone(),
            their_items: offer.their_items.clone(),
            our_items: offer.our_items.clone(),
            their_scrap: valuation.map(|v| v.their_scrap),
            our_scrap: valuation.map(|v| v.our_scrap),
            key_prices: KeyPrices {
                buy: self.collab.catalog.price(&Sku::key(), Intent::Buy),
                sell: self.collab.catalog.price(&Sku::key(), Intent::Sell),
            },
            recorded_at_ms: unix_ms(),
            content_hash: String::new(),
        }
        .sealed()
    }

    async fn reconcile(&self, offer: &Offer) {
        let receipt = match self.collab.platform.receipt(&offer.offer_id).await {
            Ok(receipt) => Some(receipt),
            Err(err) => {
                tracing::warn!(%err, "trade receipt unavailable");
                None
            }
        };
        let applied = receipt.and_then(|receipt| {
            self.our_inventory
                .apply_receipt(&offer.our_items, &offer.their_items, &receipt)
                .map_err(|err| tracing::warn!(%err, "receipt reconciliation failed"))
                .ok()
        });

        match applied {
            Some(report) => {
                tracing::info!(removed = report.removed, added = report.added, "inventory reconciled");
                self.recount_stock();
            }
            None => {
                if let Err(err) = self.refresh_our_inventory().await {
                    tracing::warn!(%err, "inventory refresh failed; stock counts may lag");
                }
            }
        }
    }

    fn recount_stock(&self) {
        let counts = {
            let view = self.view();
            self.our_inventory.stock_counts(&view)
        };
        self.collab.catalog.set_stock(&counts);
    }

    fn terminal_message(&self, offer: &Offer) -> Option<String> {
        let messages = &self.options.messages;
        let message = match offer.state {
            OfferState::Accepted => &messages.accepted,
            OfferState::Declined if !offer.is_ours => &messages.declined,
            OfferState::Cancelled | OfferState::Expired if offer.is_ours => &messages.cancelled,
            OfferState::InvalidItems => &messages.invalid_items,
            _ => return None,
        };
        Some(message.clone())
    }
}

fn unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
