//! Ordered offer decision policy.
//!
//! **Step order (first match wins):**
//! 1. Operator partner -> accept
//! 2. Blacklisted partner -> decline
//! 3. Banned partner -> decline
//! 4. Gift -> accept when gifts are accepted, else ignore
//! 5. Trade hold with decline-on-hold -> decline
//! 6. Lone non-pure SKU with an arbitrage opportunity -> route
//! 7. One-sided taking -> counter, decline without a counter item
//! 8. Any other non two-sided shape -> ignore
//! 9. Stock ceiling breach -> ignore
//! 10. Unpriced item on our side -> ignore
//! 11. Their value >= our value -> accept
//! 12. Underpaying -> counter when enabled, else ignore
//!
//! `decide` is pure: every partner fact it needs arrives in the input and the
//! catalog is only read. Each call evaluates the offer exactly once and
//! records the steps it ran.

use std::collections::HashSet;

use super::counter::{CounterTarget, select_counter_target};
use crate::catalog::{CatalogView, Intent, PricingStore};
use crate::item::Sku;
use crate::offer::{Offer, OfferShape};
use crate::stock::{StockBreach, StockGuardMetrics, StockGuardResult, evaluate_stock_ceiling};
use crate::telemetry::emit_metric_line;
use crate::valuation::{ValuationError, ValuationSummary, valuate};

// ─── Inputs ─────────────────────────────────────────────────────────────

/// Policy switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PolicySettings {
    pub accept_gifts: bool,
    pub counter_bad_offers: bool,
    pub decline_trade_hold: bool,
    pub enable_arbitrage: bool,
}

/// What is known about the partner before deciding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PartnerFacts {
    pub is_operator: bool,
    pub is_blacklisted: bool,
    pub is_banned: bool,
    pub has_trade_hold: bool,
}

pub struct DecisionInput<'a> {
    pub offer: &'a Offer,
    pub partner: PartnerFacts,
    pub arbitrage_skus: &'a HashSet<Sku>,
}

// ─── Steps ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyStep {
    Operator,
    Blacklist,
    Reputation,
    Gift,
    TradeHold,
    Arbitrage,
    Taking,
    Shape,
    StockGuard,
    Valuation,
    ValueComparison,
    BadOffer,
}

// ─── Result ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accept,
    Decline,
    Ignore,
    Counter(CounterTarget),
    /// Handed to the arbitrage collaborator. No platform action.
    RouteArbitrage(Sku),
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Accept => "accept",
            Verdict::Decline => "decline",
            Verdict::Ignore => "ignore",
            Verdict::Counter(_) => "counter",
            Verdict::RouteArbitrage(_) => "route_arbitrage",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionReason {
    Operator,
    Blacklisted,
    Banned,
    GiftAccepted,
    GiftIgnored,
    TradeHold,
    Arbitrage,
    Taking,
    NoCounterItem,
    InvalidShape,
    StockCeiling(StockBreach),
    MissingKeyPrice,
    UnpricedOurSide,
    FairValue,
    Underpaid,
    UnderpaidCounter,
}

impl DecisionReason {
    pub fn label(&self) -> &'static str {
        match self {
            DecisionReason::Operator => "operator",
            DecisionReason::Blacklisted => "blacklisted",
            DecisionReason::Banned => "banned",
            DecisionReason::GiftAccepted => "gift_accepted",
            DecisionReason::GiftIgnored => "gift_ignored",
            DecisionReason::TradeHold => "trade_hold",
            DecisionReason::Arbitrage => "arbitrage",
            DecisionReason::Taking => "taking",
            DecisionReason::NoCounterItem => "no_counter_item",
            DecisionReason::InvalidShape => "invalid_shape",
            DecisionReason::StockCeiling(_) => "stock_ceiling",
            DecisionReason::MissingKeyPrice => "missing_key_price",
            DecisionReason::UnpricedOurSide => "unpriced_our_side",
            DecisionReason::FairValue => "fair_value",
            DecisionReason::Underpaid => "underpaid",
            DecisionReason::UnderpaidCounter => "underpaid_counter",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub verdict: Verdict,
    pub reason: DecisionReason,
    /// Steps evaluated, in order.
    pub trace: Vec<PolicyStep>,
    /// Present once both sides were valued.
    pub valuation: Option<ValuationSummary>,
}

// ─── Metrics ────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct DecisionMetrics {
    accepted_total: u64,
    declined_total: u64,
    ignored_total: u64,
    countered_total: u64,
    routed_total: u64,
    stock: StockGuardMetrics,
}

impl DecisionMetrics {
    pub fn new() -> Self {
        Self {
            accepted_total: 0,
            declined_total: 0,
            ignored_total: 0,
            countered_total: 0,
            routed_total: 0,
            stock: StockGuardMetrics::new(),
        }
    }

    fn record(&mut self, verdict: &Verdict) {
        match verdict {
            Verdict::Accept => self.accepted_total += 1,
            Verdict::Decline => self.declined_total += 1,
            Verdict::Ignore => self.ignored_total += 1,
            Verdict::Counter(_) => self.countered_total += 1,
            Verdict::RouteArbitrage(_) => self.routed_total += 1,
        }
    }

    pub fn accepted_total(&self) -> u64 {
        self.accepted_total
    }

    pub fn declined_total(&self) -> u64 {
        self.declined_total
    }

    pub fn ignored_total(&self) -> u64 {
        self.ignored_total
    }

    pub fn countered_total(&self) -> u64 {
        self.countered_total
    }

    pub fn routed_total(&self) -> u64 {
        self.routed_total
    }

    pub fn stock(&self) -> &StockGuardMetrics {
        &self.stock
    }
}

impl Default for DecisionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Policy ─────────────────────────────────────────────────────────────

pub fn decide<S: PricingStore + ?Sized>(
    input: &DecisionInput<'_>,
    view: &CatalogView<'_, S>,
    settings: &PolicySettings,
    metrics: &mut DecisionMetrics,
) -> Decision {
    let decision = evaluate(input, view, settings, metrics);
    metrics.record(&decision.verdict);
    emit_metric_line(
        "offer_decision_total",
        &format!(
            "verdict={} reason={}",
            decision.verdict.label(),
            decision.reason.label()
        ),
    );
    tracing::info!(
        offer_id = %input.offer.offer_id,
        verdict = decision.verdict.label(),
        reason = decision.reason.label(),
        steps = decision.trace.len(),
        "offer decided"
    );
    decision
}

fn evaluate<S: PricingStore + ?Sized>(
    input: &DecisionInput<'_>,
    view: &CatalogView<'_, S>,
    settings: &PolicySettings,
    metrics: &mut DecisionMetrics,
) -> Decision {
    let offer = input.offer;
    let partner = input.partner;
    let mut trace = Vec::with_capacity(12);

    trace.push(PolicyStep::Operator);
    if partner.is_operator {
        return done(Verdict::Accept, DecisionReason::Operator, trace, None);
    }

    trace.push(PolicyStep::Blacklist);
    if partner.is_blacklisted {
        return done(Verdict::Decline, DecisionReason::Blacklisted, trace, None);
    }

    trace.push(PolicyStep::Reputation);
    if partner.is_banned {
        return done(Verdict::Decline, DecisionReason::Banned, trace, None);
    }

    let shape = offer.shape();
    trace.push(PolicyStep::Gift);
    if shape == OfferShape::Gift {
        return if settings.accept_gifts {
            done(Verdict::Accept, DecisionReason::GiftAccepted, trace, None)
        } else {
            done(Verdict::Ignore, DecisionReason::GiftIgnored, trace, None)
        };
    }

    trace.push(PolicyStep::TradeHold);
    if settings.decline_trade_hold && partner.has_trade_hold {
        return done(Verdict::Decline, DecisionReason::TradeHold, trace, None);
    }

    trace.push(PolicyStep::Arbitrage);
    if settings.enable_arbitrage {
        if let Some(sku) = offer.lone_non_pure_sku() {
            if input.arbitrage_skus.contains(&sku) {
                return done(
                    Verdict::RouteArbitrage(sku),
                    DecisionReason::Arbitrage,
                    trace,
                    None,
                );
            }
        }
    }

    trace.push(PolicyStep::Taking);
    if shape == OfferShape::Taking {
        return match select_counter_target(offer) {
            Some(target) => done(Verdict::Counter(target), DecisionReason::Taking, trace, None),
            None => done(Verdict::Decline, DecisionReason::NoCounterItem, trace, None),
        };
    }

    trace.push(PolicyStep::Shape);
    if shape != OfferShape::TwoSided {
        return done(Verdict::Ignore, DecisionReason::InvalidShape, trace, None);
    }

    trace.push(PolicyStep::StockGuard);
    if let StockGuardResult::Rejected(breach) =
        evaluate_stock_ceiling(&offer.their_items, view, &mut metrics.stock)
    {
        tracing::warn!(
            offer_id = %offer.offer_id,
            sku = %breach.sku,
            in_stock = breach.in_stock,
            incoming = breach.incoming,
            max_stock = breach.max_stock,
            "offer would exceed stock ceiling"
        );
        return done(
            Verdict::Ignore,
            DecisionReason::StockCeiling(breach),
            trace,
            None,
        );
    }

    trace.push(PolicyStep::Valuation);
    let sides = valuate(&offer.their_items, Intent::Buy, view).and_then(|their| {
        valuate(&offer.our_items, Intent::Sell, view).map(|our| (their, our))
    });
    let (their, our) = match sides {
        Ok(sides) => sides,
        Err(ValuationError::MissingKeyPrice { intent }) => {
            tracing::warn!(offer_id = %offer.offer_id, intent = intent.as_str(), "key price missing");
            return done(Verdict::Ignore, DecisionReason::MissingKeyPrice, trace, None);
        }
    };
    let summary = ValuationSummary::new(their.total_scrap, our.total_scrap);
    if our.has_unpriced {
        return done(
            Verdict::Ignore,
            DecisionReason::UnpricedOurSide,
            trace,
            Some(summary),
        );
    }

    trace.push(PolicyStep::ValueComparison);
    if summary.their_scrap >= summary.our_scrap {
        return done(Verdict::Accept, DecisionReason::FairValue, trace, Some(summary));
    }

    trace.push(PolicyStep::BadOffer);
    if !settings.counter_bad_offers {
        return done(Verdict::Ignore, DecisionReason::Underpaid, trace, Some(summary));
    }
    match select_counter_target(offer) {
        Some(target) => done(
            Verdict::Counter(target),
            DecisionReason::UnderpaidCounter,
            trace,
            Some(summary),
        ),
        None => done(
            Verdict::Decline,
            DecisionReason::NoCounterItem,
            trace,
            Some(summary),
        ),
    }
}

fn done(
    verdict: Verdict,
    reason: DecisionReason,
    trace: Vec<PolicyStep>,
    valuation: Option<ValuationSummary>,
) -> Decision {
    Decision {
        verdict,
        reason,
        trace,
        valuation,
    }
}
