//! Offer record table.
//!
//! One record per offer id, created on first sighting and destroyed once the
//! offer is terminal and its side effects are committed. The table is the
//! only authority for "already processed": `try_open` is a synchronous
//! check-and-insert, so callers run it before their first suspension point.
//!
//! **States:** `Sighted -> ActionPending -> ActionSent | ActionFailed`,
//! `Sighted -> Parked` (ignored), `Issued -> ActionPending` (cancel request),
//! `ActionFailed -> ActionPending` (sweep retry).
//!
//! Invalid events are reported, never panic.

use std::collections::HashMap;

use crate::offer::{OfferId, PartnerId};
use crate::policy::counter::CounterOffer;
use crate::valuation::ValuationSummary;

// ─── Origin ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOrigin {
    /// Received from a partner.
    Received,
    /// Created by this engine (counter offers).
    Issued,
}

// ─── Actions ────────────────────────────────────────────────────────────

/// The one outbound platform action a decision produces.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundAction {
    Accept,
    Decline,
    Cancel,
    Counter(Box<CounterOffer>),
}

impl OutboundAction {
    pub fn label(&self) -> &'static str {
        match self {
            OutboundAction::Accept => "accept",
            OutboundAction::Decline => "decline",
            OutboundAction::Cancel => "cancel",
            OutboundAction::Counter(_) => "counter",
        }
    }
}

// ─── States ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordState {
    Sighted,
    /// Decision made, action not yet delivered.
    ActionPending,
    ActionSent,
    /// Retry budget exhausted; eligible for the next sweep.
    ActionFailed,
    /// No action will be taken; waiting for the offer to go terminal.
    Parked,
    /// Self-issued and live on the platform.
    Issued,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordEvent {
    Decided(Option<OutboundAction>),
    ActionSent,
    ActionFailed,
    /// Platform refused the action permanently.
    ActionAbandoned,
    RetryStarted,
    CancelRequested,
}

impl RecordEvent {
    fn label(&self) -> &'static str {
        match self {
            RecordEvent::Decided(_) => "decided",
            RecordEvent::ActionSent => "action_sent",
            RecordEvent::ActionFailed => "action_failed",
            RecordEvent::ActionAbandoned => "action_abandoned",
            RecordEvent::RetryStarted => "retry_started",
            RecordEvent::CancelRequested => "cancel_requested",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    Transitioned { from: RecordState, to: RecordState },
    Ignored { current: RecordState, reason: String },
    UnknownOffer,
}

fn next_state(from: RecordState, event: &RecordEvent) -> Option<RecordState> {
    use RecordState as S;
    match (from, event) {
        (S::Sighted, RecordEvent::Decided(Some(_))) => Some(S::ActionPending),
        (S::Sighted, RecordEvent::Decided(None)) => Some(S::Parked),
        (S::ActionPending, RecordEvent::ActionSent) => Some(S::ActionSent),
        (S::ActionPending, RecordEvent::ActionFailed) => Some(S::ActionFailed),
        (S::ActionPending, RecordEvent::ActionAbandoned) => Some(S::Parked),
        (S::ActionFailed, RecordEvent::RetryStarted) => Some(S::ActionPending),
        (S::Issued, RecordEvent::CancelRequested) => Some(S::ActionPending),
        _ => None,
    }
}

// ─── Record ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct OfferRecord {
    pub offer_id: OfferId,
    pub partner_id: PartnerId,
    pub origin: OfferOrigin,
    pub state: RecordState,
    pub valuation: Option<ValuationSummary>,
    pub action: Option<OutboundAction>,
    /// Dispatch rounds started for `action`.
    pub rounds: u32,
    pub created_ms: u64,
    pub updated_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    Inserted,
    /// Already tracked. Caller must NOOP.
    Duplicate,
}

// ─── Metrics ────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct RecordMetrics {
    opened_total: u64,
    duplicates_total: u64,
    invalid_transitions_total: u64,
    closed_total: u64,
}

impl RecordMetrics {
    pub fn new() -> Self {
        Self {
            opened_total: 0,
            duplicates_total: 0,
            invalid_transitions_total: 0,
            closed_total: 0,
        }
    }

    pub fn opened_total(&self) -> u64 {
        self.opened_total
    }

    pub fn duplicates_total(&self) -> u64 {
        self.duplicates_total
    }

    pub fn invalid_transitions_total(&self) -> u64 {
        self.invalid_transitions_total
    }

    pub fn closed_total(&self) -> u64 {
        self.closed_total
    }
}

impl Default for RecordMetrics {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Table ──────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct OfferRecordTable {
    records: HashMap<OfferId, OfferRecord>,
    metrics: RecordMetrics,
}

impl OfferRecordTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the record for a received offer unless one exists.
    pub fn try_open(&mut self, offer_id: &OfferId, partner_id: &PartnerId, now_ms: u64) -> InsertResult {
        self.insert(offer_id, partner_id, OfferOrigin::Received, RecordState::Sighted, None, now_ms)
    }

    /// Track an offer this engine just created on the platform.
    pub fn register_issued(
        &mut self,
        offer_id: &OfferId,
        partner_id: &PartnerId,
        valuation: ValuationSummary,
        now_ms: u64,
    ) -> InsertResult {
        self.insert(
            offer_id,
            partner_id,
            OfferOrigin::Issued,
            RecordState::Issued,
            Some(valuation),
            now_ms,
        )
    }

    fn insert(
        &mut self,
        offer_id: &OfferId,
        partner_id: &PartnerId,
        origin: OfferOrigin,
        state: RecordState,
        valuation: Option<ValuationSummary>,
        now_ms: u64,
    ) -> InsertResult {
        if self.records.contains_key(offer_id) {
            self.metrics.duplicates_total += 1;
            return InsertResult::Duplicate;
        }
        self.records.insert(
            offer_id.clone(),
            OfferRecord {
                offer_id: offer_id.clone(),
                partner_id: partner_id.clone(),
                origin,
                state,
                valuation,
                action: None,
                rounds: 0,
                created_ms: now_ms,
                updated_ms: now_ms,
            },
        );
        self.metrics.opened_total += 1;
        InsertResult::Inserted
    }

    pub fn apply(&mut self, offer_id: &OfferId, event: RecordEvent, now_ms: u64) -> TransitionResult {
        let Some(record) = self.records.get_mut(offer_id) else {
            return TransitionResult::UnknownOffer;
        };
        let from = record.state;
        let Some(to) = next_state(from, &event) else {
            self.metrics.invalid_transitions_total += 1;
            tracing::warn!(
                offer_id = %offer_id,
                state = ?from,
                event = event.label(),
                "ignored invalid offer record transition"
            );
            return TransitionResult::Ignored {
                current: from,
                reason: format!("{} not valid in {from:?}", event.label()),
            };
        };

        match event {
            RecordEvent::Decided(action) => record.action = action,
            RecordEvent::CancelRequested => record.action = Some(OutboundAction::Cancel),
            RecordEvent::RetryStarted => record.rounds += 1,
            _ => {}
        }
        if to == RecordState::ActionPending && record.rounds == 0 {
            record.rounds = 1;
        }
        record.state = to;
        record.updated_ms = now_ms;
        TransitionResult::Transitioned { from, to }
    }

    pub fn set_valuation(&mut self, offer_id: &OfferId, valuation: ValuationSummary) {
        if let Some(record) = self.records.get_mut(offer_id) {
            record.valuation = Some(valuation);
        }
    }

    pub fn get(&self, offer_id: &OfferId) -> Option<&OfferRecord> {
        self.records.get(offer_id)
    }

    pub fn contains(&self, offer_id: &OfferId) -> bool {
        self.records.contains_key(offer_id)
    }

    /// Destroy the record once the offer is terminal.
    pub fn close(&mut self, offer_id: &OfferId) -> Option<OfferRecord> {
        let removed = self.records.remove(offer_id);
        if removed.is_some() {
            self.metrics.closed_total += 1;
        }
        removed
    }

    /// Self-issued offers still live after `threshold_ms`, oldest first.
    pub fn stale_issued(&self, now_ms: u64, threshold_ms: u64) -> Vec<OfferId> {
        let mut stale: Vec<&OfferRecord> = self
            .records
            .values()
            .filter(|r| r.state == RecordState::Issued)
            .filter(|r| now_ms.saturating_sub(r.created_ms) >= threshold_ms)
            .collect();
        stale.sort_by_key(|r| r.created_ms);
        stale.into_iter().map(|r| r.offer_id.clone()).collect()
    }

    /// Records whose last dispatch exhausted its retries.
    pub fn failed_actions(&self) -> Vec<(OfferId, PartnerId, OutboundAction)> {
        let mut failed: Vec<&OfferRecord> = self
            .records
            .values()
            .filter(|r| r.state == RecordState::ActionFailed)
            .collect();
        failed.sort_by_key(|r| r.updated_ms);
        failed
            .into_iter()
            .filter_map(|r| {
                r.action
                    .clone()
                    .map(|a| (r.offer_id.clone(), r.partner_id.clone(), a))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn metrics(&self) -> &RecordMetrics {
        &self.metrics
    }
}
