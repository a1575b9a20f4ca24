//! Offer engine: one decision, at most one outbound action per offer.

mod common;

use barter_core::item::{Item, REFINED_SKU};
use barter_core::lifecycle::{OfferOrigin, RecordState};
use barter_core::offer::{OfferId, OfferState, PartnerId};
use barter_core::policy::{CounterError, DecisionReason, METAL_MISMATCH_MESSAGE};
use barter_infra::OutcomeKind;
use barter_infra::collaborators::PlatformError;
use barter_infra::dispatch::DispatchOutcome;
use common::{
    Call, FakeInventory, HAT_SKU, PARTNER, harness, harness_with, offer, options, pricelist,
    refined, settings, with_state,
};

fn hat(asset_id: &str) -> Item {
    Item::new(asset_id, HAT_SKU)
}

// --- Accept / decline ----------------------------------------------------

#[tokio::test]
async fn test_fair_offer_accepted_once() {
    let h = harness(options());
    let fair = offer("o1", refined("t", 12), vec![hat("h1")]);

    let first = h.engine.process_offer(&fair).await;
    assert_eq!(first.kind, OutcomeKind::Accepted);
    assert_eq!(first.reason, Some(DecisionReason::FairValue));
    let summary = first.valuation.unwrap();
    assert_eq!(
        summary.line(),
        "Their value: 12.00 ref, our value: 12.00 ref, difference: 0.00 ref"
    );

    let second = h.engine.process_offer(&fair).await;
    assert_eq!(second.kind, OutcomeKind::Duplicate);
    assert_eq!(h.platform.actions(), vec![Call::Accept(OfferId::new("o1"))]);

    let record = h.engine.record(&OfferId::new("o1")).unwrap();
    assert_eq!(record.state, RecordState::ActionSent);
    assert_eq!(record.valuation, Some(summary));
}

#[tokio::test]
async fn test_gift_accepted_without_valuation() {
    let h = harness(options());
    let gift = offer("o1", vec![hat("t0")], vec![]);

    let outcome = h.engine.process_offer(&gift).await;
    assert_eq!(outcome.kind, OutcomeKind::Accepted);
    assert_eq!(outcome.reason, Some(DecisionReason::GiftAccepted));
    assert!(outcome.valuation.is_none());
    assert_eq!(h.platform.actions(), vec![Call::Accept(OfferId::new("o1"))]);
}

#[tokio::test]
async fn test_underpaid_offer_ignored_when_counter_disabled() {
    let h = harness(options());
    let low = offer("o1", refined("t", 10), vec![hat("h1")]);

    let outcome = h.engine.process_offer(&low).await;
    assert_eq!(outcome.kind, OutcomeKind::Ignored);
    assert_eq!(outcome.reason, Some(DecisionReason::Underpaid));
    assert!(h.platform.calls().is_empty());
    assert_eq!(
        h.engine.record(&OfferId::new("o1")).unwrap().state,
        RecordState::Parked
    );
}

#[tokio::test]
async fn test_trade_hold_declined() {
    let h = harness(options());
    h.platform.set_trade_hold(true);
    let fair = offer("o1", refined("t", 12), vec![hat("h1")]);

    let outcome = h.engine.process_offer(&fair).await;
    assert_eq!(outcome.kind, OutcomeKind::Declined);
    assert_eq!(outcome.reason, Some(DecisionReason::TradeHold));
    assert_eq!(h.platform.actions(), vec![Call::Decline(OfferId::new("o1"))]);
}

#[tokio::test]
async fn test_operator_bypasses_policy() {
    let mut opts = options();
    opts.operators = vec![PartnerId::new(PARTNER)];
    let h = harness(opts);
    h.platform.set_trade_hold(true);
    let taking = offer("o1", vec![], vec![hat("h1")]);

    let outcome = h.engine.process_offer(&taking).await;
    assert_eq!(outcome.kind, OutcomeKind::Accepted);
    assert_eq!(outcome.reason, Some(DecisionReason::Operator));
}

#[tokio::test]
async fn test_blacklisted_partner_declined() {
    let mut opts = options();
    opts.blacklist = vec![PartnerId::new(PARTNER)];
    let h = harness(opts);

    let outcome = h
        .engine
        .process_offer(&offer("o1", refined("t", 12), vec![hat("h1")]))
        .await;
    assert_eq!(outcome.kind, OutcomeKind::Declined);
    assert_eq!(outcome.reason, Some(DecisionReason::Blacklisted));
}

#[tokio::test]
async fn test_inactive_and_own_offers_skipped() {
    let h = harness(options());
    let accepted = with_state(offer("o1", refined("t", 12), vec![]), OfferState::Accepted);
    let mut ours = offer("o2", refined("t", 12), vec![]);
    ours.is_ours = true;

    assert_eq!(h.engine.process_offer(&accepted).await.kind, OutcomeKind::Skipped);
    assert_eq!(h.engine.process_offer(&ours).await.kind, OutcomeKind::Skipped);
    assert_eq!(h.engine.tracked_offers(), 0);
    assert!(h.platform.calls().is_empty());
}

// --- Counter -------------------------------------------------------------

fn counter_harness(their_metal: usize) -> common::Harness {
    let mut opts = options();
    opts.counter_bad_offers = true;
    let inventory = FakeInventory::new(
        vec![hat("h1"), Item::new("r0", REFINED_SKU)],
        refined("inv", their_metal),
    );
    harness_with(opts, settings(), pricelist(), inventory)
}

#[tokio::test]
async fn test_underpaid_offer_countered_with_equal_sides() {
    let h = counter_harness(20);
    let low = offer("o1", refined("t", 10), vec![hat("h1")]);

    let outcome = h.engine.process_offer(&low).await;
    assert_eq!(outcome.kind, OutcomeKind::Countered);
    assert_eq!(outcome.reason, Some(DecisionReason::UnderpaidCounter));
    assert_eq!(outcome.counter_offer_id, Some(OfferId::new("counter-1")));

    let actions = h.platform.actions();
    assert_eq!(actions.len(), 1);
    let Call::Counter(source, counter) = &actions[0] else {
        panic!("expected a counter, got {actions:?}");
    };
    assert_eq!(source, &OfferId::new("o1"));
    assert_eq!(counter.their_scrap, counter.our_scrap);
    assert_eq!(counter.our_scrap, 108);
    assert_eq!(counter.their_items.len(), 12);
    assert_eq!(counter.our_items, vec![hat("h1")]);

    let issued = h.engine.record(&OfferId::new("counter-1")).unwrap();
    assert_eq!(issued.origin, OfferOrigin::Issued);
    assert_eq!(issued.state, RecordState::Issued);
    assert_eq!(issued.valuation, Some(counter.summary()));
}

#[tokio::test]
async fn test_infeasible_counter_aborts_with_partner_message() {
    let h = counter_harness(5);
    let low = offer("o1", refined("t", 10), vec![hat("h1")]);

    let outcome = h.engine.process_offer(&low).await;
    assert_eq!(outcome.kind, OutcomeKind::Ignored);
    assert!(matches!(outcome.counter_error, Some(CounterError::Exchange(_))));
    assert!(h.platform.actions().is_empty());
    assert_eq!(
        h.platform.notifications(),
        vec![METAL_MISMATCH_MESSAGE.to_string()]
    );
    assert_eq!(
        h.engine.record(&OfferId::new("o1")).unwrap().state,
        RecordState::Parked
    );
}

#[tokio::test]
async fn test_private_partner_inventory_leaves_offer_untouched() {
    let mut opts = options();
    opts.counter_bad_offers = true;
    let h = harness_with(
        opts,
        settings(),
        pricelist(),
        FakeInventory::new(vec![hat("h1")], vec![]),
    );

    let outcome = h
        .engine
        .process_offer(&offer("o1", refined("t", 10), vec![hat("h1")]))
        .await;
    assert_eq!(outcome.kind, OutcomeKind::Ignored);
    assert!(h.platform.calls().is_empty());
}

// --- Dispatch outcome on the record --------------------------------------

#[tokio::test(start_paused = true)]
async fn test_permanent_rejection_parks_record() {
    let h = harness(options());
    h.platform
        .fail_next([PlatformError::Rejected("offer no longer exists".into())]);

    let outcome = h
        .engine
        .process_offer(&offer("o1", refined("t", 12), vec![hat("h1")]))
        .await;
    assert!(matches!(
        outcome.dispatch,
        Some(DispatchOutcome::Rejected { attempts: 1, .. })
    ));
    assert_eq!(h.platform.actions().len(), 1);
    assert_eq!(
        h.engine.record(&OfferId::new("o1")).unwrap().state,
        RecordState::Parked
    );
}

#[tokio::test]
async fn test_messages_disabled_sends_nothing() {
    let mut opts = options();
    opts.counter_bad_offers = true;
    opts.send_messages = false;
    let h = harness_with(
        opts,
        settings(),
        pricelist(),
        FakeInventory::new(vec![hat("h1")], refined("inv", 2)),
    );

    h.engine
        .process_offer(&offer("o1", refined("t", 10), vec![hat("h1")]))
        .await;
    assert!(h.platform.notifications().is_empty());
}
