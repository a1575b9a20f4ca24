//! Price feed: warm-up gate, autopriced-only writes, bad updates.

mod common;

use std::sync::Arc;
use std::time::Duration;

use barter_core::catalog::{Intent, Price, PricingStore};
use barter_core::item::{KEY_SKU, Sku};
use barter_infra::OutcomeKind;
use barter_infra::collaborators::CatalogWriteError;
use barter_infra::engine::{Collaborators, OfferEngine};
use barter_infra::price_feed::{PriceUpdate, PriceUpdateError, price_feed};
use barter_infra::store::{CatalogEntry, Pricelist, TradeLedger};
use common::{FakeInventory, FakePlatform, HAT_SKU, offer, options, refined, settings};

fn autopriced_catalog() -> Arc<Pricelist> {
    Arc::new(Pricelist::from_entries([
        CatalogEntry::new(KEY_SKU, Price::metal(50.0), Price::metal(52.0)),
        CatalogEntry::new(HAT_SKU, Price::metal(1.0), Price::metal(1.11)).autopriced(),
        CatalogEntry::new("378;6", Price::metal(3.0), Price::metal(3.33)),
    ]))
}

#[test]
fn test_warm_up_applies_autopriced_only_and_opens_gate() {
    let catalog = autopriced_catalog();
    let (_tx, feed, gate) = price_feed(8, catalog.clone());
    assert!(!gate.is_ready());

    let report = feed.warm_up(&[
        PriceUpdate::new(HAT_SKU, Price::metal(10.0), Price::metal(12.0)),
        PriceUpdate::new("378;6", Price::metal(9.0), Price::metal(9.5)),
        PriceUpdate::new("999;6", Price::metal(1.0), Price::metal(1.0)),
    ]);

    assert_eq!(report.applied, 1);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.rejected, 0);
    assert!(gate.is_ready());
    assert_eq!(
        catalog.price(&Sku::new(HAT_SKU), Intent::Sell),
        Some(Price::metal(12.0))
    );
    assert_eq!(
        catalog.price(&Sku::new("378;6"), Intent::Buy),
        Some(Price::metal(3.0))
    );
}

#[test]
fn test_invalid_updates_rejected() {
    let catalog = autopriced_catalog();
    let (_tx, feed, _gate) = price_feed(8, catalog.clone());

    let negative = PriceUpdate::new(HAT_SKU, Price::metal(-1.0), Price::metal(1.0));
    assert!(matches!(
        feed.apply(&negative),
        Err(PriceUpdateError::Catalog(CatalogWriteError::InvalidPrice { .. }))
    ));

    let one_sided = PriceUpdate {
        sku: Sku::new(HAT_SKU),
        buy: Some(Price::metal(2.0)),
        sell: None,
    };
    assert_eq!(
        feed.apply(&one_sided),
        Err(PriceUpdateError::MissingSide(Sku::new(HAT_SKU)))
    );
    assert_eq!(feed.metrics().rejected_total(), 2);
    assert_eq!(
        catalog.price(&Sku::new(HAT_SKU), Intent::Buy),
        Some(Price::metal(1.0))
    );
}

#[tokio::test]
async fn test_run_drains_channel_until_senders_drop() {
    let catalog = autopriced_catalog();
    let (tx, feed, _gate) = price_feed(2, catalog.clone());
    let task = tokio::spawn(feed.run());

    tx.publish(PriceUpdate::new(HAT_SKU, Price::metal(4.0), Price::metal(4.44)))
        .await
        .unwrap();
    drop(tx);
    task.await.unwrap();

    assert_eq!(
        catalog.price(&Sku::new(HAT_SKU), Intent::Buy),
        Some(Price::metal(4.0))
    );
}

#[tokio::test]
async fn test_try_publish_reports_full_channel() {
    let (tx, _feed, _gate) = price_feed(1, autopriced_catalog());
    tx.try_publish(PriceUpdate::new(HAT_SKU, Price::metal(1.0), Price::metal(1.0)))
        .unwrap();
    assert_eq!(
        tx.try_publish(PriceUpdate::new(HAT_SKU, Price::metal(2.0), Price::metal(2.0))),
        Err(PriceUpdateError::Full)
    );
}

#[tokio::test(start_paused = true)]
async fn test_engine_waits_for_warm_up() {
    let catalog = autopriced_catalog();
    let (_tx, feed, gate) = price_feed(8, catalog.clone());
    let platform = Arc::new(FakePlatform::default());
    let engine = OfferEngine::new(
        Collaborators {
            catalog: catalog.clone(),
            inventory: Arc::new(FakeInventory::default()),
            platform: platform.clone(),
            reputation: None,
            arbitrage: None,
        },
        options(),
        settings(),
        gate,
        TradeLedger::new(16),
    )
    .unwrap();

    // Valued at the warmed-up 12.00 sell price, not the stale 1.11.
    let fair = offer(
        "o1",
        refined("t", 12),
        vec![barter_core::item::Item::new("h1", HAT_SKU)],
    );
    let warm = async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(platform.actions().is_empty());
        feed.warm_up(&[PriceUpdate::new(
            HAT_SKU,
            Price::metal(10.0),
            Price::metal(12.0),
        )]);
    };
    let (outcome, ()) = tokio::join!(engine.process_offer(&fair), warm);

    assert_eq!(outcome.kind, OutcomeKind::Accepted);
    assert_eq!(outcome.valuation.unwrap().our_scrap, 108);
}

#[tokio::test]
async fn test_engine_refuses_to_start_without_key_price() {
    let catalog = Arc::new(Pricelist::from_entries([CatalogEntry::new(
        HAT_SKU,
        Price::metal(1.0),
        Price::metal(1.11),
    )]));
    let result = OfferEngine::new(
        Collaborators {
            catalog,
            inventory: Arc::new(FakeInventory::default()),
            platform: Arc::new(FakePlatform::default()),
            reputation: None,
            arbitrage: None,
        },
        options(),
        settings(),
        barter_infra::price_feed::WarmupGate::open(),
        TradeLedger::new(16),
    );
    assert!(matches!(
        result,
        Err(barter_infra::config::ConfigurationError::MissingKeyPrice(_))
    ));
}
