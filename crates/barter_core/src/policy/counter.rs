//! Counter-offer construction.
//!
//! Picks the one non-pure item the partner offered (we buy it) or asked for
//! (we sell it), re-selects it from a fresh inventory snapshot, prices it and
//! balances the rest with pure currency. One key value, the key price for the
//! counterpart intent, is used for the item and for the currency plan.

use std::fmt;

use crate::catalog::{CatalogView, Intent, PricingStore};
use crate::currency::{CurrencyPlan, ExchangeError, PureHoldings, format_refined, solve};
use crate::item::{Item, Sku, classify};
use crate::lifecycle::fingerprint::{OfferFingerprintInput, compute_offer_fingerprint};
use crate::offer::{Offer, OfferId, PartnerId};
use crate::valuation::{ValuationError, ValuationSummary, item_value, key_price_scrap};

pub const METAL_MISMATCH_MESSAGE: &str =
    "Sorry, metal did not add up for this trade. Do you have enough metal?";

// --- Target --------------------------------------------------------------

/// The item a counter offer is built around.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterTarget {
    pub intent: Intent,
    pub item: Item,
}

/// Exactly one side must carry non-pure items. Their side means we buy,
/// ours means we sell.
pub fn select_counter_target(offer: &Offer) -> Option<CounterTarget> {
    let theirs = offer.their_non_pure();
    let ours = offer.our_non_pure();
    match (theirs.first(), ours.first()) {
        (Some(item), None) => Some(CounterTarget {
            intent: Intent::Buy,
            item: (*item).clone(),
        }),
        (None, Some(item)) => Some(CounterTarget {
            intent: Intent::Sell,
            item: (*item).clone(),
        }),
        _ => None,
    }
}

// --- Counter offer -------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CounterOffer {
    pub source_offer_id: OfferId,
    pub partner_id: PartnerId,
    pub intent: Intent,
    pub item: Item,
    pub their_items: Vec<Item>,
    pub our_items: Vec<Item>,
    pub their_scrap: i64,
    pub our_scrap: i64,
    pub key_scrap: i64,
    pub message: String,
    pub fingerprint: u64,
}

impl CounterOffer {
    pub fn summary(&self) -> ValuationSummary {
        ValuationSummary::new(self.their_scrap, self.our_scrap)
    }
}

// --- Errors --------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterError {
    ItemNotFound { sku: Sku, intent: Intent },
    NotBanking { sku: Sku },
    NoPrice { sku: Sku },
    KeyPrice(ValuationError),
    Exchange(ExchangeError),
    ValueMismatch { their_scrap: i64, our_scrap: i64 },
}

impl CounterError {
    /// Explanation sent to the partner, if any.
    pub fn partner_message(&self) -> Option<String> {
        match self {
            CounterError::ItemNotFound { sku, intent } => {
                let whose = match intent {
                    Intent::Buy => "your",
                    Intent::Sell => "my",
                };
                Some(format!("Sorry, I could not find {sku} in {whose} inventory."))
            }
            CounterError::NotBanking { sku } => Some(format!("Sorry, I am not banking {sku}.")),
            CounterError::NoPrice { sku } => {
                Some(format!("Sorry, I do not have a price for {sku} right now."))
            }
            CounterError::Exchange(_) | CounterError::ValueMismatch { .. } => {
                Some(METAL_MISMATCH_MESSAGE.to_string())
            }
            CounterError::KeyPrice(_) => None,
        }
    }
}

impl fmt::Display for CounterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterError::ItemNotFound { sku, intent } => {
                write!(f, "counter item {sku} not found ({})", intent.as_str())
            }
            CounterError::NotBanking { sku } => write!(f, "{sku} is not listed"),
            CounterError::NoPrice { sku } => write!(f, "{sku} has no price"),
            CounterError::KeyPrice(err) => write!(f, "{err}"),
            CounterError::Exchange(err) => write!(f, "{err}"),
            CounterError::ValueMismatch {
                their_scrap,
                our_scrap,
            } => write!(
                f,
                "counter sides differ: their {} ref, our {} ref",
                format_refined(*their_scrap),
                format_refined(*our_scrap)
            ),
        }
    }
}

impl std::error::Error for CounterError {}

impl From<ExchangeError> for CounterError {
    fn from(err: ExchangeError) -> Self {
        CounterError::Exchange(err)
    }
}

impl From<ValuationError> for CounterError {
    fn from(err: ValuationError) -> Self {
        CounterError::KeyPrice(err)
    }
}

// --- Builder -------------------------------------------------------------

pub struct CounterRequest<'a> {
    pub offer: &'a Offer,
    pub target: &'a CounterTarget,
    /// Fresh snapshot of the partner's inventory.
    pub their_inventory: &'a [Item],
    /// Fresh snapshot of our inventory.
    pub our_inventory: &'a [Item],
    pub message: &'a str,
}

pub fn build_counter<S: PricingStore + ?Sized>(
    request: &CounterRequest<'_>,
    view: &CatalogView<'_, S>,
) -> Result<CounterOffer, CounterError> {
    let target = request.target;
    let intent = target.intent;
    let source = match intent {
        Intent::Buy => request.their_inventory,
        Intent::Sell => request.our_inventory,
    };
    let item = reselect(source, &target.item).ok_or_else(|| CounterError::ItemNotFound {
        sku: target.item.sku.clone(),
        intent,
    })?;

    let class = classify(&item, view);
    let Some(pricing_sku) = class.pricing_sku() else {
        return Err(CounterError::NotBanking {
            sku: item.sku.clone(),
        });
    };
    if !view.store().has_price(&pricing_sku) {
        return Err(CounterError::NoPrice { sku: pricing_sku });
    }

    let key_scrap = key_price_scrap(view.store(), intent.swap())?;
    let item_scrap = item_value(&class, intent, view.store(), key_scrap);
    if item_scrap <= 0 {
        return Err(CounterError::NoPrice { sku: pricing_sku });
    }

    let their_pure = PureHoldings::from_items(request.their_inventory);
    let our_pure = PureHoldings::from_items(request.our_inventory);
    let plan = solve(&their_pure, &our_pure, intent, item_scrap, key_scrap)?;

    let (their_items, our_items, their_scrap, our_scrap) =
        assemble(intent, item.clone(), item_scrap, plan);
    if their_scrap != our_scrap {
        return Err(CounterError::ValueMismatch {
            their_scrap,
            our_scrap,
        });
    }

    let fingerprint = compute_offer_fingerprint(&OfferFingerprintInput {
        offer_id: request.offer.offer_id.as_str(),
        their_asset_ids: their_items.iter().map(|i| i.asset_id.as_str()).collect(),
        our_asset_ids: our_items.iter().map(|i| i.asset_id.as_str()).collect(),
        their_scrap,
        our_scrap,
    });

    tracing::info!(
        offer_id = %request.offer.offer_id,
        intent = intent.as_str(),
        sku = %item.sku,
        value = %format_refined(item_scrap),
        "built counter offer"
    );

    Ok(CounterOffer {
        source_offer_id: request.offer.offer_id.clone(),
        partner_id: request.offer.partner_id.clone(),
        intent,
        item,
        their_items,
        our_items,
        their_scrap,
        our_scrap,
        key_scrap,
        message: request.message.to_string(),
        fingerprint,
    })
}

/// Same asset if still present and tradable, else the most recent tradable
/// item of the same SKU.
fn reselect(inventory: &[Item], wanted: &Item) -> Option<Item> {
    inventory
        .iter()
        .find(|i| i.asset_id == wanted.asset_id && i.sku == wanted.sku && i.tradable)
        .or_else(|| {
            inventory
                .iter()
                .rev()
                .find(|i| i.sku == wanted.sku && i.tradable)
        })
        .cloned()
}

fn assemble(
    intent: Intent,
    item: Item,
    item_scrap: i64,
    plan: CurrencyPlan,
) -> (Vec<Item>, Vec<Item>, i64, i64) {
    let mut their_items = Vec::with_capacity(plan.from_them.len() + 1);
    let mut our_items = Vec::with_capacity(plan.from_us.len() + 1);
    let (mut their_scrap, mut our_scrap) = (plan.their_scrap, plan.our_scrap);
    match intent {
        Intent::Buy => {
            their_items.push(item);
            their_scrap += item_scrap;
        }
        Intent::Sell => {
            our_items.push(item);
            our_scrap += item_scrap;
        }
    }
    their_items.extend(plan.from_them);
    our_items.extend(plan.from_us);
    (their_items, our_items, their_scrap, our_scrap)
}
