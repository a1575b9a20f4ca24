//! Barter offers as delivered by the platform.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::item::{Item, Sku};

// --- Identifiers ---------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OfferId(String);

impl OfferId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartnerId(String);

impl PartnerId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// --- State ---------------------------------------------------------------

/// Platform-reported offer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferState {
    Active,
    Accepted,
    Declined,
    Countered,
    Cancelled,
    Expired,
    InvalidItems,
    InEscrow,
    NeedsConfirmation,
}

impl OfferState {
    /// Offers in these states can no longer change.
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            OfferState::Active | OfferState::InEscrow | OfferState::NeedsConfirmation
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OfferState::Active => "active",
            OfferState::Accepted => "accepted",
            OfferState::Declined => "declined",
            OfferState::Countered => "countered",
            OfferState::Cancelled => "cancelled",
            OfferState::Expired => "expired",
            OfferState::InvalidItems => "invalid_items",
            OfferState::InEscrow => "in_escrow",
            OfferState::NeedsConfirmation => "needs_confirmation",
        }
    }
}

// --- Offer ---------------------------------------------------------------

/// Coarse shape of an offer, independent of value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferShape {
    Empty,
    /// They give, we give nothing.
    Gift,
    /// We give, they give nothing.
    Taking,
    TwoSided,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub offer_id: OfferId,
    pub partner_id: PartnerId,
    pub their_items: Vec<Item>,
    pub our_items: Vec<Item>,
    pub state: OfferState,
    /// Sent by this engine rather than received.
    #[serde(default)]
    pub is_ours: bool,
    #[serde(default)]
    pub message: Option<String>,
}

impl Offer {
    pub fn shape(&self) -> OfferShape {
        match (self.their_items.is_empty(), self.our_items.is_empty()) {
            (true, true) => OfferShape::Empty,
            (false, true) => OfferShape::Gift,
            (true, false) => OfferShape::Taking,
            (false, false) => OfferShape::TwoSided,
        }
    }

    pub fn is_gift(&self) -> bool {
        self.shape() == OfferShape::Gift
    }

    pub fn is_active(&self) -> bool {
        self.state == OfferState::Active
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn their_non_pure(&self) -> Vec<&Item> {
        non_pure(&self.their_items)
    }

    pub fn our_non_pure(&self) -> Vec<&Item> {
        non_pure(&self.our_items)
    }

    /// The single distinct non-pure SKU across both sides, if exactly one.
    pub fn lone_non_pure_sku(&self) -> Option<Sku> {
        let mut skus: Vec<&Sku> = self
            .their_items
            .iter()
            .chain(self.our_items.iter())
            .filter(|i| !i.is_pure())
            .map(|i| &i.sku)
            .collect();
        skus.sort();
        skus.dedup();
        match skus.as_slice() {
            [only] => Some((*only).clone()),
            _ => None,
        }
    }

    pub fn asset_ids(&self) -> (Vec<&str>, Vec<&str>) {
        (
            self.their_items.iter().map(|i| i.asset_id.as_str()).collect(),
            self.our_items.iter().map(|i| i.asset_id.as_str()).collect(),
        )
    }
}

fn non_pure(items: &[Item]) -> Vec<&Item> {
    items.iter().filter(|i| !i.is_pure()).collect()
}
