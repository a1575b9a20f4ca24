//! Item classification.
//!
//! Every item is labelled exactly once per decision with a closed
//! [`ItemClass`]. Valuation, the stock guard and counter construction all
//! branch on that label instead of re-deriving it.

use serde::{Deserialize, Serialize};

use super::sku::Sku;
use crate::catalog::{CatalogView, PricingStore};
use crate::currency::MetalGrade;

pub const TF2_APP_ID: u32 = 440;
pub const TF2_CONTEXT_ID: u32 = 2;

// --- Item ----------------------------------------------------------------

/// One item as seen in a single trade snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Platform-assigned id, unique within one snapshot only.
    pub asset_id: String,
    pub sku: Sku,
    pub app_id: u32,
    pub context_id: u32,
    pub tradable: bool,
    pub craftable: bool,
    /// Tagged as a craftable cosmetic hat (fallback bucket candidate).
    pub craft_hat: bool,
    /// Acquisition origin reported by the platform.
    pub origin: Option<u16>,
}

impl Item {
    /// Tradable, craftable native item with no tags.
    pub fn new(asset_id: impl Into<String>, sku: impl Into<Sku>) -> Self {
        Self {
            asset_id: asset_id.into(),
            sku: sku.into(),
            app_id: TF2_APP_ID,
            context_id: TF2_CONTEXT_ID,
            tradable: true,
            craftable: true,
            craft_hat: false,
            origin: None,
        }
    }

    /// Belongs to the game and context this engine trades in.
    pub fn is_native(&self) -> bool {
        self.app_id == TF2_APP_ID && self.context_id == TF2_CONTEXT_ID
    }

    pub fn is_key(&self) -> bool {
        self.is_native() && self.sku.is_key()
    }

    pub fn metal_grade(&self) -> Option<MetalGrade> {
        if !self.is_native() {
            return None;
        }
        self.sku.metal_grade()
    }

    /// Key or metal of this game.
    pub fn is_pure(&self) -> bool {
        self.is_key() || self.metal_grade().is_some()
    }

    /// Identity across snapshots: asset ids change on every trade, so two
    /// items are the same when sku, quality and origin agree.
    pub fn same_definition(&self, other: &Item) -> bool {
        self.sku == other.sku
            && self.sku.quality() == other.sku.quality()
            && self.origin == other.origin
    }
}

// --- Class ---------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemClass {
    /// Different game or inventory context.
    Foreign,
    Key,
    Metal(MetalGrade),
    /// Has its own catalog listing.
    Listed(Sku),
    /// Priced through the craft-hat fallback bucket.
    Bucketed,
    /// Not priceable.
    Unlisted,
}

impl ItemClass {
    /// The SKU whose catalog entry prices this item.
    pub fn pricing_sku(&self) -> Option<Sku> {
        match self {
            ItemClass::Listed(sku) => Some(sku.clone()),
            ItemClass::Bucketed => Some(Sku::craft_hat_bucket()),
            _ => None,
        }
    }

    pub fn is_pure(&self) -> bool {
        matches!(self, ItemClass::Key | ItemClass::Metal(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            ItemClass::Foreign => "foreign",
            ItemClass::Key => "key",
            ItemClass::Metal(_) => "metal",
            ItemClass::Listed(_) => "listed",
            ItemClass::Bucketed => "bucketed",
            ItemClass::Unlisted => "unlisted",
        }
    }
}

/// Label `item`, first match wins: foreign, key, metal, listed, bucket,
/// unlisted.
pub fn classify<S: PricingStore + ?Sized>(item: &Item, view: &CatalogView<'_, S>) -> ItemClass {
    if !item.is_native() {
        return ItemClass::Foreign;
    }
    if item.sku.is_key() {
        return ItemClass::Key;
    }
    if let Some(grade) = item.sku.metal_grade() {
        return ItemClass::Metal(grade);
    }
    if view.is_listed(&item.sku) {
        return ItemClass::Listed(item.sku.clone());
    }
    if view.craft_hat_bucket() && item.craft_hat && view.is_listed(&Sku::craft_hat_bucket()) {
        return ItemClass::Bucketed;
    }
    ItemClass::Unlisted
}
