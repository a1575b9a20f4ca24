//! Items and their classification.

pub mod classify;
pub mod sku;

pub use classify::{Item, ItemClass, TF2_APP_ID, TF2_CONTEXT_ID, classify};
pub use sku::{
    CRAFT_HAT_SKU, ItemAttributes, KEY_SKU, RECLAIMED_SKU, REFINED_SKU, SCRAP_SKU, Sku,
    SkuParseError,
};
