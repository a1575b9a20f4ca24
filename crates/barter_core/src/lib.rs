#![forbid(unsafe_code)]

pub mod catalog;
pub mod currency;
pub mod item;
pub mod lifecycle;
pub mod offer;
pub mod policy;
pub mod stock;
pub mod telemetry;
pub mod valuation;

pub use catalog::{CatalogView, Intent, Price, PricingStore, StockLevel, UNLIMITED_STOCK};
pub use item::{Item, ItemClass, Sku};
pub use offer::{Offer, OfferId, OfferShape, OfferState, PartnerId};
