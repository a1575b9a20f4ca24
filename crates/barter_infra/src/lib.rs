#![forbid(unsafe_code)]

pub mod collaborators;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod price_feed;
pub mod store;
pub mod sweeper;

pub use engine::{Collaborators, DecisionOutcome, OfferEngine, OutcomeKind};
