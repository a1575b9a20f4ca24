//! Offer decision policy and counter construction.

pub mod counter;
pub mod decision;

pub use counter::{
    CounterError, CounterOffer, CounterRequest, CounterTarget, METAL_MISMATCH_MESSAGE,
    build_counter, select_counter_target,
};
pub use decision::{
    Decision, DecisionInput, DecisionMetrics, DecisionReason, PartnerFacts, PolicySettings,
    PolicyStep, Verdict, decide,
};
