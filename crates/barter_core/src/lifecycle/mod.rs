//! Offer lifecycle bookkeeping: the record table, retry policy and content
//! fingerprints.

pub mod fingerprint;
pub mod record;
pub mod retry;

pub use fingerprint::{OfferFingerprintInput, compute_offer_fingerprint, format_fingerprint};
pub use record::{
    InsertResult, OfferOrigin, OfferRecord, OfferRecordTable, OutboundAction, RecordEvent,
    RecordMetrics, RecordState, TransitionResult,
};
pub use retry::RetryPolicy;
