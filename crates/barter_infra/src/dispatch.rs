//! Outbound platform actions with bounded exponential backoff.
//!
//! The same [`RetryPolicy`] wraps accept, decline, cancel and counter.
//! Transient errors are retried; a permanent rejection stops immediately.
//! Exhaustion is logged and reported, never raised: the record is left for the
//! next sweep.

use std::sync::atomic::{AtomicU64, Ordering};

use barter_core::lifecycle::{OutboundAction, RetryPolicy};
use barter_core::offer::OfferId;
use barter_core::telemetry::emit_metric_line;

use crate::collaborators::{PlatformError, PlatformTransport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered {
        attempts: u32,
        /// Id of the replacement offer for a counter.
        new_offer_id: Option<OfferId>,
    },
    Rejected {
        attempts: u32,
        error: PlatformError,
    },
    Exhausted {
        attempts: u32,
        last_error: PlatformError,
    },
}

impl DispatchOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DispatchOutcome::Delivered { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::Delivered { .. } => "delivered",
            DispatchOutcome::Rejected { .. } => "rejected",
            DispatchOutcome::Exhausted { .. } => "exhausted",
        }
    }
}

// --- Metrics -------------------------------------------------------------

/// Outbound action counters, shared by every dispatch through one engine.
#[derive(Debug)]
pub struct DispatchMetrics {
    delivered_total: AtomicU64,
    retries_total: AtomicU64,
    rejected_total: AtomicU64,
    exhausted_total: AtomicU64,
}

impl DispatchMetrics {
    /// Create a zeroed metrics tracker.
    pub fn new() -> Self {
        Self {
            delivered_total: AtomicU64::new(0),
            retries_total: AtomicU64::new(0),
            rejected_total: AtomicU64::new(0),
            exhausted_total: AtomicU64::new(0),
        }
    }

    /// Actions the platform accepted, on any attempt.
    pub fn delivered_total(&self) -> u64 {
        self.delivered_total.load(Ordering::Relaxed)
    }

    /// Attempts beyond the first, after a transient failure.
    pub fn retries_total(&self) -> u64 {
        self.retries_total.load(Ordering::Relaxed)
    }

    /// Actions dropped on a permanent platform error.
    pub fn rejected_total(&self) -> u64 {
        self.rejected_total.load(Ordering::Relaxed)
    }

    /// Actions abandoned once the attempt bound was reached.
    pub fn exhausted_total(&self) -> u64 {
        self.exhausted_total.load(Ordering::Relaxed)
    }
}

impl Default for DispatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

// --- Dispatch ------------------------------------------------------------

async fn send_once(
    platform: &dyn PlatformTransport,
    offer_id: &OfferId,
    action: &OutboundAction,
) -> Result<Option<OfferId>, PlatformError> {
    match action {
        OutboundAction::Accept => platform.accept(offer_id).await.map(|_| None),
        OutboundAction::Decline => platform.decline(offer_id).await.map(|_| None),
        OutboundAction::Cancel => platform.cancel(offer_id).await.map(|_| None),
        OutboundAction::Counter(counter) => platform.counter(offer_id, counter).await.map(Some),
    }
}

pub async fn dispatch_with_retry(
    platform: &dyn PlatformTransport,
    policy: &RetryPolicy,
    offer_id: &OfferId,
    action: &OutboundAction,
    metrics: &DispatchMetrics,
) -> DispatchOutcome {
    let mut attempt = 1;
    let outcome = loop {
        match send_once(platform, offer_id, action).await {
            Ok(new_offer_id) => {
                metrics.delivered_total.fetch_add(1, Ordering::Relaxed);
                break DispatchOutcome::Delivered {
                    attempts: attempt,
                    new_offer_id,
                };
            }
            Err(error) if !error.is_retryable() => {
                metrics.rejected_total.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    offer_id = %offer_id,
                    action = action.label(),
                    %error,
                    "platform rejected action"
                );
                break DispatchOutcome::Rejected {
                    attempts: attempt,
                    error,
                };
            }
            Err(error) if !policy.should_retry(attempt) => {
                metrics.exhausted_total.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    offer_id = %offer_id,
                    action = action.label(),
                    attempts = attempt,
                    %error,
                    "retries exhausted; leaving offer for the next sweep"
                );
                break DispatchOutcome::Exhausted {
                    attempts: attempt,
                    last_error: error,
                };
            }
            Err(error) => {
                let delay = policy.delay_for_attempt(attempt);
                metrics.retries_total.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    offer_id = %offer_id,
                    action = action.label(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    %error,
                    "transient platform error, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    };

    emit_metric_line(
        "offer_action_total",
        &format!("action={} outcome={}", action.label(), outcome.label()),
    );
    outcome
}
