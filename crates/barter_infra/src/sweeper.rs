//! Periodic sweep over open offer records.
//!
//! Cancels self-issued offers that outlived the stale threshold and
//! re-dispatches actions whose retries were exhausted.

use barter_core::lifecycle::{OutboundAction, RecordEvent, TransitionResult};
use tokio::sync::watch;

use crate::dispatch::DispatchOutcome;
use crate::engine::OfferEngine;
use crate::store::lock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    /// Stale issued offers whose cancel was delivered.
    pub cancelled: usize,
    /// Failed actions delivered on this pass.
    pub retried: usize,
    /// Dispatches on this pass that did not deliver.
    pub still_failed: usize,
}

impl OfferEngine {
    pub async fn sweep_once(&self) -> SweepReport {
        let now = self.now_ms();
        let threshold_ms = self.settings.stale_offer.as_millis() as u64;
        let mut report = SweepReport::default();

        let stale = {
            let mut records = lock(&self.records);
            let mut claimed = Vec::new();
            for offer_id in records.stale_issued(now, threshold_ms) {
                if let TransitionResult::Transitioned { .. } =
                    records.apply(&offer_id, RecordEvent::CancelRequested, now)
                {
                    if let Some(record) = records.get(&offer_id) {
                        claimed.push((offer_id, record.partner_id.clone()));
                    }
                }
            }
            claimed
        };
        for (offer_id, partner_id) in stale {
            tracing::info!(offer_id = %offer_id, "cancelling stale offer");
            let outcome = self
                .deliver(&offer_id, &partner_id, &OutboundAction::Cancel)
                .await;
            match outcome {
                DispatchOutcome::Delivered { .. } => report.cancelled += 1,
                _ => report.still_failed += 1,
            }
        }

        let failed = {
            let mut records = lock(&self.records);
            let mut claimed = Vec::new();
            for (offer_id, partner_id, action) in records.failed_actions() {
                if let TransitionResult::Transitioned { .. } =
                    records.apply(&offer_id, RecordEvent::RetryStarted, now)
                {
                    claimed.push((offer_id, partner_id, action));
                }
            }
            claimed
        };
        for (offer_id, partner_id, action) in failed {
            tracing::info!(offer_id = %offer_id, action = action.label(), "retrying failed action");
            if self.deliver(&offer_id, &partner_id, &action).await.is_delivered() {
                report.retried += 1;
            } else {
                report.still_failed += 1;
            }
        }

        if report != SweepReport::default() {
            tracing::info!(
                cancelled = report.cancelled,
                retried = report.retried,
                still_failed = report.still_failed,
                "sweep complete"
            );
        }
        report
    }
}

/// Sweep every `sweep_interval` until `shutdown` flips to true or its sender
/// is dropped.
pub async fn run_sweeper(engine: &OfferEngine, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(engine.settings.sweep_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                engine.sweep_once().await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    tracing::info!("sweeper stopped");
}
