//! Engine configuration.
//!
//! Numeric knobs live in the [`EngineParam`] table with documented defaults.
//! A missing value falls back to its default; a value that is present but
//! non-finite or negative fails closed. Policy switches and canned messages are
//! plain serde options.

use std::collections::BTreeMap;
use std::time::Duration;

use barter_core::catalog::{Intent, PricingStore};
use barter_core::lifecycle::RetryPolicy;
use barter_core::offer::PartnerId;
use barter_core::policy::PolicySettings;
use barter_core::valuation::key_price_scrap;
use serde::{Deserialize, Serialize};

// --- Errors --------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("config fail-closed: '{param_name}' {reason}")]
    InvalidParam {
        param_name: &'static str,
        reason: &'static str,
    },
    #[error("no usable {} price for the key", .0.as_str())]
    MissingKeyPrice(Intent),
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),
    #[error("unknown engine parameter '{0}'")]
    UnknownParam(String),
    #[error("invalid engine options: {0}")]
    InvalidOptions(#[from] serde_json::Error),
}

// --- Numeric parameters --------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineParam {
    /// Attempts per outbound action before giving up until the next sweep.
    MaxActionAttempts,
    RetryBaseDelayMs,
    RetryBackoffMultiplier,
    /// Age after which a self-issued offer is cancelled.
    StaleOfferS,
    SweepIntervalS,
    PriceFeedCapacity,
    LedgerCapacity,
}

pub const ALL_PARAMS: &[EngineParam] = &[
    EngineParam::MaxActionAttempts,
    EngineParam::RetryBaseDelayMs,
    EngineParam::RetryBackoffMultiplier,
    EngineParam::StaleOfferS,
    EngineParam::SweepIntervalS,
    EngineParam::PriceFeedCapacity,
    EngineParam::LedgerCapacity,
];

pub fn param_default(param: EngineParam) -> Option<f64> {
    match param {
        EngineParam::MaxActionAttempts => Some(5.0),
        EngineParam::RetryBaseDelayMs => Some(1000.0),
        EngineParam::RetryBackoffMultiplier => Some(2.0),
        EngineParam::StaleOfferS => Some(300.0),
        EngineParam::SweepIntervalS => Some(15.0),
        EngineParam::PriceFeedCapacity => Some(256.0),
        EngineParam::LedgerCapacity => Some(100_000.0),
    }
}

pub fn param_name(param: EngineParam) -> &'static str {
    match param {
        EngineParam::MaxActionAttempts => "max_action_attempts",
        EngineParam::RetryBaseDelayMs => "retry_base_delay_ms",
        EngineParam::RetryBackoffMultiplier => "retry_backoff_multiplier",
        EngineParam::StaleOfferS => "stale_offer_s",
        EngineParam::SweepIntervalS => "sweep_interval_s",
        EngineParam::PriceFeedCapacity => "price_feed_capacity",
        EngineParam::LedgerCapacity => "ledger_capacity",
    }
}

fn param_by_name(name: &str) -> Option<EngineParam> {
    ALL_PARAMS.iter().copied().find(|p| param_name(*p) == name)
}

/// Explicit value, else default, else fail closed.
pub fn resolve_param(param: EngineParam, value: Option<f64>) -> Result<f64, ConfigurationError> {
    if let Some(v) = value {
        if !v.is_finite() {
            return Err(ConfigurationError::InvalidParam {
                param_name: param_name(param),
                reason: "is non-finite",
            });
        }
        if v < 0.0 {
            return Err(ConfigurationError::InvalidParam {
                param_name: param_name(param),
                reason: "is negative",
            });
        }
        return Ok(v);
    }
    param_default(param).ok_or(ConfigurationError::InvalidParam {
        param_name: param_name(param),
        reason: "is missing and has no default",
    })
}

// --- Options -------------------------------------------------------------

/// Canned partner messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    pub counter: String,
    pub accepted: String,
    pub declined: String,
    pub cancelled: String,
    pub invalid_items: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            counter: "Your offer did not match my prices, so I sent a counter offer.".into(),
            accepted: "Success! The trade went through.".into(),
            declined: "Your offer was declined.".into(),
            cancelled: "The offer was cancelled because it was not answered in time.".into(),
            invalid_items: "The offer contained items that are no longer available.".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// The bot's own platform account.
    pub account_id: String,
    pub accept_gifts: bool,
    pub counter_bad_offers: bool,
    pub decline_trade_hold: bool,
    /// Price unlisted craft hats through the fallback bucket.
    pub enable_craft_hats: bool,
    pub enable_arbitrage: bool,
    pub send_messages: bool,
    pub operators: Vec<PartnerId>,
    pub blacklist: Vec<PartnerId>,
    pub messages: Messages,
    /// Overrides keyed by [`param_name`].
    pub params: BTreeMap<String, f64>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            account_id: String::new(),
            accept_gifts: true,
            counter_bad_offers: false,
            decline_trade_hold: true,
            enable_craft_hats: false,
            enable_arbitrage: false,
            send_messages: true,
            operators: Vec::new(),
            blacklist: Vec::new(),
            messages: Messages::default(),
            params: BTreeMap::new(),
        }
    }
}

impl EngineOptions {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigurationError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn policy_settings(&self) -> PolicySettings {
        PolicySettings {
            accept_gifts: self.accept_gifts,
            counter_bad_offers: self.counter_bad_offers,
            decline_trade_hold: self.decline_trade_hold,
            enable_arbitrage: self.enable_arbitrage,
        }
    }

    pub fn is_operator(&self, partner: &PartnerId) -> bool {
        self.operators.contains(partner)
    }

    pub fn is_blacklisted(&self, partner: &PartnerId) -> bool {
        self.blacklist.contains(partner)
    }

    fn param(&self, param: EngineParam) -> Result<f64, ConfigurationError> {
        resolve_param(param, self.params.get(param_name(param)).copied())
    }

    /// Resolve every numeric knob. Unknown override names are rejected.
    pub fn settings(&self) -> Result<EngineSettings, ConfigurationError> {
        if let Some(unknown) = self.params.keys().find(|k| param_by_name(k).is_none()) {
            return Err(ConfigurationError::UnknownParam(unknown.clone()));
        }
        let attempts = self.param(EngineParam::MaxActionAttempts)? as u32;
        let base = Duration::from_millis(self.param(EngineParam::RetryBaseDelayMs)? as u64);
        let multiplier = self.param(EngineParam::RetryBackoffMultiplier)?;
        Ok(EngineSettings {
            retry: RetryPolicy::new(attempts, base, multiplier),
            stale_offer: Duration::from_secs_f64(self.param(EngineParam::StaleOfferS)?),
            sweep_interval: Duration::from_secs_f64(self.param(EngineParam::SweepIntervalS)?),
            price_feed_capacity: (self.param(EngineParam::PriceFeedCapacity)? as usize).max(1),
            ledger_capacity: self.param(EngineParam::LedgerCapacity)? as usize,
        })
    }
}

/// Resolved numeric settings.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub retry: RetryPolicy,
    pub stale_offer: Duration,
    pub sweep_interval: Duration,
    pub price_feed_capacity: usize,
    pub ledger_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            stale_offer: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(15),
            price_feed_capacity: 256,
            ledger_capacity: 100_000,
        }
    }
}

/// Checks that must pass before the engine takes its first offer.
pub fn validate_startup<S: PricingStore + ?Sized>(
    options: &EngineOptions,
    store: &S,
) -> Result<(), ConfigurationError> {
    if options.account_id.trim().is_empty() {
        return Err(ConfigurationError::MissingCredential("account_id"));
    }
    for intent in [Intent::Buy, Intent::Sell] {
        key_price_scrap(store, intent).map_err(|_| ConfigurationError::MissingKeyPrice(intent))?;
    }
    Ok(())
}
