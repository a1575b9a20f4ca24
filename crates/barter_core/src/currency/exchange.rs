//! Constrained change-making over keys and metal.
//!
//! The payer side covers `required_scrap`, overpaying when its units cannot
//! hit the amount exactly, and the receiving side hands back the difference as
//! change. Every payment the two holdings allow is considered, not just the
//! greedy one. Only units physically present in the two holdings are ever
//! used, and a plan is either exact or not returned at all.

use std::fmt;

use super::units::Denomination;
use crate::catalog::Intent;
use crate::item::Item;

const SLOTS: usize = 4;

// --- Holdings ------------------------------------------------------------

/// Tradable pure-currency items of one side, bucketed by denomination.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PureHoldings {
    slots: [Vec<Item>; SLOTS],
}

impl PureHoldings {
    /// Keep only tradable, native keys and metal.
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a Item>) -> Self {
        let mut holdings = Self::default();
        for item in items {
            if !item.tradable {
                continue;
            }
            if let Some(denom) = Denomination::of(item) {
                holdings.slots[denom.slot()].push(item.clone());
            }
        }
        holdings
    }

    pub fn count(&self, denom: Denomination) -> usize {
        self.slots[denom.slot()].len()
    }

    pub fn total_scrap(&self, key_scrap: i64) -> i64 {
        Denomination::DESCENDING
            .iter()
            .map(|d| d.value_scrap(key_scrap) * self.count(*d) as i64)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Vec::is_empty)
    }

    fn counts(&self) -> [usize; SLOTS] {
        [
            self.slots[0].len(),
            self.slots[1].len(),
            self.slots[2].len(),
            self.slots[3].len(),
        ]
    }

    fn take(&self, counts: &[usize; SLOTS]) -> Vec<Item> {
        self.slots
            .iter()
            .zip(counts.iter())
            .flat_map(|(slot, n)| slot.iter().take(*n).cloned())
            .collect()
    }
}

// --- Plan ----------------------------------------------------------------

/// Pure-currency items each side adds to an offer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurrencyPlan {
    pub from_them: Vec<Item>,
    pub from_us: Vec<Item>,
    /// Scrap value of `from_them`.
    pub their_scrap: i64,
    /// Scrap value of `from_us`.
    pub our_scrap: i64,
}

impl CurrencyPlan {
    pub fn is_empty(&self) -> bool {
        self.from_them.is_empty() && self.from_us.is_empty()
    }
}

// --- Errors --------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    /// Key value must be positive.
    InvalidKeyValue(i64),
    NegativeRequirement(i64),
    /// `residual_scrap` is what remains after the largest exact payment not
    /// exceeding the requirement.
    Infeasible {
        required_scrap: i64,
        residual_scrap: i64,
    },
}

impl fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeError::InvalidKeyValue(v) => write!(f, "invalid key value {v} scrap"),
            ExchangeError::NegativeRequirement(v) => {
                write!(f, "negative required value {v} scrap")
            }
            ExchangeError::Infeasible {
                required_scrap,
                residual_scrap,
            } => write!(
                f,
                "cannot settle {required_scrap} scrap: {residual_scrap} scrap left uncovered"
            ),
        }
    }
}

impl std::error::Error for ExchangeError {}

// --- Solver --------------------------------------------------------------

/// Cover `required_scrap` of value flowing to the receiving side.
///
/// `Intent::Buy`: we pay, they may give change. `Intent::Sell`: they pay, we
/// may give change. On success, payer value minus change equals
/// `required_scrap` exactly.
///
/// The smallest payment the receiver can balance exactly wins, so change is
/// kept minimal. Each side's units are drawn from the highest denomination
/// down. `Infeasible` means no payment and change combination drawn from the
/// two holdings closes the gap.
pub fn solve(
    their: &PureHoldings,
    our: &PureHoldings,
    intent: Intent,
    required_scrap: i64,
    key_scrap: i64,
) -> Result<CurrencyPlan, ExchangeError> {
    if key_scrap <= 0 {
        return Err(ExchangeError::InvalidKeyValue(key_scrap));
    }
    if required_scrap < 0 {
        return Err(ExchangeError::NegativeRequirement(required_scrap));
    }
    if required_scrap == 0 {
        return Ok(CurrencyPlan::default());
    }

    let (payer, receiver) = match intent {
        Intent::Buy => (our, their),
        Intent::Sell => (their, our),
    };

    let values = slot_values(key_scrap);
    let ascending = ascending_order(&values);
    let payer_held = payer.counts();
    let receiver_held = receiver.counts();
    let payer_total = scrap_of(&payer_held, &values);
    let receiver_total = scrap_of(&receiver_held, &values);

    let required = required_scrap as usize;
    let limit = payer_total.min(required_scrap + receiver_total) as usize;
    let payable = Reachable::build(&payer_held, &values, &ascending, limit);
    let changeable =
        Reachable::build(&receiver_held, &values, &ascending, limit.saturating_sub(required));

    let found = (required..=limit).find_map(|paid| {
        let change = paid - required;
        if !payable.covers(paid) || !changeable.covers(change) {
            return None;
        }
        Some((payable.decompose(paid)?, changeable.decompose(change)?))
    });
    let Some((paid, change)) = found else {
        let best = (0..=required.min(limit))
            .rev()
            .find(|a| payable.covers(*a))
            .unwrap_or(0);
        let residual_scrap = required_scrap - best as i64;
        tracing::debug!(
            required_scrap,
            residual_scrap,
            intent = intent.as_str(),
            "currency exchange infeasible"
        );
        return Err(ExchangeError::Infeasible {
            required_scrap,
            residual_scrap,
        });
    };

    let payer_scrap = scrap_of(&paid, &values);
    let change_scrap = scrap_of(&change, &values);
    let payer_items = payer.take(&paid);
    let change_items = receiver.take(&change);

    let plan = match intent {
        Intent::Buy => CurrencyPlan {
            from_us: payer_items,
            our_scrap: payer_scrap,
            from_them: change_items,
            their_scrap: change_scrap,
        },
        Intent::Sell => CurrencyPlan {
            from_them: payer_items,
            their_scrap: payer_scrap,
            from_us: change_items,
            our_scrap: change_scrap,
        },
    };
    Ok(plan)
}

fn slot_values(key_scrap: i64) -> [i64; SLOTS] {
    let mut values = [0; SLOTS];
    for denom in Denomination::DESCENDING {
        values[denom.slot()] = denom.value_scrap(key_scrap);
    }
    values
}

fn ascending_order(values: &[i64; SLOTS]) -> [usize; SLOTS] {
    let mut order = [0, 1, 2, 3];
    order.sort_by_key(|&slot| values[slot]);
    order
}

// --- Reachability --------------------------------------------------------

/// Exact amounts one side can hand over, up to a limit.
///
/// `layers[k][a]` holds when `a` is payable with the `k` smallest
/// denominations, each bounded by the units actually held.
struct Reachable<'a> {
    held: &'a [usize; SLOTS],
    values: &'a [i64; SLOTS],
    ascending: &'a [usize; SLOTS],
    layers: Vec<Vec<bool>>,
}

impl<'a> Reachable<'a> {
    fn build(
        held: &'a [usize; SLOTS],
        values: &'a [i64; SLOTS],
        ascending: &'a [usize; SLOTS],
        limit: usize,
    ) -> Self {
        let mut layers = Vec::with_capacity(SLOTS + 1);
        let mut base = vec![false; limit + 1];
        base[0] = true;
        layers.push(base);

        for &slot in ascending {
            let value = values[slot] as usize;
            let prev = &layers[layers.len() - 1];
            let mut next = vec![false; limit + 1];
            // Units of this denomination spent to first reach each amount.
            let mut used = vec![0usize; limit + 1];
            for amount in 0..=limit {
                if prev[amount] {
                    next[amount] = true;
                } else if amount >= value
                    && next[amount - value]
                    && used[amount - value] < held[slot]
                {
                    next[amount] = true;
                    used[amount] = used[amount - value] + 1;
                }
            }
            layers.push(next);
        }

        Self {
            held,
            values,
            ascending,
            layers,
        }
    }

    fn covers(&self, amount: usize) -> bool {
        self.layers[SLOTS].get(amount).copied().unwrap_or(false)
    }

    /// Unit counts for `amount`, taking as many of each higher denomination
    /// as still leaves a payable remainder.
    fn decompose(&self, amount: usize) -> Option<[usize; SLOTS]> {
        if !self.covers(amount) {
            return None;
        }
        let mut counts = [0usize; SLOTS];
        let mut rest = amount;
        for (k, &slot) in self.ascending.iter().enumerate().rev() {
            let value = self.values[slot] as usize;
            let most = self.held[slot].min(rest / value);
            let n = (0..=most).rev().find(|n| self.layers[k][rest - n * value])?;
            counts[slot] = n;
            rest -= n * value;
        }
        (rest == 0).then_some(counts)
    }
}

fn scrap_of(counts: &[usize; SLOTS], values: &[i64; SLOTS]) -> i64 {
    counts
        .iter()
        .zip(values.iter())
        .map(|(n, v)| *n as i64 * v)
        .sum()
}
