//! Change-making solver over keys and metal.

mod common;

use barter_core::catalog::Intent;
use barter_core::currency::{Denomination, ExchangeError, MetalGrade, PureHoldings, solve};
use barter_core::item::Item;
use common::{keys, reclaimed, refined, scrap};

const KEY: i64 = 450;

fn holdings(prefix: &str, k: usize, r: usize, c: usize, s: usize) -> (Vec<Item>, PureHoldings) {
    let mut items = keys(&format!("{prefix}k"), k);
    items.extend(refined(&format!("{prefix}r"), r));
    items.extend(reclaimed(&format!("{prefix}c"), c));
    items.extend(scrap(&format!("{prefix}s"), s));
    let pure = PureHoldings::from_items(&items);
    (items, pure)
}

#[test]
fn test_feasible_iff_payer_total_covers_requirement() {
    // Payer: 1 key + 3 ref + 2 rec + 2 scrap = 485 scrap.
    let (_, ours) = holdings("o", 1, 3, 2, 2);
    // Receiver can make any change up to 548 scrap.
    let (_, theirs) = holdings("t", 0, 60, 2, 2);
    assert_eq!(ours.total_scrap(KEY), 485);

    for required in 1..=600 {
        let result = solve(&theirs, &ours, Intent::Buy, required, KEY);
        if required <= 485 {
            let plan = result.unwrap_or_else(|e| panic!("required={required}: {e}"));
            assert_eq!(
                plan.our_scrap - plan.their_scrap,
                required,
                "net transfer must be exact for required={required}"
            );
            assert!(plan.from_us.iter().all(|i| i.asset_id.starts_with('o')));
            assert!(plan.from_them.iter().all(|i| i.asset_id.starts_with('t')));
        } else {
            assert!(
                matches!(result, Err(ExchangeError::Infeasible { .. })),
                "required={required} must be infeasible"
            );
        }
    }
}

#[test]
fn test_payment_other_than_greedy_settles() {
    // We hold 1 ref + 1 rec, they hold 1 rec + 1 scrap. Paying the ref and
    // taking their rec + scrap back is the only exact split for 5 scrap.
    let (_, ours) = holdings("o", 0, 1, 1, 0);
    let (_, theirs) = holdings("t", 0, 0, 1, 1);

    let plan = solve(&theirs, &ours, Intent::Buy, 5, KEY).unwrap();
    assert_eq!(plan.our_scrap, 9);
    assert_eq!(plan.their_scrap, 4);
    assert_eq!(plan.from_us.len(), 1);
    assert_eq!(plan.from_us[0].asset_id, "or0");
    assert_eq!(plan.from_them.len(), 2);
}

/// Every exact split reachable by hand-enumerating both sides' metal.
fn settles_by_enumeration(payer: [i64; 3], receiver: [i64; 3], required: i64) -> bool {
    let values = [9, 3, 1];
    let amounts = |held: [i64; 3]| {
        let mut out = Vec::new();
        for r in 0..=held[0] {
            for c in 0..=held[1] {
                for s in 0..=held[2] {
                    out.push(r * values[0] + c * values[1] + s * values[2]);
                }
            }
        }
        out
    };
    let change = amounts(receiver);
    amounts(payer)
        .iter()
        .any(|paid| change.contains(&(paid - required)))
}

#[test]
fn test_solver_agrees_with_enumeration_on_small_holdings() {
    for pr in 0..=2 {
        for pc in 0..=2 {
            for ps in 0..=2 {
                for rr in 0..=1 {
                    for rc in 0..=2 {
                        for rs in 0..=2 {
                            let (_, ours) = holdings("o", 0, pr, pc, ps);
                            let (_, theirs) = holdings("t", 0, rr, rc, rs);
                            let payer = [pr as i64, pc as i64, ps as i64];
                            let receiver = [rr as i64, rc as i64, rs as i64];
                            for required in 1..=20 {
                                let result = solve(&theirs, &ours, Intent::Buy, required, KEY);
                                let expected = settles_by_enumeration(payer, receiver, required);
                                assert_eq!(
                                    result.is_ok(),
                                    expected,
                                    "payer={payer:?} receiver={receiver:?} required={required}"
                                );
                                if let Ok(plan) = result {
                                    assert_eq!(plan.our_scrap - plan.their_scrap, required);
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

#[test]
fn test_sell_intent_makes_them_pay() {
    let (_, theirs) = holdings("t", 2, 0, 0, 0);
    let (_, ours) = holdings("o", 0, 50, 3, 3);

    // 1 key + 1.33 ref from a partner holding only keys: they pay 2 keys,
    // we hand back the difference.
    let required = KEY + 12;
    let plan = solve(&theirs, &ours, Intent::Sell, required, KEY).unwrap();
    assert_eq!(plan.from_them.len(), 2);
    assert_eq!(plan.their_scrap - plan.our_scrap, required);
    assert_eq!(plan.our_scrap, KEY - 12);
}

#[test]
fn test_higher_denominations_are_preferred() {
    let (_, theirs) = holdings("t", 0, 0, 0, 0);
    let (_, ours) = holdings("o", 0, 5, 5, 20);

    let plan = solve(&theirs, &ours, Intent::Buy, 22, KEY).unwrap();
    let refs = plan
        .from_us
        .iter()
        .filter(|i| Denomination::of(i) == Some(Denomination::Metal(MetalGrade::Refined)))
        .count();
    assert_eq!(refs, 2);
    assert_eq!(plan.from_us.len(), 2 + 1 + 1);
}

#[test]
fn test_residual_without_change_is_reported() {
    let (_, theirs) = holdings("t", 0, 0, 0, 0);
    let (_, ours) = holdings("o", 0, 2, 0, 0);

    let err = solve(&theirs, &ours, Intent::Buy, 10, KEY).unwrap_err();
    assert_eq!(
        err,
        ExchangeError::Infeasible {
            required_scrap: 10,
            residual_scrap: 1
        }
    );
}

#[test]
fn test_invalid_inputs_are_rejected() {
    let (_, empty) = holdings("x", 0, 0, 0, 0);
    assert_eq!(
        solve(&empty, &empty, Intent::Buy, 9, 0),
        Err(ExchangeError::InvalidKeyValue(0))
    );
    assert_eq!(
        solve(&empty, &empty, Intent::Buy, -1, KEY),
        Err(ExchangeError::NegativeRequirement(-1))
    );
}

#[test]
fn test_foreign_and_untradable_units_are_never_spent() {
    let mut items = refined("o", 1);
    items[0].tradable = false;
    let mut foreign = Item::new("f", barter_core::item::REFINED_SKU);
    foreign.context_id = 6;
    items.push(foreign);
    let ours = PureHoldings::from_items(&items);
    let (_, theirs) = holdings("t", 0, 0, 0, 0);

    assert!(ours.is_empty());
    assert!(solve(&theirs, &ours, Intent::Buy, 9, KEY).is_err());
}
