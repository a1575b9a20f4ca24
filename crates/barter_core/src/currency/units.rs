//! Scrap arithmetic.
//!
//! All value math runs in integer scrap: 1 refined = 3 reclaimed = 9 scrap.
//! Refined amounts only appear at the edges (catalog prices, messages).

use serde::{Deserialize, Serialize};

use crate::item::Item;

pub const SCRAP_PER_REFINED: i64 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetalGrade {
    Refined,
    Reclaimed,
    Scrap,
}

impl MetalGrade {
    pub fn value_scrap(self) -> i64 {
        match self {
            MetalGrade::Refined => 9,
            MetalGrade::Reclaimed => 3,
            MetalGrade::Scrap => 1,
        }
    }
}

/// Pure-currency denominations, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Denomination {
    Key,
    Metal(MetalGrade),
}

impl Denomination {
    pub const DESCENDING: [Denomination; 4] = [
        Denomination::Key,
        Denomination::Metal(MetalGrade::Refined),
        Denomination::Metal(MetalGrade::Reclaimed),
        Denomination::Metal(MetalGrade::Scrap),
    ];

    pub fn of(item: &Item) -> Option<Self> {
        if item.is_key() {
            return Some(Denomination::Key);
        }
        item.metal_grade().map(Denomination::Metal)
    }

    pub fn value_scrap(self, key_scrap: i64) -> i64 {
        match self {
            Denomination::Key => key_scrap,
            Denomination::Metal(grade) => grade.value_scrap(),
        }
    }

    pub(crate) fn slot(self) -> usize {
        match self {
            Denomination::Key => 0,
            Denomination::Metal(MetalGrade::Refined) => 1,
            Denomination::Metal(MetalGrade::Reclaimed) => 2,
            Denomination::Metal(MetalGrade::Scrap) => 3,
        }
    }
}

/// Refined to scrap, rounded to the nearest scrap.
pub fn to_scrap(refined: f64) -> i64 {
    (refined * SCRAP_PER_REFINED as f64).round() as i64
}

/// Scrap to refined, truncated to two decimals (`4` scrap = `0.44`).
pub fn to_refined(scrap: i64) -> f64 {
    let hundredths = scrap * 100 / SCRAP_PER_REFINED;
    hundredths as f64 / 100.0
}

/// Snap an arbitrary refined amount onto the scrap grid.
pub fn refinedify(refined: f64) -> f64 {
    to_refined(to_scrap(refined))
}

/// Two-decimal refined string for messages.
pub fn format_refined(scrap: i64) -> String {
    format!("{:.2}", to_refined(scrap))
}
