//! Currency denominations and the change-making solver.

pub mod exchange;
pub mod units;

pub use exchange::{CurrencyPlan, ExchangeError, PureHoldings, solve};
pub use units::{Denomination, MetalGrade, format_refined, refinedify, to_refined, to_scrap};
