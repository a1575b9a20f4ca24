//! Storage: pricelist, inventory snapshot, trade ledger.

pub mod inventory;
pub mod ledger;
pub mod pricelist;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use inventory::{InventoryBook, ReconcileError, ReconcileReport};
pub use ledger::{InsertResult, KeyPrices, LedgerEntry, LedgerError, LedgerMetrics, TradeLedger};
pub use pricelist::{CatalogEntry, Pricelist};

/// Lock, recovering the guard if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
