//! Trade ledger.
//!
//! One entry per offer id, written when the offer reaches a terminal state.
//! Insert-if-absent under the ledger mutex makes terminal-state processing
//! exactly-once: a second terminal notification for the same offer is a NOOP.
//! Entries are appended to a JSONL file and reloaded on restart.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use barter_core::catalog::Price;
use barter_core::item::Item;
use barter_core::lifecycle::{OfferFingerprintInput, compute_offer_fingerprint, format_fingerprint};
use barter_core::offer::{OfferId, OfferState, PartnerId};
use serde::{Deserialize, Serialize};

use super::lock;

// --- Entry ---------------------------------------------------------------

/// Key prices at the time the entry was written.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct KeyPrices {
    pub buy: Option<Price>,
    pub sell: Option<Price>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub offer_id: OfferId,
    pub partner_id: PartnerId,
    pub state: OfferState,
    /// Issued by this engine.
    pub is_ours: bool,
    pub message: Option<String>,
    pub their_items: Vec<Item>,
    pub our_items: Vec<Item>,
    /// Absent when the offer was never valued (operator, gift, routed).
    pub their_scrap: Option<i64>,
    pub our_scrap: Option<i64>,
    pub key_prices: KeyPrices,
    pub recorded_at_ms: u64,
    /// `xxh64` over offer id, both asset lists and both values.
    pub content_hash: String,
}

impl LedgerEntry {
    /// Recompute the content hash from the entry's own fields.
    pub fn compute_hash(&self) -> String {
        let hash = compute_offer_fingerprint(&OfferFingerprintInput {
            offer_id: self.offer_id.as_str(),
            their_asset_ids: self.their_items.iter().map(|i| i.asset_id.as_str()).collect(),
            our_asset_ids: self.our_items.iter().map(|i| i.asset_id.as_str()).collect(),
            their_scrap: self.their_scrap.unwrap_or(0),
            our_scrap: self.our_scrap.unwrap_or(0),
        });
        format_fingerprint(hash)
    }

    /// Fill `content_hash`.
    pub fn sealed(mut self) -> Self {
        self.content_hash = self.compute_hash();
        self
    }
}

// --- Insert result -------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    Inserted,
    /// Already recorded. Caller must NOOP.
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("trade ledger is at capacity")]
    CapacityFull,
    #[error("ledger append failed: {reason}")]
    WriteFailed { reason: String },
}

// --- Metrics -------------------------------------------------------------

/// Ledger write counters.
#[derive(Debug)]
pub struct LedgerMetrics {
    /// Terminal reports for offers already in the ledger.
    duplicates_total: AtomicU64,
    /// Entries appended.
    inserts_total: AtomicU64,
}

impl LedgerMetrics {
    /// Create a zeroed metrics tracker.
    pub fn new() -> Self {
        Self {
            duplicates_total: AtomicU64::new(0),
            inserts_total: AtomicU64::new(0),
        }
    }

    /// Record a terminal report for an offer already in the ledger.
    pub fn record_duplicate(&self) {
        self.duplicates_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an appended entry.
    pub fn record_insert(&self) {
        self.inserts_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Current value of `ledger_duplicates_total`.
    pub fn duplicates_total(&self) -> u64 {
        self.duplicates_total.load(Ordering::Relaxed)
    }

    /// Current value of `ledger_inserts_total`.
    pub fn inserts_total(&self) -> u64 {
        self.inserts_total.load(Ordering::Relaxed)
    }
}

impl Default for LedgerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

// --- Ledger --------------------------------------------------------------

#[derive(Debug)]
struct LedgerState {
    entries: HashMap<OfferId, LedgerEntry>,
    storage_file: Option<File>,
}

#[derive(Debug)]
pub struct TradeLedger {
    state: Mutex<LedgerState>,
    capacity: usize,
    metrics: LedgerMetrics,
}

impl TradeLedger {
    /// Memory-only ledger.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                entries: HashMap::new(),
                storage_file: None,
            }),
            capacity,
            metrics: LedgerMetrics::new(),
        }
    }

    /// Create or reload a ledger backed by a JSONL file.
    pub fn with_storage_path(capacity: usize, storage_path: impl AsRef<Path>) -> io::Result<Self> {
        let path = storage_path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let entries = load_entries(path)?;
        if entries.len() > capacity {
            let reason = format!(
                "trade ledger holds {} entries but capacity is {}",
                entries.len(),
                capacity
            );
            return Err(io::Error::new(io::ErrorKind::InvalidInput, reason));
        }

        let storage_file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            state: Mutex::new(LedgerState {
                entries,
                storage_file: Some(storage_file),
            }),
            capacity,
            metrics: LedgerMetrics::new(),
        })
    }

    pub fn insert_if_absent(&self, entry: LedgerEntry) -> Result<InsertResult, LedgerError> {
        let mut state = lock(&self.state);

        if state.entries.contains_key(&entry.offer_id) {
            self.metrics.record_duplicate();
            return Ok(InsertResult::Duplicate);
        }
        if state.entries.len() >= self.capacity {
            return Err(LedgerError::CapacityFull);
        }

        if let Some(file) = state.storage_file.as_mut() {
            persist_entry(file, &entry).map_err(|e| LedgerError::WriteFailed {
                reason: e.to_string(),
            })?;
        }

        state.entries.insert(entry.offer_id.clone(), entry);
        self.metrics.record_insert();
        Ok(InsertResult::Inserted)
    }

    pub fn contains(&self, offer_id: &OfferId) -> bool {
        lock(&self.state).entries.contains_key(offer_id)
    }

    pub fn get(&self, offer_id: &OfferId) -> Option<LedgerEntry> {
        lock(&self.state).entries.get(offer_id).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.state).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn metrics(&self) -> &LedgerMetrics {
        &self.metrics
    }
}

fn load_entries(path: &Path) -> io::Result<HashMap<OfferId, LedgerEntry>> {
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)?;
    let reader = BufReader::new(file);
    let mut entries = HashMap::new();
    for (index, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let entry: LedgerEntry = serde_json::from_str(trimmed).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "invalid ledger entry at line {} in {}: {e}",
                    index + 1,
                    path.display()
                ),
            )
        })?;
        if entry.content_hash != entry.compute_hash() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "content hash mismatch for offer '{}' in {}",
                    entry.offer_id,
                    path.display()
                ),
            ));
        }
        if entries.contains_key(&entry.offer_id) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "duplicate offer_id '{}' in {}",
                    entry.offer_id,
                    path.display()
                ),
            ));
        }
        entries.insert(entry.offer_id.clone(), entry);
    }

    Ok(entries)
}

fn persist_entry(file: &mut File, entry: &LedgerEntry) -> io::Result<()> {
    let line = serde_json::to_string(entry).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("failed to encode ledger entry: {e}"),
        )
    })?;
    file.write_all(line.as_bytes())?;
    file.write_all(b"\n")?;
    file.sync_all()
}
