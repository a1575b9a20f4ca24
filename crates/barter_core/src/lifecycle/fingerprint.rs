//! Content fingerprint of an offer.
//!
//! `fingerprint = xxhash64(offer_id + sorted(their assets) + sorted(our assets)
//! + their_scrap + our_scrap)`
//!
//! Asset order on the wire is not stable, so both lists are sorted first.
//! No timestamps go into the hash.

use xxhash_rust::xxh64::xxh64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferFingerprintInput<'a> {
    pub offer_id: &'a str,
    pub their_asset_ids: Vec<&'a str>,
    pub our_asset_ids: Vec<&'a str>,
    pub their_scrap: i64,
    pub our_scrap: i64,
}

pub fn compute_offer_fingerprint(input: &OfferFingerprintInput<'_>) -> u64 {
    let mut buf = Vec::with_capacity(256);

    buf.extend_from_slice(input.offer_id.as_bytes());
    buf.push(0xFF);
    push_sorted(&mut buf, &input.their_asset_ids);
    buf.push(0xFE);
    push_sorted(&mut buf, &input.our_asset_ids);
    buf.push(0xFE);
    buf.extend_from_slice(&input.their_scrap.to_le_bytes());
    buf.push(0xFF);
    buf.extend_from_slice(&input.our_scrap.to_le_bytes());

    xxh64(&buf, 0)
}

// 0xFF/0xFE never occur in UTF-8, so field boundaries stay unambiguous.
fn push_sorted(buf: &mut Vec<u8>, ids: &[&str]) {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    for id in ids {
        buf.extend_from_slice(id.as_bytes());
        buf.push(0xFF);
    }
}

pub fn format_fingerprint(hash: u64) -> String {
    format!("{hash:016x}")
}
