//! Hash-chain primitives: hashing and chain integrity verification.
//!
//! Hash input layout (bytes, in order):
//!   1. sequence as 8-byte little-endian
//!   2. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   3. canonical JSON of the audit entry (serde_json, no pretty-printing)
//!
//! Every field that contributes to a link's hash is listed explicitly so
//! nothing is accidentally omitted. The entry's own id and timestamp are
//! committed through its JSON form.

use sha2::{Digest, Sha256};

use custos_contracts::audit::AuditEntry;

use crate::entry::ChainedEntry;

/// Compute the SHA-256 hash for a single chain link.
///
/// Returns a lowercase 64-character hex string.
///
/// # Panics
///
/// Panics if `entry` cannot be serialized to JSON, which cannot happen for
/// the well-formed `AuditEntry` type.
pub fn hash_entry(sequence: u64, prev_hash: &str, entry: &AuditEntry) -> String {
    let entry_json =
        serde_json::to_vec(entry).expect("AuditEntry must always be serializable to JSON");

    let mut hasher = Sha256::new();
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&entry_json);

    hex::encode(hasher.finalize())
}

/// Verify the integrity of a hash chain.
///
/// Returns `true` when the chain is valid according to both rules:
///
/// 1. **Prev-hash linkage** - each link's `prev_hash` equals the
///    `this_hash` of the preceding link (or `GENESIS_HASH` for link 0).
/// 2. **Hash correctness** - each link's `this_hash` matches the value
///    recomputed from its own fields.
///
/// Returns `false` the moment any mismatch is detected. An empty chain is
/// defined as valid.
pub fn verify_chain(links: &[ChainedEntry]) -> bool {
    let mut expected_prev = ChainedEntry::GENESIS_HASH.to_string();

    for link in links {
        if link.prev_hash != expected_prev {
            return false;
        }

        let recomputed = hash_entry(link.sequence, &link.prev_hash, &link.entry);
        if link.this_hash != recomputed {
            return false;
        }

        expected_prev = link.this_hash.clone();
    }

    true
}
