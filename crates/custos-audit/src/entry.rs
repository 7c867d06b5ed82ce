//! The chained wrapper around a persisted audit entry.
//!
//! `ChainedEntry` is what the store actually holds: the immutable
//! `AuditEntry` plus sequence numbering and the SHA-256 hashes that make
//! tampering detectable. The chain is the tamper-evidence mechanism; there
//! is no mutable "tampered" flag anywhere in the system.

use serde::{Deserialize, Serialize};

use custos_contracts::audit::AuditEntry;

/// A single link in the audit hash chain.
///
/// Each link commits to the previous link via `prev_hash`. Modifying any
/// field of the embedded `entry` invalidates `this_hash` and every
/// subsequent `prev_hash`, which `verify_chain` detects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainedEntry {
    /// Monotonically increasing position in the chain, starting at 0.
    pub sequence: u64,

    /// The immutable audit entry.
    pub entry: AuditEntry,

    /// SHA-256 hash (hex) of the previous link, or `GENESIS_HASH` for the
    /// first link.
    pub prev_hash: String,

    /// SHA-256 hash (hex) of this link's canonical content, computed by
    /// `hash_entry()` over (sequence, prev_hash, canonical JSON of entry).
    pub this_hash: String,
}

impl ChainedEntry {
    /// The sentinel `prev_hash` for the first link of every chain.
    ///
    /// 64 hex zeros, a value that can never be the SHA-256 of real data,
    /// making genesis detection unambiguous.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}
