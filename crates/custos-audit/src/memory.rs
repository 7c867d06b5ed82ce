//! In-memory implementation of `AuditStore`.
//!
//! `InMemoryAuditStore` is the reference implementation of the
//! [`AuditStore`](custos_core::traits::AuditStore) contract: append-only,
//! hash-chained, filterable by user, resource type, compliance status, and
//! time range. It keeps all links in a `Vec` behind a `Mutex`, making it
//! safe to share across request workers.
//!
//! It is a reference and test store, not a production design: the contract
//! is written for an indexed, append-only database adapter to satisfy, and
//! in-memory structures should only ever serve as bounded caches.

use std::sync::{Arc, Mutex};

use tracing::debug;
use uuid::Uuid;

use custos_contracts::{
    audit::{AuditEntry, AuditFilter},
    error::{CustosError, CustosResult},
};
use custos_core::traits::AuditStore;

use crate::{
    chain::{hash_entry, verify_chain},
    entry::ChainedEntry,
};

// ── Internal mutable state ────────────────────────────────────────────────────

/// The mutable interior of an `InMemoryAuditStore`.
pub(crate) struct InMemoryState {
    /// All links written so far, in append order.
    pub(crate) links: Vec<ChainedEntry>,

    /// The next sequence number to assign (starts at 0).
    pub(crate) sequence: u64,

    /// The `this_hash` of the last written link, or `GENESIS_HASH` before
    /// any link has been written.
    pub(crate) last_hash: String,
}

// ── Public store ──────────────────────────────────────────────────────────────

/// An in-memory, append-only audit store backed by a SHA-256 hash chain.
///
/// # Thread safety
///
/// Every method acquires a `Mutex` internally; each insert is a single
/// atomic append, so concurrent writers cannot lose entries.
pub struct InMemoryAuditStore {
    pub(crate) state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryAuditStore {
    /// Create an empty store with `last_hash` initialized to the genesis
    /// sentinel, so the first link's `prev_hash` is automatically correct.
    pub fn new() -> Self {
        let state = InMemoryState {
            links: Vec::new(),
            sequence: 0,
            last_hash: ChainedEntry::GENESIS_HASH.to_string(),
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// All chain links in append order. Used by operators exporting the
    /// trail for offline verification.
    pub fn export_chain(&self) -> Vec<ChainedEntry> {
        let state = self.state.lock().expect("audit state lock poisoned");
        state.links.clone()
    }
}

impl Default for InMemoryAuditStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Return true when `entry` satisfies every constraint `filter` carries.
fn matches_filter(entry: &AuditEntry, filter: &AuditFilter) -> bool {
    if let Some(user_id) = &filter.user_id {
        if &entry.user_id != user_id {
            return false;
        }
    }
    if let Some(resource_type) = filter.resource_type {
        if entry.resource_type != resource_type {
            return false;
        }
    }
    if let Some(status) = filter.compliance_status {
        if entry.compliance_status != status {
            return false;
        }
    }
    if let Some(from) = filter.from {
        if entry.timestamp < from {
            return false;
        }
    }
    if let Some(until) = filter.until {
        if entry.timestamp > until {
            return false;
        }
    }
    true
}

impl AuditStore for InMemoryAuditStore {
    /// Append one entry to the hash chain.
    ///
    /// Computes `this_hash` from (sequence, prev_hash, entry), wraps the
    /// entry in a `ChainedEntry`, appends it, then advances the sequence
    /// counter and `last_hash`. The append happens under one lock
    /// acquisition, so it is atomic with respect to other writers.
    ///
    /// Returns `Err(AuditWriteFailed)` only if the internal mutex is
    /// poisoned, which cannot happen under normal operation.
    fn insert(&self, entry: &AuditEntry) -> CustosResult<Uuid> {
        let mut state = self.state.lock().map_err(|e| CustosError::AuditWriteFailed {
            reason: format!("audit state lock poisoned: {}", e),
        })?;

        let prev_hash = state.last_hash.clone();
        let sequence = state.sequence;
        let this_hash = hash_entry(sequence, &prev_hash, entry);

        let link = ChainedEntry {
            sequence,
            entry: entry.clone(),
            prev_hash,
            this_hash: this_hash.clone(),
        };

        state.links.push(link);
        state.sequence += 1;
        state.last_hash = this_hash;

        debug!(entry_id = %entry.id, sequence, "audit entry appended to chain");

        Ok(entry.id)
    }

    /// Return matching entries ordered by timestamp ascending.
    fn query(&self, filter: &AuditFilter) -> CustosResult<Vec<AuditEntry>> {
        let state = self.state.lock().map_err(|e| CustosError::StoreError {
            reason: format!("audit state lock poisoned: {}", e),
        })?;

        let mut matched: Vec<AuditEntry> = state
            .links
            .iter()
            .map(|link| &link.entry)
            .filter(|entry| matches_filter(entry, filter))
            .cloned()
            .collect();
        matched.sort_by_key(|entry| entry.timestamp);

        Ok(matched)
    }

    fn count(&self, filter: &AuditFilter) -> CustosResult<usize> {
        let state = self.state.lock().map_err(|e| CustosError::StoreError {
            reason: format!("audit state lock poisoned: {}", e),
        })?;

        Ok(state
            .links
            .iter()
            .filter(|link| matches_filter(&link.entry, filter))
            .count())
    }

    /// Recompute the full chain and report whether it is intact.
    fn verify_chain(&self) -> CustosResult<bool> {
        let state = self.state.lock().map_err(|e| CustosError::StoreError {
            reason: format!("audit state lock poisoned: {}", e),
        })?;

        Ok(verify_chain(&state.links))
    }
}
