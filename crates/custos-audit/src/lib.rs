//! # custos-audit
//!
//! Immutable, append-only, SHA-256 hash-chained audit store for CUSTOS.
//!
//! ## Overview
//!
//! Every audit entry the recorder persists is wrapped in a [`ChainedEntry`]
//! that links to the previous entry via its SHA-256 hash. Tampering with
//! any entry, even a single byte, breaks the chain and is detected by
//! [`verify_chain`]. This chain IS the tamper-evidence mechanism: there is
//! no mutable "tampered" flag for an attacker to leave unset.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use custos_audit::InMemoryAuditStore;
//! use custos_core::traits::AuditStore;
//!
//! let store = InMemoryAuditStore::new();
//! store.insert(&entry)?;
//! assert!(store.verify_chain()?);
//! ```

pub mod chain;
pub mod entry;
pub mod memory;

pub use chain::{hash_entry, verify_chain};
pub use entry::ChainedEntry;
pub use memory::InMemoryAuditStore;

// ── Tests ─────────────────────────────────────────────────────────────────────
