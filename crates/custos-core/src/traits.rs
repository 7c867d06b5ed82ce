//! Core trait definitions for the CUSTOS pipeline.
//!
//! These traits define the seams between the decision/audit core and its
//! collaborators:
//!
//! - `PermissionEngine` - pure authorization decisions over an immutable rule table
//! - `AuditStore`       - durable, append-only persistence for audit entries
//! - `PatternDetector`  - pure risk-pattern detection over a recent window
//! - `Clock`            - wall-clock source, injectable for tests
//!
//! Every PHI-touching operation calls the permission engine first; if it is
//! allowed, the recorder appends an entry through the audit store before the
//! operation is considered complete.

use chrono::{DateTime, Utc};

use custos_contracts::{
    analysis::SuspiciousPattern,
    audit::{AuditEntry, AuditFilter},
    error::CustosResult,
    rbac::{PermissionContext, PermissionResult},
};
use uuid::Uuid;

/// The authorization decision function.
///
/// Implementations hold an immutable rule table and must be pure: `check`
/// reads the context, returns a result, and mutates nothing. That makes it
/// safe to call from any number of request workers without synchronization.
/// A denial is a normal return value, never an error.
pub trait PermissionEngine: Send + Sync {
    /// Decide whether the context's role may perform its action on its
    /// resource, including per-record attribute conditions.
    fn check(&self, ctx: &PermissionContext) -> PermissionResult;
}

/// Durable, append-only persistence for the audit trail.
///
/// An entry handed to `insert` is the contract: implementations must persist
/// it atomically as a single row and must not batch or defer in a way that
/// risks loss after `Ok` is returned. Nothing in this trait can modify or
/// delete an existing entry.
pub trait AuditStore: Send + Sync {
    /// Durably append one entry. Returns the entry's id on success.
    ///
    /// A failure here is fatal to the operation being audited: callers
    /// propagate it and treat the business action as failed (fail-closed).
    fn insert(&self, entry: &AuditEntry) -> CustosResult<Uuid>;

    /// Return entries matching `filter`, ordered by timestamp ascending.
    fn query(&self, filter: &AuditFilter) -> CustosResult<Vec<AuditEntry>>;

    /// Count entries matching `filter` without materializing them.
    fn count(&self, filter: &AuditFilter) -> CustosResult<usize>;

    /// Check the store's tamper-evidence mechanism over its full contents.
    ///
    /// The reference implementation recomputes a SHA-256 hash chain.
    /// Adapters without a chain must either provide equivalent
    /// append-only guarantees or report `Ok(false)`.
    fn verify_chain(&self) -> CustosResult<bool>;
}

/// Risk-pattern detection over a bounded recent window.
///
/// Implementations must be pure functions of their inputs so the recorder
/// can run them inline at write time. `recent` is the candidate user's
/// trailing window; `candidate` is the entry just written.
pub trait PatternDetector: Send + Sync {
    fn detect(&self, recent: &[AuditEntry], candidate: &AuditEntry) -> Vec<SuspiciousPattern>;
}

/// Wall-clock source for timestamps and window calculations.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The production clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
