//! Audit trail contracts.
//!
//! `PhiAccessEvent` is what a caller reports after a permitted PHI-touching
//! operation. `AuditEntry` is the persisted record built from it: one entry
//! per operation, immutable once written. There is deliberately no update or
//! delete anywhere in this API; a correction is itself a new entry whose
//! metadata references the entry it corrects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rbac::{Action, Resource, Role};

/// Severity of an audit entry or a derived finding.
///
/// Ordered: `Low < Medium < High < Critical`, so `max()` over a pattern set
/// yields the escalated severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Whether an entry records a compliant operation or a detected violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceStatus {
    Compliant,
    Violation,
}

/// A caller-supplied description of one PHI-relevant operation.
///
/// The recorder turns this into an [`AuditEntry`], assigning the id,
/// timestamp, severity, and compliance status itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhiAccessEvent {
    pub user_id: String,
    pub user_role: Role,
    pub action: Action,
    pub resource_type: Resource,
    pub resource_id: Option<String>,
    pub ip_address: String,
    pub user_agent: String,
    /// Ties the entry to the request that produced it across services.
    pub correlation_id: Option<Uuid>,
    /// True when the operation touched Protected Health Information.
    pub contains_phi: bool,
    /// Whether the business operation itself succeeded.
    pub success: bool,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// One immutable row in the audit trail.
///
/// Entries are append-only: once an `AuditEntry` is persisted it is never
/// modified. The store wraps each entry in a hash-chain link so any
/// after-the-fact mutation is detectable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Store-unique identifier, assigned by the recorder.
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub user_role: Role,
    pub action: Action,
    pub resource_type: Resource,
    pub resource_id: Option<String>,
    pub ip_address: String,
    pub user_agent: String,
    pub correlation_id: Option<Uuid>,
    pub contains_phi: bool,
    pub compliance_status: ComplianceStatus,
    pub severity: Severity,
    pub success: bool,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl AuditEntry {
    /// Build an entry from a reported event.
    ///
    /// The recorder owns id and timestamp assignment so that callers cannot
    /// back-date or collide entries.
    pub fn from_event(
        event: PhiAccessEvent,
        id: Uuid,
        timestamp: DateTime<Utc>,
        severity: Severity,
        compliance_status: ComplianceStatus,
    ) -> Self {
        Self {
            id,
            timestamp,
            user_id: event.user_id,
            user_role: event.user_role,
            action: event.action,
            resource_type: event.resource_type,
            resource_id: event.resource_id,
            ip_address: event.ip_address,
            user_agent: event.user_agent,
            correlation_id: event.correlation_id,
            contains_phi: event.contains_phi,
            compliance_status,
            severity,
            success: event.success,
            metadata: event.metadata,
        }
    }
}

/// Query contract a storage adapter must satisfy.
///
/// `None` fields do not constrain. Results are always ordered by timestamp,
/// ascending, so range scans (gap detection, reports) read in time order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditFilter {
    pub user_id: Option<String>,
    pub resource_type: Option<Resource>,
    pub compliance_status: Option<ComplianceStatus>,
    /// Inclusive lower timestamp bound.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper timestamp bound.
    pub until: Option<DateTime<Utc>>,
}

impl AuditFilter {
    /// A filter constrained to one time range only.
    pub fn range(from: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            until: Some(until),
            ..Self::default()
        }
    }

    /// A filter constrained to one user's entries in a time range.
    pub fn user_range(user_id: impl Into<String>, from: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            from: Some(from),
            until: Some(until),
            ..Self::default()
        }
    }
}
