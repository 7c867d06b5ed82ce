//! The PHI access recorder: the durability boundary of the audit trail.
//!
//! The recorder enforces two rules, in this order:
//!
//! 1. **Fail-closed primary write.** The audit entry for a PHI-relevant
//!    operation is durably inserted before the operation is considered
//!    complete. If the insert fails, `AuditWriteFailed` propagates and the
//!    caller must abort the business action.
//! 2. **Best-effort detection.** Pattern detection and the linked
//!    suspicious-activity entry run after the primary entry has committed.
//!    A failure anywhere in that phase is logged and swallowed; it can
//!    never retroactively void the primary record.
//!
//! The ordering is deliberate: a compliance record may not be lost because
//! an unrelated analytics step failed.

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use custos_contracts::{
    analysis::SuspiciousPattern,
    audit::{AuditEntry, AuditFilter, ComplianceStatus, PhiAccessEvent, Severity},
    error::CustosResult,
};

use crate::traits::{AuditStore, Clock, PatternDetector};

/// Metadata key on a suspicious-activity entry pointing at the primary
/// entry it was derived from.
pub const RELATED_ENTRY_KEY: &str = "relatedEntryId";

/// Metadata key holding the serialized pattern list on a
/// suspicious-activity entry.
pub const PATTERNS_KEY: &str = "patterns";

/// Records one immutable audit entry per PHI-relevant operation and runs
/// inline pattern detection against the user's recent history.
///
/// Construct one recorder per process and share it behind `Arc`; all
/// methods take `&self`.
pub struct PhiAccessRecorder {
    store: Arc<dyn AuditStore>,
    clock: Arc<dyn Clock>,
    detector: Arc<dyn PatternDetector>,
    /// How far back the per-write detection window reaches.
    detection_window: Duration,
}

impl PhiAccessRecorder {
    /// Create a recorder with the default 24-hour detection window.
    pub fn new(
        store: Arc<dyn AuditStore>,
        clock: Arc<dyn Clock>,
        detector: Arc<dyn PatternDetector>,
    ) -> Self {
        Self {
            store,
            clock,
            detector,
            detection_window: Duration::hours(24),
        }
    }

    /// Override the trailing window the per-write detection reads.
    pub fn with_detection_window(mut self, window: Duration) -> Self {
        self.detection_window = window;
        self
    }

    /// Durably record one PHI-relevant operation.
    ///
    /// Returns the primary entry as written. Returns `AuditWriteFailed`
    /// when the durable insert cannot complete, in which case the caller
    /// must treat the triggering operation as failed.
    pub fn log_phi_access(&self, event: PhiAccessEvent) -> CustosResult<AuditEntry> {
        let timestamp = self.clock.now();
        let severity = if event.contains_phi {
            Severity::Medium
        } else {
            Severity::Low
        };

        let entry = AuditEntry::from_event(
            event,
            Uuid::new_v4(),
            timestamp,
            severity,
            ComplianceStatus::Compliant,
        );

        // Primary write: fail-closed. No detection has run yet, so nothing
        // downstream can interfere with this insert.
        self.store.insert(&entry)?;

        info!(
            entry_id = %entry.id,
            user_id = %entry.user_id,
            action = %entry.action,
            resource = %entry.resource_type,
            contains_phi = entry.contains_phi,
            "audit entry recorded"
        );

        // Everything past this point is best-effort.
        self.flag_suspicious_activity(&entry);

        Ok(entry)
    }

    /// Run the pattern detector over the user's trailing window and, when
    /// patterns fire, append a linked violation entry.
    ///
    /// Failures here are logged and dropped: the primary entry is already
    /// durable, and an occasional missed detection is an accepted tradeoff.
    fn flag_suspicious_activity(&self, primary: &AuditEntry) {
        let window_start = primary.timestamp - self.detection_window;
        let filter =
            AuditFilter::user_range(primary.user_id.clone(), window_start, primary.timestamp);

        let recent = match self.store.query(&filter) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    entry_id = %primary.id,
                    error = %e,
                    "pattern detection skipped: recent-window query failed"
                );
                return;
            }
        };

        let patterns = self.detector.detect(&recent, primary);
        if patterns.is_empty() {
            debug!(entry_id = %primary.id, "no suspicious patterns in recent window");
            return;
        }

        let violation = self.build_violation_entry(primary, &patterns);

        match self.store.insert(&violation) {
            Ok(_) => {
                warn!(
                    entry_id = %violation.id,
                    related_entry_id = %primary.id,
                    user_id = %primary.user_id,
                    pattern_count = patterns.len(),
                    severity = ?violation.severity,
                    "suspicious activity recorded"
                );
            }
            Err(e) => {
                // The primary record is already durable; only the derived
                // violation entry is lost.
                warn!(
                    related_entry_id = %primary.id,
                    error = %e,
                    "suspicious-activity entry dropped"
                );
            }
        }
    }

    /// Build the linked violation entry describing detected patterns.
    fn build_violation_entry(
        &self,
        primary: &AuditEntry,
        patterns: &[SuspiciousPattern],
    ) -> AuditEntry {
        let severity = patterns
            .iter()
            .map(|p| p.severity)
            .max()
            .unwrap_or(Severity::Medium);

        let mut metadata = serde_json::Map::new();
        metadata.insert(
            RELATED_ENTRY_KEY.to_string(),
            serde_json::Value::String(primary.id.to_string()),
        );
        metadata.insert(
            PATTERNS_KEY.to_string(),
            serde_json::to_value(patterns).unwrap_or(serde_json::Value::Null),
        );

        AuditEntry {
            id: Uuid::new_v4(),
            timestamp: self.clock.now(),
            user_id: primary.user_id.clone(),
            user_role: primary.user_role,
            action: primary.action,
            resource_type: primary.resource_type,
            resource_id: primary.resource_id.clone(),
            ip_address: primary.ip_address.clone(),
            user_agent: primary.user_agent.clone(),
            correlation_id: primary.correlation_id,
            contains_phi: false,
            compliance_status: ComplianceStatus::Violation,
            severity,
            success: true,
            metadata,
        }
    }
}
