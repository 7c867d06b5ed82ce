//! # custos-core
//!
//! Trait seams and the fail-closed PHI access recorder for CUSTOS.
//!
//! This crate provides:
//! - The four core traits (`PermissionEngine`, `AuditStore`,
//!   `PatternDetector`, `Clock`)
//! - The `PhiAccessRecorder` that wires durable audit writes and inline
//!   pattern detection in the correct order
//!
//! ## Usage
//!
//! ```rust,ignore
//! use custos_core::{PhiAccessRecorder, traits::{AuditStore, Clock, PatternDetector}};
//! ```

pub mod recorder;
pub mod traits;

pub use recorder::PhiAccessRecorder;

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, TimeZone, Utc};
    use uuid::Uuid;

    use custos_contracts::{
        analysis::{PatternKind, SuspiciousPattern},
        audit::{AuditEntry, AuditFilter, ComplianceStatus, PhiAccessEvent, Severity},
        error::{CustosError, CustosResult},
        rbac::{Action, Resource, Role},
    };

    use crate::recorder::{PhiAccessRecorder, PATTERNS_KEY, RELATED_ENTRY_KEY};
    use crate::traits::{AuditStore, Clock, PatternDetector};

    // ── Test doubles ──────────────────────────────────────────────────────────

    /// Plain vector-backed store with switchable failure modes.
    struct TestStore {
        entries: Mutex<Vec<AuditEntry>>,
        /// Inserts fail once this many have succeeded.
        fail_inserts_after: Option<usize>,
        fail_queries: bool,
    }

    impl TestStore {
        fn new() -> Self {
            Self {
                entries: Mutex::new(Vec::new()),
                fail_inserts_after: None,
                fail_queries: false,
            }
        }

        fn failing_inserts_after(limit: usize) -> Self {
            Self {
                fail_inserts_after: Some(limit),
                ..Self::new()
            }
        }

        fn failing_queries() -> Self {
            Self {
                fail_queries: true,
                ..Self::new()
            }
        }

        fn stored(&self) -> Vec<AuditEntry> {
            self.entries.lock().unwrap().clone()
        }
    }

    impl AuditStore for TestStore {
        fn insert(&self, entry: &AuditEntry) -> CustosResult<Uuid> {
            let mut entries = self.entries.lock().unwrap();
            if let Some(limit) = self.fail_inserts_after {
                if entries.len() >= limit {
                    return Err(CustosError::AuditWriteFailed {
                        reason: "injected insert failure".to_string(),
                    });
                }
            }
            entries.push(entry.clone());
            Ok(entry.id)
        }

        fn query(&self, filter: &AuditFilter) -> CustosResult<Vec<AuditEntry>> {
            if self.fail_queries {
                return Err(CustosError::StoreError {
                    reason: "injected query failure".to_string(),
                });
            }
            let mut matched: Vec<AuditEntry> = self
                .entries
                .lock()
                .unwrap()
                .iter()
                .filter(|e| {
                    filter.user_id.as_deref().map_or(true, |u| e.user_id == u)
                        && filter.from.map_or(true, |from| e.timestamp >= from)
                        && filter.until.map_or(true, |until| e.timestamp <= until)
                })
                .cloned()
                .collect();
            matched.sort_by_key(|e| e.timestamp);
            Ok(matched)
        }

        fn count(&self, filter: &AuditFilter) -> CustosResult<usize> {
            Ok(self.query(filter)?.len())
        }

        fn verify_chain(&self) -> CustosResult<bool> {
            Ok(true)
        }
    }

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    /// Detector that always reports the configured pattern list.
    struct StubDetector(Vec<SuspiciousPattern>);

    impl PatternDetector for StubDetector {
        fn detect(&self, _recent: &[AuditEntry], _candidate: &AuditEntry) -> Vec<SuspiciousPattern> {
            self.0.clone()
        }
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn phi_event(user_id: &str, contains_phi: bool) -> PhiAccessEvent {
        PhiAccessEvent {
            user_id: user_id.to_string(),
            user_role: Role::Nurse,
            action: Action::Read,
            resource_type: Resource::HealthRecord,
            resource_id: Some("rec-100".to_string()),
            ip_address: "10.0.0.7".to_string(),
            user_agent: "custos-test/1.0".to_string(),
            correlation_id: None,
            contains_phi,
            success: true,
            metadata: serde_json::Map::new(),
        }
    }

    fn quiet_detector() -> Arc<StubDetector> {
        Arc::new(StubDetector(Vec::new()))
    }

    fn firing_detector() -> Arc<StubDetector> {
        Arc::new(StubDetector(vec![
            SuspiciousPattern {
                kind: PatternKind::OffHoursAccess,
                description: "access at 03:00".to_string(),
                severity: Severity::Medium,
                occurrences: 1,
            },
            SuspiciousPattern {
                kind: PatternKind::RapidSuccessiveAccesses,
                description: "14 accesses in 5 minutes".to_string(),
                severity: Severity::High,
                occurrences: 14,
            },
        ]))
    }

    fn test_clock() -> Arc<FixedClock> {
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 3, 10, 14, 30, 0).unwrap()))
    }

    // ── Recorder: primary write ───────────────────────────────────────────────

    #[test]
    fn phi_access_produces_medium_severity_compliant_entry() {
        let store = Arc::new(TestStore::new());
        let recorder = PhiAccessRecorder::new(store.clone(), test_clock(), quiet_detector());

        let entry = recorder.log_phi_access(phi_event("u1", true)).unwrap();

        assert_eq!(entry.severity, Severity::Medium);
        assert_eq!(entry.compliance_status, ComplianceStatus::Compliant);
        assert_eq!(store.stored().len(), 1);
        assert_eq!(store.stored()[0].id, entry.id);
    }

    #[test]
    fn non_phi_access_gets_low_severity() {
        let store = Arc::new(TestStore::new());
        let recorder = PhiAccessRecorder::new(store, test_clock(), quiet_detector());

        let entry = recorder.log_phi_access(phi_event("u1", false)).unwrap();
        assert_eq!(entry.severity, Severity::Low);
    }

    /// The recorder assigns ids and timestamps itself; callers cannot
    /// back-date entries.
    #[test]
    fn recorder_owns_id_and_timestamp() {
        let store = Arc::new(TestStore::new());
        let clock = test_clock();
        let recorder = PhiAccessRecorder::new(store, clock.clone(), quiet_detector());

        let a = recorder.log_phi_access(phi_event("u1", true)).unwrap();
        let b = recorder.log_phi_access(phi_event("u1", true)).unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(a.timestamp, clock.now());
    }

    // ── Recorder: fail-closed ─────────────────────────────────────────────────

    #[test]
    fn insert_failure_propagates_as_audit_write_failed() {
        let store = Arc::new(TestStore::failing_inserts_after(0));
        let recorder = PhiAccessRecorder::new(store.clone(), test_clock(), quiet_detector());

        let result = recorder.log_phi_access(phi_event("u1", true));

        match result {
            Err(CustosError::AuditWriteFailed { .. }) => {}
            other => panic!("expected AuditWriteFailed, got {:?}", other.map(|e| e.id)),
        }
        assert!(store.stored().is_empty(), "no partial entry may remain");
    }

    // ── Recorder: best-effort detection ───────────────────────────────────────

    #[test]
    fn detected_patterns_produce_linked_violation_entry() {
        let store = Arc::new(TestStore::new());
        let recorder = PhiAccessRecorder::new(store.clone(), test_clock(), firing_detector());

        let primary = recorder.log_phi_access(phi_event("u1", true)).unwrap();

        let stored = store.stored();
        assert_eq!(stored.len(), 2, "primary plus violation entry");

        let violation = &stored[1];
        assert_eq!(violation.compliance_status, ComplianceStatus::Violation);
        // Max severity across the two stub patterns is High.
        assert_eq!(violation.severity, Severity::High);
        assert_eq!(
            violation.metadata.get(RELATED_ENTRY_KEY),
            Some(&serde_json::Value::String(primary.id.to_string()))
        );
        let patterns = violation
            .metadata
            .get(PATTERNS_KEY)
            .and_then(|v| v.as_array())
            .expect("patterns metadata must be an array");
        assert_eq!(patterns.len(), 2);
    }

    #[test]
    fn violation_insert_failure_never_voids_primary() {
        // First insert (primary) succeeds; second (violation) fails.
        let store = Arc::new(TestStore::failing_inserts_after(1));
        let recorder = PhiAccessRecorder::new(store.clone(), test_clock(), firing_detector());

        let result = recorder.log_phi_access(phi_event("u1", true));

        assert!(result.is_ok(), "primary write already durable, caller must see Ok");
        let stored = store.stored();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].compliance_status, ComplianceStatus::Compliant);
    }

    #[test]
    fn recent_window_query_failure_is_swallowed() {
        let store = Arc::new(TestStore::failing_queries());
        let recorder = PhiAccessRecorder::new(store.clone(), test_clock(), firing_detector());

        let result = recorder.log_phi_access(phi_event("u1", true));

        assert!(result.is_ok());
        assert_eq!(store.stored().len(), 1, "only the primary entry exists");
    }
}
