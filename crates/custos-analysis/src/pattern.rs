//! Risk-pattern detection over a user's recent access history.
//!
//! `ThresholdDetector` implements the `PatternDetector` trait from
//! custos-core. All four rules are independent and all may fire for the
//! same candidate entry; the caller receives the full set in one pass.
//! Thresholds are configuration, not constants: compliance teams tune them
//! per deployment through [`DetectorConfig`].

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::Deserialize;

use custos_contracts::{
    analysis::{PatternKind, SuspiciousPattern},
    audit::{AuditEntry, Severity},
    rbac::Action,
};
use custos_core::traits::PatternDetector;

/// Metadata key an export operation uses to report how many records it
/// touched.
pub const RECORD_COUNT_KEY: &str = "recordCount";

/// Detection thresholds. Defaults are the reference values; every field can
/// be overridden from TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Width of the trailing window the rapid-succession rule scans.
    pub rapid_window_minutes: i64,
    /// Strictly-more-than this many entries inside the window fires the rule.
    pub rapid_threshold: usize,
    /// Local hour after which access is off-hours (exclusive).
    pub off_hours_start: u32,
    /// Local hour before which access is off-hours (exclusive).
    pub off_hours_end: u32,
    /// Strictly-more-than this many exported records fires the bulk rule.
    pub bulk_export_threshold: u64,
    /// Strictly-more-than this many distinct record ids fires the sweep rule.
    pub distinct_patient_threshold: usize,
    /// Offset applied to UTC timestamps before deriving the local hour.
    /// Deployments set this to the facility's timezone offset.
    pub local_offset_minutes: i32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            rapid_window_minutes: 5,
            rapid_threshold: 10,
            off_hours_start: 22,
            off_hours_end: 6,
            bulk_export_threshold: 100,
            distinct_patient_threshold: 10,
            local_offset_minutes: 0,
        }
    }
}

/// The reference pattern detector.
///
/// Pure over its inputs: the recorder calls it inline at write time with
/// the user's trailing window, and batch analysis calls it with longer
/// windows. It holds no state besides its thresholds.
#[derive(Debug, Clone, Default)]
pub struct ThresholdDetector {
    config: DetectorConfig,
}

impl ThresholdDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// The local hour of a timestamp under the configured offset.
    fn local_hour(&self, timestamp: DateTime<Utc>) -> u32 {
        (timestamp + Duration::minutes(i64::from(self.config.local_offset_minutes))).hour()
    }
}

impl PatternDetector for ThresholdDetector {
    fn detect(&self, recent: &[AuditEntry], candidate: &AuditEntry) -> Vec<SuspiciousPattern> {
        let mut patterns = Vec::new();

        // Only the candidate user's history counts toward windows, even if
        // the caller passed a broader slice.
        let user_entries: Vec<&AuditEntry> = recent
            .iter()
            .filter(|e| e.user_id == candidate.user_id)
            .collect();

        // ── Rapid succession ─────────────────────────────────────────────────
        let mut times: Vec<DateTime<Utc>> =
            user_entries.iter().map(|e| e.timestamp).collect();
        if !recent.iter().any(|e| e.id == candidate.id) {
            times.push(candidate.timestamp);
        }
        times.sort_unstable();

        let window = Duration::minutes(self.config.rapid_window_minutes);
        let mut densest = 0usize;
        let mut start = 0usize;
        for end in 0..times.len() {
            while times[end] - times[start] > window {
                start += 1;
            }
            densest = densest.max(end - start + 1);
        }
        if densest > self.config.rapid_threshold {
            patterns.push(SuspiciousPattern {
                kind: PatternKind::RapidSuccessiveAccesses,
                description: format!(
                    "{} accesses within a {}-minute window",
                    densest, self.config.rapid_window_minutes
                ),
                severity: Severity::High,
                occurrences: densest,
            });
        }

        // ── Off-hours access ─────────────────────────────────────────────────
        let hour = self.local_hour(candidate.timestamp);
        if hour < self.config.off_hours_end || hour > self.config.off_hours_start {
            patterns.push(SuspiciousPattern {
                kind: PatternKind::OffHoursAccess,
                description: format!("access at local hour {:02}", hour),
                severity: Severity::Medium,
                occurrences: 1,
            });
        }

        // ── Bulk export ──────────────────────────────────────────────────────
        if candidate.action == Action::Export {
            let record_count = candidate
                .metadata
                .get(RECORD_COUNT_KEY)
                .and_then(|v| v.as_u64())
                .unwrap_or(0);
            if record_count > self.config.bulk_export_threshold {
                patterns.push(SuspiciousPattern {
                    kind: PatternKind::BulkExport,
                    description: format!("export of {} records", record_count),
                    severity: Severity::High,
                    occurrences: record_count as usize,
                });
            }
        }

        // ── Multi-patient sweep ──────────────────────────────────────────────
        let mut distinct_ids: BTreeSet<&str> = user_entries
            .iter()
            .filter_map(|e| e.resource_id.as_deref())
            .collect();
        if let Some(resource_id) = candidate.resource_id.as_deref() {
            distinct_ids.insert(resource_id);
        }
        if distinct_ids.len() > self.config.distinct_patient_threshold {
            patterns.push(SuspiciousPattern {
                kind: PatternKind::MultiplePatientAccess,
                description: format!(
                    "{} distinct patient records accessed within the window",
                    distinct_ids.len()
                ),
                severity: Severity::Medium,
                occurrences: distinct_ids.len(),
            });
        }

        patterns
    }
}
