//! Audit-trail integrity analysis over a historical time range.
//!
//! `IntegrityAnalyzer` is a read-only batch operation: it scans a range of
//! the store for coverage gaps, asks the store's tamper-evidence mechanism
//! to verify itself, and scores completeness against an externally supplied
//! expected volume. It never blocks live audit writes and degrades to a
//! partial report (with an explanatory issue and `verified = false`) when
//! its deadline expires mid-scan, rather than erroring.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use custos_contracts::{
    analysis::{IntegrityIssue, IntegrityReport},
    audit::{AuditFilter, Severity},
    error::{CustosError, CustosResult},
};
use custos_core::traits::{AuditStore, Clock, SystemClock};

/// Integrity thresholds. Defaults are the reference values.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IntegrityConfig {
    /// Two consecutive entries further apart than this is a gap.
    pub expected_interval_minutes: i64,
    /// A gap wider than this is reported HIGH instead of MEDIUM.
    pub long_gap_minutes: i64,
    /// Completeness below this percentage fails verification.
    pub completeness_threshold: f64,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            expected_interval_minutes: 5,
            long_gap_minutes: 60,
            completeness_threshold: 95.0,
        }
    }
}

/// Scans a time range of the audit trail for gaps, tampering, and
/// incomplete coverage.
pub struct IntegrityAnalyzer {
    config: IntegrityConfig,
    clock: Arc<dyn Clock>,
}

impl IntegrityAnalyzer {
    pub fn new(config: IntegrityConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Substitute the clock used for deadline checks. Tests use a manual
    /// clock to exercise the partial-result path deterministically.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Verify the audit trail between `start` and `end` (inclusive).
    ///
    /// `expected_count` is the external baseline for the period (e.g.
    /// expected operation volume); zero means "no baseline", which scores
    /// completeness at 100. `deadline`, when set, bounds the scan: on
    /// expiry the report is returned partial with `verified = false`.
    ///
    /// Returns `AnalysisFailed` only when the range itself cannot be read.
    pub fn verify_integrity(
        &self,
        store: &dyn AuditStore,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        expected_count: usize,
        deadline: Option<DateTime<Utc>>,
    ) -> CustosResult<IntegrityReport> {
        let entries = store
            .query(&AuditFilter::range(start, end))
            .map_err(|e| CustosError::AnalysisFailed {
                reason: format!("cannot read audit range: {}", e),
            })?;

        let expected_interval = Duration::minutes(self.config.expected_interval_minutes);
        let long_gap = Duration::minutes(self.config.long_gap_minutes);

        let mut issues: Vec<IntegrityIssue> = Vec::new();
        let mut gaps_detected = 0usize;
        let mut truncated = false;

        // ── Gap scan ─────────────────────────────────────────────────────────
        for (index, pair) in entries.windows(2).enumerate() {
            if let Some(deadline) = deadline {
                if self.clock.now() > deadline {
                    warn!(
                        scanned = index,
                        total = entries.len(),
                        "integrity scan deadline exceeded, returning partial report"
                    );
                    issues.push(IntegrityIssue {
                        severity: Severity::Medium,
                        description: format!(
                            "analysis deadline exceeded after {} of {} entries; results are partial",
                            index,
                            entries.len()
                        ),
                    });
                    truncated = true;
                    break;
                }
            }

            let gap = pair[1].timestamp - pair[0].timestamp;
            if gap > expected_interval {
                gaps_detected += 1;
                let severity = if gap > long_gap {
                    Severity::High
                } else {
                    Severity::Medium
                };
                issues.push(IntegrityIssue {
                    severity,
                    description: format!(
                        "gap of {} minutes between entries at {} and {}",
                        gap.num_minutes(),
                        pair[0].timestamp,
                        pair[1].timestamp
                    ),
                });
            }
        }

        // ── Tamper evidence ──────────────────────────────────────────────────
        let tampering_detected = match store.verify_chain() {
            Ok(true) => false,
            Ok(false) => {
                issues.push(IntegrityIssue {
                    severity: Severity::Critical,
                    description:
                        "hash chain broken: stored entries no longer match their recorded hashes"
                            .to_string(),
                });
                true
            }
            Err(e) => {
                // Cannot prove the chain intact: degrade, do not claim verified.
                issues.push(IntegrityIssue {
                    severity: Severity::High,
                    description: format!("tamper-evidence check unavailable: {}", e),
                });
                truncated = true;
                false
            }
        };

        // ── Completeness ─────────────────────────────────────────────────────
        let completeness_score = if expected_count == 0 {
            100.0
        } else {
            entries.len() as f64 / expected_count as f64 * 100.0
        };
        if completeness_score < self.config.completeness_threshold {
            issues.push(IntegrityIssue {
                severity: Severity::High,
                description: format!(
                    "completeness {:.1}% below threshold {:.1}% ({} of {} expected entries)",
                    completeness_score,
                    self.config.completeness_threshold,
                    entries.len(),
                    expected_count
                ),
            });
        }

        let verified = gaps_detected == 0
            && !tampering_detected
            && completeness_score >= self.config.completeness_threshold
            && !truncated;

        info!(
            total_logs = entries.len(),
            gaps_detected,
            tampering_detected,
            completeness_score,
            verified,
            "integrity analysis complete"
        );

        Ok(IntegrityReport {
            total_logs: entries.len(),
            gaps_detected,
            tampering_detected,
            completeness_score,
            issues,
            verified,
        })
    }
}
