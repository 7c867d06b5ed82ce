//! Derived analysis contracts: suspicious patterns, integrity reports,
//! risk buckets, and compliance reports.
//!
//! Everything in this module is recomputed from `AuditEntry` history on
//! every analysis call. None of these types are a source of truth.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::Severity;

use std::fmt;

/// The known risk-pattern kinds the detector can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatternKind {
    RapidSuccessiveAccesses,
    OffHoursAccess,
    BulkExport,
    MultiplePatientAccess,
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PatternKind::RapidSuccessiveAccesses => "RAPID_SUCCESSIVE_ACCESSES",
            PatternKind::OffHoursAccess => "OFF_HOURS_ACCESS",
            PatternKind::BulkExport => "BULK_EXPORT",
            PatternKind::MultiplePatientAccess => "MULTIPLE_PATIENT_ACCESS",
        };
        f.write_str(name)
    }
}

/// One detected risk pattern in a user's recent access history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspiciousPattern {
    pub kind: PatternKind,
    pub description: String,
    pub severity: Severity,
    /// How many entries (or distinct ids, for sweeps) triggered the pattern.
    pub occurrences: usize,
}

/// Access-volume bucket over the analysis window, in accesses per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessFrequency {
    Low,
    Medium,
    High,
    VeryHigh,
}

/// One finding raised during integrity analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityIssue {
    pub severity: Severity,
    pub description: String,
}

/// The result of verifying a time range of the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub total_logs: usize,
    pub gaps_detected: usize,
    pub tampering_detected: bool,
    /// `actual / expected * 100`; 100.0 when the expected baseline is zero.
    pub completeness_score: f64,
    pub issues: Vec<IntegrityIssue>,
    /// True only when no gaps, no tampering, completeness at or above the
    /// configured threshold, and the scan ran to completion.
    pub verified: bool,
}

/// Optional constraints on a compliance report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportFilters {
    pub user_id: Option<String>,
    pub resource_type: Option<crate::rbac::Resource>,
}

/// Per-user activity rollup within a report period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserActivitySummary {
    pub user_id: String,
    pub total_actions: usize,
    pub phi_accesses: usize,
    pub violations: usize,
    pub last_activity: DateTime<Utc>,
}

/// The compliance report for one period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub total_entries: usize,
    pub violations: usize,
    /// `(total - violations) / total * 100`; 100.0 for an empty period.
    pub compliance_rate: f64,
    /// Violation kinds ranked by frequency, most frequent first.
    pub top_violation_kinds: Vec<(String, usize)>,
    pub user_activity: Vec<UserActivitySummary>,
    /// Free-text guidance, populated when thresholds are exceeded.
    pub recommendations: Vec<String>,
}
