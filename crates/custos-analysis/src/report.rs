//! Compliance report generation.
//!
//! A report summarizes one period of the audit trail: compliance rate, the
//! most frequent violation kinds, per-user activity, and free-text
//! recommendations when violation or off-hours rates exceed their
//! thresholds. Like integrity analysis, this is a read-only batch
//! operation over the store.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::Deserialize;
use tracing::info;

use custos_contracts::{
    analysis::{ComplianceReport, ReportFilters, UserActivitySummary},
    audit::{AuditEntry, AuditFilter, ComplianceStatus},
    error::{CustosError, CustosResult},
};
use custos_core::{recorder::PATTERNS_KEY, traits::AuditStore};

/// Reporting thresholds. Defaults are the reference values.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Violation percentage above which remediation guidance is emitted.
    pub violation_rate_threshold: f64,
    /// Off-hours percentage above which scheduling guidance is emitted.
    pub off_hours_rate_threshold: f64,
    /// Off-hours boundaries, matching the detector's semantics.
    pub off_hours_start: u32,
    pub off_hours_end: u32,
    pub local_offset_minutes: i32,
    /// How many violation kinds the ranking keeps.
    pub top_kinds_limit: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            violation_rate_threshold: 10.0,
            off_hours_rate_threshold: 5.0,
            off_hours_start: 22,
            off_hours_end: 6,
            local_offset_minutes: 0,
            top_kinds_limit: 5,
        }
    }
}

/// Builds compliance reports from the audit store.
#[derive(Debug, Clone, Default)]
pub struct ReportGenerator {
    config: ReportConfig,
}

impl ReportGenerator {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    /// Generate the compliance report for `[start, end]` under `filters`.
    ///
    /// An empty period yields a vacuously clean report: zero violations and
    /// a compliance rate of 100.
    pub fn generate(
        &self,
        store: &dyn AuditStore,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filters: &ReportFilters,
    ) -> CustosResult<ComplianceReport> {
        let filter = AuditFilter {
            user_id: filters.user_id.clone(),
            resource_type: filters.resource_type,
            compliance_status: None,
            from: Some(start),
            until: Some(end),
        };
        let entries = store
            .query(&filter)
            .map_err(|e| CustosError::AnalysisFailed {
                reason: format!("cannot read report range: {}", e),
            })?;

        let total = entries.len();
        let violations = entries
            .iter()
            .filter(|e| e.compliance_status == ComplianceStatus::Violation)
            .count();

        let compliance_rate = if total == 0 {
            100.0
        } else {
            (total - violations) as f64 / total as f64 * 100.0
        };

        let top_violation_kinds = self.rank_violation_kinds(&entries);
        let user_activity = summarize_users(&entries);
        let recommendations = self.recommend(&entries, total, violations);

        info!(
            total_entries = total,
            violations,
            compliance_rate,
            users = user_activity.len(),
            "compliance report generated"
        );

        Ok(ComplianceReport {
            period_start: start,
            period_end: end,
            total_entries: total,
            violations,
            compliance_rate,
            top_violation_kinds,
            user_activity,
            recommendations,
        })
    }

    /// Rank violation kinds by frequency, most frequent first.
    ///
    /// Kinds come from the pattern list a violation entry carries in its
    /// metadata; entries without one fall back to the action name.
    fn rank_violation_kinds(&self, entries: &[AuditEntry]) -> Vec<(String, usize)> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();

        for entry in entries {
            if entry.compliance_status != ComplianceStatus::Violation {
                continue;
            }
            let kinds = entry
                .metadata
                .get(PATTERNS_KEY)
                .and_then(|v| v.as_array())
                .map(|patterns| {
                    patterns
                        .iter()
                        .filter_map(|p| p.get("kind").and_then(|k| k.as_str()))
                        .map(str::to_string)
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();

            if kinds.is_empty() {
                *counts.entry(entry.action.to_string()).or_insert(0) += 1;
            } else {
                for kind in kinds {
                    *counts.entry(kind).or_insert(0) += 1;
                }
            }
        }

        let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
        // BTreeMap iteration gives name order; stable sort keeps it as the
        // tiebreak after ranking by count.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(self.config.top_kinds_limit);
        ranked
    }

    fn recommend(&self, entries: &[AuditEntry], total: usize, violations: usize) -> Vec<String> {
        let mut recommendations = Vec::new();
        if total == 0 {
            return recommendations;
        }

        let violation_rate = violations as f64 / total as f64 * 100.0;
        if violation_rate > self.config.violation_rate_threshold {
            recommendations.push(format!(
                "violation rate {:.1}% exceeds {:.1}%: review permission rules and retrain \
                 staff on PHI handling procedures",
                violation_rate, self.config.violation_rate_threshold
            ));
        }

        let offset = Duration::minutes(i64::from(self.config.local_offset_minutes));
        let off_hours = entries
            .iter()
            .filter(|e| {
                let hour = (e.timestamp + offset).hour();
                hour < self.config.off_hours_end || hour > self.config.off_hours_start
            })
            .count();
        let off_hours_rate = off_hours as f64 / total as f64 * 100.0;
        if off_hours_rate > self.config.off_hours_rate_threshold {
            recommendations.push(format!(
                "off-hours access is {:.1}% of volume (threshold {:.1}%): audit after-hours \
                 workflows and consider tightening off-hours permissions",
                off_hours_rate, self.config.off_hours_rate_threshold
            ));
        }

        recommendations
    }
}

/// Roll up per-user activity, ordered by user id.
fn summarize_users(entries: &[AuditEntry]) -> Vec<UserActivitySummary> {
    let mut by_user: BTreeMap<&str, UserActivitySummary> = BTreeMap::new();

    for entry in entries {
        let summary = by_user
            .entry(entry.user_id.as_str())
            .or_insert_with(|| UserActivitySummary {
                user_id: entry.user_id.clone(),
                total_actions: 0,
                phi_accesses: 0,
                violations: 0,
                last_activity: entry.timestamp,
            });
        summary.total_actions += 1;
        if entry.contains_phi {
            summary.phi_accesses += 1;
        }
        if entry.compliance_status == ComplianceStatus::Violation {
            summary.violations += 1;
        }
        if entry.timestamp > summary.last_activity {
            summary.last_activity = entry.timestamp;
        }
    }

    by_user.into_values().collect()
}
