//! Aggregate risk scoring.
//!
//! The score is a bounded additive metric over a user's analysis window:
//! violations, detected patterns weighted by severity, and an
//! access-frequency bonus, clamped to [0, 100]. For a fixed history the
//! score is monotone non-decreasing in violation count and pattern
//! severity, which makes it safe to alert on thresholds.

use serde::Deserialize;

use custos_contracts::{
    analysis::{AccessFrequency, SuspiciousPattern},
    audit::{AuditEntry, ComplianceStatus, Severity},
};

/// Scoring weights and frequency bucket boundaries.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Added once per VIOLATION-status entry.
    pub violation_weight: u32,
    pub critical_pattern_weight: u32,
    pub high_pattern_weight: u32,
    pub medium_pattern_weight: u32,
    pub low_pattern_weight: u32,
    /// Accesses-per-day boundaries for the frequency buckets.
    pub very_high_per_day: f64,
    pub high_per_day: f64,
    pub medium_per_day: f64,
    /// Bonuses per frequency bucket (LOW adds nothing).
    pub very_high_bonus: u32,
    pub high_bonus: u32,
    pub medium_bonus: u32,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            violation_weight: 10,
            critical_pattern_weight: 50,
            high_pattern_weight: 25,
            medium_pattern_weight: 10,
            low_pattern_weight: 5,
            very_high_per_day: 100.0,
            high_per_day: 50.0,
            medium_per_day: 20.0,
            very_high_bonus: 30,
            high_bonus: 15,
            medium_bonus: 5,
        }
    }
}

/// Computes bounded risk scores from audit history and detected patterns.
#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    config: RiskConfig,
}

impl RiskScorer {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// Bucket an access volume over a window, in accesses per day.
    pub fn access_frequency(&self, entry_count: usize, window_days: f64) -> AccessFrequency {
        let days = if window_days > 0.0 { window_days } else { 1.0 };
        let per_day = entry_count as f64 / days;

        if per_day >= self.config.very_high_per_day {
            AccessFrequency::VeryHigh
        } else if per_day >= self.config.high_per_day {
            AccessFrequency::High
        } else if per_day >= self.config.medium_per_day {
            AccessFrequency::Medium
        } else {
            AccessFrequency::Low
        }
    }

    /// The risk score in [0, 100] for one analysis window.
    ///
    /// `entries` is the full window (compliant and violating alike, since
    /// volume drives the frequency bonus); `patterns` is the detector
    /// output for the same window; `window_days` is the window's width.
    pub fn score(
        &self,
        entries: &[AuditEntry],
        patterns: &[SuspiciousPattern],
        window_days: f64,
    ) -> u8 {
        let violations = entries
            .iter()
            .filter(|e| e.compliance_status == ComplianceStatus::Violation)
            .count() as u32;

        let mut score = violations.saturating_mul(self.config.violation_weight);

        for pattern in patterns {
            score = score.saturating_add(match pattern.severity {
                Severity::Critical => self.config.critical_pattern_weight,
                Severity::High => self.config.high_pattern_weight,
                Severity::Medium => self.config.medium_pattern_weight,
                Severity::Low => self.config.low_pattern_weight,
            });
        }

        score = score.saturating_add(match self.access_frequency(entries.len(), window_days) {
            AccessFrequency::VeryHigh => self.config.very_high_bonus,
            AccessFrequency::High => self.config.high_bonus,
            AccessFrequency::Medium => self.config.medium_bonus,
            AccessFrequency::Low => 0,
        });

        score.min(100) as u8
    }
}
