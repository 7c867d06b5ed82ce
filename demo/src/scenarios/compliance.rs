//! Scenario 3: compliance reporting, integrity analysis, and risk scoring
//! over the recorded trail.

use chrono::Duration;

use custos_analysis::{
    DetectorConfig, IntegrityAnalyzer, IntegrityConfig, ReportGenerator, RiskScorer,
    ThresholdDetector,
};
use custos_contracts::{
    analysis::ReportFilters,
    audit::AuditFilter,
    error::CustosResult,
};
use custos_core::traits::{AuditStore, PatternDetector};

use super::{day_start, pipeline, seed_traffic};

pub fn run_scenario() -> CustosResult<()> {
    println!("── Scenario 3: compliance analysis ─────────────────────────");

    let (store, clock, recorder) = pipeline();
    seed_traffic(&recorder, &clock)?;

    let start = day_start();
    let now = start + Duration::hours(24);

    // Period report over everything the pipeline recorded.
    let report = ReportGenerator::default().generate(
        store.as_ref(),
        start,
        now,
        &ReportFilters::default(),
    )?;
    println!(
        "  compliance: {:.1}% over {} entries ({} violations)",
        report.compliance_rate, report.total_entries, report.violations
    );
    for (kind, count) in &report.top_violation_kinds {
        println!("    {} x{}", kind, count);
    }
    for recommendation in &report.recommendations {
        println!("  recommendation: {}", recommendation);
    }

    // Integrity of the same range. The simulated day has long quiet
    // stretches, so expect gap issues alongside an intact chain.
    let expected = store.count(&AuditFilter::range(start, now))?;
    let integrity = IntegrityAnalyzer::new(IntegrityConfig::default()).verify_integrity(
        store.as_ref(),
        start,
        now,
        expected,
        None,
    )?;
    println!(
        "  integrity: verified={} gaps={} tampering={} completeness={:.1}%",
        integrity.verified,
        integrity.gaps_detected,
        integrity.tampering_detected,
        integrity.completeness_score
    );

    // Risk score for the account behind the burst.
    let user = "staff-23";
    let entries = store.query(&AuditFilter::user_range(user, start, now))?;
    let detector = ThresholdDetector::new(DetectorConfig::default());
    let patterns = match entries.last() {
        Some(last) => detector.detect(&entries, last),
        None => Vec::new(),
    };
    let score = RiskScorer::default().score(&entries, &patterns, 1.0);
    println!("  risk score for {}: {}/100", user, score);
    println!();

    Ok(())
}
