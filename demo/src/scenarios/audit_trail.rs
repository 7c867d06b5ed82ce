//! Scenario 2: the tamper-evident audit trail.
//!
//! Replays simulated traffic through the recorder, prints the violation
//! entries the inline detector appended, then verifies the hash chain.

use custos_contracts::{
    audit::{AuditFilter, ComplianceStatus},
    error::CustosResult,
};
use custos_core::recorder::PATTERNS_KEY;
use custos_core::traits::AuditStore;

use super::{pipeline, seed_traffic};

pub fn run_scenario() -> CustosResult<()> {
    println!("── Scenario 2: audit trail ─────────────────────────────────");

    let (store, clock, recorder) = pipeline();
    seed_traffic(&recorder, &clock)?;

    let total = store.count(&AuditFilter::default())?;
    println!("  {} entries recorded", total);

    let violations = store.query(&AuditFilter {
        compliance_status: Some(ComplianceStatus::Violation),
        ..AuditFilter::default()
    })?;

    println!("  {} violation entries flagged inline:", violations.len());
    for violation in &violations {
        let kinds = violation
            .metadata
            .get(PATTERNS_KEY)
            .and_then(|v| v.as_array())
            .map(|patterns| {
                patterns
                    .iter()
                    .filter_map(|p| p.get("kind").and_then(|k| k.as_str()))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        println!(
            "    user={} severity={:?} patterns=[{}]",
            violation.user_id, violation.severity, kinds
        );
    }

    let intact = store.verify_chain()?;
    println!(
        "  hash chain: {}",
        if intact { "intact" } else { "BROKEN" }
    );
    if let Some(link) = store.export_chain().last() {
        println!(
            "    head: sequence={} hash={}...",
            link.sequence,
            &link.this_hash[..16]
        );
    }
    println!();

    Ok(())
}
