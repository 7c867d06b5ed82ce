//! Scenario 1: permission decisions against the demo policy.
//!
//! Compiles the TOML rule table once, then walks a set of requests showing
//! the three decision stages: no rules for the pair, action not granted,
//! and condition evaluation with the `{{userId}}` placeholder.

use custos_contracts::{
    error::CustosResult,
    rbac::{Action, PermissionContext, Resource, Role},
};
use custos_policy::{PermissionChecker, RuleTable};

use super::POLICY;

fn context(
    user_id: &str,
    role: Role,
    action: Action,
    resource: Resource,
) -> PermissionContext {
    PermissionContext {
        user_id: user_id.to_string(),
        user_role: role,
        action,
        resource,
        resource_id: Some("student-044".to_string()),
        resource_owner_id: None,
        metadata: serde_json::Map::new(),
    }
}

pub fn run_scenario() -> CustosResult<()> {
    println!("── Scenario 1: access control ──────────────────────────────");

    let table = RuleTable::from_toml_str(POLICY)?;
    let checker = PermissionChecker::new(table);

    let mut guardian_of_044 = context("guardian-9", Role::Guardian, Action::Read, Resource::Student);
    guardian_of_044
        .metadata
        .insert("guardianId".to_string(), serde_json::json!("guardian-9"));

    let mut unrelated_guardian =
        context("guardian-3", Role::Guardian, Action::Read, Resource::Student);
    unrelated_guardian
        .metadata
        .insert("guardianId".to_string(), serde_json::json!("guardian-9"));

    let requests = [
        (
            "nurse administers medication",
            context("nurse-7", Role::Nurse, Action::AdministerMedication, Resource::Medication),
        ),
        (
            "nurse reads the audit trail",
            context("nurse-7", Role::Nurse, Action::ViewAudit, Resource::Audit),
        ),
        (
            "doctor exports health records",
            context("doctor-1", Role::Doctor, Action::Export, Resource::HealthRecord),
        ),
        (
            "doctor deletes a health record",
            context("doctor-1", Role::Doctor, Action::Delete, Resource::HealthRecord),
        ),
        ("linked guardian reads their student", guardian_of_044),
        ("unrelated guardian reads the same student", unrelated_guardian),
    ];

    for (label, ctx) in requests {
        let result = checker.check(&ctx);
        if result.allowed {
            println!("  ALLOW  {}", label);
        } else {
            println!(
                "  DENY   {} ({})",
                label,
                result.reason.as_deref().unwrap_or("no reason recorded")
            );
        }
    }

    let nurse_actions = checker.allowed_actions(Role::Nurse, Resource::Medication);
    let names: Vec<String> = nurse_actions.iter().map(|a| a.to_string()).collect();
    println!("  nurse actions on medication: {}", names.join(", "));
    println!();

    Ok(())
}
