//! # custos-policy
//!
//! A TOML-driven, deny-by-default permission rule table and evaluator for
//! the CUSTOS access-control subsystem.
//!
//! ## Overview
//!
//! This crate provides [`RuleTable`], compiled once at startup from a TOML
//! policy file, and [`PermissionChecker`], which implements the
//! [`PermissionEngine`](custos_core::traits::PermissionEngine) trait.
//! Requests for which no rule grants the action are denied; a denial is a
//! structured result, not an error.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use custos_policy::{PermissionChecker, RuleTable};
//!
//! let table = RuleTable::from_file(Path::new("policies/healthcare.toml"))?;
//! let checker = PermissionChecker::new(table);
//! ```
//!
//! ## Attribute conditions
//!
//! A rule may carry conditions narrowing it to specific record
//! relationships, e.g. "only the student's own guardian". Condition values
//! may reference `{{userId}}` or `{{resourceId}}`; those placeholders are
//! compiled to typed variants at table build time and resolved per request.

pub mod checker;
pub mod rule;

pub use checker::PermissionChecker;
pub use rule::{RuleTable, RuleTableConfig};

#[cfg(test)]
mod tests {
    use custos_contracts::{
        error::CustosError,
        rbac::{Action, PermissionContext, Resource, Role},
    };

    use crate::{PermissionChecker, RuleTable};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn checker(toml: &str) -> PermissionChecker {
        PermissionChecker::new(RuleTable::from_toml_str(toml).unwrap())
    }

    fn ctx(role: Role, resource: Resource, action: Action) -> PermissionContext {
        PermissionContext {
            user_id: "u1".to_string(),
            user_role: role,
            action,
            resource,
            resource_id: None,
            resource_owner_id: None,
            metadata: serde_json::Map::new(),
        }
    }

    fn ctx_with_metadata(
        role: Role,
        resource: Resource,
        action: Action,
        metadata: serde_json::Value,
    ) -> PermissionContext {
        let metadata = match metadata {
            serde_json::Value::Object(m) => m,
            _ => panic!("metadata fixture must be a JSON object"),
        };
        PermissionContext {
            metadata,
            ..ctx(role, resource, action)
        }
    }

    const NURSE_MEDICATION: &str = r#"
        [[rules]]
        role = "nurse"
        resource = "medication"
        actions = ["read", "list", "administer-medication"]
    "#;

    // ── Deny by default ───────────────────────────────────────────────────────

    /// An empty table denies everything.
    #[test]
    fn empty_table_denies_everything() {
        let checker = checker("rules = []");
        let result = checker.check(&ctx(Role::Admin, Resource::Student, Action::Read));

        assert!(!result.allowed);
        assert!(result.reason.unwrap().contains("no permissions"));
    }

    /// A (role, resource) pair absent from the table is denied with a
    /// reason naming the missing footprint, not the concrete record.
    #[test]
    fn nurse_cannot_view_audit_trail() {
        let checker = checker(NURSE_MEDICATION);
        let result = checker.check(&ctx(Role::Nurse, Resource::Audit, Action::ViewAudit));

        assert!(!result.allowed);
        let reason = result.reason.unwrap();
        assert!(
            reason.contains("no permissions"),
            "expected 'no permissions' in reason, got: {reason}"
        );
    }

    /// A role with rules on the resource but not the action gets the
    /// action-specific denial with `required_action` populated.
    #[test]
    fn action_outside_rule_set_is_denied() {
        let checker = checker(NURSE_MEDICATION);
        let result = checker.check(&ctx(Role::Nurse, Resource::Medication, Action::Delete));

        assert!(!result.allowed);
        assert!(result.reason.unwrap().contains("cannot perform action"));
        assert_eq!(result.required_action, Some(Action::Delete));
    }

    // ── Unconditional rules ───────────────────────────────────────────────────

    /// Nurse administering medication: granted unconditionally.
    #[test]
    fn nurse_administers_medication() {
        let checker = checker(NURSE_MEDICATION);
        let result = checker.check(&ctx(
            Role::Nurse,
            Resource::Medication,
            Action::AdministerMedication,
        ));

        assert!(result.allowed);
        assert!(result.reason.is_none());
    }

    /// A rule with no conditions ignores metadata entirely.
    #[test]
    fn unconditional_rule_ignores_metadata() {
        let checker = checker(NURSE_MEDICATION);
        let result = checker.check(&ctx_with_metadata(
            Role::Nurse,
            Resource::Medication,
            Action::Read,
            serde_json::json!({ "guardianId": "someone-else", "noise": 42 }),
        ));

        assert!(result.allowed);
    }

    // ── Attribute conditions ──────────────────────────────────────────────────

    const GUARDIAN_OWN_STUDENT: &str = r#"
        [[rules]]
        role = "guardian"
        resource = "student"
        actions = ["read"]

        [[rules.conditions]]
        field = "guardianId"
        op = "eq"
        value = "{{userId}}"
    "#;

    /// A guardian may read a student record when the record's guardian id
    /// is the caller.
    #[test]
    fn guardian_reads_own_student() {
        let checker = checker(GUARDIAN_OWN_STUDENT);
        let result = checker.check(&ctx_with_metadata(
            Role::Guardian,
            Resource::Student,
            Action::Read,
            serde_json::json!({ "guardianId": "u1" }),
        ));

        assert!(result.allowed);
    }

    /// The same read against another guardian's student is denied with the
    /// conditions-not-met reason.
    #[test]
    fn guardian_denied_for_other_student() {
        let checker = checker(GUARDIAN_OWN_STUDENT);
        let result = checker.check(&ctx_with_metadata(
            Role::Guardian,
            Resource::Student,
            Action::Read,
            serde_json::json!({ "guardianId": "u2" }),
        ));

        assert!(!result.allowed);
        assert!(result.reason.unwrap().contains("conditions not met"));
    }

    /// When the condition field is absent from metadata, the context's
    /// resource owner id is the fallback comparand.
    #[test]
    fn condition_falls_back_to_resource_owner() {
        let checker = checker(GUARDIAN_OWN_STUDENT);
        let mut context = ctx(Role::Guardian, Resource::Student, Action::Read);
        context.resource_owner_id = Some("u1".to_string());

        assert!(checker.check(&context).allowed);

        context.resource_owner_id = Some("u9".to_string());
        assert!(!checker.check(&context).allowed);

        // No metadata value and no owner: nothing to test, condition fails.
        context.resource_owner_id = None;
        assert!(!checker.check(&context).allowed);
    }

    /// Membership operators work over array literals.
    #[test]
    fn in_and_nin_operators() {
        let toml = r#"
            [[rules]]
            role = "staff"
            resource = "contact"
            actions = ["read"]

            [[rules.conditions]]
            field = "relationship"
            op = "in"
            value = ["parent", "guardian", "emergency"]

            [[rules.conditions]]
            field = "status"
            op = "nin"
            value = ["revoked", "expired"]
        "#;
        let checker = checker(toml);

        let allowed = checker.check(&ctx_with_metadata(
            Role::Staff,
            Resource::Contact,
            Action::Read,
            serde_json::json!({ "relationship": "guardian", "status": "active" }),
        ));
        assert!(allowed.allowed);

        let denied = checker.check(&ctx_with_metadata(
            Role::Staff,
            Resource::Contact,
            Action::Read,
            serde_json::json!({ "relationship": "guardian", "status": "revoked" }),
        ));
        assert!(!denied.allowed);
    }

    /// Ordering operators compare numerically.
    #[test]
    fn gt_and_lt_operators() {
        let toml = r#"
            [[rules]]
            role = "teacher"
            resource = "student"
            actions = ["read"]

            [[rules.conditions]]
            field = "gradeLevel"
            op = "gt"
            value = 6

            [[rules.conditions]]
            field = "gradeLevel"
            op = "lt"
            value = 13
        "#;
        let checker = checker(toml);

        let in_range = checker.check(&ctx_with_metadata(
            Role::Teacher,
            Resource::Student,
            Action::Read,
            serde_json::json!({ "gradeLevel": 9 }),
        ));
        assert!(in_range.allowed);

        let below = checker.check(&ctx_with_metadata(
            Role::Teacher,
            Resource::Student,
            Action::Read,
            serde_json::json!({ "gradeLevel": 6 }),
        ));
        assert!(!below.allowed, "gt is strict");
    }

    /// `matches` tests a pre-compiled regex against the context value.
    #[test]
    fn matches_operator_uses_regex() {
        let toml = r#"
            [[rules]]
            role = "api-client"
            resource = "report"
            actions = ["read"]

            [[rules.conditions]]
            field = "clientScope"
            op = "matches"
            value = "^reports:(read|export)$"
        "#;
        let checker = checker(toml);

        let scoped = checker.check(&ctx_with_metadata(
            Role::ApiClient,
            Resource::Report,
            Action::Read,
            serde_json::json!({ "clientScope": "reports:read" }),
        ));
        assert!(scoped.allowed);

        let unscoped = checker.check(&ctx_with_metadata(
            Role::ApiClient,
            Resource::Report,
            Action::Read,
            serde_json::json!({ "clientScope": "admin:all" }),
        ));
        assert!(!unscoped.allowed);
    }

    /// Rules evaluate in declaration order; a later unconditional rule can
    /// still allow after an earlier conditional rule fails.
    #[test]
    fn later_rule_can_allow_after_conditional_miss() {
        let toml = r#"
            [[rules]]
            role = "doctor"
            resource = "health-record"
            actions = ["read"]

            [[rules.conditions]]
            field = "careTeamId"
            op = "eq"
            value = "{{userId}}"

            [[rules]]
            role = "doctor"
            resource = "health-record"
            actions = ["read"]
        "#;
        let checker = checker(toml);

        let result = checker.check(&ctx_with_metadata(
            Role::Doctor,
            Resource::HealthRecord,
            Action::Read,
            serde_json::json!({ "careTeamId": "someone-else" }),
        ));
        assert!(result.allowed, "the unconditional second rule grants access");
    }

    // ── Derived helpers ───────────────────────────────────────────────────────

    /// `allowed_actions` is the deduplicated union across all matching rules.
    #[test]
    fn allowed_actions_unions_without_duplicates() {
        let toml = r#"
            [[rules]]
            role = "nurse"
            resource = "medication"
            actions = ["read", "list"]

            [[rules]]
            role = "nurse"
            resource = "medication"
            actions = ["read", "administer-medication"]
        "#;
        let checker = checker(toml);

        let actions = checker.allowed_actions(Role::Nurse, Resource::Medication);
        assert_eq!(actions.len(), 3);
        assert!(actions.contains(&Action::Read));
        assert!(actions.contains(&Action::List));
        assert!(actions.contains(&Action::AdministerMedication));

        assert!(checker.allowed_actions(Role::Nurse, Resource::Audit).is_empty());
    }

    #[test]
    fn allowed_resources_lists_distinct_resources() {
        let toml = r#"
            [[rules]]
            role = "nurse"
            resource = "medication"
            actions = ["read"]

            [[rules]]
            role = "nurse"
            resource = "health-record"
            actions = ["read"]

            [[rules]]
            role = "nurse"
            resource = "medication"
            actions = ["list"]
        "#;
        let checker = checker(toml);

        let resources = checker.allowed_resources(Role::Nurse);
        assert_eq!(resources.len(), 2);
        assert!(resources.contains(&Resource::Medication));
        assert!(resources.contains(&Resource::HealthRecord));
    }

    // ── Config failures are fail-closed ──────────────────────────────────────

    /// Malformed TOML is a ConfigError, never a permissive table.
    #[test]
    fn malformed_toml_is_config_error() {
        let result = RuleTable::from_toml_str("this is not valid toml ][[[");
        match result {
            Err(CustosError::ConfigError { reason }) => {
                assert!(reason.contains("failed to parse rule TOML"));
            }
            other => panic!("expected ConfigError, got {:?}", other.map(|_| ())),
        }
    }

    /// An operator outside the closed set cannot be expressed; the config
    /// fails to deserialize instead of evaluating to allow.
    #[test]
    fn unknown_operator_is_config_error() {
        let toml = r#"
            [[rules]]
            role = "staff"
            resource = "contact"
            actions = ["read"]

            [[rules.conditions]]
            field = "relationship"
            op = "contains"
            value = "parent"
        "#;
        assert!(matches!(
            RuleTable::from_toml_str(toml),
            Err(CustosError::ConfigError { .. })
        ));
    }

    /// A broken regex in a `matches` condition fails at build time.
    #[test]
    fn invalid_regex_is_config_error() {
        let toml = r#"
            [[rules]]
            role = "staff"
            resource = "contact"
            actions = ["read"]

            [[rules.conditions]]
            field = "name"
            op = "matches"
            value = "unclosed("
        "#;
        match RuleTable::from_toml_str(toml) {
            Err(CustosError::ConfigError { reason }) => {
                assert!(reason.contains("invalid pattern"));
            }
            other => panic!("expected ConfigError, got {:?}", other.map(|_| ())),
        }
    }

    /// A placeholder is not a usable regex pattern.
    #[test]
    fn placeholder_pattern_is_config_error() {
        let toml = r#"
            [[rules]]
            role = "staff"
            resource = "contact"
            actions = ["read"]

            [[rules.conditions]]
            field = "name"
            op = "matches"
            value = "{{userId}}"
        "#;
        match RuleTable::from_toml_str(toml) {
            Err(CustosError::ConfigError { reason }) => {
                assert!(reason.contains("literal string pattern"));
            }
            other => panic!("expected ConfigError, got {:?}", other.map(|_| ())),
        }
    }
}
