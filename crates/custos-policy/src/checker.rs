//! The permission evaluator.
//!
//! `PermissionChecker` holds a compiled, immutable [`RuleTable`] and decides
//! requests with a pure function. Evaluation order:
//!
//! 1. Select rules matching the context's role and resource. None matching
//!    means the role has no footprint on the resource at all.
//! 2. Of those, keep rules whose action set contains the requested action.
//! 3. Walk the remaining rules in declaration order: a rule with no
//!    conditions allows immediately; otherwise every condition must hold.
//! 4. Nothing passed: denied with "conditions not met".
//!
//! Denials are normal return values. The checker never errors and never
//! mutates, so a single instance serves any number of request workers.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use tracing::{debug, warn};

use custos_contracts::rbac::{
    Action, ConditionOp, PermissionContext, PermissionResult, Resource, Role,
};
use custos_core::traits::PermissionEngine;

use crate::rule::{CompiledCondition, CompiledRule, RuleTable};

/// The attribute-aware permission evaluator.
///
/// Construct once at startup from a [`RuleTable`] and share behind `Arc`.
#[derive(Debug)]
pub struct PermissionChecker {
    table: RuleTable,
}

impl PermissionChecker {
    pub fn new(table: RuleTable) -> Self {
        Self { table }
    }

    /// Decide one request. Pure: reads the table and context, returns a
    /// result, touches nothing else.
    pub fn check(&self, ctx: &PermissionContext) -> PermissionResult {
        debug!(
            user_id = %ctx.user_id,
            role = %ctx.user_role,
            action = %ctx.action,
            resource = %ctx.resource,
            "evaluating permission"
        );

        let role_rules: Vec<&CompiledRule> = self
            .table
            .rules()
            .iter()
            .filter(|r| r.role == ctx.user_role && r.resource == ctx.resource)
            .collect();

        if role_rules.is_empty() {
            warn!(
                role = %ctx.user_role,
                resource = %ctx.resource,
                "role has no permissions for resource"
            );
            return PermissionResult::deny(format!(
                "role '{}' has no permissions for resource '{}'",
                ctx.user_role, ctx.resource
            ))
            .with_required_role(ctx.user_role);
        }

        let action_rules: Vec<&CompiledRule> = role_rules
            .into_iter()
            .filter(|r| r.actions.contains(&ctx.action))
            .collect();

        if action_rules.is_empty() {
            warn!(
                role = %ctx.user_role,
                action = %ctx.action,
                resource = %ctx.resource,
                "role cannot perform action on resource"
            );
            return PermissionResult::deny(format!(
                "role '{}' cannot perform action '{}' on resource '{}'",
                ctx.user_role, ctx.action, ctx.resource
            ))
            .with_required_action(ctx.action);
        }

        for rule in &action_rules {
            if rule.conditions.is_empty() {
                debug!(role = %ctx.user_role, action = %ctx.action, "unconditional rule allowed");
                return PermissionResult::allow();
            }
            if rule.conditions.iter().all(|c| condition_holds(c, ctx)) {
                debug!(role = %ctx.user_role, action = %ctx.action, "conditional rule allowed");
                return PermissionResult::allow();
            }
        }

        warn!(
            user_id = %ctx.user_id,
            role = %ctx.user_role,
            action = %ctx.action,
            resource = %ctx.resource,
            "all matching rules have unmet conditions"
        );
        PermissionResult::deny(format!(
            "conditions not met for role '{}' on resource '{}'",
            ctx.user_role, ctx.resource
        ))
    }

    /// The deduplicated union of actions the role holds on the resource.
    pub fn allowed_actions(&self, role: Role, resource: Resource) -> BTreeSet<Action> {
        self.table
            .rules()
            .iter()
            .filter(|r| r.role == role && r.resource == resource)
            .flat_map(|r| r.actions.iter().copied())
            .collect()
    }

    /// The set of distinct resources the role has any rule for.
    pub fn allowed_resources(&self, role: Role) -> BTreeSet<Resource> {
        self.table
            .rules()
            .iter()
            .filter(|r| r.role == role)
            .map(|r| r.resource)
            .collect()
    }
}

impl PermissionEngine for PermissionChecker {
    fn check(&self, ctx: &PermissionContext) -> PermissionResult {
        PermissionChecker::check(self, ctx)
    }
}

// ── Condition evaluation ──────────────────────────────────────────────────────

/// Evaluate one condition against the context.
///
/// The context value is `metadata[field]`, falling back to
/// `resource_owner_id`; a condition with no context value to test fails.
/// A placeholder that cannot resolve also fails. Every failure path denies,
/// never allows.
fn condition_holds(cond: &CompiledCondition, ctx: &PermissionContext) -> bool {
    let actual = match ctx.metadata.get(&cond.field) {
        Some(v) => v.clone(),
        None => match &ctx.resource_owner_id {
            Some(owner) => serde_json::Value::String(owner.clone()),
            None => return false,
        },
    };

    let expected = match cond.value.resolve(ctx) {
        Some(v) => v,
        None => return false,
    };

    match cond.op {
        ConditionOp::Eq => actual == expected,
        ConditionOp::Ne => actual != expected,
        ConditionOp::In => expected
            .as_array()
            .map_or(false, |arr| arr.contains(&actual)),
        ConditionOp::Nin => expected
            .as_array()
            .map_or(false, |arr| !arr.contains(&actual)),
        ConditionOp::Gt => {
            compare_values(&actual, &expected).map_or(false, |o| o == Ordering::Greater)
        }
        ConditionOp::Lt => {
            compare_values(&actual, &expected).map_or(false, |o| o == Ordering::Less)
        }
        ConditionOp::Matches => cond
            .pattern
            .as_ref()
            .map_or(false, |re| re.is_match(&string_form(&actual))),
    }
}

/// Order two JSON values: numerically when both are numbers, lexically when
/// both are strings, incomparable otherwise.
fn compare_values(a: &serde_json::Value, b: &serde_json::Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x.partial_cmp(&y);
    }
    if let (Some(x), Some(y)) = (a.as_str(), b.as_str()) {
        return Some(x.cmp(y));
    }
    None
}

/// The string a `matches` pattern is tested against.
fn string_form(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
