//! RBAC vocabulary and permission rule types.
//!
//! The role / resource / action vocabulary is a closed set. Rules narrow
//! that vocabulary with attribute conditions (ABAC): a condition compares a
//! field from the request context against a literal or a resolved
//! placeholder such as the calling user's id. Operators are a tagged enum,
//! not strings, so an operator that does not exist cannot be expressed and
//! a rule file that names one fails to parse (fail-closed).

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// ── Vocabulary ────────────────────────────────────────────────────────────────

/// The closed set of caller roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Nurse,
    Doctor,
    Pharmacist,
    Staff,
    Teacher,
    Guardian,
    Viewer,
    ApiClient,
    System,
}

/// The closed set of protected resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resource {
    Student,
    Medication,
    HealthRecord,
    Contact,
    Audit,
    Report,
    User,
    Notification,
}

/// The closed set of operations a rule can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    Read,
    List,
    Create,
    Update,
    Delete,
    AdministerMedication,
    ViewAudit,
    Export,
    Search,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::SuperAdmin => "super-admin",
            Role::Admin => "admin",
            Role::Nurse => "nurse",
            Role::Doctor => "doctor",
            Role::Pharmacist => "pharmacist",
            Role::Staff => "staff",
            Role::Teacher => "teacher",
            Role::Guardian => "guardian",
            Role::Viewer => "viewer",
            Role::ApiClient => "api-client",
            Role::System => "system",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Student => "student",
            Resource::Medication => "medication",
            Resource::HealthRecord => "health-record",
            Resource::Contact => "contact",
            Resource::Audit => "audit",
            Resource::Report => "report",
            Resource::User => "user",
            Resource::Notification => "notification",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Read => "read",
            Action::List => "list",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::AdministerMedication => "administer-medication",
            Action::ViewAudit => "view-audit",
            Action::Export => "export",
            Action::Search => "search",
        };
        f.write_str(name)
    }
}

// ── Conditions ────────────────────────────────────────────────────────────────

/// Comparison operators available to rule conditions.
///
/// Serialized lowercase in rule files: `eq`, `ne`, `in`, `nin`, `gt`, `lt`,
/// `matches`. Anything else fails deserialization, which surfaces as a
/// `ConfigError` at rule-table build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionOp {
    /// Equality on JSON values.
    Eq,
    /// Inequality on JSON values.
    Ne,
    /// Membership in an array value.
    In,
    /// Non-membership in an array value.
    Nin,
    /// Numeric greater-than (string comparison when both sides are strings).
    Gt,
    /// Numeric less-than (string comparison when both sides are strings).
    Lt,
    /// The value is a regular expression tested against the context value.
    Matches,
}

/// A request attribute a condition value can refer to instead of a literal.
///
/// Rule files write these as template strings: `"{{userId}}"` and
/// `"{{resourceId}}"`. They are recognized once at rule-table build time;
/// evaluation resolves them with [`ConditionValue::resolve`], so no string
/// substitution happens on the hot path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placeholder {
    UserId,
    ResourceId,
}

/// The right-hand side of a condition: a literal or a context placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConditionValue {
    Literal(serde_json::Value),
    Placeholder(Placeholder),
}

impl ConditionValue {
    /// Classify a raw config value, recognizing the template placeholders.
    pub fn parse(raw: serde_json::Value) -> Self {
        if let serde_json::Value::String(s) = &raw {
            match s.as_str() {
                "{{userId}}" => return ConditionValue::Placeholder(Placeholder::UserId),
                "{{resourceId}}" => return ConditionValue::Placeholder(Placeholder::ResourceId),
                _ => {}
            }
        }
        ConditionValue::Literal(raw)
    }

    /// Resolve this value against a request context.
    ///
    /// Returns `None` when a placeholder refers to a context field that is
    /// absent (e.g. `{{resourceId}}` on a collection-level request); a
    /// condition whose value cannot be resolved never passes.
    pub fn resolve(&self, ctx: &PermissionContext) -> Option<serde_json::Value> {
        match self {
            ConditionValue::Literal(v) => Some(v.clone()),
            ConditionValue::Placeholder(Placeholder::UserId) => {
                Some(serde_json::Value::String(ctx.user_id.clone()))
            }
            ConditionValue::Placeholder(Placeholder::ResourceId) => ctx
                .resource_id
                .clone()
                .map(serde_json::Value::String),
        }
    }
}

/// One attribute predicate on a rule.
///
/// All conditions on a rule are combined with AND. A rule with zero
/// conditions is unconditionally satisfied once role, resource, and action
/// match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// The context field to test: looked up in `PermissionContext::metadata`,
    /// falling back to `resource_owner_id`.
    pub field: String,
    pub op: ConditionOp,
    pub value: ConditionValue,
}

/// One (role, resource, action-set, conditions) grant.
///
/// The rule table is append-only at build time and immutable at evaluation
/// time: nothing in the API mutates a rule once the table is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionRule {
    pub role: Role,
    pub resource: Resource,
    pub actions: BTreeSet<Action>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

// ── Evaluation context and result ─────────────────────────────────────────────

/// Everything the evaluator needs to decide one request.
///
/// Built per request by the caller from the identity source and the routing
/// layer; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionContext {
    pub user_id: String,
    pub user_role: Role,
    pub action: Action,
    pub resource: Resource,
    /// The concrete record targeted, when the request addresses one.
    pub resource_id: Option<String>,
    /// The owner of the targeted record, when the caller knows it.
    /// Used as a fallback when a condition's field is absent from `metadata`.
    pub resource_owner_id: Option<String>,
    /// Request attributes conditions can test (relationship ids, counts, …).
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// The evaluator's decision. Always a normal return value, never an error.
///
/// Denial reasons name the role, resource, and action but never whether a
/// concrete record exists, so the boundary can distinguish "not authorized"
/// from "not found" without leaking existence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionResult {
    pub allowed: bool,
    pub reason: Option<String>,
    pub required_role: Option<Role>,
    pub required_action: Option<Action>,
}

impl PermissionResult {
    /// An unqualified allow.
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            required_role: None,
            required_action: None,
        }
    }

    /// A denial carrying a human-readable reason.
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            required_role: None,
            required_action: None,
        }
    }

    /// Record the action the denial hinged on.
    pub fn with_required_action(mut self, action: Action) -> Self {
        self.required_action = Some(action);
        self
    }

    /// Record the role the denial hinged on.
    pub fn with_required_role(mut self, role: Role) -> Self {
        self.required_role = Some(role);
        self
    }
}
