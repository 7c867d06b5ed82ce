//! Rule table configuration schema and compilation.
//!
//! A `RuleTableConfig` is deserialized from TOML and compiled into an
//! immutable [`RuleTable`]. Compilation is where everything stringly gets
//! resolved: template placeholders become typed [`ConditionValue`]s and
//! `matches` patterns become pre-built regexes. A config that cannot be
//! compiled is a `ConfigError`; a malformed rule never degrades to allow.
//!
//! Example policy file:
//!
//! ```toml
//! [[rules]]
//! role = "nurse"
//! resource = "medication"
//! actions = ["read", "list", "administer-medication"]
//!
//! [[rules]]
//! role = "guardian"
//! resource = "student"
//! actions = ["read"]
//!
//! [[rules.conditions]]
//! field = "guardianId"
//! op = "eq"
//! value = "{{userId}}"
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use custos_contracts::{
    error::{CustosError, CustosResult},
    rbac::{Action, ConditionOp, ConditionValue, Resource, Role},
};

// ── Raw config schema ─────────────────────────────────────────────────────────

/// The top-level structure deserialized from a TOML policy file.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleTableConfig {
    /// Ordered list of rules. Evaluation walks them in declaration order.
    pub rules: Vec<RuleConfig>,
}

/// One rule as written in TOML, before compilation.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
    pub role: Role,
    pub resource: Resource,
    pub actions: Vec<Action>,
    #[serde(default)]
    pub conditions: Vec<ConditionConfig>,
}

/// One condition as written in TOML.
///
/// `value` may be a string, number, boolean, or array. The strings
/// `"{{userId}}"` and `"{{resourceId}}"` are compiled to placeholders.
#[derive(Debug, Clone, Deserialize)]
pub struct ConditionConfig {
    pub field: String,
    pub op: ConditionOp,
    pub value: toml::Value,
}

// ── Compiled rules ────────────────────────────────────────────────────────────

/// A condition ready for evaluation: typed value, pre-built regex.
#[derive(Debug, Clone)]
pub struct CompiledCondition {
    pub field: String,
    pub op: ConditionOp,
    pub value: ConditionValue,
    /// Present exactly when `op == Matches`.
    pub pattern: Option<Regex>,
}

/// A compiled rule with a deduplicated action set.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub role: Role,
    pub resource: Resource,
    pub actions: BTreeSet<Action>,
    pub conditions: Vec<CompiledCondition>,
}

/// The immutable rule table the evaluator runs against.
///
/// Built once at process start; nothing in the API mutates it afterwards,
/// which is what makes concurrent lock-free evaluation safe.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<CompiledRule>,
}

impl RuleTable {
    /// Parse `s` as TOML and compile it into a rule table.
    pub fn from_toml_str(s: &str) -> CustosResult<Self> {
        let config: RuleTableConfig = toml::from_str(s).map_err(|e| CustosError::ConfigError {
            reason: format!("failed to parse rule TOML: {}", e),
        })?;
        Self::compile(config)
    }

    /// Read the file at `path` and parse it as TOML rule configuration.
    pub fn from_file(path: &Path) -> CustosResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| CustosError::ConfigError {
            reason: format!("failed to read rule file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Compile a parsed config into the immutable table.
    ///
    /// Returns `ConfigError` when a `matches` condition has a non-string or
    /// invalid pattern, or when a condition value cannot be represented.
    pub fn compile(config: RuleTableConfig) -> CustosResult<Self> {
        let mut rules = Vec::with_capacity(config.rules.len());

        for (index, raw) in config.rules.into_iter().enumerate() {
            let mut conditions = Vec::with_capacity(raw.conditions.len());

            for cond in raw.conditions {
                let json = toml_to_json(cond.value).map_err(|reason| CustosError::ConfigError {
                    reason: format!(
                        "rule {} condition on '{}': {}",
                        index, cond.field, reason
                    ),
                })?;
                let value = ConditionValue::parse(json);

                let pattern = if cond.op == ConditionOp::Matches {
                    Some(compile_pattern(index, &cond.field, &value)?)
                } else {
                    None
                };

                conditions.push(CompiledCondition {
                    field: cond.field,
                    op: cond.op,
                    value,
                    pattern,
                });
            }

            rules.push(CompiledRule {
                role: raw.role,
                resource: raw.resource,
                actions: raw.actions.into_iter().collect(),
                conditions,
            });
        }

        Ok(Self { rules })
    }

    /// All compiled rules, in declaration order.
    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }
}

/// Build the regex for a `matches` condition.
///
/// The pattern must be a literal string; a placeholder makes no sense as a
/// regular expression and is rejected at compile time.
fn compile_pattern(
    rule_index: usize,
    field: &str,
    value: &ConditionValue,
) -> CustosResult<Regex> {
    let source = match value {
        ConditionValue::Literal(serde_json::Value::String(s)) => s,
        _ => {
            return Err(CustosError::ConfigError {
                reason: format!(
                    "rule {} condition on '{}': 'matches' requires a literal string pattern",
                    rule_index, field
                ),
            })
        }
    };
    Regex::new(source).map_err(|e| CustosError::ConfigError {
        reason: format!(
            "rule {} condition on '{}': invalid pattern: {}",
            rule_index, field, e
        ),
    })
}

/// Convert a TOML value into the JSON value space conditions compare in.
fn toml_to_json(value: toml::Value) -> Result<serde_json::Value, String> {
    serde_json::to_value(value).map_err(|e| format!("unsupported value: {}", e))
}
