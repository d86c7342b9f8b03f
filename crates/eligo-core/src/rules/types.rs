//! Rule tree types
//!
//! An `InclusionRules` value is either a flat list of conditions under one
//! combinator, or a nested tree where sub-groups contribute one boolean
//! each to the parent combination.

use crate::rules::operator::{Combinator, RuleOperator};
use crate::types::Value;
use serde::{Deserialize, Serialize};

/// A single leaf condition: field, operator, expected value
///
/// `field` is a dotted reference into the execution context, optionally
/// scoped by a data-source id (`accountApi.balanceTier`). `value` is absent
/// for the existence operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    pub field: String,
    pub operator: RuleOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl RuleCondition {
    /// Create a condition with an expected value
    pub fn new(field: impl Into<String>, operator: RuleOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value: Some(value),
        }
    }

    /// Create a value-less condition (exists / notExists)
    pub fn existence(field: impl Into<String>, operator: RuleOperator) -> Self {
        Self {
            field: field.into(),
            operator,
            value: None,
        }
    }
}

/// Inclusion rule tree
///
/// `conditions` and `groups` members all contribute one boolean each;
/// `combinator` folds them. An empty tree evaluates by the combinator's
/// vacuous value (AND and NOT over nothing are true, OR is false).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InclusionRules {
    #[serde(default)]
    pub combinator: Combinator,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<RuleCondition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<InclusionRules>,
}

impl InclusionRules {
    /// Create a flat rule set
    pub fn flat(combinator: Combinator, conditions: Vec<RuleCondition>) -> Self {
        Self {
            combinator,
            conditions,
            groups: Vec::new(),
        }
    }

    /// Add a nested group
    pub fn with_group(mut self, group: InclusionRules) -> Self {
        self.groups.push(group);
        self
    }

    /// True when the tree has no conditions and no groups at any level
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.groups.iter().all(|g| g.is_empty())
    }

    /// Total number of leaf conditions in the tree
    pub fn leaf_count(&self) -> usize {
        self.conditions.len() + self.groups.iter().map(|g| g.leaf_count()).sum::<usize>()
    }
}
