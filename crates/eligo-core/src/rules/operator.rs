//! Operators for rule conditions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison operator of a leaf rule condition
///
/// Deserialized from the camelCase operator names used in rule
/// configuration. An unrecognized name maps to `Unknown` instead of
/// failing deserialization; the evaluator treats `Unknown` as false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleOperator {
    /// Field is present in the context
    Exists,
    /// Field is absent from the context
    NotExists,
    /// Equal
    Equals,
    /// Not equal
    NotEquals,
    /// Greater than (numeric)
    Gt,
    /// Greater than or equal (numeric)
    Gte,
    /// Less than (numeric)
    Lt,
    /// Less than or equal (numeric)
    Lte,
    /// Membership in an array value
    In,
    /// Absence from an array value
    NotIn,
    /// Regex match against the string form
    Matches,
    /// Fallback for operator names not in this set
    #[serde(other)]
    Unknown,
}

impl RuleOperator {
    /// Returns true for the existence checks, which are the only operators
    /// that distinguish a missing field from a present one
    pub fn is_existence(&self) -> bool {
        matches!(self, RuleOperator::Exists | RuleOperator::NotExists)
    }

    /// Returns true for the numeric comparison operators
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            RuleOperator::Gt | RuleOperator::Gte | RuleOperator::Lt | RuleOperator::Lte
        )
    }
}

impl fmt::Display for RuleOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleOperator::Exists => "exists",
            RuleOperator::NotExists => "notExists",
            RuleOperator::Equals => "equals",
            RuleOperator::NotEquals => "notEquals",
            RuleOperator::Gt => "gt",
            RuleOperator::Gte => "gte",
            RuleOperator::Lt => "lt",
            RuleOperator::Lte => "lte",
            RuleOperator::In => "in",
            RuleOperator::NotIn => "notIn",
            RuleOperator::Matches => "matches",
            RuleOperator::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// Logical combinator for a rule group
///
/// `And` requires every member true, `Or` at least one, `Not` none
/// (a combined not-or).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Combinator {
    #[default]
    And,
    Or,
    Not,
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
            Combinator::Not => "NOT",
        };
        write!(f, "{}", name)
    }
}
