//! Rule evaluation
//!
//! Applies an inclusion rule tree to the extracted context. Every leaf
//! condition contributes one entry to the diagnostic trail regardless of
//! the final verdict; a missing variable never errors, it simply makes
//! non-existence operators evaluate to false.

use eligo_core::{Combinator, InclusionRules, RuleCondition, RuleOperator, Value};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::context::ExecutionContext;
use crate::error::EngineError;

/// One evaluated leaf condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionCheck {
    pub field: String,
    pub operator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<Value>,
    pub result: bool,
}

/// Final verdict plus the full per-condition trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleOutcome {
    pub result: bool,
    pub matched_conditions: Vec<ConditionCheck>,
}

pub struct RuleEvaluator;

impl RuleEvaluator {
    /// Evaluate a rule tree against the context
    pub fn evaluate(rules: &InclusionRules, ctx: &ExecutionContext) -> RuleOutcome {
        let mut trail = Vec::new();
        let result = Self::evaluate_group(rules, ctx, &mut trail);

        tracing::debug!(
            result,
            conditions = trail.len(),
            "rule evaluation complete"
        );
        RuleOutcome {
            result,
            matched_conditions: trail,
        }
    }

    /// Combine leaf conditions and nested groups under one combinator
    ///
    /// Each nested group contributes a single boolean to its parent.
    fn evaluate_group(
        rules: &InclusionRules,
        ctx: &ExecutionContext,
        trail: &mut Vec<ConditionCheck>,
    ) -> bool {
        let mut outcomes: Vec<bool> = Vec::new();

        for condition in &rules.conditions {
            let check = Self::evaluate_condition(condition, ctx);
            outcomes.push(check.result);
            trail.push(check);
        }
        for group in &rules.groups {
            outcomes.push(Self::evaluate_group(group, ctx, trail));
        }

        match rules.combinator {
            Combinator::And => outcomes.iter().all(|ok| *ok),
            Combinator::Or => outcomes.iter().any(|ok| *ok),
            Combinator::Not => !outcomes.iter().any(|ok| *ok),
        }
    }

    fn evaluate_condition(condition: &RuleCondition, ctx: &ExecutionContext) -> ConditionCheck {
        if matches!(condition.operator, RuleOperator::Unknown) {
            let gap = EngineError::InvalidRuleOperator(condition.field.clone());
            tracing::warn!(error = %gap, "condition evaluates to false");
        }

        let actual = ctx.load_field(&condition.field);
        let result =
            Self::apply_operator(&condition.operator, actual.as_ref(), condition.value.as_ref());

        ConditionCheck {
            field: condition.field.clone(),
            operator: condition.operator.to_string(),
            expected: condition.value.clone(),
            actual,
            result,
        }
    }

    fn apply_operator(
        operator: &RuleOperator,
        actual: Option<&Value>,
        expected: Option<&Value>,
    ) -> bool {
        match operator {
            RuleOperator::Exists => actual.is_some(),
            RuleOperator::NotExists => actual.is_none(),
            RuleOperator::Equals => match (actual, expected) {
                (Some(actual), Some(expected)) => values_equal(actual, expected),
                _ => false,
            },
            RuleOperator::NotEquals => match (actual, expected) {
                (Some(actual), Some(expected)) => !values_equal(actual, expected),
                _ => false,
            },
            RuleOperator::Gt => Self::compare(actual, expected, |a, e| a > e),
            RuleOperator::Gte => Self::compare(actual, expected, |a, e| a >= e),
            RuleOperator::Lt => Self::compare(actual, expected, |a, e| a < e),
            RuleOperator::Lte => Self::compare(actual, expected, |a, e| a <= e),
            RuleOperator::In => Self::membership(actual, expected),
            RuleOperator::NotIn => match (actual, expected) {
                (Some(_), Some(_)) => !Self::membership(actual, expected),
                _ => false,
            },
            RuleOperator::Matches => Self::matches(actual, expected),
            RuleOperator::Unknown => false,
        }
    }

    /// Numeric comparison; any side that cannot coerce to f64 yields false
    fn compare(
        actual: Option<&Value>,
        expected: Option<&Value>,
        op: impl Fn(f64, f64) -> bool,
    ) -> bool {
        let (Some(actual), Some(expected)) = (actual, expected) else {
            return false;
        };
        match (actual.as_f64(), expected.as_f64()) {
            (Some(a), Some(e)) => op(a, e),
            _ => {
                tracing::debug!("non-numeric operand in comparison, yielding false");
                false
            }
        }
    }

    fn membership(actual: Option<&Value>, expected: Option<&Value>) -> bool {
        let (Some(actual), Some(Value::Array(items))) = (actual, expected) else {
            return false;
        };
        items.iter().any(|item| values_equal(actual, item))
    }

    fn matches(actual: Option<&Value>, expected: Option<&Value>) -> bool {
        let (Some(actual), Some(expected)) = (actual, expected) else {
            return false;
        };
        let pattern = expected.to_display_string();
        match Regex::new(&pattern) {
            Ok(regex) => regex.is_match(&actual.to_display_string()),
            Err(err) => {
                tracing::debug!(pattern = %pattern, error = %err, "invalid match pattern, yielding false");
                false
            }
        }
    }
}

/// Equality with numeric coercion so `"12000"` equals `12000`
///
/// Shared with the executor's next-call checks so chaining and rule
/// evaluation agree on what equal means.
pub(crate) fn values_equal(actual: &Value, expected: &Value) -> bool {
    if actual == expected {
        return true;
    }
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(e)) => a == e,
        _ => false,
    }
}
