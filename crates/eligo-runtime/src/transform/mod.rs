//! Post-extraction value transforms
//!
//! Transforms run after path extraction and before validation. Each kind is
//! a closed enum variant carrying its own parameters; configuration writes
//! them as `{ type: ..., ... }` maps. A transform never fails: inputs it
//! cannot handle pass through unchanged or collapse to Null, which sends the
//! field down the default-value path.

use chrono::{Datelike, NaiveDate, Utc};
use eligo_core::Value;
use serde::{Deserialize, Serialize};

/// One range entry for tier classification, bounds inclusive
///
/// A missing `min` or `max` leaves that side of the range open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierMapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    pub value: Value,
}

/// Transform kinds applicable to an extracted field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TransformKind {
    /// Uppercase a string value
    Uppercase,
    /// Lowercase a string value
    Lowercase,
    /// Trim surrounding whitespace from a string value
    Trim,
    /// Take the first element of an array, with an optional fallback when
    /// the array is empty
    SelectFirst {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fallback: Option<Value>,
    },
    /// Convert an ISO date (yyyy-mm-dd) into an age in whole years
    CalculateAge,
    /// Map a numeric value onto the first matching range entry
    TierClassification { mappings: Vec<TierMapping> },
    /// Fallback for transform types not in this set; acts as identity
    #[serde(other)]
    Unknown,
}

impl TransformKind {
    /// Apply the transform to a value
    pub fn apply(&self, value: Value) -> Value {
        match self {
            TransformKind::Uppercase => match value {
                Value::String(s) => Value::String(s.to_uppercase()),
                other => other,
            },
            TransformKind::Lowercase => match value {
                Value::String(s) => Value::String(s.to_lowercase()),
                other => other,
            },
            TransformKind::Trim => match value {
                Value::String(s) => Value::String(s.trim().to_string()),
                other => other,
            },
            TransformKind::SelectFirst { fallback } => match value {
                Value::Array(items) => items
                    .into_iter()
                    .next()
                    .or_else(|| fallback.clone())
                    .unwrap_or(Value::Null),
                other => other,
            },
            TransformKind::CalculateAge => match value
                .as_str()
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
            {
                Some(dob) => {
                    Value::Number(age_in_years(dob, Utc::now().date_naive()) as f64)
                }
                None => {
                    tracing::debug!("calculateAge: value is not an ISO date, yielding Null");
                    Value::Null
                }
            },
            TransformKind::TierClassification { mappings } => classify(&value, mappings),
            TransformKind::Unknown => {
                tracing::warn!("Unknown transform type, passing value through");
                value
            }
        }
    }
}

/// Whole years between a date of birth and a reference date
fn age_in_years(dob: NaiveDate, on: NaiveDate) -> i32 {
    let mut age = on.year() - dob.year();
    if (on.month(), on.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    age.max(0)
}

/// Find the first range entry containing the numeric value
///
/// Non-numeric input or no matching range yields Null so the field falls
/// back to its configured default.
fn classify(value: &Value, mappings: &[TierMapping]) -> Value {
    let Some(n) = value.as_f64() else {
        tracing::debug!("tierClassification: value is not numeric, yielding Null");
        return Value::Null;
    };

    for mapping in mappings {
        let above_min = mapping.min.map_or(true, |min| n >= min);
        let below_max = mapping.max.map_or(true, |max| n <= max);
        if above_min && below_max {
            return mapping.value.clone();
        }
    }

    tracing::debug!("tierClassification: no range matched {}", n);
    Value::Null
}
