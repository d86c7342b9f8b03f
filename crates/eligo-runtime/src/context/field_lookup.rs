//! Field lookup utilities
//!
//! Helpers for navigating nested `Value` structures with dot-notation
//! paths. Missing keys yield Null rather than an error so rule evaluation
//! can treat absent data gracefully.

use eligo_core::Value;
use std::collections::HashMap;

/// Get a nested value from a variable map following a path
///
/// The first segment selects a variable; remaining segments navigate
/// through `Value::Object` layers. Any miss returns Null.
pub(super) fn get_nested_value(data: &HashMap<String, Value>, path: &[&str]) -> Value {
    let Some(first) = path.first() else {
        return Value::Null;
    };

    let mut current = match data.get(*first) {
        Some(v) => v,
        None => {
            tracing::trace!("Variable not found: {}", first);
            return Value::Null;
        }
    };

    for segment in &path[1..] {
        match current {
            Value::Object(map) => match map.get(*segment) {
                Some(v) => current = v,
                None => {
                    tracing::trace!("Nested field not found: {}", segment);
                    return Value::Null;
                }
            },
            _ => {
                tracing::trace!("Cannot access field '{}' on non-object", segment);
                return Value::Null;
            }
        }
    }

    current.clone()
}
