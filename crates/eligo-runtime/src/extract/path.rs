//! Path expressions over response values
//!
//! Grammar: optional `$` root anchor, `.name` member segments, `[n]`
//! numeric index, `[*]` wildcard over arrays. `$.items[*].id` collects the
//! `id` of every element. Navigation misses yield `Null`; only a malformed
//! expression is an error.

use eligo_core::Value;

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Key(String),
    Index(usize),
    Wildcard,
}

fn malformed(path: &str, reason: &str) -> EngineError {
    EngineError::ExtractionFailure {
        field: path.to_string(),
        reason: format!("malformed path expression: {}", reason),
    }
}

fn parse(path: &str) -> Result<Vec<Segment>> {
    let trimmed = path.trim();
    let mut rest = trimmed.strip_prefix('$').unwrap_or(trimmed);
    let mut segments = Vec::new();

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('.') {
            let end = after.find(['.', '[']).unwrap_or(after.len());
            let name = &after[..end];
            if name.is_empty() {
                return Err(malformed(path, "empty member name"));
            }
            segments.push(Segment::Key(name.to_string()));
            rest = &after[end..];
        } else if let Some(after) = rest.strip_prefix('[') {
            let end = after
                .find(']')
                .ok_or_else(|| malformed(path, "unterminated index"))?;
            let inner = after[..end].trim();
            if inner == "*" {
                segments.push(Segment::Wildcard);
            } else {
                let index = inner
                    .parse::<usize>()
                    .map_err(|_| malformed(path, "index must be a non-negative integer or *"))?;
                segments.push(Segment::Index(index));
            }
            rest = &after[end + 1..];
        } else {
            // Bare leading member, e.g. "accounts[0].id"
            let end = rest.find(['.', '[']).unwrap_or(rest.len());
            segments.push(Segment::Key(rest[..end].to_string()));
            rest = &rest[end..];
        }
    }

    Ok(segments)
}

/// Evaluate a path expression against a value
///
/// `Ok(Value::Null)` means the path did not lead anywhere in this
/// particular response; `Err` means the expression itself is broken.
pub fn navigate(root: &Value, path: &str) -> Result<Value> {
    let segments = parse(path)?;
    Ok(walk(root, &segments))
}

fn walk(value: &Value, segments: &[Segment]) -> Value {
    let Some((head, tail)) = segments.split_first() else {
        return value.clone();
    };

    match head {
        Segment::Key(name) => match value {
            Value::Object(map) => map
                .get(name)
                .map(|inner| walk(inner, tail))
                .unwrap_or(Value::Null),
            _ => Value::Null,
        },
        Segment::Index(index) => match value {
            Value::Array(items) => items
                .get(*index)
                .map(|inner| walk(inner, tail))
                .unwrap_or(Value::Null),
            _ => Value::Null,
        },
        Segment::Wildcard => match value {
            Value::Array(items) => {
                let collected: Vec<Value> = items
                    .iter()
                    .map(|inner| walk(inner, tail))
                    .filter(|v| !v.is_null())
                    .collect();
                Value::Array(collected)
            }
            _ => Value::Null,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Value {
        let json: serde_json::Value = serde_json::from_str(
            r#"{
                "balance": 12000,
                "account": { "status": "ACTIVE", "owner": { "name": "Ada" } },
                "items": [
                    { "id": "P1", "price": 10 },
                    { "id": "P2", "price": 20 }
                ],
                "tags": ["a", "b"]
            }"#,
        )
        .unwrap();
        Value::from_json(json)
    }

    #[test]
    fn test_root_returns_whole_value() {
        let value = sample();
        assert_eq!(navigate(&value, "$").unwrap(), value);
        assert_eq!(navigate(&value, "").unwrap(), value);
    }

    #[test]
    fn test_nested_members() {
        let value = sample();
        assert_eq!(
            navigate(&value, "$.account.owner.name").unwrap(),
            Value::String("Ada".to_string())
        );
        // Leading anchor is optional
        assert_eq!(
            navigate(&value, "account.status").unwrap(),
            Value::String("ACTIVE".to_string())
        );
    }

    #[test]
    fn test_array_index() {
        let value = sample();
        assert_eq!(
            navigate(&value, "$.items[1].id").unwrap(),
            Value::String("P2".to_string())
        );
        assert_eq!(navigate(&value, "$.tags[0]").unwrap(), Value::String("a".to_string()));
    }

    #[test]
    fn test_wildcard_collects() {
        let value = sample();
        assert_eq!(
            navigate(&value, "$.items[*].id").unwrap(),
            Value::Array(vec![
                Value::String("P1".to_string()),
                Value::String("P2".to_string())
            ])
        );
    }

    #[test]
    fn test_wildcard_terminal_clones_array() {
        let value = sample();
        let items = navigate(&value, "$.items[*]").unwrap();
        assert_eq!(items.as_array().map(|a| a.len()), Some(2));
    }

    #[test]
    fn test_wildcard_skips_missing_members() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"items": [{"id": "P1"}, {"price": 5}]}"#).unwrap();
        let value = Value::from_json(json);

        assert_eq!(
            navigate(&value, "$.items[*].id").unwrap(),
            Value::Array(vec![Value::String("P1".to_string())])
        );
    }

    #[test]
    fn test_misses_yield_null() {
        let value = sample();
        assert_eq!(navigate(&value, "$.missing").unwrap(), Value::Null);
        assert_eq!(navigate(&value, "$.items[9].id").unwrap(), Value::Null);
        assert_eq!(navigate(&value, "$.balance.nested").unwrap(), Value::Null);
        assert_eq!(navigate(&value, "$.tags[*]").unwrap().as_array().map(|a| a.len()), Some(2));
        assert_eq!(navigate(&value, "$.balance[*]").unwrap(), Value::Null);
    }

    #[test]
    fn test_malformed_expressions() {
        let value = sample();
        assert!(navigate(&value, "$.items[").is_err());
        assert!(navigate(&value, "$.items[x]").is_err());
        assert!(navigate(&value, "$.items[-1]").is_err());
        assert!(navigate(&value, "$.a..b").is_err());
    }
}
