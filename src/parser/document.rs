//! Flattening of `notmuch show --format=json` output into message records.
//!
//! The output nests messages inside thread and reply arrays to a depth that
//! depends on the data. Every object node is a message; arrays are
//! concatenated; `null` contributes nothing. Strings, numbers and booleans
//! have no place in that structure and abort the decode.

use serde_json::Value;

use crate::error::{EpistleError, Result};

/// Collect every message object in `doc`, depth-first, in document order.
///
/// The walk keeps its own stack, so reply chains of any length decode.
pub fn flatten_records(doc: Value) -> Result<Vec<Value>> {
    let mut records = Vec::new();
    let mut pending = vec![doc];
    while let Some(node) = pending.pop() {
        match node {
            Value::Null => {}
            Value::Object(_) => records.push(node),
            Value::Array(items) => pending.extend(items.into_iter().rev()),
            other => {
                return Err(EpistleError::MalformedDocument(format!(
                    "unexpected {} in query output",
                    kind(&other)
                )))
            }
        }
    }
    Ok(records)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(records: &[Value]) -> Vec<&str> {
        records
            .iter()
            .map(|r| r["id"].as_str().unwrap_or("?"))
            .collect()
    }

    #[test]
    fn test_three_level_nesting_is_flattened_depth_first() {
        let doc = json!([
            [[{"id": "a"}, [[{"id": "b"}, []]]]],
            [[{"id": "c"}, []]]
        ]);
        let records = flatten_records(doc).unwrap();
        assert_eq!(ids(&records), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_null_contributes_nothing() {
        let doc = json!([[null, [[{"id": "x"}, null]]]]);
        assert_eq!(ids(&flatten_records(doc).unwrap()), vec!["x"]);
        assert!(flatten_records(Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_bare_object_is_one_record() {
        let records = flatten_records(json!({"id": "solo"})).unwrap();
        assert_eq!(ids(&records), vec!["solo"]);
    }

    #[test]
    fn test_empty_result() {
        assert!(flatten_records(json!([])).unwrap().is_empty());
    }

    #[test]
    fn test_bare_number_is_fatal() {
        let err = flatten_records(json!(42)).unwrap_err();
        assert!(matches!(err, EpistleError::MalformedDocument(_)));
    }

    #[test]
    fn test_scalar_inside_array_is_fatal() {
        assert!(flatten_records(json!([[{"id": "a"}, "oops"]])).is_err());
        assert!(flatten_records(json!([true])).is_err());
    }

    /// `[[ [msg0, [[msg1, [ ... ]]]] ]]`, one reply per message.
    fn reply_chain(len: usize) -> Value {
        let mut replies = json!([]);
        for n in (1..len).rev() {
            replies = json!([[{"id": format!("m{n}")}, replies]]);
        }
        json!([[[{"id": "m0"}, replies]]])
    }

    #[test]
    fn test_long_reply_chain_is_flattened_in_order() {
        let records = flatten_records(reply_chain(40)).unwrap();
        let expected: Vec<String> = (0..40).map(|n| format!("m{n}")).collect();
        assert_eq!(ids(&records), expected);
    }

    #[test]
    fn test_nesting_far_beyond_parser_depth() {
        let mut doc = json!({"id": "deep"});
        for _ in 0..1_000 {
            doc = Value::Array(vec![doc]);
        }
        assert_eq!(ids(&flatten_records(doc).unwrap()), vec!["deep"]);
    }
}
