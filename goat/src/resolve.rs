//! Reference substitution for schemas.
//!
//! `"$data/user/name"` is replaced by the value at `/data/user/name` of the
//! context. An object with a string `ref` field is replaced by the referenced
//! object with its own remaining fields laid over it. Anything that does not
//! resolve is left as written.

use serde_json::{Map, Value};
use tracing::warn;

/// Longest chain of references followed before giving up
pub const MAX_DEPTH: usize = 32;

/// Resolve every reference in `schema` against `context`.
pub fn resolve_refs(schema: &Value, context: &Value) -> Value {
    resolve(schema, context, 0)
}

/// JSON pointer for a `$root/path` reference
pub fn reference_pointer(reference: &str) -> Option<String> {
    let path = reference.strip_prefix('$')?;
    if path.is_empty() || path.starts_with(char::is_whitespace) || path.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    Some(format!("/{}", path.trim_start_matches('/')))
}

fn lookup<'c>(reference: &str, context: &'c Value) -> Option<&'c Value> {
    context.pointer(&reference_pointer(reference)?)
}

fn resolve(value: &Value, context: &Value, depth: usize) -> Value {
    if depth > MAX_DEPTH {
        warn!(depth, "reference chain too deep, leaving it unresolved");
        return value.clone();
    }

    match value {
        Value::String(s) => match lookup(s, context) {
            Some(found) => resolve(found, context, depth + 1),
            None => value.clone(),
        },
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve(v, context, depth)).collect()),
        Value::Object(map) => {
            let target = map
                .get("ref")
                .and_then(Value::as_str)
                .and_then(|r| lookup(r, context))
                .and_then(Value::as_object);
            match target {
                Some(target) => {
                    let mut merged: Map<String, Value> = target.clone();
                    for (key, field) in map {
                        if key != "ref" {
                            merged.insert(key.clone(), field.clone());
                        }
                    }
                    resolve(&Value::Object(merged), context, depth + 1)
                }
                None => Value::Object(
                    map.iter()
                        .map(|(k, v)| (k.clone(), resolve(v, context, depth)))
                        .collect(),
                ),
            }
        }
        _ => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_references() {
        let ctx = json!({"data": {"user": {"name": "Ada"}, "items": [1, 2]}});
        let schema = json!({
            "name": "greeting",
            "content": ["$data/user/name", "$data/items/1", "$data/missing", "$5.00"]
        });
        let resolved = resolve_refs(&schema, &ctx);
        assert_eq!(resolved["content"], json!(["Ada", 2, "$data/missing", "$5.00"]));
    }

    #[test]
    fn test_ref_objects_merge_own_fields() {
        let ctx = json!({"definitions": {"card": {"component": "Card", "classes": "base", "content": "Body"}}});
        let schema = json!({"ref": "$definitions/card", "name": "promo", "classes": "promo"});
        let resolved = resolve_refs(&schema, &ctx);
        assert_eq!(
            resolved,
            json!({"component": "Card", "classes": "promo", "content": "Body", "name": "promo"})
        );
    }

    #[test]
    fn test_chained_references() {
        let ctx = json!({"a": "$b", "b": "$c", "c": "end"});
        assert_eq!(resolve_refs(&json!("$a"), &ctx), json!("end"));
    }

    #[test]
    fn test_cycle_stops() {
        let ctx = json!({"a": "$b", "b": "$a"});
        let resolved = resolve_refs(&json!("$a"), &ctx);
        assert!(resolved.as_str().unwrap().starts_with('$'));
    }
}
