//! Merge policies for schema nodes.
//!
//! Two tiers are used when a mutation result is applied to a node: every key
//! is overridden shallowly, except `style` and `_props` which are deep-merged
//! when both sides define them.

use serde_json::{Map, Value};

/// Keys that are deep-merged instead of replaced when a mutation is applied
pub const DEEP_MERGED_KEYS: [&str; 2] = ["style", "_props"];

/// Recursively merge `overlay` into `base`.
///
/// Objects merge key by key; any other overlay value replaces the base value.
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

/// Apply a mutation result over a schema node.
pub fn apply_mutation(node: &Map<String, Value>, overrides: Option<&Map<String, Value>>) -> Map<String, Value> {
    let mut merged = node.clone();
    let Some(overrides) = overrides else {
        return merged;
    };

    for (key, value) in overrides {
        let deep = DEEP_MERGED_KEYS.contains(&key.as_str())
            && value.is_object()
            && merged.get(key).is_some_and(Value::is_object);

        if deep {
            if let Some(existing) = merged.get_mut(key) {
                deep_merge(existing, value);
            }
        } else {
            merged.insert(key.clone(), value.clone());
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_deep_merge_nested() {
        let mut base = json!({"a": {"b": 1, "c": {"d": 2}}, "x": [1, 2]});
        deep_merge(&mut base, &json!({"a": {"c": {"e": 3}}, "x": [3]}));
        assert_eq!(base, json!({"a": {"b": 1, "c": {"d": 2, "e": 3}}, "x": [3]}));
    }

    #[test]
    fn test_apply_mutation_deep_merges_style_and_props() {
        let node = obj(json!({
            "name": "title",
            "style": {"color": "blue", "margin": 0},
            "_props": {"data": {"a": 1}},
            "content": {"name": "inner"}
        }));
        let overrides = obj(json!({
            "style": {"color": "red"},
            "_props": {"data": {"b": 2}},
            "content": "replaced"
        }));

        let merged = apply_mutation(&node, Some(&overrides));
        assert_eq!(merged["style"], json!({"color": "red", "margin": 0}));
        assert_eq!(merged["_props"], json!({"data": {"a": 1, "b": 2}}));
        // everything else is shallow
        assert_eq!(merged["content"], json!("replaced"));
        assert_eq!(merged["name"], json!("title"));
    }

    #[test]
    fn test_apply_mutation_style_only_on_one_side() {
        let node = obj(json!({"name": "a"}));
        let overrides = obj(json!({"style": {"color": "red"}}));
        let merged = apply_mutation(&node, Some(&overrides));
        assert_eq!(merged["style"], json!({"color": "red"}));

        let untouched = apply_mutation(&node, None);
        assert_eq!(untouched, node);
    }
}
