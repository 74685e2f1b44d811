use serde_json::Value;

/// Recursive dictionary union with right-hand-side precedence (§6):
/// objects are merged key-by-key, recursing into nested objects; any other
/// value type (including arrays) is replaced wholesale by `rhs`.
pub fn merge_json(lhs: Value, rhs: Value) -> Value {
    match (lhs, rhs) {
        (Value::Object(mut lhs_map), Value::Object(rhs_map)) => {
            for (key, rhs_value) in rhs_map {
                let merged = match lhs_map.remove(&key) {
                    Some(lhs_value) => merge_json(lhs_value, rhs_value),
                    None => rhs_value,
                };
                lhs_map.insert(key, merged);
            }
            Value::Object(lhs_map)
        }
        (_, rhs) => rhs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merges_nested_objects() {
        let lhs = json!({"a": {"x": 1, "y": 2}, "b": 5});
        let rhs = json!({"a": {"y": 3}});
        assert_eq!(merge_json(lhs, rhs), json!({"a": {"x": 1, "y": 3}, "b": 5}));
    }

    #[test]
    fn rhs_scalar_replaces_lhs_wholesale() {
        let lhs = json!({"a": [1, 2, 3]});
        let rhs = json!({"a": [9]});
        assert_eq!(merge_json(lhs, rhs), json!({"a": [9]}));
    }
}
