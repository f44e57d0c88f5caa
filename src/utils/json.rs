use serde_json::{Map, Value};

/// JSON merge patch (RFC 7396): `null` removes a key, objects merge
/// recursively, anything else replaces.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_fields) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target_fields) = target {
        for (key, value) in patch_fields {
            if value.is_null() {
                target_fields.remove(key);
            } else {
                merge_patch(
                    target_fields.entry(key.clone()).or_insert(Value::Null),
                    value,
                );
            }
        }
    }
}

/// Resolves a dotted path such as `personalInfo.name`.
pub fn lookup_path<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.get(segment))
}

pub fn lookup_f64(document: &Value, path: &str) -> Option<f64> {
    lookup_path(document, path).and_then(Value::as_f64)
}

/// Text form used for searching and categorical comparison.
pub fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_patch_merges_nested_objects_and_removes_nulls() {
        let mut doc = json!({
            "personalInfo": { "name": "Priya", "phone": "98" },
            "aadhaar": "1111",
            "rewardPoints": 10
        });
        merge_patch(
            &mut doc,
            &json!({ "personalInfo": { "phone": null, "ward": 4 }, "rewardPoints": 25 }),
        );
        assert_eq!(
            doc,
            json!({
                "personalInfo": { "name": "Priya", "ward": 4 },
                "aadhaar": "1111",
                "rewardPoints": 25
            })
        );
    }

    #[test]
    fn merge_patch_replaces_non_objects() {
        let mut doc = json!({ "tags": ["a", "b"] });
        merge_patch(&mut doc, &json!({ "tags": ["c"] }));
        assert_eq!(doc, json!({ "tags": ["c"] }));
    }

    #[test]
    fn lookup_follows_dotted_paths() {
        let doc = json!({ "segregationCompliance": { "score": 82.5 } });
        assert_eq!(lookup_f64(&doc, "segregationCompliance.score"), Some(82.5));
        assert!(lookup_path(&doc, "segregationCompliance.missing").is_none());
        assert!(lookup_path(&doc, "nothing.here").is_none());
    }

    #[test]
    fn text_form_of_scalars() {
        assert_eq!(value_as_text(&json!("ward 4")), Some("ward 4".into()));
        assert_eq!(value_as_text(&json!(12)), Some("12".into()));
        assert_eq!(value_as_text(&json!(true)), Some("true".into()));
        assert_eq!(value_as_text(&json!({})), None);
    }
}
