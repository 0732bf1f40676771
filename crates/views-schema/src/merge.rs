//! Option merge logic
//!
//! Two flavours:
//! - [`deep_merge`]: schema-less layering (objects merge by key, arrays
//!   replace, scalars override). Used for settings layers.
//! - [`unpack_options`]: schema-driven unpacking of stored display options
//!   over their defaults.

use serde_json::{Map, Value};

use crate::option::OptionEntry;

/// Deep merge two JSON values.
///
/// Merge semantics:
/// - Objects: deep-merge by key (recursive)
/// - Arrays: REPLACE (second wins entirely)
/// - Scalars: override (second wins)
/// - Null: override (null can override any value)
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = if let Some(base_value) = base_map.remove(&key) {
                    deep_merge(base_value, overlay_value)
                } else {
                    overlay_value
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }

        (Value::Array(_), overlay @ Value::Array(_)) => overlay,

        (_, overlay) => overlay,
    }
}

/// Merge multiple layers in order (first is base, last has highest precedence)
pub fn merge_layers(layers: Vec<Value>) -> Value {
    layers.into_iter().fold(Value::Null, deep_merge)
}

/// Unpack stored options into `storage` using the schema entries.
///
/// - Scalar options overwrite.
/// - Composite options merge field by field, so a partially stored plugin
///   block still inherits missing nested keys from `storage`.
/// - Options whose default is a map (handler sets, plugin option maps) are
///   replaced wholesale; their contents belong to someone else.
/// - Keys unknown to the schema are kept as stored.
///
/// A stored value with the wrong shape never fails the unpack: the key falls
/// back to its schema default and its dotted path is returned so the caller
/// can report the repair.
pub fn unpack_options(
    storage: &mut Map<String, Value>,
    raw: &Map<String, Value>,
    entries: &[OptionEntry],
) -> Vec<String> {
    let mut repaired = Vec::new();
    unpack_into(storage, raw, entries, "", &mut repaired);
    repaired
}

fn unpack_into(
    storage: &mut Map<String, Value>,
    raw: &Map<String, Value>,
    entries: &[OptionEntry],
    prefix: &str,
    repaired: &mut Vec<String>,
) {
    for (key, value) in raw {
        let Some(entry) = entries.iter().find(|e| &e.key == key) else {
            storage.insert(key.clone(), value.clone());
            continue;
        };

        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        if !entry.accepts_shape(value) {
            storage.insert(key.clone(), entry.default_value());
            repaired.push(path);
            continue;
        }

        if entry.is_composite() {
            let target = storage
                .entry(key.clone())
                .or_insert_with(|| entry.default_value());
            if !target.is_object() {
                *target = entry.default_value();
            }
            if let (Value::Object(target_map), Value::Object(raw_map)) = (target, value) {
                unpack_into(target_map, raw_map, &entry.contains, &path, repaired);
            }
        } else if value.is_array() && entry.default.is_object() {
            // empty list standing in for an empty map
            storage.insert(key.clone(), Value::Object(Map::new()));
        } else {
            storage.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::DisplayKind;
    use crate::schema::OptionSchema;
    use serde_json::json;

    fn unpack(raw: Value) -> (Map<String, Value>, Vec<String>) {
        let schema = OptionSchema::for_kind(&DisplayKind::new("page").with_pager(true));
        let mut storage = schema.defaults_value();
        let raw = raw.as_object().cloned().unwrap();
        let repaired = unpack_options(&mut storage, &raw, schema.entries());
        (storage, repaired)
    }

    #[test]
    fn test_scalar_override() {
        let base = json!({"timeout": 100});
        let overlay = json!({"timeout": 200});
        let result = deep_merge(base, overlay);
        assert_eq!(result["timeout"], 200);
    }

    #[test]
    fn test_object_deep_merge() {
        let base = json!({"cache": {"enabled": false, "size": 10}});
        let overlay = json!({"cache": {"enabled": true}});
        let result = deep_merge(base, overlay);

        assert_eq!(result["cache"]["enabled"], true);
        assert_eq!(result["cache"]["size"], 10);
    }

    #[test]
    fn test_array_replace() {
        let base = json!({"kinds": ["page", "block", "feed"]});
        let overlay = json!({"kinds": ["embed"]});
        let result = deep_merge(base, overlay);
        assert_eq!(result["kinds"], json!(["embed"]));
    }

    #[test]
    fn test_merge_layers() {
        let builtin = json!({"a": 1, "nested": {"b": 2, "c": 3}});
        let file = json!({"nested": {"b": 20}});
        let cli = json!({"a": 10});

        let result = merge_layers(vec![builtin, file, cli]);
        assert_eq!(result["a"], 10);
        assert_eq!(result["nested"]["b"], 20);
        assert_eq!(result["nested"]["c"], 3);
    }

    #[test]
    fn test_unpack_scalars_and_unknown_keys() {
        let (options, repaired) = unpack(json!({"title": "Recent content", "path": "recent", "custom": 1}));
        assert!(repaired.is_empty());
        assert_eq!(options["title"], "Recent content");
        assert_eq!(options["path"], "recent");
        assert_eq!(options["custom"], 1);
        assert_eq!(options["use_more_text"], "more");
    }

    #[test]
    fn test_unpack_composite_keeps_missing_subfields() {
        let (options, _) = unpack(json!({"pager": {"type": "mini"}}));
        assert_eq!(options["pager"], json!({"type": "mini", "options": {}}));
    }

    #[test]
    fn test_unpack_keeps_legacy_siblings() {
        let (options, _) = unpack(json!({"access": {"type": "perm", "perm": "access content"}}));
        assert_eq!(options["access"]["type"], "perm");
        assert_eq!(options["access"]["perm"], "access content");
    }

    #[test]
    fn test_unpack_partial_flags() {
        let (options, _) = unpack(json!({"defaults": {"title": false}}));
        assert_eq!(options["defaults"]["title"], false);
        assert_eq!(options["defaults"]["fields"], true);
    }

    #[test]
    fn test_unpack_repairs_malformed_composite() {
        let (options, repaired) = unpack(json!({"pager": "full", "query": {"options": 3}}));
        assert_eq!(options["pager"], json!({"type": "full", "options": {}}));
        assert_eq!(options["query"]["options"], json!({}));
        assert_eq!(repaired, vec!["pager".to_string(), "query.options".to_string()]);
    }

    #[test]
    fn test_unpack_handler_sets_replace() {
        let (options, _) = unpack(json!({
            "fields": {"title": {"table": "node", "field": "title"}},
            "sorts": []
        }));
        assert_eq!(options["fields"].as_object().unwrap().len(), 1);
        assert_eq!(options["sorts"], json!({}));
    }
}
