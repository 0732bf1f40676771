//! Where each plugin category keeps its selection and settings.
//!
//! Three shapes exist and every persisted view depends on them:
//! - split: `style_plugin` + `style_options`
//! - legacy: `{ "type": name, ...settings }` (access, cache)
//! - nested: `{ "type": name, "options": { ...settings } }`

use serde_json::{Map, Value};
use views_registry::{PluginCategory, StorageShape};

use crate::display::Display;

/// Stored selection and settings of one category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginSelection {
    pub name: Option<String>,
    pub options: Map<String, Value>,
}

fn as_map(value: Option<&Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    }
}

fn type_of(value: Option<&Value>) -> Option<String> {
    value
        .and_then(|v| v.get("type"))
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// Read the selection of `category` from a display's effective options.
pub fn extract(display: &Display<'_>, category: PluginCategory) -> PluginSelection {
    match category.storage() {
        StorageShape::Split { selector, options } => PluginSelection {
            name: Some(display.get_str(selector))
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            options: as_map(display.get_option(options)),
        },
        StorageShape::Legacy { key } => {
            let value = display.get_option(key);
            let mut options = as_map(value);
            options.remove("type");
            PluginSelection {
                name: type_of(value),
                options,
            }
        }
        StorageShape::Nested { key } => {
            let value = display.get_option(key);
            PluginSelection {
                name: type_of(value),
                options: as_map(value.and_then(|v| v.get("options"))),
            }
        }
    }
}

/// The option writes that store `name` with `options` for `category`.
pub fn compose(category: PluginCategory, name: &str, options: Map<String, Value>) -> Vec<(&'static str, Value)> {
    match category.storage() {
        StorageShape::Split { selector, options: key } => vec![
            (selector, Value::String(name.to_string())),
            (key, Value::Object(options)),
        ],
        StorageShape::Legacy { key } => {
            let mut map = Map::new();
            map.insert("type".to_string(), Value::String(name.to_string()));
            for (k, v) in options {
                if k != "type" {
                    map.insert(k, v);
                }
            }
            vec![(key, Value::Object(map))]
        }
        StorageShape::Nested { key } => {
            let mut map = Map::new();
            map.insert("type".to_string(), Value::String(name.to_string()));
            map.insert("options".to_string(), Value::Object(options));
            vec![(key, Value::Object(map))]
        }
    }
}

/// The option writes that replace the settings of `category`, keeping
/// the current selection.
pub fn compose_options(category: PluginCategory, name: &str, options: Map<String, Value>) -> Vec<(&'static str, Value)> {
    let mut writes = compose(category, name, options);
    if matches!(category.storage(), StorageShape::Split { .. }) {
        // the selector is unchanged
        writes.remove(0);
    }
    writes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_view_with;
    use serde_json::json;

    #[test]
    fn test_extract_shapes() {
        let view = sample_view_with(json!({
            "access": {"type": "role", "role": {"editor": "editor"}},
            "pager": {"type": "some", "options": {"items_per_page": 5}},
            "style_plugin": "grid",
            "style_options": {"columns": 3}
        }));
        let display = view.display("default").unwrap();

        let access = extract(&display, PluginCategory::Access);
        assert_eq!(access.name.as_deref(), Some("role"));
        assert_eq!(Value::Object(access.options), json!({"role": {"editor": "editor"}}));

        let pager = extract(&display, PluginCategory::Pager);
        assert_eq!(pager.name.as_deref(), Some("some"));
        assert_eq!(pager.options["items_per_page"], 5);

        let style = extract(&display, PluginCategory::Style);
        assert_eq!(style.name.as_deref(), Some("grid"));
        assert_eq!(style.options["columns"], 3);
    }

    #[test]
    fn test_compose_shapes() {
        let mut options = Map::new();
        options.insert("perm".to_string(), json!("access content"));
        assert_eq!(
            compose(PluginCategory::Access, "perm", options.clone()),
            vec![("access", json!({"type": "perm", "perm": "access content"}))]
        );
        assert_eq!(
            compose(PluginCategory::ExposedForm, "basic", Map::new()),
            vec![("exposed_form", json!({"type": "basic", "options": {}}))]
        );
        let style = compose(PluginCategory::Style, "grid", Map::new());
        assert_eq!(style[0], ("style_plugin", json!("grid")));
        assert_eq!(style[1], ("style_options", json!({})));

        assert_eq!(compose_options(PluginCategory::Row, "fields", Map::new()), vec![("row_options", json!({}))]);
    }
}
