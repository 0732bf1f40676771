//! Built-in engine settings (layer 1)

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use views_registry::PluginCategory;
use views_schema::DisplayKind;

/// Plugin names used when a stored selection does not resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackPlugins {
    pub style: String,
    pub row: String,
    pub pager: String,
    pub access: String,
    pub cache: String,
    pub exposed_form: String,
    pub query: String,
}

impl Default for FallbackPlugins {
    fn default() -> Self {
        Self {
            style: "default".to_string(),
            row: "fields".to_string(),
            pager: "none".to_string(),
            access: "none".to_string(),
            cache: "none".to_string(),
            exposed_form: "basic".to_string(),
            query: "views_query".to_string(),
        }
    }
}

impl FallbackPlugins {
    /// Fallback name for one category.
    pub fn name_for(&self, category: PluginCategory) -> &str {
        match category {
            PluginCategory::Style => &self.style,
            PluginCategory::Row => &self.row,
            PluginCategory::Pager => &self.pager,
            PluginCategory::Access => &self.access,
            PluginCategory::Cache => &self.cache,
            PluginCategory::ExposedForm => &self.exposed_form,
            PluginCategory::Query => &self.query,
        }
    }
}

/// Built-in default settings values
#[derive(Debug, Clone)]
pub struct BuiltinSettings {
    /// Memoize unpacked options across displays (default: on)
    pub unpack_cache: bool,

    /// Fallback plugin names
    pub fallback: FallbackPlugins,
}

impl Default for BuiltinSettings {
    fn default() -> Self {
        Self {
            unpack_cache: true,
            fallback: FallbackPlugins::default(),
        }
    }
}

impl BuiltinSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> Value {
        let kinds: Map<String, Value> = DisplayKind::builtin()
            .into_iter()
            .map(|kind| {
                let id = kind.id.clone();
                (id, serde_json::to_value(kind).unwrap_or(Value::Null))
            })
            .collect();

        json!({
            "display_kinds": kinds,
            "unpack_cache": {
                "enabled": self.unpack_cache
            },
            "fallback": serde_json::to_value(&self.fallback).unwrap_or(Value::Null),
            "sections": {}
        })
    }
}
