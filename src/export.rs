//! Export descriptors
//!
//! The exporter that turns a display into code or a structured dump lives
//! elsewhere. This module only decides which options are exported and with
//! which strategy, following each schema entry's [`SerializationHint`].

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use views_registry::{HandlerCategory, PluginCategory};
use views_schema::{OptionEntry, SerializationHint, DEFAULTS_KEY};

use crate::display::Display;
use crate::plugin::compose;

/// One exported option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportItem {
    /// Top level option key the item belongs to.
    pub key: String,
    /// Dotted path the value is written at.
    pub path: String,
    pub strategy: SerializationHint,
    pub value: Value,
}

impl ExportItem {
    fn new(key: &str, path: impl Into<String>, strategy: SerializationHint, value: Value) -> Self {
        Self {
            key: key.to_string(),
            path: path.into(),
            strategy,
            value,
        }
    }
}

/// Everything exported for one display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayExport {
    pub view_name: String,
    pub display_id: String,
    pub exported_at: DateTime<Utc>,
    pub items: Vec<ExportItem>,
}

/// Plugin category of a composite entry whose `type` child selects a plugin.
fn plugin_category(entry: &OptionEntry) -> Option<PluginCategory> {
    entry
        .child("type")
        .filter(|child| child.hint == SerializationHint::Plugin)
        .and_then(|_| PluginCategory::from_str(&entry.key).ok())
}

impl<'v> Display<'v> {
    /// Describe what an exporter should write for this display.
    pub fn export_options(&self) -> DisplayExport {
        let mut items = Vec::new();
        for entry in self.config().schema().entries() {
            if entry.key == DEFAULTS_KEY {
                continue;
            }
            if !self.is_default_display() && self.config().sections().is_defaultable(&entry.key) {
                if self.is_defaulted(&entry.key) {
                    continue;
                }
                items.push(ExportItem::new(
                    DEFAULTS_KEY,
                    format!("{}.{}", DEFAULTS_KEY, entry.key),
                    SerializationHint::Value,
                    Value::Bool(false),
                ));
            }
            self.export_entry(entry, &mut items);
        }
        debug!(display = %self.id(), items = items.len(), "export prepared");

        DisplayExport {
            view_name: self.view().name().to_string(),
            display_id: self.id().to_string(),
            exported_at: Utc::now(),
            items,
        }
    }

    fn export_entry(&self, entry: &OptionEntry, items: &mut Vec<ExportItem>) {
        let key = entry.key.as_str();
        if let Some(category) = plugin_category(entry) {
            self.export_plugin(key, category, items);
            return;
        }
        match entry.hint {
            SerializationHint::Skip => {}
            SerializationHint::Value | SerializationHint::Plugin => {
                let Some(value) = self.get_option(key) else {
                    return;
                };
                if *value != entry.default_value() {
                    items.push(ExportItem::new(key, key, SerializationHint::Value, value.clone()));
                }
            }
            SerializationHint::ValueAlways => {
                let value = self.get_option(key).cloned().unwrap_or_else(|| entry.default_value());
                items.push(ExportItem::new(key, key, SerializationHint::ValueAlways, value));
            }
            SerializationHint::Style => match key {
                "style_plugin" => self.export_plugin(key, PluginCategory::Style, items),
                "row_plugin" => {
                    let uses_row = self
                        .get_plugin(PluginCategory::Style)
                        .map(|style| style.uses_row_plugin())
                        .unwrap_or(false);
                    if uses_row {
                        self.export_plugin(key, PluginCategory::Row, items);
                    }
                }
                _ => {}
            },
            SerializationHint::HandlerSet => {
                let Some(category) = HandlerCategory::from_plural(key) else {
                    return;
                };
                for (id, handler) in self.get_handlers(category).iter() {
                    let mut value = handler.options().clone();
                    value.insert("plugin_id".to_string(), Value::String(handler.implementation().to_string()));
                    items.push(ExportItem::new(
                        key,
                        format!("{}.{}", key, id),
                        SerializationHint::HandlerSet,
                        Value::Object(value),
                    ));
                }
            }
        }
    }

    /// Export the resolved plugin of `category` in its storage shape.
    ///
    /// Unresolvable selections are exported as stored.
    fn export_plugin(&self, key: &str, category: PluginCategory, items: &mut Vec<ExportItem>) {
        let strategy = if matches!(category, PluginCategory::Style | PluginCategory::Row) {
            SerializationHint::Style
        } else {
            SerializationHint::Plugin
        };
        let Some(plugin) = self.get_plugin(category) else {
            if let Some(value) = self.get_option(key) {
                items.push(ExportItem::new(key, key, strategy, value.clone()));
            }
            return;
        };
        let options: Map<String, Value> = plugin.options().clone();
        for (option_key, value) in compose(category, plugin.name(), options) {
            items.push(ExportItem::new(option_key, option_key, strategy, value));
        }
    }
}
