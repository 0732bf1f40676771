//! One row of the option schema.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How an option is handed to the export collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerializationHint {
    /// Plain value, exported only when it differs from the default.
    Value,
    /// Plain value, always exported.
    ValueAlways,
    /// Never exported on its own (another option exports it).
    Skip,
    /// Plugin selection; the resolved plugin exports its own options.
    Plugin,
    /// Style or row selection; the style/row plugin exports its options.
    Style,
    /// Ordered handler specs; every handler exports itself.
    HandlerSet,
}

/// A recognized option key.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionEntry {
    /// Option key.
    pub key: String,

    /// Default for scalar options. Unused for composite options, whose
    /// default is assembled from `contains`.
    pub default: Value,

    /// Nested keys of a composite option (e.g. `access.type`).
    pub contains: Vec<OptionEntry>,

    /// Whether the key belongs to a defaultable section.
    pub defaultable: bool,

    /// Whether the value is user facing text.
    pub translatable: bool,

    /// Whether the value is a boolean flag.
    pub boolean: bool,

    /// Export strategy.
    pub hint: SerializationHint,
}

impl OptionEntry {
    /// A scalar (or opaque structured) option.
    pub fn new(key: &str, default: Value) -> Self {
        Self {
            key: key.to_string(),
            default,
            contains: Vec::new(),
            defaultable: false,
            translatable: false,
            boolean: false,
            hint: SerializationHint::Value,
        }
    }

    /// A composite option whose nested keys merge field by field.
    pub fn composite(key: &str, contains: Vec<OptionEntry>) -> Self {
        Self {
            contains,
            ..Self::new(key, Value::Null)
        }
    }

    pub fn defaultable(mut self) -> Self {
        self.defaultable = true;
        self
    }

    pub fn translatable(mut self) -> Self {
        self.translatable = true;
        self
    }

    pub fn boolean(mut self) -> Self {
        self.boolean = true;
        self
    }

    pub fn hint(mut self, hint: SerializationHint) -> Self {
        self.hint = hint;
        self
    }

    pub fn is_composite(&self) -> bool {
        !self.contains.is_empty()
    }

    /// The value a fresh display starts with.
    pub fn default_value(&self) -> Value {
        if self.is_composite() {
            let map: Map<String, Value> = self
                .contains
                .iter()
                .map(|child| (child.key.clone(), child.default_value()))
                .collect();
            Value::Object(map)
        } else {
            self.default.clone()
        }
    }

    /// Look up a nested key of a composite option.
    pub fn child(&self, key: &str) -> Option<&OptionEntry> {
        self.contains.iter().find(|c| c.key == key)
    }

    /// Whether a stored value has an acceptable shape for this entry.
    ///
    /// Composite options and options whose default is a map must be stored
    /// as maps. An empty list is accepted as an empty map since some
    /// serializers cannot tell the two apart.
    pub fn accepts_shape(&self, value: &Value) -> bool {
        let wants_map = self.is_composite() || self.default.is_object();
        if !wants_map {
            return true;
        }
        match value {
            Value::Object(_) => true,
            Value::Array(items) => items.is_empty(),
            _ => false,
        }
    }
}
