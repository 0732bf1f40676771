//! Persisted copy of a display's stored options.
//!
//! Every committed write lands here as a path-addressed assignment so the
//! persistence layer can serialize the view without asking the display
//! anything. The mirror holds what is *stored*, not what is effective:
//! deferred options are absent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One assignment recorded for the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorWrite {
    /// Dotted path, e.g. `display.page_1.display_options.title`.
    pub path: String,
    /// New value; `None` removes the path.
    pub value: Option<Value>,
}

/// Stored options of one display plus a journal of writes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OptionsMirror {
    display_path: String,
    values: Map<String, Value>,
    journal: Vec<MirrorWrite>,
}

impl OptionsMirror {
    pub fn new(display_id: &str, stored: Map<String, Value>) -> Self {
        Self {
            display_path: format!("display.{}", display_id),
            values: stored,
            journal: Vec::new(),
        }
    }

    /// Path of the stored option map.
    pub fn options_path(&self) -> String {
        format!("{}.display_options", self.display_path)
    }

    /// Stored option values.
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Store an option value.
    pub fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value.clone());
        self.record(format!("{}.{}", self.options_path(), key), Some(value));
    }

    /// Remove a stored option.
    pub fn remove(&mut self, key: &str) {
        if self.values.remove(key).is_some() {
            self.record(format!("{}.{}", self.options_path(), key), None);
        }
    }

    /// Store one deferral flag under `defaults`.
    pub fn set_flag(&mut self, key: &str, deferred: bool) {
        let defaults = self
            .values
            .entry(views_schema::DEFAULTS_KEY.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !defaults.is_object() {
            *defaults = Value::Object(Map::new());
        }
        if let Value::Object(map) = defaults {
            map.insert(key.to_string(), Value::Bool(deferred));
        }
        self.record(
            format!("{}.{}.{}", self.options_path(), views_schema::DEFAULTS_KEY, key),
            Some(Value::Bool(deferred)),
        );
    }

    /// Record a write to a display property outside the option map
    /// (`display_title`, `new_id`).
    pub fn set_property(&mut self, name: &str, value: Value) {
        self.record(format!("{}.{}", self.display_path, name), Some(value));
    }

    fn record(&mut self, path: String, value: Option<Value>) {
        self.journal.push(MirrorWrite { path, value });
    }

    /// Writes recorded since the last drain.
    pub fn pending_writes(&self) -> &[MirrorWrite] {
        &self.journal
    }

    /// Hand the recorded writes to the persistence layer.
    pub fn drain_writes(&mut self) -> Vec<MirrorWrite> {
        std::mem::take(&mut self.journal)
    }
}
