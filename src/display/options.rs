//! Reading and writing options through the deferral flags.

use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{Display, DisplayMut};

impl<'v> Display<'v> {
    /// Whether `key` is read from the default display.
    ///
    /// Only options of a defaultable section can defer, and only on a
    /// display that has a default display to defer to.
    pub fn is_defaulted(&self, key: &str) -> bool {
        self.config.defers(key) && self.default_display().is_some()
    }

    /// Whether this display stores its own values for `section`.
    pub fn is_overridden(&self, section: &str) -> bool {
        !self.is_defaulted(section)
    }

    /// Effective value of an option.
    pub fn get_option(&self, key: &str) -> Option<&'v Value> {
        if self.is_defaulted(key) {
            if let Some(default) = self.default_display() {
                return default.get_option(key);
            }
        }
        self.config.options.get(key)
    }

    pub fn get_str(&self, key: &str) -> &'v str {
        self.get_option(key).and_then(Value::as_str).unwrap_or_default()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        match self.get_option(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_i64().unwrap_or(0) != 0,
            Some(Value::String(s)) => !s.is_empty() && s != "0",
            _ => false,
        }
    }

    /// Every schema option with its effective value, in schema order.
    pub fn effective_options(&self) -> Map<String, Value> {
        self.config
            .schema
            .entries()
            .iter()
            .filter(|entry| entry.key != views_schema::DEFAULTS_KEY)
            .filter_map(|entry| {
                self.get_option(&entry.key)
                    .map(|value| (entry.key.clone(), value.clone()))
            })
            .collect()
    }
}

impl<'v> DisplayMut<'v> {
    pub fn is_defaulted(&self, key: &str) -> bool {
        self.as_display().is_defaulted(key)
    }

    pub fn get_option(&self, key: &str) -> Option<Value> {
        self.as_display().get_option(key).cloned()
    }

    /// Index of the display a write to `key` lands on.
    fn write_target(&self, key: &str) -> usize {
        if self.is_defaulted(key) {
            if let Some(index) = self.view.default_index() {
                return index;
            }
        }
        self.index
    }

    /// Write an option.
    ///
    /// A deferred option is written on the default display, so every display
    /// deferring to it sees the new value. Otherwise the value is stored
    /// locally and mirrored for persistence.
    pub fn set_option(&mut self, key: &str, value: Value) {
        let target = self.write_target(key);
        if target != self.index {
            debug!(display = %self.id(), option = key, "option is deferred, writing to default display");
        }
        let config = &mut self.view.displays[target];
        config.options.insert(key.to_string(), value.clone());
        config.mirror.set(key, value);
        self.view.after_write(target, key);
    }

    /// Stop deferring the section of `key`, then write it locally.
    pub fn override_option(&mut self, key: &str, value: Value) {
        self.toggle_override(key, Some(false));
        self.set_option(key, value);
    }

    /// Switch a section between deferring and owning its values.
    ///
    /// `new_state` is the new deferral state (`true` = revert to the default
    /// display); `None` flips the current state. Every key of the section
    /// moves together. When taking ownership the effective values are
    /// copied locally before the flags change, so nothing visible changes.
    ///
    /// Returns whether anything changed. The default display and options
    /// outside any section are left alone.
    pub fn toggle_override(&mut self, section: &str, new_state: Option<bool>) -> bool {
        let config = self.config();
        if config.is_default_display() {
            return false;
        }
        let Some(keys) = config.sections.keys_in(section).map(<[String]>::to_vec) else {
            return false;
        };
        let deferred = new_state.unwrap_or_else(|| !self.is_defaulted(section));

        if deferred {
            let config = self.config_mut();
            for key in &keys {
                config.options.remove(key);
                config.mirror.remove(key);
            }
        } else {
            // read before flip
            let effective: Vec<(String, Option<Value>)> = keys
                .iter()
                .map(|key| (key.clone(), self.get_option(key)))
                .collect();
            let config = self.config_mut();
            for (key, value) in effective {
                if let Some(value) = value {
                    config.options.insert(key.clone(), value.clone());
                    config.mirror.set(&key, value);
                }
            }
        }

        let config = self.config_mut();
        config.deferred.insert(keys[0].clone(), deferred);
        for key in &keys {
            config.mirror.set_flag(key, deferred);
        }
        info!(
            display = %config.id,
            section,
            deferred,
            "section override toggled"
        );

        for key in &keys {
            self.view.after_write(self.index, key);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::sample_view;
    use serde_json::json;

    #[test]
    fn test_deferred_read_follows_default() {
        let view = sample_view();
        let page = view.display("page_1").unwrap();
        assert!(page.is_defaulted("title"));
        assert_eq!(page.get_option("title"), Some(&json!("All content")));
        assert_eq!(page.get_str("path"), "content");
    }

    #[test]
    fn test_deferred_write_lands_on_default() {
        let mut view = sample_view();
        view.display_mut("page_1").unwrap().set_option("title", json!("Shared"));

        assert_eq!(view.display("default").unwrap().get_str("title"), "Shared");
        assert_eq!(view.display("page_1").unwrap().get_str("title"), "Shared");
        assert!(view.display("page_1").unwrap().config().mirror().get("title").is_none());
    }

    #[test]
    fn test_override_then_revert() {
        let mut view = sample_view();
        {
            let mut page = view.display_mut("page_1").unwrap();
            assert!(page.toggle_override("title", Some(false)));
            assert!(!page.is_defaulted("title"));
            assert_eq!(page.get_option("title"), Some(json!("All content")));
            page.set_option("title", json!("Mine"));
        }
        assert_eq!(view.display("page_1").unwrap().get_str("title"), "Mine");
        assert_eq!(view.display("default").unwrap().get_str("title"), "All content");

        view.display_mut("page_1").unwrap().toggle_override("title", None);
        let page = view.display("page_1").unwrap();
        assert!(page.is_defaulted("title"));
        assert_eq!(page.get_str("title"), "All content");
        assert!(page.config().mirror().get("title").is_none());
        assert_eq!(page.config().mirror().values()["defaults"]["title"], true);
    }

    #[test]
    fn test_toggle_moves_whole_section() {
        let mut view = sample_view();
        view.display_mut("page_1").unwrap().toggle_override("row_options", Some(false));
        let page = view.display("page_1").unwrap();
        for key in ["style_plugin", "style_options", "row_plugin", "row_options"] {
            assert!(!page.is_defaulted(key), "{} still deferred", key);
        }
        assert_eq!(page.get_str("style_plugin"), "default");
        assert!(page.is_defaulted("fields"));
    }

    #[test]
    fn test_toggle_on_default_display_is_noop() {
        let mut view = sample_view();
        assert!(!view.display_mut("default").unwrap().toggle_override("title", Some(true)));
        assert!(!view.display_mut("page_1").unwrap().toggle_override("path", Some(false)));
    }

    #[test]
    fn test_effective_options_skip_flags() {
        let view = sample_view();
        let options = view.display("page_1").unwrap().effective_options();
        assert!(options.get("defaults").is_none());
        assert_eq!(options["title"], "All content");
    }
}
