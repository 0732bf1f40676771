use serde_json::{json, Map, Value};
use tracing::{debug, info};
use views_registry::{FieldError, PluginCategory};

use super::{as_bool, section_def, submitted, SectionKind};
use crate::display::DisplayMut;
use crate::error::DisplayError;
use crate::plugin::{compose_options, extract, rule_for};

impl<'v> DisplayMut<'v> {
    /// Store submitted values for `section`.
    ///
    /// Values are expected to have passed
    /// [`validate_form`](crate::Display::validate_form). Any cached output
    /// is flushed first, since every committed change can alter it.
    pub fn commit_form(&mut self, section: &str, values: &Value) -> Result<(), DisplayError> {
        let def = section_def(&self.as_display(), section)?;

        self.as_display()
            .plugin_or_fallback(PluginCategory::Cache)
            .cache_flush();

        match def.kind {
            SectionKind::Text(key) => {
                let value = submitted(values, key).cloned().unwrap_or(Value::Null);
                self.set_option(key, value);
            }
            SectionKind::Boolean(key) => {
                let value = as_bool(submitted(values, key));
                self.set_option(key, Value::Bool(value));
            }
            SectionKind::DisplayTitle => {
                let title = submitted(values, "display_title")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let config = self.config_mut();
                config.title = title.clone();
                config.mirror.set_property("display_title", json!(title));
                if let Some(description) = submitted(values, "display_description") {
                    self.set_option("display_description", description.clone());
                }
            }
            SectionKind::DisplayId => {
                let new_id = submitted(values, "display_id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                if new_id != self.id() {
                    info!(display = %self.id(), new_id = %new_id, "display id change pending");
                    let config = self.config_mut();
                    config.pending_id = Some(new_id.clone());
                    config.mirror.set_property("new_id", json!(new_id));
                }
            }
            SectionKind::UseMore => {
                self.set_option("use_more", Value::Bool(as_bool(submitted(values, "use_more"))));
                // the form asks "only if there is more", the option stores "always"
                let always = !as_bool(submitted(values, "use_more_always"));
                self.set_option("use_more_always", Value::Bool(always));
                if let Some(text) = submitted(values, "use_more_text") {
                    self.set_option("use_more_text", text.clone());
                }
            }
            SectionKind::LinkDisplay => {
                let link = submitted(values, "link_display").cloned().unwrap_or(Value::Null);
                self.set_option("link_display", link);
                if let Some(url) = submitted(values, "link_url") {
                    self.set_option("link_url", url.clone());
                }
            }
            SectionKind::PluginSelect(_) => {
                let name = submitted(values, section)
                    .or_else(|| submitted(values, "type"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                if let Some(rule) = rule_for(section) {
                    self.select_plugin(rule, &name);
                }
            }
            SectionKind::PluginOptions(category) => {
                let writes = {
                    let display = self.as_display();
                    let name = extract(&display, category)
                        .name
                        .or_else(|| display.config().plugins.selected_name(&display, category))
                        .unwrap_or_default();
                    let submitted = match display.get_plugin(category) {
                        Some(plugin) => plugin.submit_options(values.clone()),
                        None => values.clone(),
                    };
                    let options = match submitted {
                        Value::Object(map) => map,
                        _ => Map::new(),
                    };
                    compose_options(category, &name, options)
                };
                for (key, value) in writes {
                    self.set_option(key, value);
                }
                self.invalidate_plugins(category);
            }
        }

        debug!(display = %self.id(), section, "form section committed");
        Ok(())
    }

    /// Validate, then commit when nothing was wrong.
    ///
    /// Returns the validation errors; nothing is stored if there are any.
    pub fn submit_form(&mut self, section: &str, values: &Value) -> Result<Vec<FieldError>, DisplayError> {
        let errors = self.as_display().validate_form(section, values)?;
        if errors.is_empty() {
            self.commit_form(section, values)?;
        }
        Ok(errors)
    }

    /// Flip the section between using the default display and owning its
    /// values. Returns whether anything changed.
    pub fn override_form(&mut self, section: &str) -> bool {
        self.toggle_override(section, None)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::sample_view;
    use crate::view::FormRequest;
    use serde_json::json;

    #[test]
    fn test_commit_text_on_deferred_section_writes_default() {
        let mut view = sample_view();
        view.display_mut("page_1")
            .unwrap()
            .commit_form("title", &json!({"title": "Everything"}))
            .unwrap();
        assert_eq!(view.display("default").unwrap().get_str("title"), "Everything");
        assert_eq!(view.display("block_1").unwrap().get_str("title"), "Latest");
    }

    #[test]
    fn test_commit_display_title_and_id() {
        let mut view = sample_view();
        {
            let mut page = view.display_mut("page_1").unwrap();
            page.commit_form("display_title", &json!({"display_title": "Front page"}))
                .unwrap();
            page.commit_form("display_id", &json!({"display_id": "front"})).unwrap();
        }
        let page = view.display("page_1").unwrap();
        assert_eq!(page.title(), "Front page");
        assert_eq!(page.config().pending_id(), Some("front"));
        let paths: Vec<&str> = page
            .config()
            .mirror()
            .pending_writes()
            .iter()
            .map(|w| w.path.as_str())
            .collect();
        assert!(paths.contains(&"display.page_1.display_title"));
        assert!(paths.contains(&"display.page_1.new_id"));
    }

    #[test]
    fn test_commit_use_more_inverts_always() {
        let mut view = sample_view();
        view.display_mut("block_1")
            .unwrap()
            .commit_form(
                "use_more",
                &json!({"use_more": true, "use_more_always": true, "use_more_text": "all"}),
            )
            .unwrap();
        let block = view.display("block_1").unwrap();
        assert!(block.use_more());
        assert!(!block.use_more_always());
        assert_eq!(block.use_more_text(), Some("all"));
    }

    #[test]
    fn test_commit_style_selection_cascades() {
        let mut view = sample_view();
        view.display_mut("default")
            .unwrap()
            .commit_form("style_plugin", &json!({"style_plugin": "grid"}))
            .unwrap();
        assert_eq!(view.display("default").unwrap().get_str("style_plugin"), "grid");
        assert_eq!(view.form_stack(), [FormRequest::new("default", "style_options")]);
    }

    #[test]
    fn test_commit_plugin_options_keeps_selection() {
        let mut view = sample_view();
        view.display_mut("default")
            .unwrap()
            .commit_form("pager_options", &json!({"items_per_page": 5, "offset": 0}))
            .unwrap();
        let display = view.display("default").unwrap();
        let pager = display.get_option("pager").unwrap();
        assert_eq!(pager["type"], "full");
        assert_eq!(pager["options"]["items_per_page"], 5);
        let plugin = display.get_plugin(views_registry::PluginCategory::Pager).unwrap();
        assert_eq!(plugin.options()["items_per_page"], 5);
    }

    #[test]
    fn test_submit_rejects_invalid_values() {
        let mut view = sample_view();
        let errors = view
            .display_mut("page_1")
            .unwrap()
            .submit_form("css_class", &json!({"css_class": "a.b"}))
            .unwrap();
        assert_eq!(errors.len(), 1);
        assert!(view.display("page_1").unwrap().get_option("css_class") != Some(&json!("a.b")));
    }

    #[test]
    fn test_override_form_toggles() {
        let mut view = sample_view();
        assert!(view.display_mut("page_1").unwrap().override_form("title"));
        assert!(!view.display("page_1").unwrap().is_defaulted("title"));
        assert!(view.display_mut("page_1").unwrap().override_form("title"));
        assert!(view.display("page_1").unwrap().is_defaulted("title"));
        assert!(!view.display_mut("default").unwrap().override_form("title"));
    }
}
