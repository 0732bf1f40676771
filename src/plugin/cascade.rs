//! Plugin selection changes and what they reset.
//!
//! Changing a selection invalidates the settings stored for the previous
//! plugin. Each rule names the selection section, the category it selects
//! and whether the old settings survive the change.

use tracing::info;
use views_registry::PluginCategory;

use super::{compose, extract, plugin_context};
use crate::display::DisplayMut;
use crate::view::FormRequest;

/// What happens when the plugin of one section changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeRule {
    /// Form section holding the selection.
    pub section: &'static str,
    pub category: PluginCategory,
    /// Hand the old settings to the new plugin instead of resetting them.
    pub carry_options: bool,
}

impl CascadeRule {
    /// Section that edits the selected plugin's settings.
    pub fn options_section(&self) -> &'static str {
        self.category.options_section()
    }
}

pub const CASCADE_RULES: &[CascadeRule] = &[
    CascadeRule {
        section: "style_plugin",
        category: PluginCategory::Style,
        carry_options: false,
    },
    CascadeRule {
        section: "row_plugin",
        category: PluginCategory::Row,
        carry_options: false,
    },
    CascadeRule {
        section: "access",
        category: PluginCategory::Access,
        carry_options: false,
    },
    CascadeRule {
        section: "cache",
        category: PluginCategory::Cache,
        carry_options: false,
    },
    CascadeRule {
        section: "exposed_form",
        category: PluginCategory::ExposedForm,
        carry_options: false,
    },
    CascadeRule {
        section: "pager",
        category: PluginCategory::Pager,
        carry_options: true,
    },
];

/// Rule for a selection section.
pub fn rule_for(section: &str) -> Option<&'static CascadeRule> {
    CASCADE_RULES.iter().find(|rule| rule.section == section)
}

impl<'v> DisplayMut<'v> {
    /// Select a different plugin for the category of `rule`.
    ///
    /// Nothing happens unless `name` differs from the current selection and
    /// names a known plugin. Otherwise the selection is written together
    /// with reset (or carried) settings, and if the new plugin has settings
    /// of its own a form request for them is queued on the view.
    ///
    /// Returns whether the selection changed.
    pub fn select_plugin(&mut self, rule: &CascadeRule, name: &str) -> bool {
        let display = self.as_display();
        let current = extract(&display, rule.category);
        if current.name.as_deref() == Some(name) {
            return false;
        }
        let Some(descriptor) = display.config().plugins.catalog().lookup(rule.category, name) else {
            return false;
        };

        let options = if rule.carry_options {
            let ctx = plugin_context(&display, Vec::new());
            descriptor.initialize(&ctx, current.options).options().clone()
        } else {
            Default::default()
        };
        let uses_options = descriptor.info().uses_options;
        let writes = compose(rule.category, name, options);

        info!(
            display = %self.id(),
            category = %rule.category,
            from = current.name.as_deref().unwrap_or(""),
            to = name,
            "plugin selection changed"
        );
        for (key, value) in writes {
            self.set_option(key, value);
        }
        if uses_options {
            let request = FormRequest::new(self.id(), rule.options_section());
            self.view.push_form_request(request);
        }
        true
    }
}
