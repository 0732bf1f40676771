//! Form sections for the display editor
//!
//! The editor UI is someone else's job; this module only describes what a
//! section edits and applies what comes back:
//! - [`Display::populate_form`] builds a [`FormSection`] descriptor.
//! - [`Display::validate_form`] checks submitted values.
//! - [`DisplayMut::commit_form`] stores them.

mod commit;
mod validate;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use views_registry::PluginCategory;

use crate::display::Display;
use crate::error::DisplayError;
use crate::plugin::extract;

/// What a form section edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SectionKind {
    /// A single text option.
    Text(&'static str),
    /// A single on/off option.
    Boolean(&'static str),
    DisplayTitle,
    DisplayId,
    UseMore,
    LinkDisplay,
    /// Choosing the plugin of a category.
    PluginSelect(PluginCategory),
    /// Editing the settings of the selected plugin.
    PluginOptions(PluginCategory),
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SectionDef {
    pub name: &'static str,
    pub title: &'static str,
    pub kind: SectionKind,
}

const fn def(name: &'static str, title: &'static str, kind: SectionKind) -> SectionDef {
    SectionDef { name, title, kind }
}

pub(crate) const FORM_SECTIONS: &[SectionDef] = &[
    def("display_title", "The name and the description of this display", SectionKind::DisplayTitle),
    def("display_id", "The machine name of this display", SectionKind::DisplayId),
    def("display_comment", "Administrative comment", SectionKind::Text("display_comment")),
    def("title", "The title of this view", SectionKind::Text("title")),
    def("css_class", "CSS class", SectionKind::Text("css_class")),
    def("path", "The menu path or URL of this view", SectionKind::Text("path")),
    def("field_language", "Field language", SectionKind::Text("field_language")),
    def("use_ajax", "Use AJAX when available to load this view", SectionKind::Boolean("use_ajax")),
    def("hide_attachment_summary", "Hide attachments when displaying a contextual filter summary", SectionKind::Boolean("hide_attachment_summary")),
    def("hide_admin_links", "Hide administrative links", SectionKind::Boolean("hide_admin_links")),
    def("group_by", "Allow grouping and aggregation (calculation) of fields", SectionKind::Boolean("group_by")),
    def("exposed_block", "Put the exposed form in a block", SectionKind::Boolean("exposed_block")),
    def("use_more", "Add a more link to the bottom of the display", SectionKind::UseMore),
    def("link_display", "Which display to use for path", SectionKind::LinkDisplay),
    def("style_plugin", "How should this view be styled", SectionKind::PluginSelect(PluginCategory::Style)),
    def("row_plugin", "How should each row in this view be styled", SectionKind::PluginSelect(PluginCategory::Row)),
    def("access", "Access restrictions", SectionKind::PluginSelect(PluginCategory::Access)),
    def("cache", "Caching", SectionKind::PluginSelect(PluginCategory::Cache)),
    def("exposed_form", "Exposed form style", SectionKind::PluginSelect(PluginCategory::ExposedForm)),
    def("pager", "Select which pager, if any, to use for this view", SectionKind::PluginSelect(PluginCategory::Pager)),
    def("style_options", "Style options", SectionKind::PluginOptions(PluginCategory::Style)),
    def("row_options", "Row style options", SectionKind::PluginOptions(PluginCategory::Row)),
    def("access_options", "Access options", SectionKind::PluginOptions(PluginCategory::Access)),
    def("cache_options", "Caching options", SectionKind::PluginOptions(PluginCategory::Cache)),
    def("exposed_form_options", "Exposed form options", SectionKind::PluginOptions(PluginCategory::ExposedForm)),
    def("pager_options", "Pager options", SectionKind::PluginOptions(PluginCategory::Pager)),
    def("query", "Query options", SectionKind::PluginOptions(PluginCategory::Query)),
];

/// Value shown for `link_display` when a custom URL is used.
pub const CUSTOM_URL: &str = "custom_url";

/// One input of a form section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub key: String,
    /// Current effective value.
    pub value: Value,
    /// Allowed values as (value, label); empty for free input.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<(String, String)>,
}

impl FormField {
    fn new(key: &str, value: Value) -> Self {
        Self {
            key: key.to_string(),
            value,
            choices: Vec::new(),
        }
    }

    fn with_choices(mut self, choices: Vec<(String, String)>) -> Self {
        self.choices = choices;
        self
    }
}

/// Declarative description of one form section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSection {
    pub section: String,
    pub title: String,
    pub display_id: String,
    /// Whether the section can defer to the default display here.
    pub defaultable: bool,
    /// Whether this display stores its own values for the section.
    pub overridden: bool,
    /// `default-<section>` when deferred, `<display>-<section>` otherwise.
    pub highlight: String,
    pub fields: Vec<FormField>,
}

pub(crate) fn section_def(display: &Display<'_>, section: &str) -> Result<SectionDef, DisplayError> {
    FORM_SECTIONS
        .iter()
        .find(|def| def.name == section)
        .filter(|def| def.name != "path" || display.has_path())
        .filter(|def| {
            // kinds without a pager have no pager sections
            display.kind().use_pager || !matches!(def.name, "pager" | "pager_options")
        })
        .copied()
        .ok_or_else(|| DisplayError::UnknownSection(section.to_string()))
}

/// Read a submitted value for `key`; a bare scalar stands for itself.
pub(crate) fn submitted<'a>(values: &'a Value, key: &str) -> Option<&'a Value> {
    match values {
        Value::Object(map) => map.get(key),
        Value::Null => None,
        other => Some(other),
    }
}

pub(crate) fn as_bool(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0) != 0,
        Some(Value::String(s)) => !s.is_empty() && s != "0",
        _ => false,
    }
}

impl<'v> Display<'v> {
    /// Describe the form section `section` for this display.
    pub fn populate_form(&self, section: &str) -> Result<FormSection, DisplayError> {
        let def = section_def(self, section)?;
        let defaulted = self.is_defaulted(section);
        let highlight = if defaulted {
            format!("default-{}", section)
        } else {
            format!("{}-{}", self.id(), section)
        };
        let value_of = |key: &str| self.get_option(key).cloned().unwrap_or(Value::Null);

        let fields = match def.kind {
            SectionKind::Text(key) | SectionKind::Boolean(key) => vec![FormField::new(key, value_of(key))],
            SectionKind::DisplayTitle => vec![
                FormField::new("display_title", json!(self.title())),
                FormField::new("display_description", value_of("display_description")),
            ],
            SectionKind::DisplayId => vec![FormField::new("display_id", json!(self.id()))],
            SectionKind::UseMore => vec![
                FormField::new("use_more", value_of("use_more")),
                // shown inverted: "only if there is more content"
                FormField::new("use_more_always", json!(!self.get_bool("use_more_always"))),
                FormField::new("use_more_text", value_of("use_more_text")),
            ],
            SectionKind::LinkDisplay => {
                let mut choices: Vec<(String, String)> = self
                    .view()
                    .displays()
                    .filter(|d| d.has_path())
                    .map(|d| (d.id().to_string(), d.title().to_string()))
                    .collect();
                choices.push((CUSTOM_URL.to_string(), "Custom URL".to_string()));
                vec![
                    FormField::new("link_display", value_of("link_display")).with_choices(choices),
                    FormField::new("link_url", value_of("link_url")),
                ]
            }
            SectionKind::PluginSelect(category) => {
                let selected = self
                    .config()
                    .plugins
                    .selected_name(self, category)
                    .map(Value::String)
                    .unwrap_or(Value::Null);
                let choices = self
                    .config()
                    .plugins
                    .catalog()
                    .names(category, self.view().base_table());
                vec![FormField::new(section, selected).with_choices(choices)]
            }
            SectionKind::PluginOptions(category) => {
                let options = match self.get_plugin(category) {
                    Some(plugin) => plugin.options().clone(),
                    None => extract(self, category).options,
                };
                options
                    .into_iter()
                    .map(|(key, value)| FormField::new(&key, value))
                    .collect()
            }
        };

        Ok(FormSection {
            section: section.to_string(),
            title: def.title.to_string(),
            display_id: self.id().to_string(),
            defaultable: !self.is_default_display() && self.config().sections().is_defaultable(section),
            overridden: !defaulted,
            highlight,
            fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_view;

    #[test]
    fn test_populate_deferred_section() {
        let view = sample_view();
        let form = view.display("page_1").unwrap().populate_form("title").unwrap();
        assert_eq!(form.highlight, "default-title");
        assert!(form.defaultable);
        assert!(!form.overridden);
        assert_eq!(form.fields[0].value, json!("All content"));
    }

    #[test]
    fn test_populate_overridden_section() {
        let view = sample_view();
        let form = view.display("block_1").unwrap().populate_form("title").unwrap();
        assert_eq!(form.highlight, "block_1-title");
        assert!(form.overridden);
        assert_eq!(form.fields[0].value, json!("Latest"));
    }

    #[test]
    fn test_populate_plugin_select_lists_choices() {
        let view = sample_view();
        let form = view.display("default").unwrap().populate_form("style_plugin").unwrap();
        assert!(!form.defaultable);
        assert_eq!(form.fields[0].value, json!("default"));
        assert!(form.fields[0].choices.iter().any(|(name, _)| name == "grid"));
    }

    #[test]
    fn test_populate_plugin_options() {
        let view = sample_view();
        let form = view.display("page_1").unwrap().populate_form("pager_options").unwrap();
        let items = form.fields.iter().find(|f| f.key == "items_per_page").unwrap();
        assert_eq!(items.value, json!(20));
    }

    #[test]
    fn test_unknown_sections() {
        let view = sample_view();
        let block = view.display("block_1").unwrap();
        assert!(matches!(block.populate_form("path"), Err(DisplayError::UnknownSection(_))));
        assert!(matches!(block.populate_form("widgets"), Err(DisplayError::UnknownSection(_))));
        let attachment = view.display("attachment_1").unwrap();
        assert!(attachment.populate_form("pager").is_err());
        assert!(view.display("page_1").unwrap().populate_form("path").is_ok());
    }
}
