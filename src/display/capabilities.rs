//! Derived display behaviour: pager, more link, links, access, validation.

use std::collections::BTreeMap;

use serde_json::Value;
use views_registry::{Account, HandlerCategory, PluginCategory};

use super::Display;

/// Permission that bypasses every access plugin.
pub const ACCESS_ALL_VIEWS: &str = "access all views";

impl<'v> Display<'v> {
    /// Whether results are split into pages.
    pub fn use_pager(&self) -> bool {
        self.get_plugin(PluginCategory::Pager)
            .map(|pager| pager.use_pager())
            .unwrap_or(false)
    }

    pub fn use_more(&self) -> bool {
        self.kind().use_more && self.get_bool("use_more")
    }

    pub fn use_more_always(&self) -> bool {
        self.kind().use_more && self.get_bool("use_more_always")
    }

    /// Text of the "more" link, if the kind supports one.
    pub fn use_more_text(&self) -> Option<&'v str> {
        if self.kind().use_more {
            Some(self.get_str("use_more_text"))
        } else {
            None
        }
    }

    pub fn use_group_by(&self) -> bool {
        self.get_bool("group_by")
    }

    pub fn is_ajax_enabled(&self) -> bool {
        self.kind().uses_ajax && self.get_bool("use_ajax")
    }

    pub fn accept_attachments(&self) -> bool {
        self.kind().accept_attachments
    }

    pub fn has_path(&self) -> bool {
        self.kind().has_path
    }

    /// Whether the style renders field handlers, directly or through its
    /// row plugin.
    pub fn uses_fields(&self) -> bool {
        let Some(style) = self.get_plugin(PluginCategory::Style) else {
            return false;
        };
        if style.uses_row_plugin() {
            if let Some(row) = self.get_plugin(PluginCategory::Row) {
                return row.uses_fields();
            }
        }
        style.uses_fields()
    }

    /// Whether any handler or the pager adds exposed inputs.
    pub fn uses_exposed(&self) -> bool {
        let handler_exposed = HandlerCategory::ALL.into_iter().any(|category| {
            self.get_handlers(category)
                .iter()
                .any(|(_, handler)| handler.can_expose() && handler.is_exposed())
        });
        handler_exposed
            || self
                .get_plugin(PluginCategory::Pager)
                .map(|pager| pager.uses_exposed())
                .unwrap_or(false)
    }

    /// Display that links for this one: the `link_display` option when it
    /// names a display of the view, else the first display with a path.
    pub fn get_link_display(&self) -> Option<&'v str> {
        let configured = self.get_str("link_display");
        if !configured.is_empty() {
            if let Some(display) = self.view.display(configured) {
                return Some(display.id());
            }
        }
        self.view
            .displays()
            .find(|display| display.has_path())
            .map(|display| display.id())
    }

    /// Path of this display, or of the display it links through.
    pub fn get_path(&self) -> Option<&'v str> {
        if self.has_path() {
            return Some(self.get_str("path"));
        }
        let link = self.get_link_display()?;
        if link == self.id() {
            return None;
        }
        // only one hop: a linked display without a path has nothing to give
        self.view
            .display(link)
            .filter(|display| display.has_path())
            .map(|display| display.get_str("path"))
    }

    /// Field labels by field id.
    ///
    /// Labels of fields reached through a relationship are prefixed with the
    /// relationship's label. With `groupable_only`, fields that cannot be
    /// grouped as strings are left out.
    pub fn get_field_labels(&self, groupable_only: bool) -> BTreeMap<String, String> {
        let relationships: BTreeMap<String, String> = self
            .get_handlers(HandlerCategory::Relationship)
            .iter()
            .map(|(id, handler)| {
                let label = handler.label().map(str::to_string).unwrap_or_else(|| handler.ui_name());
                (id.to_string(), label)
            })
            .collect();

        let mut labels = BTreeMap::new();
        for (id, handler) in self.get_handlers(HandlerCategory::Field).iter() {
            if groupable_only && !handler.uses_string_group_by() {
                continue;
            }
            let mut label = handler.label().map(str::to_string).unwrap_or_else(|| handler.ui_name());
            if let Some(relationship) = handler.relationship().and_then(|r| relationships.get(r)) {
                label = format!("({}) {}", relationship, label);
            }
            labels.insert(id.to_string(), label);
        }
        labels
    }

    /// Whether `account` may see this display.
    pub fn access(&self, account: &Account) -> bool {
        if account.has_permission(ACCESS_ALL_VIEWS) {
            return true;
        }
        match self.get_plugin(PluginCategory::Access) {
            Some(plugin) => plugin.access(account),
            None => true,
        }
    }

    /// Configuration problems of this display.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let title = self.title();

        if self.uses_fields() {
            let visible = self
                .get_handlers(HandlerCategory::Field)
                .iter()
                .any(|(_, handler)| !handler.is_excluded());
            if !visible {
                errors.push(format!(
                    "Display \"{}\" uses fields but there are none defined for it or all are excluded.",
                    title
                ));
            }
        }

        if self.has_path() && self.get_str("path").is_empty() {
            errors.push(format!("Display \"{}\" uses a path but the path is undefined.", title));
        }

        match self.get_plugin(PluginCategory::Style) {
            Some(style) => errors.extend(style.validate()),
            None => errors.push(format!("Display \"{}\" has an invalid style plugin.", title)),
        }

        errors.extend(self.plugin_or_fallback(PluginCategory::Query).validate());

        for category in HandlerCategory::ALL {
            for (_, handler) in self.get_handlers(category).iter() {
                errors.extend(handler.validate());
            }
        }
        errors
    }

    /// Whether no exposed handler other than `id` already uses `identifier`.
    pub fn is_identifier_unique(&self, id: &str, identifier: &str) -> bool {
        HandlerCategory::ALL.into_iter().all(|category| {
            self.get_handlers(category).iter().all(|(key, handler)| {
                !(handler.can_expose()
                    && handler.is_exposed()
                    && key != id
                    && handler.exposed_identifier() == Some(identifier))
            })
        })
    }

    /// Title of the resolved plugin, or of whatever stands in for it.
    pub fn plugin_title(&self, category: PluginCategory) -> String {
        self.plugin_or_fallback(category).info().title.clone()
    }

    /// Whether the option holds a non-empty value.
    pub fn has_option(&self, key: &str) -> bool {
        match self.get_option(key) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(_) => true,
        }
    }
}
