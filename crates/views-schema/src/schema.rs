//! Option definitions per display kind.

use serde_json::{json, Map, Value};

use crate::kind::DisplayKind;
use crate::option::{OptionEntry, SerializationHint};

/// Key of the per-display map recording which options defer to the
/// default display (`true` = deferred).
pub const DEFAULTS_KEY: &str = "defaults";

/// Deferral flags a fresh non-default display starts with.
const DEFAULT_FLAGS: &[(&str, bool)] = &[
    ("access", true),
    ("cache", true),
    ("query", true),
    ("title", true),
    ("css_class", true),
    ("use_ajax", true),
    ("hide_attachment_summary", true),
    ("hide_admin_links", false),
    ("pager", true),
    ("pager_options", true),
    ("use_more", true),
    ("use_more_always", true),
    ("use_more_text", true),
    ("exposed_form", true),
    ("exposed_form_options", true),
    ("link_display", true),
    ("link_url", true),
    ("group_by", true),
    ("style_plugin", true),
    ("style_options", true),
    ("row_plugin", true),
    ("row_options", true),
    ("header", true),
    ("footer", true),
    ("empty", true),
    ("relationships", true),
    ("fields", true),
    ("sorts", true),
    ("arguments", true),
    ("filters", true),
    ("filter_groups", true),
];

/// Flags dropped for kinds that cannot page; they have no pager section.
const PAGER_FLAGS: &[&str] = &["pager", "pager_options"];

/// The full set of options recognized by displays of one kind.
///
/// Entry order is export order: handler sets come last.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionSchema {
    entries: Vec<OptionEntry>,
}

impl OptionSchema {
    /// Build the schema for a display kind.
    ///
    /// Pure function of the kind. Kinds without pager support get the
    /// limited pager as default and keep their pager settings local. The
    /// default kind gets no deferral flags at all.
    pub fn for_kind(kind: &DisplayKind) -> Self {
        let plugin = |default: &str| OptionEntry::new("type", json!(default)).hint(SerializationHint::Plugin);
        let nested_options = || OptionEntry::new("options", json!({})).hint(SerializationHint::Skip);
        let handlers = |key: &str| OptionEntry::new(key, json!({})).hint(SerializationHint::HandlerSet);

        let pager_default = if kind.use_pager { "full" } else { "some" };

        let mut entries = Vec::new();
        if !kind.is_default() {
            entries.push(Self::defaults_entry(kind));
        }

        entries.extend([
            OptionEntry::new("title", json!("")).translatable(),
            OptionEntry::new("enabled", json!(true)).boolean(),
            OptionEntry::new("display_comment", json!("")),
            OptionEntry::new("css_class", json!("")),
            OptionEntry::new("display_description", json!("")).translatable(),
            OptionEntry::new("use_ajax", json!(false)).boolean(),
            OptionEntry::new("hide_attachment_summary", json!(false)).boolean(),
            OptionEntry::new("hide_admin_links", json!(false)).boolean(),
            OptionEntry::new("use_more", json!(false)).boolean(),
            OptionEntry::new("use_more_always", json!(false))
                .boolean()
                .hint(SerializationHint::ValueAlways),
            OptionEntry::new("use_more_text", json!("more")).translatable(),
            OptionEntry::new("link_display", json!("")),
            OptionEntry::new("link_url", json!("")),
            OptionEntry::new("group_by", json!(false)).boolean(),
            OptionEntry::new("field_language", json!("***CURRENT_LANGUAGE***")),
            OptionEntry::new("field_language_add_to_query", json!(1)),
            // access and cache keep plugin settings next to `type`
            OptionEntry::composite("access", vec![plugin("none")]),
            OptionEntry::composite("cache", vec![plugin("none")]),
            OptionEntry::composite("query", vec![plugin("views_query"), nested_options()]),
            OptionEntry::composite("exposed_form", vec![plugin("basic"), nested_options()]),
            OptionEntry::composite("pager", vec![plugin(pager_default), nested_options()]),
            OptionEntry::new("style_plugin", json!("default")).hint(SerializationHint::Style),
            OptionEntry::new("style_options", json!({})).hint(SerializationHint::Skip),
            OptionEntry::new("row_plugin", json!("fields")).hint(SerializationHint::Style),
            OptionEntry::new("row_options", json!({})).hint(SerializationHint::Skip),
            OptionEntry::new("exposed_block", json!(false)).boolean(),
        ]);

        if kind.has_path {
            entries.push(OptionEntry::new("path", json!("")));
        }

        entries.extend([
            handlers("header"),
            handlers("footer"),
            handlers("empty"),
            handlers("relationships"),
            handlers("fields"),
            handlers("sorts"),
            handlers("arguments"),
            OptionEntry::composite(
                "filter_groups",
                vec![
                    OptionEntry::new("operator", json!("AND")),
                    OptionEntry::new("groups", json!({"1": "AND"})),
                ],
            ),
            handlers("filters"),
        ]);

        if !kind.is_default() {
            let flags = Self::flag_map(kind);
            for entry in entries.iter_mut() {
                if flags.contains_key(&entry.key) {
                    entry.defaultable = true;
                }
            }
        }

        Self { entries }
    }

    fn flag_map(kind: &DisplayKind) -> Map<String, Value> {
        let mut flags: Map<String, Value> = DEFAULT_FLAGS
            .iter()
            .map(|(key, deferred)| (key.to_string(), Value::Bool(*deferred)))
            .collect();
        if !kind.use_pager {
            for key in PAGER_FLAGS {
                flags.remove(*key);
            }
        }
        flags
    }

    fn defaults_entry(kind: &DisplayKind) -> OptionEntry {
        let flags = Self::flag_map(kind)
            .into_iter()
            .map(|(key, deferred)| OptionEntry::new(&key, deferred).boolean())
            .collect();
        OptionEntry::composite(DEFAULTS_KEY, flags).hint(SerializationHint::Skip)
    }

    /// All entries in export order.
    pub fn entries(&self) -> &[OptionEntry] {
        &self.entries
    }

    /// Look up one entry.
    pub fn get(&self, key: &str) -> Option<&OptionEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// Default value of one option.
    pub fn default_value(&self, key: &str) -> Option<Value> {
        self.get(key).map(OptionEntry::default_value)
    }

    /// The option map a fresh display starts from, including the
    /// deferral flags for non-default kinds.
    pub fn defaults_value(&self) -> Map<String, Value> {
        self.entries
            .iter()
            .map(|e| (e.key.clone(), e.default_value()))
            .collect()
    }

    /// Deferral flags a fresh display starts with. Empty for the default kind.
    pub fn default_flags(&self) -> Map<String, Value> {
        match self.default_value(DEFAULTS_KEY) {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Keys marked translatable.
    pub fn translatable_keys(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| e.translatable)
            .map(|e| e.key.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> DisplayKind {
        DisplayKind::new("page").with_pager(true).with_path(true)
    }

    #[test]
    fn test_default_kind_has_no_flags() {
        let schema = OptionSchema::for_kind(&DisplayKind::new("default").with_pager(true));
        assert!(schema.get(DEFAULTS_KEY).is_none());
        assert!(schema.default_flags().is_empty());
        assert!(schema.entries().iter().all(|e| !e.defaultable));
    }

    #[test]
    fn test_page_defaults() {
        let schema = OptionSchema::for_kind(&page());
        let defaults = schema.defaults_value();

        assert_eq!(defaults["title"], "");
        assert_eq!(defaults["pager"], json!({"type": "full", "options": {}}));
        assert_eq!(defaults["access"], json!({"type": "none"}));
        assert_eq!(defaults["style_plugin"], "default");
        assert_eq!(defaults["path"], "");
        assert_eq!(defaults[DEFAULTS_KEY]["title"], true);
        assert!(defaults[DEFAULTS_KEY].get("display_description").is_none());
        assert!(schema.get("title").unwrap().defaultable);
        assert!(!schema.get("display_description").unwrap().defaultable);
        assert!(!schema.get("enabled").unwrap().defaultable);
    }

    #[test]
    fn test_no_pager_kind() {
        let schema = OptionSchema::for_kind(&DisplayKind::new("attachment"));
        assert_eq!(schema.default_value("pager").unwrap()["type"], "some");
        let flags = schema.default_flags();
        assert!(flags.get("pager").is_none());
        assert!(flags.get("pager_options").is_none());
        assert!(!schema.get("pager").unwrap().defaultable);
        assert!(schema.get("path").is_none());
    }

    #[test]
    fn test_defaultable_matches_sections() {
        for kind in [page(), DisplayKind::new("attachment")] {
            let schema = OptionSchema::for_kind(&kind);
            let sections = crate::SectionMap::standard(&kind);
            for key in schema.default_flags().keys() {
                assert!(sections.is_defaultable(key), "{} has a flag but no section", key);
            }
            for entry in schema.entries() {
                if entry.defaultable {
                    assert!(sections.is_defaultable(&entry.key), "{}", entry.key);
                }
            }
        }
    }

    #[test]
    fn test_handler_sets_export_last() {
        let schema = OptionSchema::for_kind(&page());
        let keys: Vec<&str> = schema.entries().iter().map(|e| e.key.as_str()).collect();
        let fields = keys.iter().position(|k| *k == "fields").unwrap();
        let title = keys.iter().position(|k| *k == "title").unwrap();
        assert!(title < fields);
        assert_eq!(keys.last(), Some(&"filters"));
        assert_eq!(schema.get("fields").unwrap().hint, SerializationHint::HandlerSet);
    }

    #[test]
    fn test_translatable_keys() {
        let schema = OptionSchema::for_kind(&page());
        let keys: Vec<&str> = schema.translatable_keys().collect();
        assert_eq!(keys, vec!["title", "display_description", "use_more_text"]);
    }
}
