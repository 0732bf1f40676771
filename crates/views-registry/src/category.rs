//! Plugin and handler categories.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Where a plugin category keeps its selection and settings inside the
/// display options.
///
/// These shapes are a storage contract with every persisted view and must
/// not be unified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageShape {
    /// `<selector>` names the plugin, `<options>` holds its settings.
    Split {
        selector: &'static str,
        options: &'static str,
    },
    /// `{ "type": name, ...settings }` under one key (access, cache).
    Legacy { key: &'static str },
    /// `{ "type": name, "options": { ...settings } }` under one key.
    Nested { key: &'static str },
}

impl StorageShape {
    /// The option key holding the plugin name.
    pub fn selection_key(&self) -> &'static str {
        match self {
            Self::Split { selector, .. } => selector,
            Self::Legacy { key } | Self::Nested { key } => key,
        }
    }
}

/// Categories of swappable strategy plugins a display resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginCategory {
    Style,
    Row,
    Pager,
    Access,
    Cache,
    ExposedForm,
    Query,
}

impl PluginCategory {
    pub const ALL: [PluginCategory; 7] = [
        Self::Style,
        Self::Row,
        Self::Pager,
        Self::Access,
        Self::Cache,
        Self::ExposedForm,
        Self::Query,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Style => "style",
            Self::Row => "row",
            Self::Pager => "pager",
            Self::Access => "access",
            Self::Cache => "cache",
            Self::ExposedForm => "exposed_form",
            Self::Query => "query",
        }
    }

    /// Human readable label used in titles ("Missing style plugin").
    pub fn label(self) -> &'static str {
        match self {
            Self::ExposedForm => "exposed form",
            other => other.as_str(),
        }
    }

    /// Storage shape of this category.
    pub fn storage(self) -> StorageShape {
        match self {
            Self::Style => StorageShape::Split {
                selector: "style_plugin",
                options: "style_options",
            },
            Self::Row => StorageShape::Split {
                selector: "row_plugin",
                options: "row_options",
            },
            Self::Access => StorageShape::Legacy { key: "access" },
            Self::Cache => StorageShape::Legacy { key: "cache" },
            Self::Pager => StorageShape::Nested { key: "pager" },
            Self::ExposedForm => StorageShape::Nested { key: "exposed_form" },
            Self::Query => StorageShape::Nested { key: "query" },
        }
    }

    /// Form section editing this category's settings.
    pub fn options_section(self) -> &'static str {
        match self {
            Self::Style => "style_options",
            Self::Row => "row_options",
            Self::Pager => "pager_options",
            Self::Access => "access_options",
            Self::Cache => "cache_options",
            Self::ExposedForm => "exposed_form_options",
            Self::Query => "query",
        }
    }
}

impl fmt::Display for PluginCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluginCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown plugin category '{}'", s))
    }
}

/// Categories of per-column handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerCategory {
    Field,
    Argument,
    Sort,
    Filter,
    Relationship,
    Header,
    Footer,
    Empty,
}

impl HandlerCategory {
    pub const ALL: [HandlerCategory; 8] = [
        Self::Field,
        Self::Argument,
        Self::Sort,
        Self::Filter,
        Self::Relationship,
        Self::Header,
        Self::Footer,
        Self::Empty,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Field => "field",
            Self::Argument => "argument",
            Self::Sort => "sort",
            Self::Filter => "filter",
            Self::Relationship => "relationship",
            Self::Header => "header",
            Self::Footer => "footer",
            Self::Empty => "empty",
        }
    }

    /// Option key holding the ordered specs of this category.
    pub fn plural(self) -> &'static str {
        match self {
            Self::Field => "fields",
            Self::Argument => "arguments",
            Self::Sort => "sorts",
            Self::Filter => "filters",
            Self::Relationship => "relationships",
            Self::Header => "header",
            Self::Footer => "footer",
            Self::Empty => "empty",
        }
    }

    /// Handler type looked up in the catalog. Header, footer and empty
    /// text all use area handlers.
    pub fn handler_type(self) -> &'static str {
        match self {
            Self::Header | Self::Footer | Self::Empty => "area",
            other => other.as_str(),
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Field => "Fields",
            Self::Argument => "Contextual filters",
            Self::Sort => "Sort criteria",
            Self::Filter => "Filter criteria",
            Self::Relationship => "Relationships",
            Self::Header => "Header",
            Self::Footer => "Footer",
            Self::Empty => "No results behavior",
        }
    }

    /// Singular title.
    pub fn short_title(self) -> &'static str {
        match self {
            Self::Field => "Field",
            Self::Argument => "Contextual filter",
            Self::Sort => "Sort criterion",
            Self::Filter => "Filter criterion",
            Self::Relationship => "Relationship",
            Self::Header => "Header",
            Self::Footer => "Footer",
            Self::Empty => "Empty",
        }
    }

    /// Category whose specs live under the given option key.
    pub fn from_plural(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.plural() == key)
    }
}

impl fmt::Display for HandlerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HandlerCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown handler category '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_shapes() {
        assert!(matches!(PluginCategory::Access.storage(), StorageShape::Legacy { key: "access" }));
        assert!(matches!(PluginCategory::Cache.storage(), StorageShape::Legacy { .. }));
        assert!(matches!(PluginCategory::Pager.storage(), StorageShape::Nested { key: "pager" }));
        assert!(matches!(PluginCategory::Query.storage(), StorageShape::Nested { .. }));
        assert_eq!(PluginCategory::Style.storage().selection_key(), "style_plugin");
        assert_eq!(PluginCategory::ExposedForm.storage().selection_key(), "exposed_form");
    }

    #[test]
    fn test_parse_roundtrip() {
        for category in PluginCategory::ALL {
            assert_eq!(category.as_str().parse::<PluginCategory>().unwrap(), category);
        }
        assert!("widget".parse::<PluginCategory>().is_err());
        assert_eq!("filter".parse::<HandlerCategory>().unwrap(), HandlerCategory::Filter);
    }

    #[test]
    fn test_handler_plurals() {
        assert_eq!(HandlerCategory::Field.plural(), "fields");
        assert_eq!(HandlerCategory::Header.plural(), "header");
        assert_eq!(HandlerCategory::from_plural("sorts"), Some(HandlerCategory::Sort));
        assert_eq!(HandlerCategory::from_plural("sort"), None);
        assert_eq!(HandlerCategory::Empty.handler_type(), "area");
        assert_eq!(HandlerCategory::Filter.handler_type(), "filter");
    }
}
