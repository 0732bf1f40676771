//! Plugin contracts.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::category::{HandlerCategory, PluginCategory};

/// Static description of a plugin, as returned by `describe`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub category: PluginCategory,
    pub name: String,
    pub title: String,

    #[serde(default)]
    pub help: String,

    /// Whether the plugin has a settings form of its own.
    #[serde(default)]
    pub uses_options: bool,

    /// Style plugins: whether rows are rendered through a row plugin.
    #[serde(default)]
    pub uses_row_plugin: bool,

    /// Style and row plugins: whether field handlers are rendered.
    #[serde(default)]
    pub uses_fields: bool,

    /// Base tables the plugin is restricted to (empty = any).
    #[serde(default)]
    pub base: Vec<String>,
}

impl PluginInfo {
    pub fn new(category: PluginCategory, name: &str, title: &str) -> Self {
        Self {
            category,
            name: name.to_string(),
            title: title.to_string(),
            help: String::new(),
            uses_options: false,
            uses_row_plugin: false,
            uses_fields: false,
            base: Vec::new(),
        }
    }

    pub fn with_help(mut self, help: &str) -> Self {
        self.help = help.to_string();
        self
    }

    pub fn with_options(mut self) -> Self {
        self.uses_options = true;
        self
    }

    pub fn with_row_plugin(mut self) -> Self {
        self.uses_row_plugin = true;
        self
    }

    pub fn with_fields(mut self) -> Self {
        self.uses_fields = true;
        self
    }

    pub fn with_base(mut self, tables: &[&str]) -> Self {
        self.base = tables.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Whether the plugin may be offered for a view on `base_table`.
    pub fn supports_base(&self, base_table: &str) -> bool {
        self.base.is_empty() || self.base.iter().any(|b| b == base_table)
    }
}

/// What a plugin is bound to when it is initialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginContext<'a> {
    pub view_name: &'a str,
    pub display_id: &'a str,
    pub base_table: &'a str,
    pub base_field: &'a str,
    /// Localization keys; only set for query plugins.
    pub localization_keys: Vec<String>,
}

/// A per-field validation message for the form collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Dotted path of the offending form field.
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// The user an access check is made for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub name: String,
    #[serde(default)]
    pub roles: BTreeSet<String>,
    #[serde(default)]
    pub permissions: BTreeSet<String>,
}

impl Account {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.roles.insert(role.to_string());
        self
    }

    pub fn with_permission(mut self, permission: &str) -> Self {
        self.permissions.insert(permission.to_string());
        self
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

/// One aggregation function a query plugin supports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateFunction {
    pub title: String,
    /// Handler implementation replacing the nominal one, per category.
    #[serde(default)]
    pub handlers: BTreeMap<HandlerCategory, String>,
}

/// Aggregation functions keyed by group type ("count", "sum", ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationInfo {
    pub functions: BTreeMap<String, AggregateFunction>,
}

impl AggregationInfo {
    pub fn with_function(mut self, group_type: &str, title: &str, handlers: &[(HandlerCategory, &str)]) -> Self {
        self.functions.insert(
            group_type.to_string(),
            AggregateFunction {
                title: title.to_string(),
                handlers: handlers
                    .iter()
                    .map(|(category, handler)| (*category, handler.to_string()))
                    .collect(),
            },
        );
        self
    }

    /// Override handler registered for a group type and category.
    pub fn override_for(&self, group_type: &str, category: HandlerCategory) -> Option<&str> {
        self.functions
            .get(group_type)
            .and_then(|f| f.handlers.get(&category))
            .map(String::as_str)
    }
}

/// A resolved, initialized plugin instance.
///
/// Instances are shared by reference once resolved, so every method takes
/// `&self`.
pub trait Plugin: fmt::Debug {
    fn info(&self) -> &PluginInfo;

    /// Settings the plugin was initialized with, merged over its defaults.
    fn options(&self) -> &Map<String, Value>;

    fn name(&self) -> &str {
        &self.info().name
    }

    fn category(&self) -> PluginCategory {
        self.info().category
    }

    fn uses_options(&self) -> bool {
        self.info().uses_options
    }

    fn uses_fields(&self) -> bool {
        self.info().uses_fields
    }

    fn uses_row_plugin(&self) -> bool {
        self.info().uses_row_plugin
    }

    /// Validate submitted settings for this plugin's form.
    fn validate_options(&self, _submitted: &Value) -> Vec<FieldError> {
        Vec::new()
    }

    /// Massage submitted settings before they are stored.
    fn submit_options(&self, submitted: Value) -> Value {
        submitted
    }

    /// Problems with the plugin's current configuration.
    fn validate(&self) -> Vec<String> {
        Vec::new()
    }

    /// Pager plugins: whether results are split into pages.
    fn use_pager(&self) -> bool {
        false
    }

    /// Whether the plugin adds exposed inputs.
    fn uses_exposed(&self) -> bool {
        false
    }

    /// Access plugins: whether `account` may see the display.
    fn access(&self, _account: &Account) -> bool {
        true
    }

    /// Cache plugins: drop anything cached for the view.
    fn cache_flush(&self) {}

    /// Query plugins: supported aggregation functions.
    fn aggregation_info(&self) -> AggregationInfo {
        AggregationInfo::default()
    }

    /// Query plugins: keys used to localize stored strings.
    fn localization_keys(&self) -> &[String] {
        &[]
    }

    /// Release anything held by the instance.
    fn destroy(&self) {}
}

/// A registered plugin, able to build instances.
pub trait PluginDescriptor: Send + Sync {
    fn info(&self) -> &PluginInfo;

    /// Build an instance bound to `ctx` with the extracted settings.
    fn initialize(&self, ctx: &PluginContext<'_>, options: Map<String, Value>) -> Box<dyn Plugin>;
}
