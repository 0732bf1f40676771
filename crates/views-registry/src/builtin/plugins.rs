//! Built-in plugin set.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::debug;
use views_schema::deep_merge;

use crate::category::{HandlerCategory, PluginCategory};
use crate::plugin::{Account, AggregationInfo, FieldError, Plugin, PluginContext, PluginDescriptor, PluginInfo};

/// Behaviour of a built-in plugin beyond holding its settings.
#[derive(Debug, Clone, PartialEq)]
pub enum PluginBehavior {
    Plain,
    /// Grid style: `columns` must be a positive number.
    Grid,
    /// Pager; `paged` tells whether results are split into pages.
    Pager { paged: bool },
    /// Access granted by the `perm` permission.
    Permission,
    /// Access granted by any role listed in `role`.
    Role,
    /// Time based cache with lifespans in seconds.
    TimeCache,
    /// Query plugin with its aggregation functions.
    Query(AggregationInfo),
}

/// A built-in plugin: static info, default settings and a behaviour.
#[derive(Debug, Clone)]
pub struct OptionPlugin {
    info: PluginInfo,
    defaults: Map<String, Value>,
    behavior: PluginBehavior,
}

impl OptionPlugin {
    pub fn new(info: PluginInfo) -> Self {
        Self {
            info,
            defaults: Map::new(),
            behavior: PluginBehavior::Plain,
        }
    }

    pub fn with_defaults(mut self, defaults: Value) -> Self {
        if let Value::Object(map) = defaults {
            self.defaults = map;
        }
        self
    }

    pub fn with_behavior(mut self, behavior: PluginBehavior) -> Self {
        self.behavior = behavior;
        self
    }
}

impl PluginDescriptor for OptionPlugin {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    fn initialize(&self, ctx: &PluginContext<'_>, options: Map<String, Value>) -> Box<dyn Plugin> {
        let merged = match deep_merge(Value::Object(self.defaults.clone()), Value::Object(options)) {
            Value::Object(map) => map,
            _ => self.defaults.clone(),
        };
        Box::new(ConfiguredPlugin {
            info: self.info.clone(),
            options: merged,
            behavior: self.behavior.clone(),
            localization_keys: ctx.localization_keys.clone(),
        })
    }
}

/// An initialized built-in plugin.
#[derive(Debug, Clone)]
pub struct ConfiguredPlugin {
    info: PluginInfo,
    options: Map<String, Value>,
    behavior: PluginBehavior,
    localization_keys: Vec<String>,
}

fn positive_number(value: Option<&Value>) -> bool {
    value.and_then(Value::as_u64).is_some_and(|n| n > 0)
}

fn non_negative_number(value: Option<&Value>) -> bool {
    value.map_or(true, |v| v.as_u64().is_some())
}

impl Plugin for ConfiguredPlugin {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    fn options(&self) -> &Map<String, Value> {
        &self.options
    }

    fn validate_options(&self, submitted: &Value) -> Vec<FieldError> {
        let mut errors = Vec::new();
        match &self.behavior {
            PluginBehavior::Grid => {
                if !positive_number(submitted.get("columns")) {
                    errors.push(FieldError::new("columns", "Columns must be a positive number."));
                }
            }
            PluginBehavior::Pager { .. } => {
                if !non_negative_number(submitted.get("items_per_page")) {
                    errors.push(FieldError::new("items_per_page", "Items to display must be a number."));
                }
                if !non_negative_number(submitted.get("offset")) {
                    errors.push(FieldError::new("offset", "Offset must be a number."));
                }
            }
            PluginBehavior::TimeCache => {
                for key in ["results_lifespan", "output_lifespan"] {
                    if !non_negative_number(submitted.get(key)) {
                        errors.push(FieldError::new(key, "Lifespan must be a number of seconds."));
                    }
                }
            }
            PluginBehavior::Permission => {
                let perm = submitted.get("perm").and_then(Value::as_str).unwrap_or_default();
                if perm.is_empty() {
                    errors.push(FieldError::new("perm", "A permission is required."));
                }
            }
            _ => {}
        }
        errors
    }

    fn validate(&self) -> Vec<String> {
        match &self.behavior {
            PluginBehavior::Grid if !positive_number(self.options.get("columns")) => {
                vec![format!("Style '{}' needs at least one column.", self.info.name)]
            }
            _ => Vec::new(),
        }
    }

    fn use_pager(&self) -> bool {
        matches!(self.behavior, PluginBehavior::Pager { paged: true })
    }

    fn uses_exposed(&self) -> bool {
        if !matches!(self.behavior, PluginBehavior::Pager { .. }) {
            return false;
        }
        let expose = self.options.get("expose");
        ["items_per_page", "offset"].iter().any(|key| {
            expose
                .and_then(|e| e.get(*key))
                .and_then(Value::as_bool)
                .unwrap_or(false)
        })
    }

    fn access(&self, account: &Account) -> bool {
        match &self.behavior {
            PluginBehavior::Permission => {
                let perm = self.options.get("perm").and_then(Value::as_str).unwrap_or_default();
                account.has_permission(perm)
            }
            PluginBehavior::Role => match self.options.get("role") {
                Some(Value::Object(roles)) => roles
                    .iter()
                    .filter(|(_, enabled)| !matches!(enabled, Value::Bool(false) | Value::Null))
                    .any(|(role, _)| account.roles.contains(role)),
                Some(Value::Array(roles)) => roles
                    .iter()
                    .filter_map(Value::as_str)
                    .any(|role| account.roles.contains(role)),
                _ => false,
            },
            _ => true,
        }
    }

    fn cache_flush(&self) {
        if self.behavior == PluginBehavior::TimeCache {
            debug!(plugin = %self.info.name, "flushing cached results");
        }
    }

    fn aggregation_info(&self) -> AggregationInfo {
        match &self.behavior {
            PluginBehavior::Query(info) => info.clone(),
            _ => AggregationInfo::default(),
        }
    }

    fn localization_keys(&self) -> &[String] {
        &self.localization_keys
    }
}

/// Stand-in for a plugin that could not be resolved.
#[derive(Debug, Clone)]
pub struct BrokenPlugin {
    info: PluginInfo,
    requested: String,
    options: Map<String, Value>,
}

impl BrokenPlugin {
    pub fn new(category: PluginCategory, requested: &str) -> Self {
        let title = format!("Missing {} plugin", category.label());
        Self {
            info: PluginInfo::new(category, "broken", &title),
            requested: requested.to_string(),
            options: Map::new(),
        }
    }

    /// Name that failed to resolve.
    pub fn requested(&self) -> &str {
        &self.requested
    }
}

impl Plugin for BrokenPlugin {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    fn options(&self) -> &Map<String, Value> {
        &self.options
    }

    fn validate(&self) -> Vec<String> {
        vec![format!(
            "The {} plugin '{}' is not available.",
            self.info.category.label(),
            self.requested
        )]
    }
}

/// Aggregation functions of the SQL query plugin.
pub fn sql_aggregation() -> AggregationInfo {
    let numeric = [
        (HandlerCategory::Field, "field_numeric"),
        (HandlerCategory::Filter, "filter_group_by_numeric"),
        (HandlerCategory::Sort, "sort_group_by_numeric"),
        (HandlerCategory::Argument, "argument_group_by_numeric"),
    ];
    let mut info = AggregationInfo::default().with_function("group", "Group results together", &[]);
    for (group_type, title) in [
        ("count", "Count"),
        ("count_distinct", "Count DISTINCT"),
        ("sum", "Sum"),
        ("avg", "Average"),
        ("min", "Minimum"),
        ("max", "Maximum"),
        ("stddev_pop", "Standard deviation"),
    ] {
        info = info.with_function(group_type, title, &numeric);
    }
    info
}

/// Every built-in plugin.
pub fn plugins() -> Vec<Arc<dyn PluginDescriptor>> {
    use PluginCategory::*;

    let plugin = |category, name: &str, title: &str| PluginInfo::new(category, name, title);

    let list: Vec<OptionPlugin> = vec![
        OptionPlugin::new(plugin(Style, "default", "Unformatted list").with_options().with_row_plugin().with_fields())
            .with_defaults(json!({"grouping": [], "row_class": ""})),
        OptionPlugin::new(plugin(Style, "grid", "Grid").with_options().with_row_plugin().with_fields())
            .with_defaults(json!({"columns": 4, "alignment": "horizontal", "fill_single_line": true}))
            .with_behavior(PluginBehavior::Grid),
        OptionPlugin::new(plugin(Style, "table", "Table").with_options().with_fields())
            .with_defaults(json!({"columns": {}, "default": "", "sticky": false})),
        OptionPlugin::new(plugin(Style, "list", "HTML list").with_options().with_row_plugin().with_fields())
            .with_defaults(json!({"type": "ul", "class": ""})),
        OptionPlugin::new(plugin(Row, "fields", "Fields").with_options().with_fields())
            .with_defaults(json!({"inline": {}, "separator": "", "hide_empty": false})),
        OptionPlugin::new(plugin(Row, "entity", "Content").with_options())
            .with_defaults(json!({"view_mode": "teaser"})),
        OptionPlugin::new(plugin(Pager, "none", "Display all items").with_options())
            .with_defaults(json!({"offset": 0}))
            .with_behavior(PluginBehavior::Pager { paged: false }),
        OptionPlugin::new(plugin(Pager, "some", "Display a specified number of items").with_options())
            .with_defaults(json!({"items_per_page": 10, "offset": 0}))
            .with_behavior(PluginBehavior::Pager { paged: false }),
        OptionPlugin::new(plugin(Pager, "full", "Paged output, full pager").with_options())
            .with_defaults(json!({
                "items_per_page": 10,
                "offset": 0,
                "id": 0,
                "quantity": 9,
                "expose": {"items_per_page": false, "offset": false}
            }))
            .with_behavior(PluginBehavior::Pager { paged: true }),
        OptionPlugin::new(plugin(Pager, "mini", "Paged output, mini pager").with_options())
            .with_defaults(json!({"items_per_page": 10, "offset": 0, "id": 0}))
            .with_behavior(PluginBehavior::Pager { paged: true }),
        OptionPlugin::new(plugin(Access, "none", "None")),
        OptionPlugin::new(plugin(Access, "perm", "Permission").with_options())
            .with_defaults(json!({"perm": "access content"}))
            .with_behavior(PluginBehavior::Permission),
        OptionPlugin::new(plugin(Access, "role", "Role").with_options())
            .with_defaults(json!({"role": {}}))
            .with_behavior(PluginBehavior::Role),
        OptionPlugin::new(plugin(Cache, "none", "None")),
        OptionPlugin::new(plugin(Cache, "time", "Time-based").with_options())
            .with_defaults(json!({"results_lifespan": 3600, "output_lifespan": 3600}))
            .with_behavior(PluginBehavior::TimeCache),
        OptionPlugin::new(plugin(ExposedForm, "basic", "Basic").with_options())
            .with_defaults(json!({
                "submit_button": "Apply",
                "reset_button": false,
                "reset_button_label": "Reset",
                "exposed_sorts_label": "Sort by"
            })),
        OptionPlugin::new(plugin(ExposedForm, "input_required", "Input required").with_options())
            .with_defaults(json!({
                "submit_button": "Apply",
                "text_input_required": "Select any filter and click on Apply to see results"
            })),
        OptionPlugin::new(plugin(Query, "views_query", "SQL Query").with_options())
            .with_defaults(json!({
                "disable_sql_rewrite": false,
                "distinct": false,
                "query_comment": ""
            }))
            .with_behavior(PluginBehavior::Query(sql_aggregation())),
    ];

    list.into_iter()
        .map(|p| Arc::new(p) as Arc<dyn PluginDescriptor>)
        .collect()
}
