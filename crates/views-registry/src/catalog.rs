//! Global plugin and handler catalogs.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::category::PluginCategory;
use crate::handler::HandlerDescriptor;
use crate::plugin::{PluginDescriptor, PluginInfo};

/// Errors raised while populating a catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("{category} plugin '{name}' is already registered")]
    DuplicatePlugin { category: PluginCategory, name: String },

    #[error("handler '{0}' is already registered")]
    DuplicateHandler(String),
}

/// Data-source facts about a base table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseTableInfo {
    /// Primary field of the table.
    pub field: String,
    /// Query plugin to use for views on this table (`None` = default).
    #[serde(default)]
    pub query_class: Option<String>,
}

/// Global lookup of plugins by category and name.
pub trait PluginCatalog: Send + Sync {
    fn lookup(&self, category: PluginCategory, name: &str) -> Option<Arc<dyn PluginDescriptor>>;

    fn describe(&self, category: PluginCategory, name: &str) -> Option<PluginInfo> {
        self.lookup(category, name).map(|d| d.info().clone())
    }

    /// Every plugin of a category usable for `base_table`, as (name, title).
    fn names(&self, category: PluginCategory, base_table: &str) -> Vec<(String, String)>;
}

/// Global lookup of handler implementations and table data.
pub trait HandlerCatalog: Send + Sync {
    /// Find the implementation for a column, or the named override.
    fn lookup(
        &self,
        table: &str,
        field: &str,
        handler_type: &str,
        override_name: Option<&str>,
    ) -> Option<Arc<dyn HandlerDescriptor>>;

    fn base_table(&self, table: &str) -> Option<BaseTableInfo>;
}

/// Plugin catalog held in memory.
#[derive(Default)]
pub struct InMemoryPluginCatalog {
    plugins: BTreeMap<(PluginCategory, String), Arc<dyn PluginDescriptor>>,
}

impl InMemoryPluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog pre-populated with the built-in plugins.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        for descriptor in crate::builtin::plugins() {
            catalog.insert(descriptor);
        }
        catalog
    }

    /// Register a plugin; names are unique per category.
    pub fn register(&mut self, descriptor: Arc<dyn PluginDescriptor>) -> Result<(), CatalogError> {
        let info = descriptor.info();
        let key = (info.category, info.name.clone());
        if self.plugins.contains_key(&key) {
            return Err(CatalogError::DuplicatePlugin {
                category: key.0,
                name: key.1,
            });
        }
        self.insert(descriptor);
        Ok(())
    }

    /// Register a plugin, replacing any plugin with the same name.
    pub fn insert(&mut self, descriptor: Arc<dyn PluginDescriptor>) {
        let info = descriptor.info();
        debug!(category = %info.category, name = %info.name, "registering plugin");
        self.plugins.insert((info.category, info.name.clone()), descriptor);
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl PluginCatalog for InMemoryPluginCatalog {
    fn lookup(&self, category: PluginCategory, name: &str) -> Option<Arc<dyn PluginDescriptor>> {
        self.plugins.get(&(category, name.to_string())).cloned()
    }

    fn names(&self, category: PluginCategory, base_table: &str) -> Vec<(String, String)> {
        self.plugins
            .iter()
            .filter(|((c, _), d)| *c == category && d.info().supports_base(base_table))
            .map(|((_, name), d)| (name.clone(), d.info().title.clone()))
            .collect()
    }
}

/// Handler catalog held in memory.
///
/// Column handlers are keyed by (table, field, handler type); override
/// implementations are keyed by name alone.
#[derive(Default)]
pub struct InMemoryHandlerCatalog {
    columns: BTreeMap<(String, String, String), Arc<dyn HandlerDescriptor>>,
    implementations: BTreeMap<String, Arc<dyn HandlerDescriptor>>,
    tables: BTreeMap<String, BaseTableInfo>,
}

impl InMemoryHandlerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog holding the built-in override implementations. Column
    /// handlers still have to be registered by the host.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        for descriptor in crate::builtin::handler_implementations() {
            catalog
                .implementations
                .insert(descriptor.name().to_string(), descriptor);
        }
        catalog
    }

    /// Register the handler for one column and handler type.
    pub fn register(&mut self, table: &str, field: &str, handler_type: &str, descriptor: Arc<dyn HandlerDescriptor>) {
        debug!(table, field, handler_type, name = descriptor.name(), "registering handler");
        self.columns.insert(
            (table.to_string(), field.to_string(), handler_type.to_string()),
            descriptor,
        );
    }

    /// Register a named implementation usable as an override.
    pub fn register_implementation(&mut self, descriptor: Arc<dyn HandlerDescriptor>) -> Result<(), CatalogError> {
        let name = descriptor.name().to_string();
        if self.implementations.contains_key(&name) {
            return Err(CatalogError::DuplicateHandler(name));
        }
        self.implementations.insert(name, descriptor);
        Ok(())
    }

    /// Describe a base table.
    pub fn register_base_table(&mut self, table: &str, info: BaseTableInfo) {
        self.tables.insert(table.to_string(), info);
    }
}

impl HandlerCatalog for InMemoryHandlerCatalog {
    fn lookup(
        &self,
        table: &str,
        field: &str,
        handler_type: &str,
        override_name: Option<&str>,
    ) -> Option<Arc<dyn HandlerDescriptor>> {
        if let Some(name) = override_name {
            if let Some(found) = self.implementations.get(name) {
                return Some(found.clone());
            }
            debug!(name, "override handler not registered, using column handler");
        }
        self.columns
            .get(&(table.to_string(), field.to_string(), handler_type.to_string()))
            .cloned()
    }

    fn base_table(&self, table: &str) -> Option<BaseTableInfo> {
        self.tables.get(table).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{GenericHandlerDescriptor, OptionPlugin};
    use crate::category::HandlerCategory;

    #[test]
    fn test_register_duplicate_plugin() {
        let mut catalog = InMemoryPluginCatalog::new();
        let grid = Arc::new(OptionPlugin::new(PluginInfo::new(PluginCategory::Style, "grid", "Grid")));
        catalog.register(grid.clone()).unwrap();
        let err = catalog.register(grid).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicatePlugin { .. }));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_names_filters_category_and_base() {
        let mut catalog = InMemoryPluginCatalog::new();
        catalog.insert(Arc::new(OptionPlugin::new(PluginInfo::new(PluginCategory::Style, "grid", "Grid"))));
        catalog.insert(Arc::new(OptionPlugin::new(
            PluginInfo::new(PluginCategory::Style, "user_list", "User list").with_base(&["users"]),
        )));
        catalog.insert(Arc::new(OptionPlugin::new(PluginInfo::new(PluginCategory::Row, "fields", "Fields"))));

        let names = catalog.names(PluginCategory::Style, "node");
        assert_eq!(names, vec![("grid".to_string(), "Grid".to_string())]);
        assert_eq!(catalog.names(PluginCategory::Style, "users").len(), 2);
    }

    #[test]
    fn test_builtins_cover_every_category() {
        let catalog = InMemoryPluginCatalog::with_builtins();
        for category in PluginCategory::ALL {
            assert!(!catalog.names(category, "node").is_empty(), "no {} plugins", category);
        }
        assert!(catalog.lookup(PluginCategory::Access, "none").is_some());
        assert!(catalog.lookup(PluginCategory::Style, "missing").is_none());
    }

    #[test]
    fn test_handler_override_lookup() {
        let mut catalog = InMemoryHandlerCatalog::new();
        catalog.register("node", "nid", "field", Arc::new(GenericHandlerDescriptor::new("field", HandlerCategory::Field)));
        catalog
            .register_implementation(Arc::new(GenericHandlerDescriptor::new("field_numeric", HandlerCategory::Field)))
            .unwrap();

        let nominal = catalog.lookup("node", "nid", "field", None).unwrap();
        assert_eq!(nominal.name(), "field");

        let overridden = catalog.lookup("node", "nid", "field", Some("field_numeric")).unwrap();
        assert_eq!(overridden.name(), "field_numeric");

        let fallback = catalog.lookup("node", "nid", "field", Some("field_unknown")).unwrap();
        assert_eq!(fallback.name(), "field");

        assert!(catalog.lookup("node", "title", "field", None).is_none());
    }

    #[test]
    fn test_handler_builtins_hold_overrides() {
        let mut catalog = InMemoryHandlerCatalog::with_builtins();
        let err = catalog
            .register_implementation(Arc::new(GenericHandlerDescriptor::new("field_numeric", HandlerCategory::Field)))
            .unwrap_err();
        assert_eq!(err, CatalogError::DuplicateHandler("field_numeric".to_string()));
        assert!(catalog.lookup("node", "nid", "field", Some("sort_group_by_numeric")).is_some());
    }
}
