//! Plugin resolution
//!
//! Each display owns one [`PluginResolver`]. Resolved instances are kept
//! per (category, name) for the lifetime of the display, so repeated
//! resolution hands out the same instance until its category is
//! invalidated or the cache is cleared.

mod cascade;
mod storage;

pub use cascade::{rule_for, CascadeRule, CASCADE_RULES};
pub use storage::{compose, compose_options, extract, PluginSelection};

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use tracing::{debug, warn};
use views_registry::builtin::BrokenPlugin;
use views_registry::{Plugin, PluginCatalog, PluginCategory, PluginContext};

use crate::display::Display;
use crate::settings::FallbackPlugins;

type PluginKey = (PluginCategory, String);

/// Per-display cache of resolved plugins.
pub struct PluginResolver {
    catalog: Arc<dyn PluginCatalog>,
    fallback: FallbackPlugins,
    cache: RefCell<HashMap<PluginKey, Rc<dyn Plugin>>>,
}

impl fmt::Debug for PluginResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginResolver")
            .field("fallback", &self.fallback)
            .field("cached", &self.cache.borrow().len())
            .finish()
    }
}

/// Binding for a plugin built on `display`.
pub(crate) fn plugin_context<'a>(display: &'a Display<'_>, localization_keys: Vec<String>) -> PluginContext<'a> {
    let view = display.view();
    PluginContext {
        view_name: view.name(),
        display_id: display.id(),
        base_table: view.base_table(),
        base_field: view.base_field(),
        localization_keys,
    }
}

impl PluginResolver {
    pub fn new(catalog: Arc<dyn PluginCatalog>, fallback: FallbackPlugins) -> Self {
        Self {
            catalog,
            fallback,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &Arc<dyn PluginCatalog> {
        &self.catalog
    }

    /// Name `category` resolves to on `display` when none is given.
    ///
    /// The query plugin follows the base table, every other category its
    /// stored selection.
    pub fn selected_name(&self, display: &Display<'_>, category: PluginCategory) -> Option<String> {
        match category {
            PluginCategory::Query => Some(
                display
                    .view()
                    .query_class()
                    .unwrap_or_else(|| self.fallback.name_for(PluginCategory::Query))
                    .to_string(),
            ),
            _ => extract(display, category).name,
        }
    }

    /// Resolve a plugin of `category`.
    ///
    /// Returns `None` when no name is stored or the catalog does not know
    /// it; callers decide what to fall back to.
    pub fn resolve(
        &self,
        display: &Display<'_>,
        category: PluginCategory,
        name: Option<&str>,
    ) -> Option<Rc<dyn Plugin>> {
        let name = match name {
            Some(name) => name.to_string(),
            None => self.selected_name(display, category)?,
        };
        let key = (category, name);

        if let Some(found) = self.cache.borrow().get(&key) {
            let display_id = display.id();
            debug!(display = %display_id, category = %category, name = %key.1, "plugin cache hit");
            return Some(found.clone());
        }

        let Some(descriptor) = self.catalog.lookup(category, &key.1) else {
            let display_id = display.id();
            debug!(display = %display_id, category = %category, name = %key.1, "plugin not found");
            return None;
        };

        let localization_keys = if category == PluginCategory::Query {
            let owner = if display.is_defaulted("query") { "default" } else { display.id() };
            vec![owner.to_string(), category.as_str().to_string()]
        } else {
            Vec::new()
        };
        let options = extract(display, category).options;
        let ctx = plugin_context(display, localization_keys);

        let display_id = display.id();
        debug!(display = %display_id, category = %category, name = %key.1, "initializing plugin");
        let plugin: Rc<dyn Plugin> = Rc::from(descriptor.initialize(&ctx, options));
        self.cache.borrow_mut().insert(key, plugin.clone());
        Some(plugin)
    }

    /// Resolve a plugin, or stand something in for it.
    ///
    /// An unknown selection falls back to the configured fallback plugin;
    /// if even that is missing a [`BrokenPlugin`] is returned.
    pub fn resolve_or_fallback(&self, display: &Display<'_>, category: PluginCategory) -> Rc<dyn Plugin> {
        if let Some(plugin) = self.resolve(display, category, None) {
            return plugin;
        }
        let requested = self.selected_name(display, category).unwrap_or_default();
        let fallback = self.fallback.name_for(category);
        let display_id = display.id();
        warn!(
            display = %display_id,
            category = %category,
            requested = %requested,
            fallback,
            "plugin not available, using fallback"
        );
        if let Some(plugin) = self.resolve(display, category, Some(fallback)) {
            return plugin;
        }
        Rc::new(BrokenPlugin::new(category, &requested))
    }

    /// Tear down and forget the resolved instances of one category.
    ///
    /// Instances of other categories stay cached.
    pub fn invalidate(&self, category: PluginCategory) {
        let dropped: Vec<Rc<dyn Plugin>> = {
            let mut cache = self.cache.borrow_mut();
            let keys: Vec<PluginKey> = cache.keys().filter(|(c, _)| *c == category).cloned().collect();
            keys.into_iter().filter_map(|key| cache.remove(&key)).collect()
        };
        if !dropped.is_empty() {
            debug!(category = %category, dropped = dropped.len(), "plugin cache invalidated");
        }
        for plugin in dropped {
            plugin.destroy();
        }
    }

    /// Tear down and forget every resolved instance.
    pub fn clear(&self) {
        let drained: Vec<Rc<dyn Plugin>> = self.cache.borrow_mut().drain().map(|(_, p)| p).collect();
        for plugin in drained {
            plugin.destroy();
        }
    }

    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{engine_with, sample_stored, sample_view, sample_view_with};
    use serde_json::json;

    #[test]
    fn test_same_instance_within_display() {
        let view = sample_view();
        let page = view.display("page_1").unwrap();
        let first = page.get_plugin(PluginCategory::Style).unwrap();
        let second = page.get_plugin(PluginCategory::Style).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_displays_do_not_share_instances() {
        let view = sample_view();
        let page = view.display("page_1").unwrap().get_plugin(PluginCategory::Style).unwrap();
        let block = view.display("block_1").unwrap().get_plugin(PluginCategory::Style).unwrap();
        assert_eq!(page.name(), block.name());
        assert!(!Rc::ptr_eq(&page, &block));
    }

    #[test]
    fn test_query_binds_base_table_and_localization() {
        let view = sample_view();
        let query = view.display("page_1").unwrap().get_plugin(PluginCategory::Query).unwrap();
        assert_eq!(query.name(), "views_query");
        assert_eq!(query.localization_keys(), ["default", "query"]);

        let own = view.display("default").unwrap().get_plugin(PluginCategory::Query).unwrap();
        assert_eq!(own.localization_keys(), ["default", "query"]);
    }

    #[test]
    fn test_missing_plugin_resolves_to_none_and_falls_back() {
        let view = sample_view_with(json!({"style_plugin": "carousel"}));
        let display = view.display("default").unwrap();
        assert!(display.get_plugin(PluginCategory::Style).is_none());
        let fallback = display.plugin_or_fallback(PluginCategory::Style);
        assert_eq!(fallback.name(), "default");
    }

    #[test]
    fn test_broken_when_fallback_missing() {
        let engine = engine_with(json!({"fallback": {"access": "gone"}}));
        let mut view = engine.load_view(&sample_stored()).unwrap();
        view.display_mut("default")
            .unwrap()
            .set_option("access", json!({"type": "missing"}));
        let plugin = view.display("default").unwrap().plugin_or_fallback(PluginCategory::Access);
        assert_eq!(plugin.info().title, "Missing access plugin");
    }

    #[test]
    fn test_invalidate_keeps_other_categories() {
        let view = sample_view();
        let page = view.display("page_1").unwrap();
        let style = page.get_plugin(PluginCategory::Style).unwrap();
        let pager = page.get_plugin(PluginCategory::Pager).unwrap();

        page.config().plugins.invalidate(PluginCategory::Pager);

        assert!(Rc::ptr_eq(&style, &page.get_plugin(PluginCategory::Style).unwrap()));
        assert!(!Rc::ptr_eq(&pager, &page.get_plugin(PluginCategory::Pager).unwrap()));
    }

    #[test]
    fn test_clear_rebuilds() {
        let view = sample_view();
        let page = view.display("page_1").unwrap();
        let first = page.get_plugin(PluginCategory::Pager).unwrap();
        assert!(!page.config().plugins.is_empty());
        page.config().plugins.clear();
        let second = page.get_plugin(PluginCategory::Pager).unwrap();
        assert!(!Rc::ptr_eq(&first, &second));
    }
}
