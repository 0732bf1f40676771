//! Views, their stored form, and the engine that loads them.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;
use views_registry::{
    HandlerCatalog, HandlerCategory, InMemoryHandlerCatalog, InMemoryPluginCatalog, PluginCatalog,
    PluginCategory, StorageShape,
};

use crate::cache::UnpackCache;
use crate::display::{Display, DisplayConfig, DisplayInit, DisplayMut};
use crate::error::DisplayError;
use crate::mirror::MirrorWrite;
use crate::settings::EngineSettings;

fn default_base_table() -> String {
    "node".to_string()
}

/// A display as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDisplay {
    pub id: String,
    /// Display kind id.
    pub display_plugin: String,
    #[serde(default)]
    pub display_title: String,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub display_options: Map<String, Value>,
}

/// A view as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredView {
    pub name: String,
    #[serde(default = "default_base_table")]
    pub base_table: String,
    /// Primary field of the base table; looked up in the handler catalog
    /// when empty.
    #[serde(default)]
    pub base_field: String,
    #[serde(default)]
    pub display: Vec<StoredDisplay>,
}

impl StoredView {
    pub fn from_json(json: &str) -> Result<Self, DisplayError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Request for the host to show another form section next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormRequest {
    pub display_id: String,
    pub section: String,
}

impl FormRequest {
    pub fn new(display_id: &str, section: &str) -> Self {
        Self {
            display_id: display_id.to_string(),
            section: section.to_string(),
        }
    }
}

/// Loads views against one set of settings and catalogs.
pub struct Engine {
    settings: EngineSettings,
    plugins: Arc<dyn PluginCatalog>,
    handlers: Arc<dyn HandlerCatalog>,
    unpack_cache: UnpackCache,
}

impl Engine {
    pub fn new(settings: EngineSettings, plugins: Arc<dyn PluginCatalog>, handlers: Arc<dyn HandlerCatalog>) -> Self {
        let unpack_cache = UnpackCache::new(settings.unpack_cache.enabled);
        Self {
            settings,
            plugins,
            handlers,
            unpack_cache,
        }
    }

    /// An engine with the built-in plugins and override handlers.
    pub fn with_builtins(settings: EngineSettings) -> Self {
        Self::new(
            settings,
            Arc::new(InMemoryPluginCatalog::with_builtins()),
            Arc::new(InMemoryHandlerCatalog::with_builtins()),
        )
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn plugin_catalog(&self) -> &Arc<dyn PluginCatalog> {
        &self.plugins
    }

    pub fn handler_catalog(&self) -> &Arc<dyn HandlerCatalog> {
        &self.handlers
    }

    pub fn unpack_cache(&self) -> &UnpackCache {
        &self.unpack_cache
    }

    /// Swap the plugin catalog. Memoized unpacks are dropped.
    pub fn set_plugin_catalog(&mut self, plugins: Arc<dyn PluginCatalog>) {
        self.plugins = plugins;
        self.unpack_cache.invalidate();
    }

    /// Swap the handler catalog. Memoized unpacks are dropped.
    pub fn set_handler_catalog(&mut self, handlers: Arc<dyn HandlerCatalog>) {
        self.handlers = handlers;
        self.unpack_cache.invalidate();
    }

    /// Swap the settings. Starts a fresh unpack cache.
    pub fn set_settings(&mut self, settings: EngineSettings) {
        self.unpack_cache.invalidate();
        self.unpack_cache = UnpackCache::new(settings.unpack_cache.enabled);
        self.settings = settings;
    }

    /// Load a view for rendering.
    pub fn load_view(&self, stored: &StoredView) -> Result<View, DisplayError> {
        self.build_view(stored, false)
    }

    /// Load a view for editing. Unpacking bypasses the shared cache.
    pub fn edit_view(&self, stored: &StoredView) -> Result<View, DisplayError> {
        self.build_view(stored, true)
    }

    fn build_view(&self, stored: &StoredView, editing: bool) -> Result<View, DisplayError> {
        let mut seen = HashSet::new();
        for display in &stored.display {
            if !seen.insert(display.id.as_str()) {
                return Err(DisplayError::DuplicateId(display.id.clone()));
            }
        }

        let mut resolved = Vec::with_capacity(stored.display.len());
        for display in &stored.display {
            let kind = self
                .settings
                .kind(&display.display_plugin)
                .cloned()
                .ok_or_else(|| DisplayError::UnknownKind {
                    display: display.id.clone(),
                    kind: display.display_plugin.clone(),
                })?;
            resolved.push((display, kind));
        }

        let default_id = resolved
            .iter()
            .find(|(_, kind)| kind.is_default())
            .map(|(display, _)| display.id.clone());

        // default display first, the rest by position
        resolved.sort_by_key(|(display, kind)| (!kind.is_default(), display.position));

        let cache = if editing { None } else { Some(&self.unpack_cache) };
        let mut displays = Vec::with_capacity(resolved.len());
        for (display, kind) in resolved {
            if !kind.is_default() && default_id.is_none() {
                return Err(DisplayError::MissingDefault(display.id.clone()));
            }
            let sections = self.settings.section_map(&kind)?;
            displays.push(DisplayConfig::initialize(
                display,
                DisplayInit {
                    kind,
                    sections,
                    default_ref: default_id.clone(),
                    cache,
                    plugins: self.plugins.clone(),
                    handlers: self.handlers.clone(),
                    fallback: self.settings.fallback.clone(),
                },
            ));
        }

        let table_info = self.handlers.base_table(&stored.base_table);
        let base_field = if stored.base_field.is_empty() {
            table_info.as_ref().map(|t| t.field.clone()).unwrap_or_default()
        } else {
            stored.base_field.clone()
        };

        info!(
            view = %stored.name,
            displays = displays.len(),
            editing,
            "view loaded"
        );

        Ok(View {
            name: stored.name.clone(),
            base_table: stored.base_table.clone(),
            base_field,
            query_class: table_info.and_then(|t| t.query_class),
            editing,
            displays,
            form_stack: Vec::new(),
        })
    }
}

/// A loaded view: its displays plus edit-session state.
#[derive(Debug)]
pub struct View {
    name: String,
    base_table: String,
    base_field: String,
    query_class: Option<String>,
    editing: bool,
    pub(crate) displays: Vec<DisplayConfig>,
    form_stack: Vec<FormRequest>,
}

/// Plugin category whose stored selection or settings live under `key`.
fn plugin_category_for(key: &str) -> Option<PluginCategory> {
    PluginCategory::ALL.into_iter().find(|category| match category.storage() {
        StorageShape::Split { selector, options } => key == selector || key == options,
        StorageShape::Legacy { key: k } | StorageShape::Nested { key: k } => key == k,
    })
}

impl View {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_table(&self) -> &str {
        &self.base_table
    }

    pub fn base_field(&self) -> &str {
        &self.base_field
    }

    /// Query plugin the base table asks for, if any.
    pub fn query_class(&self) -> Option<&str> {
        self.query_class.as_deref()
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.displays.iter().position(|d| d.id == id)
    }

    pub(crate) fn default_index(&self) -> Option<usize> {
        self.displays.iter().position(DisplayConfig::is_default_display)
    }

    pub fn display(&self, id: &str) -> Option<Display<'_>> {
        self.index_of(id).map(|index| Display {
            view: self,
            config: &self.displays[index],
        })
    }

    pub fn display_mut(&mut self, id: &str) -> Option<DisplayMut<'_>> {
        self.index_of(id).map(|index| DisplayMut { view: self, index })
    }

    pub fn default_display(&self) -> Option<Display<'_>> {
        self.default_index().map(|index| Display {
            view: self,
            config: &self.displays[index],
        })
    }

    /// Every display, default display first.
    pub fn displays(&self) -> impl Iterator<Item = Display<'_>> {
        self.displays.iter().map(move |config| Display { view: self, config })
    }

    pub fn display_ids(&self) -> impl Iterator<Item = &str> {
        self.displays.iter().map(|d| d.id.as_str())
    }

    /// Form sections the host should show next, oldest first.
    pub fn form_stack(&self) -> &[FormRequest] {
        &self.form_stack
    }

    pub(crate) fn push_form_request(&mut self, request: FormRequest) {
        if !self.form_stack.contains(&request) {
            self.form_stack.push(request);
        }
    }

    pub fn take_form_stack(&mut self) -> Vec<FormRequest> {
        std::mem::take(&mut self.form_stack)
    }

    /// Drop cached instances that may have been built from `key` on the
    /// display at `target` or on any display deferring `key` to it.
    pub(crate) fn after_write(&self, target: usize, key: &str) {
        let target_is_default = self.displays[target].is_default_display();
        for (index, config) in self.displays.iter().enumerate() {
            if index != target && !(target_is_default && config.defers(key)) {
                continue;
            }
            if let Some(category) = HandlerCategory::from_plural(key) {
                config.handlers.invalidate(category);
            } else if key == "group_by" || key == "query" {
                config.handlers.clear();
            }
            if let Some(category) = plugin_category_for(key) {
                config.plugins.invalidate(category);
            }
        }
    }

    /// Collect every display's recorded writes for the persistence layer.
    pub fn drain_writes(&mut self) -> Vec<MirrorWrite> {
        self.displays
            .iter_mut()
            .flat_map(|d| d.mirror.drain_writes())
            .collect()
    }

    /// The view as it would be persisted now.
    pub fn to_stored(&self) -> StoredView {
        StoredView {
            name: self.name.clone(),
            base_table: self.base_table.clone(),
            base_field: self.base_field.clone(),
            display: self
                .displays
                .iter()
                .map(|d| StoredDisplay {
                    id: d.id.clone(),
                    display_plugin: d.kind.id.clone(),
                    display_title: d.title.clone(),
                    position: d.position,
                    display_options: d.mirror.values().clone(),
                })
                .collect(),
        }
    }

    /// Tear down every display's cached instances.
    pub fn destroy(self) {
        for display in &self.displays {
            display.destroy();
        }
        info!(view = %self.name, "view destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{engine, sample_stored, sample_view};
    use serde_json::json;

    #[test]
    fn test_default_display_first() {
        let view = sample_view();
        let ids: Vec<&str> = view.display_ids().collect();
        assert_eq!(ids[0], "default");
        assert_eq!(ids.len(), 4);
        assert_eq!(view.base_field(), "nid");
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut stored = sample_stored();
        let copy = stored.display[1].clone();
        stored.display.push(copy);
        assert!(matches!(engine().load_view(&stored), Err(DisplayError::DuplicateId(_))));
    }

    #[test]
    fn test_missing_default_rejected() {
        let mut stored = sample_stored();
        stored.display.retain(|d| d.display_plugin != "default");
        assert!(matches!(engine().load_view(&stored), Err(DisplayError::MissingDefault(_))));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let mut stored = sample_stored();
        stored.display[1].display_plugin = "carousel".to_string();
        assert!(matches!(engine().load_view(&stored), Err(DisplayError::UnknownKind { .. })));
    }

    #[test]
    fn test_edit_view_bypasses_cache() {
        let engine = engine();
        engine.edit_view(&sample_stored()).unwrap();
        assert!(engine.unpack_cache().is_empty());

        engine.load_view(&sample_stored()).unwrap();
        assert!(!engine.unpack_cache().is_empty());
    }

    #[test]
    fn test_catalog_swap_invalidates_cache() {
        let mut engine = engine();
        engine.load_view(&sample_stored()).unwrap();
        engine.set_plugin_catalog(Arc::new(InMemoryPluginCatalog::with_builtins()));
        assert!(engine.unpack_cache().is_empty());
        assert_eq!(engine.unpack_cache().generation(), 1);
    }

    #[test]
    fn test_to_stored_reflects_writes() {
        let mut view = sample_view();
        view.display_mut("page_1")
            .unwrap()
            .override_option("title", json!("Recent content"));
        let stored = view.to_stored();
        let page = stored.display.iter().find(|d| d.id == "page_1").unwrap();
        assert_eq!(page.display_options["title"], "Recent content");
        assert_eq!(page.display_options["defaults"]["title"], false);

        let writes = view.drain_writes();
        assert!(writes
            .iter()
            .any(|w| w.path == "display.page_1.display_options.title"));
        assert!(view.drain_writes().is_empty());
    }

    #[test]
    fn test_plugin_category_for_storage_keys() {
        assert_eq!(plugin_category_for("style_options"), Some(PluginCategory::Style));
        assert_eq!(plugin_category_for("row_plugin"), Some(PluginCategory::Row));
        assert_eq!(plugin_category_for("access"), Some(PluginCategory::Access));
        assert_eq!(plugin_category_for("pager"), Some(PluginCategory::Pager));
        assert_eq!(plugin_category_for("title"), None);
    }

    #[test]
    fn test_stored_view_json() {
        let stored = StoredView::from_json(
            r#"{"name": "frontpage", "display": [{"id": "default", "display_plugin": "default"}]}"#,
        )
        .unwrap();
        assert_eq!(stored.base_table, "node");
        assert!(stored.display[0].display_options.is_empty());
    }
}
