//! Display configuration
//!
//! A [`DisplayConfig`] owns one display's unpacked options, its deferral
//! flags and its plugin/handler caches. It is always reached through its
//! [`View`](crate::View), because deferred options live on the view's default
//! display:
//! - [`Display`] is the read handle (effective values, resolution).
//! - [`DisplayMut`] is the write handle (set, override, toggle).

mod capabilities;
mod init;
mod options;

pub use init::DisplayInit;

use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::{Map, Value};
use views_registry::{Handler, HandlerCategory, Plugin, PluginCategory};
use views_schema::{DisplayKind, OptionSchema, SectionMap};

use crate::handler::{HandlerRegistry, HandlerSet};
use crate::mirror::OptionsMirror;
use crate::plugin::PluginResolver;
use crate::view::View;

/// One display of a view.
#[derive(Debug)]
pub struct DisplayConfig {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) position: i64,
    pub(crate) kind: DisplayKind,
    pub(crate) schema: OptionSchema,
    pub(crate) sections: SectionMap,
    /// Unpacked options stored on this display.
    pub(crate) options: Map<String, Value>,
    /// Deferral flag per section name (`true` = read from the default display).
    pub(crate) deferred: BTreeMap<String, bool>,
    /// Id of the default display; `None` on the default display itself.
    pub(crate) default_ref: Option<String>,
    pub(crate) mirror: OptionsMirror,
    pub(crate) pending_id: Option<String>,
    /// Option paths that were repaired while unpacking.
    pub(crate) repaired: Vec<String>,
    pub(crate) plugins: PluginResolver,
    pub(crate) handlers: HandlerRegistry,
}

impl DisplayConfig {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn kind(&self) -> &DisplayKind {
        &self.kind
    }

    pub fn schema(&self) -> &OptionSchema {
        &self.schema
    }

    pub fn sections(&self) -> &SectionMap {
        &self.sections
    }

    pub fn mirror(&self) -> &OptionsMirror {
        &self.mirror
    }

    /// New id requested through the `display_id` form, not yet applied.
    pub fn pending_id(&self) -> Option<&str> {
        self.pending_id.as_deref()
    }

    /// Option paths that fell back to their defaults while unpacking.
    pub fn repaired(&self) -> &[String] {
        &self.repaired
    }

    /// Deferral flags keyed by section name.
    pub fn deferral_flags(&self) -> &BTreeMap<String, bool> {
        &self.deferred
    }

    pub fn is_default_display(&self) -> bool {
        self.kind.is_default()
    }

    /// Whether `key` reads through to the default display.
    pub(crate) fn defers(&self, key: &str) -> bool {
        if self.is_default_display() || self.default_ref.is_none() {
            return false;
        }
        let Some(section) = self.sections.section_for(key) else {
            return false;
        };
        self.deferred.get(section).copied().unwrap_or(true)
    }

    /// Tear down cached plugin and handler instances.
    pub fn destroy(&self) {
        self.plugins.clear();
        self.handlers.clear();
    }
}

/// Read handle on one display of a view.
#[derive(Debug, Clone, Copy)]
pub struct Display<'v> {
    pub(crate) view: &'v View,
    pub(crate) config: &'v DisplayConfig,
}

impl<'v> Display<'v> {
    pub fn id(&self) -> &'v str {
        &self.config.id
    }

    pub fn title(&self) -> &'v str {
        &self.config.title
    }

    pub fn kind(&self) -> &'v DisplayKind {
        &self.config.kind
    }

    pub fn config(&self) -> &'v DisplayConfig {
        self.config
    }

    pub fn view(&self) -> &'v View {
        self.view
    }

    pub fn is_default_display(&self) -> bool {
        self.config.is_default_display()
    }

    /// The display deferred options are read from.
    pub fn default_display(&self) -> Option<Display<'v>> {
        self.config
            .default_ref
            .as_deref()
            .and_then(|id| self.view.display(id))
    }

    /// Resolve a plugin of `category` by its stored selection.
    pub fn get_plugin(&self, category: PluginCategory) -> Option<Rc<dyn Plugin>> {
        self.config.plugins.resolve(self, category, None)
    }

    /// Resolve a plugin of `category` by explicit name.
    pub fn get_plugin_named(&self, category: PluginCategory, name: &str) -> Option<Rc<dyn Plugin>> {
        self.config.plugins.resolve(self, category, Some(name))
    }

    /// Resolve a plugin, falling back to the configured fallback plugin or
    /// a broken placeholder.
    pub fn plugin_or_fallback(&self, category: PluginCategory) -> Rc<dyn Plugin> {
        self.config.plugins.resolve_or_fallback(self, category)
    }

    /// Handlers of one category in stored order.
    pub fn get_handlers(&self, category: HandlerCategory) -> Rc<HandlerSet> {
        self.config.handlers.handlers_for(self, category)
    }

    pub fn get_handler(&self, category: HandlerCategory, id: &str) -> Option<Rc<dyn Handler>> {
        self.get_handlers(category).get(id)
    }
}

/// Write handle on one display of a view.
#[derive(Debug)]
pub struct DisplayMut<'v> {
    pub(crate) view: &'v mut View,
    pub(crate) index: usize,
}

impl<'v> DisplayMut<'v> {
    pub(crate) fn config(&self) -> &DisplayConfig {
        &self.view.displays[self.index]
    }

    pub(crate) fn config_mut(&mut self) -> &mut DisplayConfig {
        &mut self.view.displays[self.index]
    }

    /// Read access to the same display.
    pub fn as_display(&self) -> Display<'_> {
        Display {
            view: self.view,
            config: &self.view.displays[self.index],
        }
    }

    pub fn id(&self) -> &str {
        &self.config().id
    }

    /// Drop the cached handlers of one category.
    pub fn invalidate_handlers(&self, category: HandlerCategory) {
        self.config().handlers.invalidate(category);
    }

    /// Drop the cached plugin instances of one category.
    pub fn invalidate_plugins(&self, category: PluginCategory) {
        self.config().plugins.invalidate(category);
    }

    /// Drop every cached plugin instance.
    pub fn clear_plugin_cache(&self) {
        self.config().plugins.clear();
    }
}
