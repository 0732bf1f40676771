//! Handler construction and caching
//!
//! A display builds the handlers of a category on first use and keeps the
//! ordered result until that category is invalidated.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};
use views_registry::{Handler, HandlerCatalog, HandlerCategory, HandlerContext, PluginCategory};

use crate::display::Display;

/// Handlers of one category, in stored order.
#[derive(Default)]
pub struct HandlerSet {
    entries: Vec<(String, Rc<dyn Handler>)>,
}

impl fmt::Debug for HandlerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter().map(|(id, _)| id)).finish()
    }
}

impl HandlerSet {
    pub fn get(&self, id: &str) -> Option<Rc<dyn Handler>> {
        self.entries
            .iter()
            .find(|(key, _)| key == id)
            .map(|(_, handler)| handler.clone())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rc<dyn Handler>)> {
        self.entries.iter().map(|(id, handler)| (id.as_str(), handler))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-display cache of handler sets.
pub struct HandlerRegistry {
    catalog: Arc<dyn HandlerCatalog>,
    cache: RefCell<BTreeMap<HandlerCategory, Rc<HandlerSet>>>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("cached", &self.cache.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl HandlerRegistry {
    pub fn new(catalog: Arc<dyn HandlerCatalog>) -> Self {
        Self {
            catalog,
            cache: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn catalog(&self) -> &Arc<dyn HandlerCatalog> {
        &self.catalog
    }

    /// Handlers of `category` on `display`, built on first use.
    pub fn handlers_for(&self, display: &Display<'_>, category: HandlerCategory) -> Rc<HandlerSet> {
        if let Some(found) = self.cache.borrow().get(&category) {
            return found.clone();
        }
        let built = Rc::new(self.build(display, category));
        let display_id = display.id();
        debug!(
            display = %display_id,
            category = %category,
            count = built.len(),
            "handlers built"
        );
        self.cache.borrow_mut().insert(category, built.clone());
        built
    }

    fn build(&self, display: &Display<'_>, category: HandlerCategory) -> HandlerSet {
        let Some(Value::Object(specs)) = display.get_option(category.plural()) else {
            return HandlerSet::default();
        };

        let aggregation = if display.use_group_by() {
            display
                .get_plugin(PluginCategory::Query)
                .map(|query| query.aggregation_info())
        } else {
            None
        };

        let ctx = HandlerContext {
            view_name: display.view().name(),
            display_id: display.id(),
            category,
        };

        let mut entries = Vec::with_capacity(specs.len());
        for (id, spec) in specs {
            let Value::Object(spec) = spec else {
                let display_id = display.id();
                warn!(display = %display_id, category = %category, id = %id, "handler spec is not a map, skipping");
                continue;
            };
            let mut spec = spec.clone();
            spec.insert("id".to_string(), Value::String(id.clone()));

            let table = spec.get("table").and_then(Value::as_str).unwrap_or_default();
            let field = spec.get("field").and_then(Value::as_str).unwrap_or_default();

            let override_name = match (&aggregation, spec.get("group_type").and_then(Value::as_str)) {
                (Some(info), Some(group_type)) => info.override_for(group_type, category),
                _ => None,
            };

            let Some(descriptor) = self
                .catalog
                .lookup(table, field, category.handler_type(), override_name)
            else {
                let display_id = display.id();
                warn!(
                    display = %display_id,
                    category = %category,
                    id = %id,
                    table,
                    field,
                    "no handler for spec, skipping"
                );
                continue;
            };
            if let Some(name) = override_name {
                debug!(id = %id, handler = name, "group by override applied");
            }
            let handler: Rc<dyn Handler> = Rc::from(descriptor.initialize(&ctx, &spec));
            entries.push((id.clone(), handler));
        }
        HandlerSet { entries }
    }

    /// Forget one category; the next lookup rebuilds it.
    pub fn invalidate(&self, category: HandlerCategory) {
        if let Some(set) = self.cache.borrow_mut().remove(&category) {
            for (_, handler) in set.iter() {
                handler.destroy();
            }
        }
    }

    /// Forget every category.
    pub fn clear(&self) {
        let drained = std::mem::take(&mut *self.cache.borrow_mut());
        for set in drained.values() {
            for (_, handler) in set.iter() {
                handler.destroy();
            }
        }
    }

    pub fn is_cached(&self, category: HandlerCategory) -> bool {
        self.cache.borrow().contains_key(&category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_view;
    use serde_json::json;

    #[test]
    fn test_stored_order_kept() {
        let view = sample_view();
        let fields = view.display("default").unwrap().get_handlers(HandlerCategory::Field);
        let ids: Vec<&str> = fields.ids().collect();
        assert_eq!(ids, vec!["title", "name", "nid"]);
    }

    #[test]
    fn test_unconstructable_specs_skipped() {
        let mut view = sample_view();
        view.display_mut("default").unwrap().set_option(
            "sorts",
            json!({
                "created": {"table": "node", "field": "created"},
                "bogus": {"table": "node", "field": "nope"},
                "broken": "not a spec",
                "title": {"table": "node", "field": "title"}
            }),
        );
        let sorts = view.display("default").unwrap().get_handlers(HandlerCategory::Sort);
        assert_eq!(sorts.len(), 2);
        assert_eq!(sorts.ids().collect::<Vec<_>>(), vec!["created", "title"]);
    }

    #[test]
    fn test_same_set_until_invalidated() {
        let view = sample_view();
        let display = view.display("default").unwrap();
        let first = display.get_handlers(HandlerCategory::Field);
        let second = display.get_handlers(HandlerCategory::Field);
        assert!(Rc::ptr_eq(&first, &second));

        display.get_handlers(HandlerCategory::Filter);
        display.config().handlers.invalidate(HandlerCategory::Field);
        assert!(!display.config().handlers.is_cached(HandlerCategory::Field));
        assert!(display.config().handlers.is_cached(HandlerCategory::Filter));
        assert!(!Rc::ptr_eq(&first, &display.get_handlers(HandlerCategory::Field)));
    }

    #[test]
    fn test_group_by_override() {
        let mut view = sample_view();
        {
            let mut display = view.display_mut("default").unwrap();
            display.set_option("group_by", json!(true));
            display.set_option(
                "fields",
                json!({"nid": {"table": "node", "field": "nid", "group_type": "count"}}),
            );
        }
        let display = view.display("default").unwrap();
        let nid = display.get_handler(HandlerCategory::Field, "nid").unwrap();
        assert_eq!(nid.implementation(), "field_numeric");
    }

    #[test]
    fn test_group_type_ignored_without_group_by() {
        let mut view = sample_view();
        view.display_mut("default").unwrap().set_option(
            "fields",
            json!({"nid": {"table": "node", "field": "nid", "group_type": "count"}}),
        );
        let nid = view
            .display("default")
            .unwrap()
            .get_handler(HandlerCategory::Field, "nid")
            .unwrap();
        assert_eq!(nid.implementation(), "field");
    }
}
