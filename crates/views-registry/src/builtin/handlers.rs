//! Generic handler implementation.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::category::HandlerCategory;
use crate::handler::{Handler, HandlerContext, HandlerDescriptor};

/// A handler that keeps its stored spec and nothing else.
#[derive(Debug, Clone)]
pub struct GenericHandler {
    id: String,
    category: HandlerCategory,
    implementation: String,
    options: Map<String, Value>,
}

impl Handler for GenericHandler {
    fn id(&self) -> &str {
        &self.id
    }

    fn category(&self) -> HandlerCategory {
        self.category
    }

    fn implementation(&self) -> &str {
        &self.implementation
    }

    fn options(&self) -> &Map<String, Value> {
        &self.options
    }

    fn validate(&self) -> Vec<String> {
        if self.field().is_empty() {
            vec![format!("{} '{}' has no field.", self.category.short_title(), self.id)]
        } else {
            Vec::new()
        }
    }

    fn can_expose(&self) -> bool {
        matches!(self.category, HandlerCategory::Filter | HandlerCategory::Sort)
    }

    fn is_exposed(&self) -> bool {
        self.can_expose() && self.options.get("exposed").and_then(Value::as_bool).unwrap_or(false)
    }

    fn uses_string_group_by(&self) -> bool {
        !self.implementation.ends_with("_numeric")
    }
}

/// Builds [`GenericHandler`]s under a fixed implementation name.
#[derive(Debug, Clone)]
pub struct GenericHandlerDescriptor {
    name: String,
    category: HandlerCategory,
}

impl GenericHandlerDescriptor {
    pub fn new(name: &str, category: HandlerCategory) -> Self {
        Self {
            name: name.to_string(),
            category,
        }
    }
}

impl HandlerDescriptor for GenericHandlerDescriptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&self, ctx: &HandlerContext<'_>, spec: &Map<String, Value>) -> Box<dyn Handler> {
        let id = spec.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
        // Area handlers are shared by header, footer and empty text.
        let category = if self.category.handler_type() == ctx.category.handler_type() {
            ctx.category
        } else {
            self.category
        };
        Box::new(GenericHandler {
            id,
            category,
            implementation: self.name.clone(),
            options: spec.clone(),
        })
    }
}

/// Named implementations swapped in by aggregation.
pub fn handler_implementations() -> Vec<Arc<dyn HandlerDescriptor>> {
    [
        ("field_numeric", HandlerCategory::Field),
        ("filter_group_by_numeric", HandlerCategory::Filter),
        ("sort_group_by_numeric", HandlerCategory::Sort),
        ("argument_group_by_numeric", HandlerCategory::Argument),
    ]
    .into_iter()
    .map(|(name, category)| Arc::new(GenericHandlerDescriptor::new(name, category)) as Arc<dyn HandlerDescriptor>)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_initialize_keeps_spec() {
        let descriptor = GenericHandlerDescriptor::new("filter_string", HandlerCategory::Filter);
        let ctx = HandlerContext {
            view_name: "frontpage",
            display_id: "default",
            category: HandlerCategory::Filter,
        };
        let handler = descriptor.initialize(
            &ctx,
            &spec(json!({
                "id": "title",
                "table": "node",
                "field": "title",
                "exposed": true,
                "expose": {"identifier": "title"}
            })),
        );
        assert_eq!(handler.id(), "title");
        assert_eq!(handler.ui_name(), "node.title");
        assert!(handler.is_exposed());
        assert_eq!(handler.exposed_identifier(), Some("title"));
        assert!(handler.validate().is_empty());
    }

    #[test]
    fn test_area_handler_takes_context_category() {
        let descriptor = GenericHandlerDescriptor::new("area_text", HandlerCategory::Header);
        let ctx = HandlerContext {
            view_name: "frontpage",
            display_id: "default",
            category: HandlerCategory::Footer,
        };
        let handler = descriptor.initialize(&ctx, &spec(json!({"id": "area", "table": "views", "field": "area"})));
        assert_eq!(handler.category(), HandlerCategory::Footer);
        assert!(!handler.can_expose());
    }

    #[test]
    fn test_numeric_implementations() {
        let names: Vec<String> = handler_implementations().iter().map(|d| d.name().to_string()).collect();
        assert!(names.contains(&"field_numeric".to_string()));
        assert_eq!(names.len(), 4);

        let ctx = HandlerContext {
            view_name: "v",
            display_id: "default",
            category: HandlerCategory::Field,
        };
        let handler = handler_implementations()[0].initialize(&ctx, &spec(json!({"id": "nid", "field": "nid"})));
        assert!(!handler.uses_string_group_by());
    }
}
