//! Handler contracts.

use std::fmt;

use serde_json::{Map, Value};

use crate::category::HandlerCategory;

/// What a handler is bound to when it is initialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerContext<'a> {
    pub view_name: &'a str,
    pub display_id: &'a str,
    /// Category the spec was stored under. Area handlers use it to know
    /// whether they render a header, a footer or empty text.
    pub category: HandlerCategory,
}

/// An initialized handler bound to one stored spec.
pub trait Handler: fmt::Debug {
    /// Spec id within its category.
    fn id(&self) -> &str;

    fn category(&self) -> HandlerCategory;

    /// Name of the implementation that was constructed. Differs from the
    /// nominal one when a group-by override was applied.
    fn implementation(&self) -> &str;

    /// The stored spec the handler was initialized with.
    fn options(&self) -> &Map<String, Value>;

    fn table(&self) -> &str {
        self.options().get("table").and_then(Value::as_str).unwrap_or_default()
    }

    fn field(&self) -> &str {
        self.options().get("field").and_then(Value::as_str).unwrap_or_default()
    }

    /// Administrative label, if one was configured.
    fn label(&self) -> Option<&str> {
        self.options()
            .get("label")
            .and_then(Value::as_str)
            .filter(|l| !l.is_empty())
    }

    /// Name shown in the UI when no label is set.
    fn ui_name(&self) -> String {
        format!("{}.{}", self.table(), self.field())
    }

    fn validate(&self) -> Vec<String> {
        Vec::new()
    }

    fn can_expose(&self) -> bool {
        false
    }

    fn is_exposed(&self) -> bool {
        self.options().get("exposed").and_then(Value::as_bool).unwrap_or(false)
    }

    /// Whether the exposed input is a grouped filter.
    fn is_a_group(&self) -> bool {
        self.options().get("is_grouped").and_then(Value::as_bool).unwrap_or(false)
    }

    /// Identifier of the exposed input.
    fn exposed_identifier(&self) -> Option<&str> {
        let block = if self.is_a_group() { "group_info" } else { "expose" };
        self.options()
            .get(block)
            .and_then(|b| b.get("identifier"))
            .and_then(Value::as_str)
    }

    /// Fields: whether the handler can be grouped on as a string.
    fn uses_string_group_by(&self) -> bool {
        true
    }

    /// Fields: whether the field is hidden from output.
    fn is_excluded(&self) -> bool {
        self.options().get("exclude").and_then(Value::as_bool).unwrap_or(false)
    }

    /// Field id of the relationship the handler goes through, if any.
    fn relationship(&self) -> Option<&str> {
        self.options()
            .get("relationship")
            .and_then(Value::as_str)
            .filter(|r| !r.is_empty() && *r != "none")
    }

    fn destroy(&self) {}
}

/// A registered handler implementation, able to build instances.
pub trait HandlerDescriptor: Send + Sync {
    /// Implementation name, e.g. `field_numeric`.
    fn name(&self) -> &str;

    fn initialize(&self, ctx: &HandlerContext<'_>, spec: &Map<String, Value>) -> Box<dyn Handler>;
}
