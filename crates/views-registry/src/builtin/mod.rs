//! Built-in plugins and handler implementations.
//!
//! These cover every plugin category so a display always has something to
//! resolve, plus the numeric handlers aggregation swaps in.

mod handlers;
mod plugins;

pub use handlers::{handler_implementations, GenericHandler, GenericHandlerDescriptor};
pub use plugins::{plugins, sql_aggregation, BrokenPlugin, ConfiguredPlugin, OptionPlugin, PluginBehavior};
