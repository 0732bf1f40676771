//! Plugin and handler catalogs for views displays.
//!
//! This crate holds the contracts a display needs from the outside world:
//! - [`PluginCategory`] / [`HandlerCategory`]: the closed sets of things a
//!   display resolves by name, with their storage shapes.
//! - [`Plugin`] / [`Handler`]: the resolved strategy objects.
//! - [`PluginCatalog`] / [`HandlerCatalog`]: global lookup by name.
//!
//! In-memory catalogs and a built-in plugin set are provided so hosts and
//! tests can wire a display without any external registry.

pub mod builtin;
mod catalog;
mod category;
mod handler;
mod plugin;

pub use catalog::{
    BaseTableInfo, CatalogError, HandlerCatalog, InMemoryHandlerCatalog, InMemoryPluginCatalog,
    PluginCatalog,
};
pub use category::{HandlerCategory, PluginCategory, StorageShape};
pub use handler::{Handler, HandlerContext, HandlerDescriptor};
pub use plugin::{
    Account, AggregateFunction, AggregationInfo, FieldError, Plugin, PluginContext,
    PluginDescriptor, PluginInfo,
};
