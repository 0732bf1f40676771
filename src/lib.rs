//! Views display engine
//!
//! Displays of a view either store their own options or defer, section by
//! section, to the view's default display. This crate resolves effective
//! option values through those deferrals, resolves and caches the plugins
//! and handlers a display is configured with, and keeps a persisted mirror
//! of every write.
//!
//! Entry points:
//! - [`Engine`] loads a [`StoredView`] into a [`View`].
//! - [`Display`] / [`DisplayMut`] read and write one display.
//! - [`form`] and [`export`] expose the form lifecycle and export data.

pub mod cache;
pub mod display;
pub mod error;
pub mod export;
pub mod form;
pub mod handler;
pub mod mirror;
pub mod plugin;
pub mod settings;
pub mod view;

pub use display::{Display, DisplayConfig, DisplayMut};
pub use error::DisplayError;
pub use export::{DisplayExport, ExportItem};
pub use form::{FormField, FormSection};
pub use handler::{HandlerRegistry, HandlerSet};
pub use mirror::{MirrorWrite, OptionsMirror};
pub use plugin::PluginResolver;
pub use settings::{EngineSettings, SettingsError};
pub use view::{Engine, FormRequest, StoredDisplay, StoredView, View};
