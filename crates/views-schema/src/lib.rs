//! Static option tables for views displays.
//!
//! Everything in this crate is pure data plus pure functions:
//! - [`OptionSchema`]: every recognized display option with its default value,
//!   its nested keys and how it is exported.
//! - [`SectionMap`]: which option keys move together when a display stops or
//!   starts deferring to the default display.
//! - [`unpack_options`]: merges stored option data over schema defaults.

mod kind;
mod merge;
mod option;
mod schema;
mod sections;

pub use kind::{DisplayKind, DEFAULT_KIND};
pub use merge::{deep_merge, merge_layers, unpack_options};
pub use option::{OptionEntry, SerializationHint};
pub use schema::{OptionSchema, DEFAULTS_KEY};
pub use sections::{SectionError, SectionMap};
