//! Building a display from stored data.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};
use views_registry::{HandlerCatalog, PluginCatalog};
use views_schema::{unpack_options, DisplayKind, OptionSchema, SectionMap, DEFAULTS_KEY};

use super::DisplayConfig;
use crate::cache::{unpack_key, UnpackCache, Unpacked};
use crate::handler::HandlerRegistry;
use crate::mirror::OptionsMirror;
use crate::plugin::PluginResolver;
use crate::settings::FallbackPlugins;
use crate::view::StoredDisplay;

/// Everything a display needs besides its stored data.
pub struct DisplayInit<'a> {
    pub kind: DisplayKind,
    pub sections: SectionMap,
    /// Id of the view's default display (ignored for the default display).
    pub default_ref: Option<String>,
    /// Shared unpack cache; `None` while editing.
    pub cache: Option<&'a UnpackCache>,
    pub plugins: Arc<dyn PluginCatalog>,
    pub handlers: Arc<dyn HandlerCatalog>,
    pub fallback: FallbackPlugins,
}

impl DisplayConfig {
    /// Unpack stored options over the schema defaults.
    ///
    /// Never fails: options stored with the wrong shape fall back to their
    /// defaults and are listed in [`DisplayConfig::repaired`].
    pub fn initialize(stored: &StoredDisplay, init: DisplayInit<'_>) -> Self {
        let DisplayInit {
            kind,
            sections,
            default_ref,
            cache,
            plugins,
            handlers,
            fallback,
        } = init;

        let mut raw = stored.display_options.clone();
        let default_ref = if kind.is_default() {
            // the default display cannot defer
            raw.remove(DEFAULTS_KEY);
            None
        } else {
            default_ref
        };

        let schema = OptionSchema::for_kind(&kind);
        let previous = schema.defaults_value();

        let unpack = || {
            let mut options = previous.clone();
            let repaired = unpack_options(&mut options, &raw, schema.entries());
            Unpacked { options, repaired }
        };

        let Unpacked { mut options, repaired } = match (cache, unpack_key(&previous, &raw)) {
            (Some(cache), Some(key)) => cache.get_or_insert_with(&key, unpack).0,
            _ => {
                debug!(display = %stored.id, "unpacking without cache");
                unpack()
            }
        };

        for path in &repaired {
            warn!(display = %stored.id, option = %path, "stored option has the wrong shape, using default");
        }

        let stored_flags = raw.get(DEFAULTS_KEY).and_then(Value::as_object);
        let deferred = match options.remove(DEFAULTS_KEY) {
            Some(Value::Object(flags)) => section_flags(&sections, &flags, stored_flags),
            _ => BTreeMap::new(),
        };

        Self {
            id: stored.id.clone(),
            title: stored.display_title.clone(),
            position: stored.position,
            mirror: OptionsMirror::new(&stored.id, raw),
            kind,
            schema,
            sections,
            options,
            deferred,
            default_ref,
            pending_id: None,
            repaired,
            plugins: PluginResolver::new(plugins, fallback),
            handlers: HandlerRegistry::new(handlers),
        }
    }
}

/// One deferral flag per section, keyed by section name.
///
/// A stored flag for the section name wins, then a stored flag for any other
/// member key, then the kind's default. Stored maps that disagree within a
/// section therefore still move the whole section together.
fn section_flags(
    sections: &SectionMap,
    unpacked: &Map<String, Value>,
    stored: Option<&Map<String, Value>>,
) -> BTreeMap<String, bool> {
    sections
        .sections()
        .filter_map(|section| {
            let keys = sections.keys_in(section)?;
            let flag = stored
                .and_then(|flags| keys.iter().find_map(|key| flags.get(key)))
                .or_else(|| keys.iter().find_map(|key| unpacked.get(key)))?;
            Some((section.to_string(), flag_value(flag)))
        })
        .collect()
}

fn flag_value(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().unwrap_or(0) != 0,
        Value::String(s) => !s.is_empty() && s != "0",
        _ => false,
    }
}
