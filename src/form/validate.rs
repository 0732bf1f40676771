use std::sync::OnceLock;

use regex_lite::Regex;
use serde_json::Value;
use tracing::warn;
use views_registry::FieldError;

use super::{section_def, submitted, SectionKind};
use crate::display::Display;
use crate::error::DisplayError;

const CSS_CLASS_INVALID: &str = r"[^a-zA-Z0-9_ -]";
const DISPLAY_ID_INVALID: &str = r"[^a-z0-9_]";

static CSS_CLASS_RE: OnceLock<Option<Regex>> = OnceLock::new();
static DISPLAY_ID_RE: OnceLock<Option<Regex>> = OnceLock::new();

/// Compile `pattern` once per process.
fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(pattern, error = %e, "bad validation pattern");
            None
        }
    })
    .as_ref()
}

/// Whether `value` contains a character matched by the pattern in `cell`.
fn has_invalid(cell: &'static OnceLock<Option<Regex>>, pattern: &str, value: &str) -> bool {
    compiled(cell, pattern).is_some_and(|re| re.is_match(value))
}

fn submitted_str<'a>(values: &'a Value, key: &str) -> &'a str {
    submitted(values, key).and_then(Value::as_str).unwrap_or_default()
}

impl<'v> Display<'v> {
    /// Check submitted values for `section`.
    ///
    /// An empty result means the values may be committed.
    pub fn validate_form(&self, section: &str, values: &Value) -> Result<Vec<FieldError>, DisplayError> {
        let def = section_def(self, section)?;
        let mut errors = Vec::new();

        match def.kind {
            SectionKind::DisplayTitle => {
                if submitted_str(values, "display_title").trim().is_empty() {
                    errors.push(FieldError::new("display_title", "Display title may not be empty."));
                }
            }
            SectionKind::Text("css_class") => {
                let css = submitted_str(values, "css_class");
                if has_invalid(&CSS_CLASS_RE, CSS_CLASS_INVALID, css) {
                    errors.push(FieldError::new("css_class", "CSS classes must be alphanumeric or dashes only."));
                }
            }
            SectionKind::DisplayId => {
                let id = submitted_str(values, "display_id");
                if id.is_empty() {
                    errors.push(FieldError::new("display_id", "Display name must not be empty."));
                } else if has_invalid(&DISPLAY_ID_RE, DISPLAY_ID_INVALID, id) {
                    errors.push(FieldError::new(
                        "display_id",
                        "Display name must be letters, numbers, or underscores only.",
                    ));
                } else if self.view().displays().any(|d| d.id() != self.id() && d.id() == id) {
                    errors.push(FieldError::new("display_id", "Display id should be unique."));
                }
            }
            SectionKind::PluginOptions(category) => {
                if let Some(plugin) = self.get_plugin(category) {
                    errors.extend(plugin.validate_options(values).into_iter().map(|e| {
                        FieldError::new(&format!("{}.{}", section, e.field), e.message)
                    }));
                }
            }
            _ => {}
        }
        Ok(errors)
    }
}
