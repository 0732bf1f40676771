//! Engine settings
//!
//! Settings are merged from three layers, lowest precedence first:
//! 1. Built-in defaults
//! 2. An optional TOML settings file
//! 3. Explicit JSON overrides (CLI flags, tests)

mod defaults;

pub use defaults::{BuiltinSettings, FallbackPlugins};

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::info;
use views_schema::{merge_layers, DisplayKind, SectionError, SectionMap, DEFAULT_KIND};

/// Origin of a settings layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SettingsOrigin {
    Builtin,
    File,
    Overrides,
}

/// A contributing settings layer with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsSource {
    pub origin: SettingsOrigin,

    /// File path (None for builtin/overrides)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for builtin/overrides)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Switches for the unpack cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnpackCacheSettings {
    pub enabled: bool,
}

/// Settings errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, Deserialize)]
struct SettingsDoc {
    display_kinds: BTreeMap<String, DisplayKind>,
    unpack_cache: UnpackCacheSettings,
    fallback: FallbackPlugins,
    #[serde(default)]
    sections: BTreeMap<String, Vec<String>>,
}

/// Effective engine settings with provenance.
#[derive(Debug, Clone, Serialize)]
pub struct EngineSettings {
    /// Known display kinds by id
    pub display_kinds: BTreeMap<String, DisplayKind>,

    pub unpack_cache: UnpackCacheSettings,

    pub fallback: FallbackPlugins,

    /// Extra sections added to every display's section table
    pub sections: BTreeMap<String, Vec<String>>,

    /// Contributing layers in precedence order
    pub sources: Vec<SettingsSource>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            display_kinds: DisplayKind::builtin()
                .into_iter()
                .map(|k| (k.id.clone(), k))
                .collect(),
            unpack_cache: UnpackCacheSettings { enabled: true },
            fallback: FallbackPlugins::default(),
            sections: BTreeMap::new(),
            sources: vec![SettingsSource {
                origin: SettingsOrigin::Builtin,
                path: None,
                digest: None,
            }],
        }
    }
}

impl EngineSettings {
    /// Build settings from layers
    pub fn build(settings_path: Option<&Path>, overrides: Option<Value>) -> Result<Self, SettingsError> {
        let mut layers = Vec::new();
        let mut sources = Vec::new();

        // Layer 1: Built-in defaults
        layers.push(BuiltinSettings::new().to_value());
        sources.push(SettingsSource {
            origin: SettingsOrigin::Builtin,
            path: None,
            digest: None,
        });

        // Layer 2: Settings file
        if let Some(path) = settings_path {
            let (value, digest) = Self::load_toml_file(path)?;
            info!(path = %path.display(), digest = %digest, "loaded settings file");
            layers.push(value);
            sources.push(SettingsSource {
                origin: SettingsOrigin::File,
                path: Some(path.to_string_lossy().to_string()),
                digest: Some(digest),
            });
        }

        // Layer 3: Overrides
        if let Some(overrides) = overrides {
            layers.push(overrides);
            sources.push(SettingsSource {
                origin: SettingsOrigin::Overrides,
                path: None,
                digest: None,
            });
        }

        let merged = merge_layers(layers);
        let doc: SettingsDoc =
            serde_json::from_value(merged).map_err(|e| SettingsError::ParseError(e.to_string()))?;

        let display_kinds = doc
            .display_kinds
            .into_iter()
            .map(|(id, mut kind)| {
                kind.id = id.clone();
                if kind.title.is_empty() {
                    kind.title = id.clone();
                }
                (id, kind)
            })
            .collect();

        let settings = Self {
            display_kinds,
            unpack_cache: doc.unpack_cache,
            fallback: doc.fallback,
            sections: doc.sections,
            sources,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Load and parse a TOML file, returning the value and digest
    fn load_toml_file(path: &Path) -> Result<(Value, String), SettingsError> {
        let bytes = fs::read(path).map_err(|e| SettingsError::IoError(e.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let contents = String::from_utf8(bytes)
            .map_err(|e| SettingsError::ParseError(format!("Invalid UTF-8: {}", e)))?;

        let toml_value: toml::Value = toml::from_str(&contents)
            .map_err(|e| SettingsError::ParseError(format!("TOML parse error: {}", e)))?;

        Ok((Self::toml_to_json(toml_value), digest))
    }

    /// Convert TOML Value to JSON Value
    fn toml_to_json(toml: toml::Value) -> Value {
        match toml {
            toml::Value::String(s) => Value::String(s),
            toml::Value::Integer(i) => Value::Number(i.into()),
            toml::Value::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(dt) => Value::String(dt.to_string()),
            toml::Value::Array(arr) => Value::Array(arr.into_iter().map(Self::toml_to_json).collect()),
            toml::Value::Table(table) => Value::Object(
                table
                    .into_iter()
                    .map(|(k, v)| (k, Self::toml_to_json(v)))
                    .collect(),
            ),
        }
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if !self.display_kinds.contains_key(DEFAULT_KIND) {
            return Err(SettingsError::ValidationError(format!(
                "display kind '{}' must be defined",
                DEFAULT_KIND
            )));
        }
        if !self.sections.is_empty() {
            SectionMap::from_mapping(&self.sections)
                .map_err(|e| SettingsError::ValidationError(e.to_string()))?;
        }
        Ok(())
    }

    /// Look up a display kind.
    pub fn kind(&self, id: &str) -> Option<&DisplayKind> {
        self.display_kinds.get(id)
    }

    /// Section table for a kind: the standard groups plus configured extras.
    pub fn section_map(&self, kind: &DisplayKind) -> Result<SectionMap, SectionError> {
        let mut map = SectionMap::standard(kind);
        if !self.sections.is_empty() {
            map.extend(SectionMap::from_mapping(&self.sections)?)?;
        }
        Ok(map)
    }

    /// Digest of the settings file, if one was loaded.
    pub fn file_digest(&self) -> Option<&str> {
        self.sources
            .iter()
            .find(|s| s.origin == SettingsOrigin::File)
            .and_then(|s| s.digest.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_only() {
        let settings = EngineSettings::build(None, None).unwrap();
        assert!(settings.unpack_cache.enabled);
        assert_eq!(settings.kind("page").unwrap().id, "page");
        assert!(settings.kind("default").unwrap().is_default());
        assert_eq!(settings.sources.len(), 1);
        assert!(settings.file_digest().is_none());
    }

    #[test]
    fn test_file_layer_overrides_builtin() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[unpack_cache]
enabled = false

[display_kinds.rss]
use_pager = true
has_path = true

[fallback]
style = "list"
"#
        )
        .unwrap();

        let settings = EngineSettings::build(Some(file.path()), None).unwrap();
        assert!(!settings.unpack_cache.enabled);
        assert_eq!(settings.fallback.style, "list");
        assert_eq!(settings.fallback.row, "fields");

        let rss = settings.kind("rss").unwrap();
        assert_eq!(rss.id, "rss");
        assert_eq!(rss.title, "rss");
        assert!(rss.has_path);
        assert!(settings.kind("page").is_some());
        assert_eq!(settings.file_digest().unwrap().len(), 64);
    }

    #[test]
    fn test_overrides_win() {
        let settings = EngineSettings::build(
            None,
            Some(json!({"unpack_cache": {"enabled": false}, "display_kinds": {"block": {"use_more": false}}})),
        )
        .unwrap();
        assert!(!settings.unpack_cache.enabled);
        assert!(!settings.kind("block").unwrap().use_more);
        // sibling keys of the same kind are kept
        assert!(settings.kind("block").unwrap().use_pager);
        assert_eq!(settings.sources.last().unwrap().origin, SettingsOrigin::Overrides);
    }

    #[test]
    fn test_asymmetric_sections_rejected() {
        let err = EngineSettings::build(
            None,
            Some(json!({"sections": {"exposed_block": ["exposed_block", "field_language"]}})),
        )
        .unwrap_err();
        assert!(matches!(err, SettingsError::ValidationError(_)));
    }

    #[test]
    fn test_extra_section_extends_table() {
        let settings = EngineSettings::build(
            None,
            Some(json!({"sections": {
                "field_language": ["field_language", "field_language_add_to_query"],
                "field_language_add_to_query": ["field_language", "field_language_add_to_query"]
            }})),
        )
        .unwrap();
        let page = settings.kind("page").unwrap().clone();
        let map = settings.section_map(&page).unwrap();
        assert_eq!(map.section_for("field_language_add_to_query"), Some("field_language"));
        assert_eq!(map.section_for("title"), Some("title"));
    }

    #[test]
    fn test_overlapping_extra_section_fails_table() {
        let settings = EngineSettings::build(
            None,
            Some(json!({"sections": {"title": ["title"]}})),
        )
        .unwrap();
        let page = settings.kind("page").unwrap().clone();
        assert!(matches!(settings.section_map(&page), Err(SectionError::Overlap { .. })));
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = EngineSettings::build(Some(Path::new("/nonexistent/views.toml")), None).unwrap_err();
        assert!(matches!(err, SettingsError::IoError(_)));
    }
}
