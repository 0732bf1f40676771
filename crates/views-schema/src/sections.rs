//! Defaultable sections: option keys that defer or override together.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::kind::DisplayKind;

/// Errors raised when a section table is malformed.
///
/// A malformed table makes override toggling non-reversible, so hosts
/// treat these as fatal when a view is built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SectionError {
    #[error("option '{key}' belongs to both section '{first}' and section '{second}'")]
    Overlap {
        key: String,
        first: String,
        second: String,
    },

    #[error("section '{section}' lists '{key}' but the section of '{key}' does not match")]
    Asymmetric { section: String, key: String },

    #[error("section '{0}' has no keys")]
    Empty(String),
}

/// Standard section groups. The first key names the section.
const STANDARD_GROUPS: &[&[&str]] = &[
    &["access", "access_options"],
    &["cache", "cache_options"],
    &["title"],
    &["css_class"],
    &["use_ajax"],
    &["hide_attachment_summary"],
    &["hide_admin_links"],
    &["group_by"],
    &["query"],
    &["use_more", "use_more_always", "use_more_text"],
    &["link_display", "link_url"],
    // style and row cascade together
    &["style_plugin", "style_options", "row_plugin", "row_options"],
    &["pager", "pager_options"],
    &["exposed_form", "exposed_form_options"],
    &["header"],
    &["footer"],
    &["empty"],
    &["relationships"],
    &["fields"],
    &["sorts"],
    &["arguments"],
    &["filters", "filter_groups"],
];

/// Maps option keys to the section they move with.
///
/// Every member key of a section can be used to address it; the first key
/// of a group is its canonical name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionMap {
    groups: Vec<Vec<String>>,
    index: HashMap<String, usize>,
}

impl SectionMap {
    /// The section table for a display kind.
    ///
    /// Kinds that cannot page do not get a pager section.
    pub fn standard(kind: &DisplayKind) -> Self {
        let mut map = Self::default();
        for group in STANDARD_GROUPS {
            if !kind.use_pager && group[0] == "pager" {
                continue;
            }
            let keys: Vec<String> = group.iter().map(|k| k.to_string()).collect();
            map.push_unchecked(keys);
        }
        map
    }

    /// Build from explicit groups, rejecting keys listed in two groups.
    pub fn from_groups<I, G, S>(groups: I) -> Result<Self, SectionError>
    where
        I: IntoIterator<Item = G>,
        G: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map = Self::default();
        for group in groups {
            map.add_group(group.into_iter().map(Into::into).collect())?;
        }
        Ok(map)
    }

    /// Build from a key → member-keys mapping, the shape section tables
    /// are usually written in.
    ///
    /// Every key a section lists must itself map to exactly the same key
    /// set; anything else is rejected.
    pub fn from_mapping(mapping: &BTreeMap<String, Vec<String>>) -> Result<Self, SectionError> {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut map = Self::default();

        for (section, keys) in mapping {
            if keys.is_empty() {
                return Err(SectionError::Empty(section.clone()));
            }
            let members: BTreeSet<&str> = keys.iter().map(String::as_str).collect();
            if !members.contains(section.as_str()) {
                return Err(SectionError::Asymmetric {
                    section: section.clone(),
                    key: section.clone(),
                });
            }
            for key in keys {
                let other: BTreeSet<&str> = mapping
                    .get(key)
                    .map(|k| k.iter().map(String::as_str).collect())
                    .unwrap_or_default();
                if other != members {
                    return Err(SectionError::Asymmetric {
                        section: section.clone(),
                        key: key.clone(),
                    });
                }
            }
            if seen.insert(keys[0].as_str()) && !map.index.contains_key(&keys[0]) {
                map.add_group(keys.clone())?;
            }
        }
        Ok(map)
    }

    /// Merge another table in, rejecting overlapping keys.
    pub fn extend(&mut self, other: SectionMap) -> Result<(), SectionError> {
        for group in other.groups {
            self.add_group(group)?;
        }
        Ok(())
    }

    fn add_group(&mut self, keys: Vec<String>) -> Result<(), SectionError> {
        let Some(name) = keys.first().cloned() else {
            return Err(SectionError::Empty(String::new()));
        };
        for key in &keys {
            if let Some(existing) = self.index.get(key) {
                return Err(SectionError::Overlap {
                    key: key.clone(),
                    first: self.groups[*existing][0].clone(),
                    second: name,
                });
            }
        }
        self.push_unchecked(keys);
        Ok(())
    }

    fn push_unchecked(&mut self, mut keys: Vec<String>) {
        keys.dedup();
        let idx = self.groups.len();
        for key in &keys {
            self.index.insert(key.clone(), idx);
        }
        self.groups.push(keys);
    }

    /// Canonical name of the section a key moves with.
    pub fn section_for(&self, key: &str) -> Option<&str> {
        self.index.get(key).map(|idx| self.groups[*idx][0].as_str())
    }

    /// Every key of the section addressed by `section` (any member key).
    pub fn keys_in(&self, section: &str) -> Option<&[String]> {
        self.index.get(section).map(|idx| self.groups[*idx].as_slice())
    }

    /// Whether a key participates in defaulting.
    pub fn is_defaultable(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Canonical section names in table order.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g[0].as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> DisplayKind {
        DisplayKind::new("page").with_pager(true)
    }

    #[test]
    fn test_style_row_cascade() {
        let map = SectionMap::standard(&page());
        let keys = map.keys_in("row_options").unwrap();
        assert_eq!(keys, ["style_plugin", "style_options", "row_plugin", "row_options"]);
        assert_eq!(map.section_for("row_plugin"), Some("style_plugin"));
        assert_eq!(map.section_for("style_options"), Some("style_plugin"));
    }

    #[test]
    fn test_sections_are_symmetric() {
        let map = SectionMap::standard(&page());
        for section in map.sections() {
            let keys = map.keys_in(section).unwrap();
            for key in keys {
                assert_eq!(map.keys_in(key).unwrap(), keys);
            }
        }
    }

    #[test]
    fn test_unknown_key_has_no_section() {
        let map = SectionMap::standard(&page());
        assert!(map.section_for("display_comment").is_none());
        assert!(map.keys_in("enabled").is_none());
        assert!(!map.is_defaultable("path"));
    }

    #[test]
    fn test_no_pager_kind_drops_pager_section() {
        let map = SectionMap::standard(&DisplayKind::new("attachment"));
        assert!(map.keys_in("pager").is_none());
        assert!(map.keys_in("pager_options").is_none());
        assert!(map.keys_in("title").is_some());
    }

    #[test]
    fn test_from_groups_rejects_overlap() {
        let err = SectionMap::from_groups(vec![vec!["a", "b"], vec!["b", "c"]]).unwrap_err();
        assert_eq!(
            err,
            SectionError::Overlap {
                key: "b".to_string(),
                first: "a".to_string(),
                second: "b".to_string(),
            }
        );
    }

    #[test]
    fn test_from_mapping_symmetric() {
        let mut mapping = BTreeMap::new();
        mapping.insert("a".to_string(), vec!["a".to_string(), "b".to_string()]);
        mapping.insert("b".to_string(), vec!["a".to_string(), "b".to_string()]);
        mapping.insert("c".to_string(), vec!["c".to_string()]);

        let map = SectionMap::from_mapping(&mapping).unwrap();
        assert_eq!(map.section_for("b"), Some("a"));
        assert_eq!(map.keys_in("c").unwrap(), ["c"]);
        assert_eq!(map.sections().count(), 2);
    }

    #[test]
    fn test_from_mapping_rejects_asymmetry() {
        let mut mapping = BTreeMap::new();
        mapping.insert("a".to_string(), vec!["a".to_string(), "b".to_string()]);
        mapping.insert("b".to_string(), vec!["b".to_string()]);

        let err = SectionMap::from_mapping(&mapping).unwrap_err();
        assert!(matches!(err, SectionError::Asymmetric { .. }));
    }

    #[test]
    fn test_extend_rejects_overlap() {
        let mut map = SectionMap::standard(&page());
        let extra = SectionMap::from_groups(vec![vec!["title", "subtitle"]]).unwrap();
        assert!(map.extend(extra).is_err());

        let extra = SectionMap::from_groups(vec![vec!["path", "menu"]]).unwrap();
        map.extend(extra).unwrap();
        assert_eq!(map.section_for("menu"), Some("path"));
    }
}
