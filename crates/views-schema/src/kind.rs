//! Display kinds (page, block, feed, ...)

use serde::{Deserialize, Serialize};

/// Kind id of the display every other display falls back to.
pub const DEFAULT_KIND: &str = "default";

/// Static capabilities of a display kind.
///
/// The kind decides which options exist (no pager options for kinds that
/// cannot page) and a handful of behaviours such as whether the display has
/// its own path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayKind {
    /// Kind identifier ("page", "block", ...). Filled from the settings key.
    #[serde(default)]
    pub id: String,

    /// Human readable name.
    #[serde(default)]
    pub title: String,

    /// Whether displays of this kind can carry a pager.
    #[serde(default)]
    pub use_pager: bool,

    /// Whether displays of this kind can render a "more" link.
    #[serde(default)]
    pub use_more: bool,

    /// Whether attachments may be attached to displays of this kind.
    #[serde(default)]
    pub accept_attachments: bool,

    /// Whether displays of this kind own a path.
    #[serde(default)]
    pub has_path: bool,

    /// Whether displays of this kind allow AJAX at all.
    #[serde(default = "default_true")]
    pub uses_ajax: bool,
}

fn default_true() -> bool {
    true
}

impl DisplayKind {
    /// Create a kind with every capability switched off.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            title: id.to_string(),
            use_pager: false,
            use_more: false,
            accept_attachments: false,
            has_path: false,
            uses_ajax: true,
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn with_pager(mut self, use_pager: bool) -> Self {
        self.use_pager = use_pager;
        self
    }

    pub fn with_more(mut self, use_more: bool) -> Self {
        self.use_more = use_more;
        self
    }

    pub fn with_attachments(mut self, accept: bool) -> Self {
        self.accept_attachments = accept;
        self
    }

    pub fn with_path(mut self, has_path: bool) -> Self {
        self.has_path = has_path;
        self
    }

    pub fn with_ajax(mut self, uses_ajax: bool) -> Self {
        self.uses_ajax = uses_ajax;
        self
    }

    /// Is this the kind of the shared default display?
    pub fn is_default(&self) -> bool {
        self.id == DEFAULT_KIND
    }

    /// Displays without a path link through another display.
    pub fn uses_link_display(&self) -> bool {
        !self.has_path
    }

    /// Only displays with a path can move their exposed form into a block.
    pub fn uses_exposed_form_in_block(&self) -> bool {
        self.has_path
    }

    /// The kinds known without any settings file.
    pub fn builtin() -> Vec<DisplayKind> {
        vec![
            DisplayKind::new(DEFAULT_KIND)
                .with_title("Master")
                .with_pager(true)
                .with_more(true)
                .with_attachments(true),
            DisplayKind::new("page")
                .with_title("Page")
                .with_pager(true)
                .with_more(true)
                .with_attachments(true)
                .with_path(true),
            DisplayKind::new("block")
                .with_title("Block")
                .with_pager(true)
                .with_more(true)
                .with_attachments(true),
            DisplayKind::new("feed")
                .with_title("Feed")
                .with_pager(true)
                .with_path(true)
                .with_ajax(false),
            DisplayKind::new("attachment")
                .with_title("Attachment")
                .with_more(true),
            DisplayKind::new("embed")
                .with_title("Embed")
                .with_pager(true)
                .with_more(true)
                .with_attachments(true),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_kinds() {
        let kinds = DisplayKind::builtin();
        assert!(kinds[0].is_default());
        assert_eq!(kinds.iter().filter(|k| k.is_default()).count(), 1);

        let feed = kinds.iter().find(|k| k.id == "feed").unwrap();
        assert!(feed.has_path);
        assert!(!feed.uses_ajax);
        assert!(!feed.uses_link_display());
        assert!(feed.uses_exposed_form_in_block());
    }

    #[test]
    fn test_deserialize_defaults() {
        let kind: DisplayKind = serde_json::from_str(r#"{"use_pager": true}"#).unwrap();
        assert!(kind.use_pager);
        assert!(kind.uses_ajax);
        assert!(!kind.has_path);
        assert!(kind.id.is_empty());
    }
}
