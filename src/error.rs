//! Errors raised while building or editing a view.
//!
//! Only configuration mistakes are errors. Bad stored data and names that do
//! not resolve degrade instead (see `DisplayConfig::initialize`).

use views_schema::SectionError;

use crate::settings::SettingsError;

/// Fatal problems with a view or a request made against it.
#[derive(Debug, thiserror::Error)]
pub enum DisplayError {
    #[error("display '{0}' defers to a default display but the view has none")]
    MissingDefault(String),

    #[error("display id '{0}' is used more than once")]
    DuplicateId(String),

    #[error("display '{display}' uses unknown display kind '{kind}'")]
    UnknownKind { display: String, kind: String },

    #[error("no display '{0}' in this view")]
    NoSuchDisplay(String),

    #[error("'{0}' is not a form section")]
    UnknownSection(String),

    #[error("invalid section table: {0}")]
    Section(#[from] SectionError),

    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
