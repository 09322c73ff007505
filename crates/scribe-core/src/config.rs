//! Editor configuration.
//!
//! Options are grouped by the object they configure: [`DocumentOptions`] are read when a
//! document and its buffer are created, [`ViewOptions`] when an
//! [`EditModel`](crate::EditModel) attaches to a document. Both load from TOML and every field
//! is optional:
//!
//! ```toml
//! [document]
//! undo_limit = 500
//! line_ending = "crlf"
//!
//! [view]
//! caret_period_ms = 0
//! fold_display_text_style = "boxed"
//! ```

use crate::edit_model::{Bidirectional, FoldDisplayTextStyle};
use crate::line_ending::LineEnding;
use crate::model_state::UndoSelectionHistory;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Failure to read or write a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration: {0}")]
    /// The file could not be read.
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    /// The TOML text does not describe a configuration.
    Parse(#[from] toml::de::Error),
    #[error("cannot serialize configuration: {0}")]
    /// The configuration could not be written as TOML.
    Serialize(#[from] toml::ser::Error),
}

/// Options applied to a new document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentOptions {
    /// Maximum number of retained undo actions.
    pub undo_limit: usize,
    /// Maximum byte length of one coalesced typing action.
    pub coalesce_limit: usize,
    /// Whether edits are logged for undo.
    pub collect_undo: bool,
    /// Create the buffer without a lexical style layer.
    pub styles_none: bool,
    /// Line ending used when saving.
    pub line_ending: LineEnding,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            undo_limit: 1000,
            coalesce_limit: 256,
            collect_undo: true,
            styles_none: false,
            line_ending: LineEnding::Lf,
        }
    }
}

/// Options applied to a new view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewOptions {
    /// Whether undo and redo restore the selection (and scroll position).
    pub undo_selection_history: UndoSelectionHistory,
    /// Caret blink period in milliseconds; `0` disables blinking.
    pub caret_period_ms: u64,
    /// Width of a tab stop in columns.
    pub tab_width: usize,
    /// How fold display text is shown after contracted lines.
    pub fold_display_text_style: FoldDisplayTextStyle,
    /// Text shown after contracted lines that have no text of their own.
    pub default_fold_display_text: Option<String>,
    /// Bidirectional text mode.
    pub bidirectional: Bidirectional,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            undo_selection_history: UndoSelectionHistory::Enabled,
            caret_period_ms: 500,
            tab_width: 8,
            fold_display_text_style: FoldDisplayTextStyle::Hidden,
            default_fold_display_text: None,
            bidirectional: Bidirectional::Disabled,
        }
    }
}

/// Complete editor configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Document options.
    pub document: DocumentOptions,
    /// View options.
    pub view: ViewOptions,
}

impl EditorConfig {
    /// Parse a TOML configuration; missing fields take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML configuration file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(target: "scribe.document", path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Render the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_gives_defaults() {
        let config = EditorConfig::from_toml_str("").unwrap();
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.document.undo_limit, 1000);
        assert_eq!(config.view.caret_period_ms, 500);
    }

    #[test]
    fn test_partial_sections() {
        let config = EditorConfig::from_toml_str(
            r#"
            [document]
            undo_limit = 20
            line_ending = "crlf"

            [view]
            undo_selection_history = "scroll"
            default_fold_display_text = "..."
            "#,
        )
        .unwrap();
        assert_eq!(config.document.undo_limit, 20);
        assert_eq!(config.document.line_ending, LineEnding::Crlf);
        assert!(config.document.collect_undo);
        assert_eq!(config.view.undo_selection_history, UndoSelectionHistory::Scroll);
        assert_eq!(config.view.default_fold_display_text.as_deref(), Some("..."));
        assert_eq!(config.view.tab_width, 8);
    }

    #[test]
    fn test_bad_value_is_reported() {
        let err = EditorConfig::from_toml_str("[document]\nundo_limit = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
