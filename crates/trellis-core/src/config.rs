//! Editor configuration.

use serde::{Deserialize, Serialize};

use crate::error::EditorError;
use crate::model::SegmentFormat;

/// Runtime options of an `Editor`, loadable from camelCase JSON.
///
/// ```json
/// { "defaultSegmentFormat": { "fontFamily": "Arial" }, "undoDepth": 50 }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorOptions {
    /// Format every parsed segment inherits.
    pub default_segment_format: SegmentFormat,
    /// Maximum number of undo snapshots kept.
    pub undo_depth: usize,
    /// Keep the model between transactions and patch it from DOM mutations.
    /// When off, every transaction re-parses.
    pub enable_cache: bool,
    /// Reuse unchanged block elements on write-back.
    pub reuse_cached_elements: bool,
    /// Run the inline optimizer after writing.
    pub optimize: bool,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            default_segment_format: SegmentFormat::default(),
            undo_depth: 100,
            enable_cache: true,
            reuse_cached_elements: true,
            optimize: true,
        }
    }
}

impl EditorOptions {
    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let options =
            EditorOptions::from_json(r#"{"undoDepth": 5, "defaultSegmentFormat": {"fontSize": "12pt"}}"#)
                .unwrap();
        assert_eq!(options.undo_depth, 5);
        assert!(options.enable_cache);
        assert_eq!(options.default_segment_format.font_size.as_deref(), Some("12pt"));
    }

    #[test]
    fn test_bad_json_is_config_error() {
        let err = EditorOptions::from_json("{").unwrap_err();
        assert!(matches!(err, EditorError::Config(_)));
    }
}
