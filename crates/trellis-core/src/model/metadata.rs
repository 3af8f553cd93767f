//! `data-*` attributes and structured editing metadata.
//!
//! Metadata that has no HTML/CSS equivalent is JSON-encoded into the
//! `editing-info` dataset key (`data-editing-info` in HTML) and read back on
//! the next parse.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// `data-*` attributes of an element, keyed without the `data-` prefix.
pub type Dataset = BTreeMap<SmolStr, String>;

pub const EDITING_INFO_KEY: &str = "editing-info";

/// Decode the metadata blob. Malformed JSON is logged and ignored.
pub fn get_metadata<T: DeserializeOwned>(dataset: &Dataset) -> Option<T> {
    let raw = dataset.get(EDITING_INFO_KEY)?;
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(target: "trellis::parse", %err, raw = %raw, "ignoring malformed editing metadata");
            None
        }
    }
}

/// Read-modify-write the metadata blob. Returning `None` from `update`
/// removes it.
pub fn update_metadata<T, F>(dataset: &mut Dataset, update: F) -> Option<T>
where
    T: Serialize + DeserializeOwned + Clone,
    F: FnOnce(Option<T>) -> Option<T>,
{
    let current = get_metadata(dataset);
    let next = update(current);
    match &next {
        Some(value) => match serde_json::to_string(value) {
            Ok(json) => {
                dataset.insert(SmolStr::new_static(EDITING_INFO_KEY), json);
            }
            Err(err) => {
                tracing::warn!(target: "trellis::format", %err, "cannot encode editing metadata");
            }
        },
        None => {
            dataset.remove(EDITING_INFO_KEY);
        }
    }
    next
}

/// Table-wide styling choices.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableMetadata {
    pub has_header_row: bool,
    pub has_first_column: bool,
    pub has_banded_rows: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_row_color: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banded_row_color: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<SmolStr>,
}

/// Per-cell overrides that survive re-application of table metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableCellMetadata {
    pub bg_color_override: bool,
    pub border_override: bool,
}

/// Bullet/number style choice of a list level.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordered_style_type: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unordered_style_type: Option<u8>,
}

impl ListMetadata {
    /// CSS `list-style-type` for this metadata at `depth`. Without an
    /// explicit choice the style cycles by depth.
    pub fn list_style_type(&self, ordered: bool, depth: usize) -> &'static str {
        const ORDERED: &[&str] = &["decimal", "lower-alpha", "lower-roman"];
        const UNORDERED: &[&str] = &["disc", "circle", "square"];
        let (styles, chosen) = if ordered {
            (ORDERED, self.ordered_style_type)
        } else {
            (UNORDERED, self.unordered_style_type)
        };
        let index = chosen.map(usize::from).unwrap_or(depth) % styles.len();
        styles[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_roundtrip_through_dataset() {
        let mut dataset = Dataset::new();
        update_metadata(&mut dataset, |_: Option<TableMetadata>| {
            Some(TableMetadata {
                has_header_row: true,
                ..Default::default()
            })
        });
        assert_eq!(
            dataset.get(EDITING_INFO_KEY).map(String::as_str),
            Some(r#"{"hasHeaderRow":true,"hasFirstColumn":false,"hasBandedRows":false}"#)
        );
        let meta: TableMetadata = get_metadata(&dataset).unwrap();
        assert!(meta.has_header_row);

        update_metadata(&mut dataset, |_: Option<TableMetadata>| None);
        assert!(dataset.is_empty());
    }

    #[test]
    fn test_malformed_metadata_ignored() {
        let mut dataset = Dataset::new();
        dataset.insert(EDITING_INFO_KEY.into(), "{not json".into());
        assert_eq!(get_metadata::<TableCellMetadata>(&dataset), None);
    }

    #[test]
    fn test_list_style_cycles_by_depth() {
        let meta = ListMetadata::default();
        assert_eq!(meta.list_style_type(true, 0), "decimal");
        assert_eq!(meta.list_style_type(true, 1), "lower-alpha");
        assert_eq!(meta.list_style_type(false, 3), "disc");
        let chosen = ListMetadata {
            unordered_style_type: Some(2),
            ..Default::default()
        };
        assert_eq!(chosen.list_style_type(false, 0), "square");
    }
}
