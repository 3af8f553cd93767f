//! Format records.
//!
//! Every format is a struct of optional keys. An unset key means "inherit"
//! and is never serialized, so an empty record compares equal to
//! `Default::default()`.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Character-level formatting of a segment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SegmentFormat {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_color: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strikethrough: Option<bool>,
    /// `super` or `sub`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub super_or_sub_script: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub letter_spacing: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_height: Option<SmolStr>,
}

impl SegmentFormat {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn bold() -> Self {
        Self {
            font_weight: Some(SmolStr::new_static("bold")),
            ..Default::default()
        }
    }

    pub fn is_bold(&self) -> bool {
        self.font_weight.as_deref().is_some_and(is_bold_weight)
    }

    /// Copy every set key of `other` over `self`.
    pub fn merge(&mut self, other: &SegmentFormat) {
        merge_opt(&mut self.font_family, &other.font_family);
        merge_opt(&mut self.font_size, &other.font_size);
        merge_opt(&mut self.text_color, &other.text_color);
        merge_opt(&mut self.background_color, &other.background_color);
        merge_opt(&mut self.font_weight, &other.font_weight);
        merge_opt(&mut self.italic, &other.italic);
        merge_opt(&mut self.underline, &other.underline);
        merge_opt(&mut self.strikethrough, &other.strikethrough);
        merge_opt(&mut self.super_or_sub_script, &other.super_or_sub_script);
        merge_opt(&mut self.letter_spacing, &other.letter_spacing);
        merge_opt(&mut self.line_height, &other.line_height);
    }

    pub fn merged(&self, other: &SegmentFormat) -> SegmentFormat {
        let mut out = self.clone();
        out.merge(other);
        out
    }
}

pub fn is_bold_weight(weight: &str) -> bool {
    matches!(
        weight.trim(),
        "bold" | "bolder" | "600" | "700" | "800" | "900"
    )
}

/// Block-level box formatting shared by paragraphs, containers, tables,
/// cells, list levels and dividers. Each block kind only registers the
/// handlers that make sense for it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BlockFormat {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<SmolStr>,
    /// `start`, `center`, `end` or `justify`; `start`/`end` follow direction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_align: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_top: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_right: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_bottom: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_left: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding_top: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding_right: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding_bottom: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding_left: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_top: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_right: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_bottom: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_left: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_collapse: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_height: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub white_space: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_indent: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertical_align: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_style_type: Option<SmolStr>,
}

impl BlockFormat {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn is_rtl(&self) -> bool {
        self.direction.as_deref() == Some("rtl")
    }
}

/// Attributes of a hyperlink decoration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LinkFormat {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rel: Option<SmolStr>,
    /// Named anchor (`<a name>`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<SmolStr>,
}

impl LinkFormat {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Box formatting of an image.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImageFormat {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_width: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub float: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertical_align: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border: Option<SmolStr>,
}

impl ImageFormat {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn merge_opt<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
    if let Some(value) = source {
        *target = Some(value.clone());
    }
}
