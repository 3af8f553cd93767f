//! Segments: the inline units of a paragraph.

use serde::{Deserialize, Serialize};
use trellis_dom::FragmentNode;

use super::dom_ref::DomRef;
use super::entity::ContentModelEntity;
use super::format::{ImageFormat, LinkFormat, SegmentFormat};
use super::metadata::Dataset;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "segmentType")]
pub enum ContentModelSegment {
    Text(ContentModelText),
    Image(ContentModelImage),
    Br(ContentModelBr),
    SelectionMarker(ContentModelSelectionMarker),
    General(ContentModelGeneralSegment),
    Entity(ContentModelEntity),
}

/// Hyperlink decoration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Link {
    pub format: LinkFormat,
    #[serde(skip_serializing_if = "Dataset::is_empty")]
    pub dataset: Dataset,
}

/// Inline code decoration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Code {
    #[serde(skip_serializing_if = "SegmentFormat::is_empty")]
    pub format: SegmentFormat,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentModelText {
    pub text: String,
    #[serde(skip_serializing_if = "SegmentFormat::is_empty")]
    pub format: SegmentFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<Code>,
    #[serde(skip_serializing_if = "is_false")]
    pub is_selected: bool,
    /// Text node this segment lives in, plus its offset there.
    #[serde(skip)]
    pub dom_ref: DomRef,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentModelImage {
    pub src: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "SegmentFormat::is_empty")]
    pub format: SegmentFormat,
    #[serde(skip_serializing_if = "ImageFormat::is_empty")]
    pub image_format: ImageFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
    #[serde(skip_serializing_if = "Dataset::is_empty")]
    pub dataset: Dataset,
    #[serde(skip_serializing_if = "is_false")]
    pub is_selected: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub is_selected_as_image_selection: bool,
    #[serde(skip)]
    pub dom_ref: DomRef,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentModelBr {
    #[serde(skip_serializing_if = "SegmentFormat::is_empty")]
    pub format: SegmentFormat,
    #[serde(skip_serializing_if = "is_false")]
    pub is_selected: bool,
    #[serde(skip)]
    pub dom_ref: DomRef,
}

/// Zero-width caret placeholder. Always counts as selected.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentModelSelectionMarker {
    #[serde(skip_serializing_if = "SegmentFormat::is_empty")]
    pub format: SegmentFormat,
}

/// Inline element the model does not understand, kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentModelGeneralSegment {
    pub element: FragmentNode,
    #[serde(default, skip_serializing_if = "SegmentFormat::is_empty")]
    pub format: SegmentFormat,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_selected: bool,
    #[serde(skip)]
    pub dom_ref: DomRef,
}

pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}

impl ContentModelSegment {
    pub fn format(&self) -> &SegmentFormat {
        match self {
            ContentModelSegment::Text(s) => &s.format,
            ContentModelSegment::Image(s) => &s.format,
            ContentModelSegment::Br(s) => &s.format,
            ContentModelSegment::SelectionMarker(s) => &s.format,
            ContentModelSegment::General(s) => &s.format,
            ContentModelSegment::Entity(s) => &s.format,
        }
    }

    pub fn format_mut(&mut self) -> &mut SegmentFormat {
        match self {
            ContentModelSegment::Text(s) => &mut s.format,
            ContentModelSegment::Image(s) => &mut s.format,
            ContentModelSegment::Br(s) => &mut s.format,
            ContentModelSegment::SelectionMarker(s) => &mut s.format,
            ContentModelSegment::General(s) => &mut s.format,
            ContentModelSegment::Entity(s) => &mut s.format,
        }
    }

    pub fn is_selected(&self) -> bool {
        match self {
            ContentModelSegment::Text(s) => s.is_selected,
            ContentModelSegment::Image(s) => s.is_selected,
            ContentModelSegment::Br(s) => s.is_selected,
            ContentModelSegment::SelectionMarker(_) => true,
            ContentModelSegment::General(s) => s.is_selected,
            ContentModelSegment::Entity(s) => s.is_selected,
        }
    }

    /// Set the selection flag. Markers ignore this.
    pub fn set_selected(&mut self, selected: bool) {
        match self {
            ContentModelSegment::Text(s) => s.is_selected = selected,
            ContentModelSegment::Image(s) => {
                s.is_selected = selected;
                if !selected {
                    s.is_selected_as_image_selection = false;
                }
            }
            ContentModelSegment::Br(s) => s.is_selected = selected,
            ContentModelSegment::SelectionMarker(_) => {}
            ContentModelSegment::General(s) => s.is_selected = selected,
            ContentModelSegment::Entity(s) => s.is_selected = selected,
        }
    }

    pub fn dom_ref(&self) -> Option<&DomRef> {
        match self {
            ContentModelSegment::Text(s) => Some(&s.dom_ref),
            ContentModelSegment::Image(s) => Some(&s.dom_ref),
            ContentModelSegment::Br(s) => Some(&s.dom_ref),
            ContentModelSegment::SelectionMarker(_) => None,
            ContentModelSegment::General(s) => Some(&s.dom_ref),
            ContentModelSegment::Entity(s) => Some(&s.dom_ref),
        }
    }

    pub fn dom_ref_mut(&mut self) -> Option<&mut DomRef> {
        match self {
            ContentModelSegment::Text(s) => Some(&mut s.dom_ref),
            ContentModelSegment::Image(s) => Some(&mut s.dom_ref),
            ContentModelSegment::Br(s) => Some(&mut s.dom_ref),
            ContentModelSegment::SelectionMarker(_) => None,
            ContentModelSegment::General(s) => Some(&mut s.dom_ref),
            ContentModelSegment::Entity(s) => Some(&mut s.dom_ref),
        }
    }

    pub fn is_marker(&self) -> bool {
        matches!(self, ContentModelSegment::SelectionMarker(_))
    }

    pub fn as_text(&self) -> Option<&ContentModelText> {
        match self {
            ContentModelSegment::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut ContentModelText> {
        match self {
            ContentModelSegment::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ContentModelSegment::Text(_) => "Text",
            ContentModelSegment::Image(_) => "Image",
            ContentModelSegment::Br(_) => "Br",
            ContentModelSegment::SelectionMarker(_) => "SelectionMarker",
            ContentModelSegment::General(_) => "General",
            ContentModelSegment::Entity(_) => "Entity",
        }
    }
}

pub fn create_text(text: impl Into<String>, format: &SegmentFormat) -> ContentModelSegment {
    ContentModelSegment::Text(ContentModelText {
        text: text.into(),
        format: format.clone(),
        ..Default::default()
    })
}

pub fn create_br(format: &SegmentFormat) -> ContentModelSegment {
    ContentModelSegment::Br(ContentModelBr {
        format: format.clone(),
        ..Default::default()
    })
}

pub fn create_selection_marker(format: &SegmentFormat) -> ContentModelSegment {
    ContentModelSegment::SelectionMarker(ContentModelSelectionMarker {
        format: format.clone(),
    })
}

pub fn create_image(src: impl Into<String>, format: &SegmentFormat) -> ContentModelSegment {
    ContentModelSegment::Image(ContentModelImage {
        src: src.into(),
        format: format.clone(),
        ..Default::default()
    })
}

pub fn create_general_segment(element: FragmentNode, format: &SegmentFormat) -> ContentModelSegment {
    ContentModelSegment::General(ContentModelGeneralSegment {
        element,
        format: format.clone(),
        is_selected: false,
        dom_ref: DomRef::default(),
    })
}

pub fn create_link(href: impl Into<String>) -> Link {
    Link {
        format: LinkFormat {
            href: Some(href.into()),
            ..Default::default()
        },
        dataset: Dataset::new(),
    }
}

impl ContentModelText {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// True if `other` can be merged into this segment without losing
    /// formatting or decorations.
    pub fn same_shape(&self, other: &ContentModelText) -> bool {
        self.format == other.format
            && self.link == other.link
            && self.code == other.code
            && self.is_selected == other.is_selected
    }

    /// Split at a character offset, keeping the head and returning the tail.
    /// The tail's DOM reference points further into the same text node.
    pub fn split_off(&mut self, offset: usize) -> ContentModelText {
        let (head, tail) = split_at_char(&self.text, offset);
        let (head, tail) = (head.to_string(), tail.to_string());
        let head_len = head.chars().count();
        self.text = head;
        let mut dom_ref = self.dom_ref;
        dom_ref.offset += head_len;
        dom_ref.fingerprint = None;
        ContentModelText {
            text: tail,
            format: self.format.clone(),
            link: self.link.clone(),
            code: self.code.clone(),
            is_selected: self.is_selected,
            dom_ref,
        }
    }
}

/// Split a string at a character offset.
pub fn split_at_char(text: &str, offset: usize) -> (&str, &str) {
    let byte = text
        .char_indices()
        .nth(offset)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    text.split_at(byte)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_json_shape() {
        let seg = create_text("hi", &SegmentFormat::bold());
        let json = serde_json::to_string(&seg).unwrap();
        assert_eq!(
            json,
            r#"{"segmentType":"Text","text":"hi","format":{"fontWeight":"bold"}}"#
        );
        let back: ContentModelSegment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, seg);
    }

    #[test]
    fn test_dom_ref_ignored_by_equality() {
        let mut a = create_text("x", &SegmentFormat::default());
        let b = a.clone();
        if let Some(r) = a.dom_ref_mut() {
            r.offset = 5;
        }
        assert_eq!(a, b);
    }

    #[test]
    fn test_marker_always_selected() {
        let mut marker = create_selection_marker(&SegmentFormat::default());
        marker.set_selected(false);
        assert!(marker.is_selected());
        assert!(marker.is_marker());
    }

    #[test]
    fn test_split_off_moves_dom_offset() {
        let mut text = ContentModelText {
            text: "hello".into(),
            dom_ref: DomRef {
                offset: 2,
                ..Default::default()
            },
            ..Default::default()
        };
        let tail = text.split_off(3);
        assert_eq!(text.text, "hel");
        assert_eq!(tail.text, "lo");
        assert_eq!(tail.dom_ref.offset, 5);
    }

    #[test]
    fn test_split_at_char() {
        assert_eq!(split_at_char("héllo", 2), ("hé", "llo"));
        assert_eq!(split_at_char("ab", 5), ("ab", ""));
    }
}
