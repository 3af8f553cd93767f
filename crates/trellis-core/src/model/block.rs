//! Blocks and block groups.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use trellis_dom::FragmentNode;

use super::dom_ref::DomRef;
use super::entity::ContentModelEntity;
use super::format::{BlockFormat, SegmentFormat};
use super::metadata::Dataset;
use super::segment::{ContentModelSegment, is_false};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "blockType")]
pub enum ContentModelBlock {
    Paragraph(ContentModelParagraph),
    Table(ContentModelTable),
    BlockGroup(ContentModelBlockGroup),
    Divider(ContentModelDivider),
    Entity(ContentModelEntity),
}

/// Block groups own child blocks.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "blockGroupType")]
pub enum ContentModelBlockGroup {
    ListItem(ContentModelListItem),
    FormatContainer(ContentModelFormatContainer),
    General(ContentModelGeneralBlock),
}

/// Heading or `<p>` tag a paragraph is written with.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParagraphDecorator {
    pub tag_name: SmolStr,
    /// Format implied by the tag (headings are bold and larger).
    #[serde(skip_serializing_if = "SegmentFormat::is_empty")]
    pub format: SegmentFormat,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentModelParagraph {
    pub segments: Vec<ContentModelSegment>,
    #[serde(skip_serializing_if = "BlockFormat::is_empty")]
    pub format: BlockFormat,
    /// Character format set on the paragraph element itself.
    #[serde(skip_serializing_if = "SegmentFormat::is_empty")]
    pub segment_format: SegmentFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decorator: Option<ParagraphDecorator>,
    /// Inferred from inline content rather than a block element.
    #[serde(skip_serializing_if = "is_false")]
    pub is_implicit: bool,
    /// Element this paragraph was parsed from or written to.
    #[serde(skip)]
    pub dom_ref: DomRef,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentModelTable {
    pub rows: Vec<ContentModelTableRow>,
    #[serde(skip_serializing_if = "BlockFormat::is_empty")]
    pub format: BlockFormat,
    #[serde(skip_serializing_if = "Dataset::is_empty")]
    pub dataset: Dataset,
    #[serde(skip)]
    pub dom_ref: DomRef,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentModelTableRow {
    pub cells: Vec<ContentModelTableCell>,
    #[serde(skip_serializing_if = "BlockFormat::is_empty")]
    pub format: BlockFormat,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentModelTableCell {
    pub blocks: Vec<ContentModelBlock>,
    #[serde(skip_serializing_if = "BlockFormat::is_empty")]
    pub format: BlockFormat,
    /// Covered by the cell to the left (colspan).
    #[serde(skip_serializing_if = "is_false")]
    pub span_left: bool,
    /// Covered by the cell above (rowspan).
    #[serde(skip_serializing_if = "is_false")]
    pub span_above: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub is_header: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub is_selected: bool,
    #[serde(skip_serializing_if = "Dataset::is_empty")]
    pub dataset: Dataset,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListType {
    #[default]
    #[serde(rename = "OL")]
    Ordered,
    #[serde(rename = "UL")]
    Unordered,
}

impl ListType {
    pub fn tag(self) -> &'static str {
        match self {
            ListType::Ordered => "ol",
            ListType::Unordered => "ul",
        }
    }
}

/// One nesting level of a list item.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListLevel {
    pub list_type: ListType,
    /// Explicit start number; `None` continues the numbering thread.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_number: Option<u32>,
    #[serde(skip_serializing_if = "BlockFormat::is_empty")]
    pub format: BlockFormat,
    #[serde(skip_serializing_if = "Dataset::is_empty")]
    pub dataset: Dataset,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentModelListItem {
    pub levels: Vec<ListLevel>,
    pub blocks: Vec<ContentModelBlock>,
    #[serde(skip_serializing_if = "BlockFormat::is_empty")]
    pub format: BlockFormat,
    /// Character format of the bullet/number.
    #[serde(skip_serializing_if = "SegmentFormat::is_empty")]
    pub format_holder: SegmentFormat,
}

/// Block-level wrapper such as `blockquote`, `pre` or a styled `div`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentModelFormatContainer {
    pub tag_name: SmolStr,
    pub blocks: Vec<ContentModelBlock>,
    #[serde(skip_serializing_if = "BlockFormat::is_empty")]
    pub format: BlockFormat,
    #[serde(skip)]
    pub dom_ref: DomRef,
}

/// Block element the model does not understand, kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentModelGeneralBlock {
    pub element: FragmentNode,
    #[serde(skip)]
    pub dom_ref: DomRef,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentModelDivider {
    pub tag_name: SmolStr,
    #[serde(skip_serializing_if = "BlockFormat::is_empty")]
    pub format: BlockFormat,
    #[serde(skip_serializing_if = "is_false")]
    pub is_selected: bool,
    #[serde(skip)]
    pub dom_ref: DomRef,
}

impl ContentModelBlock {
    /// Child blocks of a block group (not of tables; use the cells).
    pub fn child_blocks(&self) -> Option<&Vec<ContentModelBlock>> {
        match self {
            ContentModelBlock::BlockGroup(ContentModelBlockGroup::ListItem(item)) => {
                Some(&item.blocks)
            }
            ContentModelBlock::BlockGroup(ContentModelBlockGroup::FormatContainer(c)) => {
                Some(&c.blocks)
            }
            _ => None,
        }
    }

    pub fn child_blocks_mut(&mut self) -> Option<&mut Vec<ContentModelBlock>> {
        match self {
            ContentModelBlock::BlockGroup(ContentModelBlockGroup::ListItem(item)) => {
                Some(&mut item.blocks)
            }
            ContentModelBlock::BlockGroup(ContentModelBlockGroup::FormatContainer(c)) => {
                Some(&mut c.blocks)
            }
            _ => None,
        }
    }

    pub fn as_paragraph(&self) -> Option<&ContentModelParagraph> {
        match self {
            ContentModelBlock::Paragraph(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_paragraph_mut(&mut self) -> Option<&mut ContentModelParagraph> {
        match self {
            ContentModelBlock::Paragraph(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&ContentModelTable> {
        match self {
            ContentModelBlock::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_table_mut(&mut self) -> Option<&mut ContentModelTable> {
        match self {
            ContentModelBlock::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Element reference of blocks that own one.
    pub fn dom_ref(&self) -> Option<&DomRef> {
        match self {
            ContentModelBlock::Paragraph(p) => Some(&p.dom_ref),
            ContentModelBlock::Table(t) => Some(&t.dom_ref),
            ContentModelBlock::BlockGroup(ContentModelBlockGroup::FormatContainer(c)) => {
                Some(&c.dom_ref)
            }
            ContentModelBlock::BlockGroup(ContentModelBlockGroup::General(g)) => Some(&g.dom_ref),
            ContentModelBlock::BlockGroup(ContentModelBlockGroup::ListItem(_)) => None,
            ContentModelBlock::Divider(d) => Some(&d.dom_ref),
            ContentModelBlock::Entity(e) => Some(&e.dom_ref),
        }
    }

    pub fn dom_ref_mut(&mut self) -> Option<&mut DomRef> {
        match self {
            ContentModelBlock::Paragraph(p) => Some(&mut p.dom_ref),
            ContentModelBlock::Table(t) => Some(&mut t.dom_ref),
            ContentModelBlock::BlockGroup(ContentModelBlockGroup::FormatContainer(c)) => {
                Some(&mut c.dom_ref)
            }
            ContentModelBlock::BlockGroup(ContentModelBlockGroup::General(g)) => {
                Some(&mut g.dom_ref)
            }
            ContentModelBlock::BlockGroup(ContentModelBlockGroup::ListItem(_)) => None,
            ContentModelBlock::Divider(d) => Some(&mut d.dom_ref),
            ContentModelBlock::Entity(e) => Some(&mut e.dom_ref),
        }
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ContentModelBlock::Paragraph(_) => "Paragraph",
            ContentModelBlock::Table(_) => "Table",
            ContentModelBlock::BlockGroup(ContentModelBlockGroup::ListItem(_)) => "ListItem",
            ContentModelBlock::BlockGroup(ContentModelBlockGroup::FormatContainer(_)) => {
                "FormatContainer"
            }
            ContentModelBlock::BlockGroup(ContentModelBlockGroup::General(_)) => "General",
            ContentModelBlock::Divider(_) => "Divider",
            ContentModelBlock::Entity(_) => "Entity",
        }
    }
}

impl ContentModelParagraph {
    /// True if the paragraph has nothing but selection markers.
    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(|s| s.is_marker())
    }

    /// Concatenated text of all text segments.
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .filter_map(|s| s.as_text())
            .map(|t| t.text.as_str())
            .collect()
    }
}

impl ContentModelTable {
    /// Number of logical columns (the longest row).
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|r| r.cells.len()).max().unwrap_or(0)
    }

    /// True if every row has the same number of logical cells.
    pub fn is_rectangular(&self) -> bool {
        let columns = self.column_count();
        self.rows.iter().all(|r| r.cells.len() == columns)
    }
}

impl ContentModelTableCell {
    /// Cells covered by a neighbour's span are not written.
    pub fn is_spanned(&self) -> bool {
        self.span_left || self.span_above
    }
}

pub fn create_paragraph(
    is_implicit: bool,
    format: &BlockFormat,
    segment_format: &SegmentFormat,
    decorator: Option<ParagraphDecorator>,
) -> ContentModelParagraph {
    ContentModelParagraph {
        segments: Vec::new(),
        format: format.clone(),
        segment_format: segment_format.clone(),
        decorator,
        is_implicit,
        dom_ref: DomRef::default(),
    }
}

pub fn create_paragraph_decorator(tag_name: &str, format: &SegmentFormat) -> ParagraphDecorator {
    ParagraphDecorator {
        tag_name: SmolStr::new(tag_name.to_ascii_lowercase()),
        format: format.clone(),
    }
}

pub fn create_table(rows: usize, columns: usize) -> ContentModelTable {
    ContentModelTable {
        rows: (0..rows)
            .map(|_| ContentModelTableRow {
                cells: (0..columns)
                    .map(|_| create_table_cell(false, false, false))
                    .collect(),
                format: BlockFormat::default(),
            })
            .collect(),
        ..Default::default()
    }
}

pub fn create_table_cell(span_left: bool, span_above: bool, is_header: bool) -> ContentModelTableCell {
    ContentModelTableCell {
        span_left,
        span_above,
        is_header,
        ..Default::default()
    }
}

pub fn create_list_level(list_type: ListType, start_number: Option<u32>) -> ListLevel {
    ListLevel {
        list_type,
        start_number,
        ..Default::default()
    }
}

pub fn create_list_item(levels: Vec<ListLevel>, format_holder: &SegmentFormat) -> ContentModelListItem {
    ContentModelListItem {
        levels,
        blocks: Vec::new(),
        format: BlockFormat::default(),
        format_holder: format_holder.clone(),
    }
}

pub fn create_format_container(tag_name: &str, format: &BlockFormat) -> ContentModelFormatContainer {
    ContentModelFormatContainer {
        tag_name: SmolStr::new(tag_name.to_ascii_lowercase()),
        blocks: Vec::new(),
        format: format.clone(),
        dom_ref: DomRef::default(),
    }
}

pub fn create_divider(tag_name: &str, format: &BlockFormat) -> ContentModelDivider {
    ContentModelDivider {
        tag_name: SmolStr::new(tag_name.to_ascii_lowercase()),
        format: format.clone(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::segment::create_text;

    #[test]
    fn test_block_json_shape() {
        let mut para = create_paragraph(true, &BlockFormat::default(), &SegmentFormat::default(), None);
        para.segments.push(create_text("x", &SegmentFormat::default()));
        let block = ContentModelBlock::Paragraph(para);
        let json = serde_json::to_string(&block).unwrap();
        assert_eq!(
            json,
            r#"{"blockType":"Paragraph","segments":[{"segmentType":"Text","text":"x"}],"isImplicit":true}"#
        );
        let back: ContentModelBlock = serde_json::from_str(&json).unwrap();
        assert_eq!(back, block);
    }

    #[test]
    fn test_nested_group_json() {
        let mut item = create_list_item(
            vec![create_list_level(ListType::Unordered, None)],
            &SegmentFormat::default(),
        );
        item.blocks.push(ContentModelBlock::Divider(create_divider("hr", &BlockFormat::default())));
        let block = ContentModelBlock::BlockGroup(ContentModelBlockGroup::ListItem(item));
        let json = serde_json::to_string(&block).unwrap();
        assert!(json.starts_with(r#"{"blockType":"BlockGroup","blockGroupType":"ListItem""#));
        let back: ContentModelBlock = serde_json::from_str(&json).unwrap();
        assert_eq!(back, block);
    }

    #[test]
    fn test_create_table_is_rectangular() {
        let table = create_table(2, 3);
        assert_eq!(table.column_count(), 3);
        assert!(table.is_rectangular());
    }
}
