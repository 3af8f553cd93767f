//! The document root and tree walks over it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::block::{ContentModelBlock, ContentModelBlockGroup, ContentModelParagraph};
use super::entity::ContentModelEntity;
use super::format::SegmentFormat;
use super::segment::{ContentModelSegment, is_false};

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentModelDocument {
    pub blocks: Vec<ContentModelBlock>,
    /// Default segment format; every parsed segment inherits it.
    #[serde(skip_serializing_if = "SegmentFormat::is_empty")]
    pub format: SegmentFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<BTreeMap<String, String>>,
    /// The live range had its focus before its anchor.
    #[serde(skip_serializing_if = "is_false")]
    pub has_reverted_range_selection: bool,
}

impl ContentModelDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(format: &SegmentFormat) -> Self {
        Self {
            format: format.clone(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Every paragraph in document order, descending into list items,
    /// containers and table cells.
    pub fn paragraphs(&self) -> Vec<&ContentModelParagraph> {
        let mut out = Vec::new();
        collect_paragraphs(&self.blocks, &mut out);
        out
    }

    pub fn paragraphs_mut(&mut self) -> Vec<&mut ContentModelParagraph> {
        let mut out = Vec::new();
        collect_paragraphs_mut(&mut self.blocks, &mut out);
        out
    }

    /// Entities in document order, both block and inline.
    pub fn entities(&self) -> Vec<&ContentModelEntity> {
        let mut out = Vec::new();
        visit_blocks(&self.blocks, &mut |block| match block {
            ContentModelBlock::Entity(e) => out.push(e),
            ContentModelBlock::Paragraph(p) => {
                out.extend(p.segments.iter().filter_map(|s| match s {
                    ContentModelSegment::Entity(e) => Some(e),
                    _ => None,
                }));
            }
            _ => {}
        });
        out
    }

    /// `(type, id)` of every entity that has an id.
    pub fn entity_ids(&self) -> Vec<(SmolStr, SmolStr)> {
        self.entities()
            .into_iter()
            .filter_map(|e| e.id.clone().map(|id| (e.entity_type.clone(), id)))
            .collect()
    }

    /// Drop every DOM reference, producing a model detached from any tree.
    pub fn clear_dom_refs(&mut self) {
        visit_blocks_mut(&mut self.blocks, &mut |block| {
            if let Some(r) = block.dom_ref_mut() {
                r.clear();
            }
            if let ContentModelBlock::Paragraph(p) = block {
                for seg in &mut p.segments {
                    if let Some(r) = seg.dom_ref_mut() {
                        r.clear();
                    }
                }
            }
        });
    }
}

fn collect_paragraphs<'a>(blocks: &'a [ContentModelBlock], out: &mut Vec<&'a ContentModelParagraph>) {
    for block in blocks {
        match block {
            ContentModelBlock::Paragraph(p) => out.push(p),
            ContentModelBlock::Table(t) => {
                for cell in t.rows.iter().flat_map(|r| r.cells.iter()) {
                    collect_paragraphs(&cell.blocks, out);
                }
            }
            ContentModelBlock::BlockGroup(ContentModelBlockGroup::ListItem(item)) => {
                collect_paragraphs(&item.blocks, out)
            }
            ContentModelBlock::BlockGroup(ContentModelBlockGroup::FormatContainer(c)) => {
                collect_paragraphs(&c.blocks, out)
            }
            _ => {}
        }
    }
}

fn collect_paragraphs_mut<'a>(
    blocks: &'a mut [ContentModelBlock],
    out: &mut Vec<&'a mut ContentModelParagraph>,
) {
    for block in blocks {
        match block {
            ContentModelBlock::Paragraph(p) => out.push(p),
            ContentModelBlock::Table(t) => {
                for cell in t.rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
                    collect_paragraphs_mut(&mut cell.blocks, out);
                }
            }
            ContentModelBlock::BlockGroup(ContentModelBlockGroup::ListItem(item)) => {
                collect_paragraphs_mut(&mut item.blocks, out)
            }
            ContentModelBlock::BlockGroup(ContentModelBlockGroup::FormatContainer(c)) => {
                collect_paragraphs_mut(&mut c.blocks, out)
            }
            _ => {}
        }
    }
}

/// Pre-order walk over every block, including blocks inside table cells.
pub fn visit_blocks<'a>(blocks: &'a [ContentModelBlock], visit: &mut impl FnMut(&'a ContentModelBlock)) {
    for block in blocks {
        visit(block);
        match block {
            ContentModelBlock::Table(t) => {
                for cell in t.rows.iter().flat_map(|r| r.cells.iter()) {
                    visit_blocks(&cell.blocks, visit);
                }
            }
            _ => {
                if let Some(children) = block.child_blocks() {
                    visit_blocks(children, visit);
                }
            }
        }
    }
}

pub fn visit_blocks_mut(blocks: &mut [ContentModelBlock], visit: &mut impl FnMut(&mut ContentModelBlock)) {
    for block in blocks {
        visit(&mut *block);
        match block {
            ContentModelBlock::Table(t) => {
                for cell in t.rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
                    visit_blocks_mut(&mut cell.blocks, visit);
                }
            }
            _ => {
                if let Some(children) = block.child_blocks_mut() {
                    visit_blocks_mut(children, visit);
                }
            }
        }
    }
}
