//! Selection stored in the model.
//!
//! A collapsed selection is a single `SelectionMarker`. A range is two
//! markers with every segment between them flagged `is_selected`. Table
//! and image selections use flags on cells and images instead.

use super::block::{
    ContentModelBlock, ContentModelBlockGroup, ContentModelParagraph, ContentModelTable,
};
use super::document::{ContentModelDocument, visit_blocks, visit_blocks_mut};
use super::segment::{ContentModelSegment, create_selection_marker};

/// A point in the model: paragraph index in document order, segment index
/// in that paragraph and a character offset when the segment is text.
/// `segment == segments.len()` means the end of the paragraph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ModelPosition {
    pub paragraph: usize,
    pub segment: usize,
    pub offset: usize,
}

impl ModelPosition {
    pub fn new(paragraph: usize, segment: usize, offset: usize) -> Self {
        Self {
            paragraph,
            segment,
            offset,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionKind {
    Collapsed,
    Range,
    Table,
    Image,
}

/// One selected thing, visited in document order.
#[derive(Debug)]
pub enum SelectedItem<'a> {
    /// Selected segments of one paragraph (indices into `segments`).
    Segments {
        paragraph_index: usize,
        paragraph: &'a ContentModelParagraph,
        indices: Vec<usize>,
    },
    Cell {
        table: &'a ContentModelTable,
        row: usize,
        column: usize,
    },
    Block(&'a ContentModelBlock),
}

/// Visit every selected item in document order.
pub fn iterate_selections<'a>(doc: &'a ContentModelDocument, mut visit: impl FnMut(SelectedItem<'a>)) {
    let mut paragraph_index = 0;
    iterate_blocks(&doc.blocks, &mut paragraph_index, &mut visit);
}

fn iterate_blocks<'a>(
    blocks: &'a [ContentModelBlock],
    paragraph_index: &mut usize,
    visit: &mut impl FnMut(SelectedItem<'a>),
) {
    for block in blocks {
        match block {
            ContentModelBlock::Paragraph(p) => {
                let indices: Vec<usize> = p
                    .segments
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| s.is_selected())
                    .map(|(i, _)| i)
                    .collect();
                if !indices.is_empty() {
                    visit(SelectedItem::Segments {
                        paragraph_index: *paragraph_index,
                        paragraph: p,
                        indices,
                    });
                }
                *paragraph_index += 1;
            }
            ContentModelBlock::Table(t) => {
                for (row, r) in t.rows.iter().enumerate() {
                    for (column, cell) in r.cells.iter().enumerate() {
                        if cell.is_selected {
                            visit(SelectedItem::Cell { table: t, row, column });
                        }
                        iterate_blocks(&cell.blocks, paragraph_index, visit);
                    }
                }
            }
            ContentModelBlock::Divider(d) => {
                if d.is_selected {
                    visit(SelectedItem::Block(block));
                }
            }
            ContentModelBlock::Entity(e) => {
                if e.is_selected {
                    visit(SelectedItem::Block(block));
                }
            }
            ContentModelBlock::BlockGroup(ContentModelBlockGroup::ListItem(item)) => {
                iterate_blocks(&item.blocks, paragraph_index, visit)
            }
            ContentModelBlock::BlockGroup(ContentModelBlockGroup::FormatContainer(c)) => {
                iterate_blocks(&c.blocks, paragraph_index, visit)
            }
            ContentModelBlock::BlockGroup(ContentModelBlockGroup::General(_)) => {}
        }
    }
}

/// Selected segments in document order.
pub fn get_selected_segments(doc: &ContentModelDocument, include_markers: bool) -> Vec<&ContentModelSegment> {
    let mut out = Vec::new();
    iterate_selections(doc, |item| {
        if let SelectedItem::Segments {
            paragraph, indices, ..
        } = item
        {
            out.extend(
                indices
                    .into_iter()
                    .map(|i| &paragraph.segments[i])
                    .filter(|s| include_markers || !s.is_marker()),
            );
        }
    });
    out
}

pub fn has_selection(doc: &ContentModelDocument) -> bool {
    let mut found = false;
    iterate_selections(doc, |_| found = true);
    found
}

pub fn selection_kind(doc: &ContentModelDocument) -> Option<SelectionKind> {
    let mut has_cell = false;
    let mut has_image = false;
    let mut has_content = false;
    let mut markers = 0;
    iterate_selections(doc, |item| match item {
        SelectedItem::Cell { .. } => has_cell = true,
        SelectedItem::Block(_) => has_content = true,
        SelectedItem::Segments {
            paragraph, indices, ..
        } => {
            for i in indices {
                match &paragraph.segments[i] {
                    ContentModelSegment::SelectionMarker(_) => markers += 1,
                    ContentModelSegment::Image(img) if img.is_selected_as_image_selection => {
                        has_image = true
                    }
                    _ => has_content = true,
                }
            }
        }
    });
    if has_cell {
        Some(SelectionKind::Table)
    } else if has_image {
        Some(SelectionKind::Image)
    } else if has_content || markers > 1 {
        Some(SelectionKind::Range)
    } else if markers == 1 {
        Some(SelectionKind::Collapsed)
    } else {
        None
    }
}

/// Position of the first selection marker.
pub fn find_marker(doc: &ContentModelDocument) -> Option<ModelPosition> {
    doc.paragraphs()
        .iter()
        .enumerate()
        .find_map(|(pi, p)| {
            p.segments
                .iter()
                .position(|s| s.is_marker())
                .map(|si| ModelPosition::new(pi, si, 0))
        })
}

/// Remove every marker and clear every selection flag. Returns true if
/// anything was selected.
pub fn clear_selection(doc: &mut ContentModelDocument) -> bool {
    let mut changed = false;
    doc.has_reverted_range_selection = false;
    visit_blocks_mut(&mut doc.blocks, &mut |block| match block {
        ContentModelBlock::Paragraph(p) => {
            let before = p.segments.len();
            p.segments.retain(|s| !s.is_marker());
            changed |= p.segments.len() != before;
            for seg in &mut p.segments {
                changed |= seg.is_selected();
                seg.set_selected(false);
            }
        }
        ContentModelBlock::Table(t) => {
            for cell in t.rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
                changed |= cell.is_selected;
                cell.is_selected = false;
            }
        }
        ContentModelBlock::Divider(d) => {
            changed |= d.is_selected;
            d.is_selected = false;
        }
        ContentModelBlock::Entity(e) => {
            changed |= e.is_selected;
            e.is_selected = false;
        }
        ContentModelBlock::BlockGroup(_) => {}
    });
    changed
}

/// Replace the selection with a caret at `start`, or a range from `start`
/// to `end`. Positions past the end of the model are clamped.
pub fn set_selection(doc: &mut ContentModelDocument, start: ModelPosition, end: Option<ModelPosition>) -> bool {
    clear_selection(doc);
    let mut paragraphs = doc.paragraphs_mut();
    if paragraphs.is_empty() {
        return false;
    }
    let clamp = |pos: ModelPosition, count: usize| {
        if pos.paragraph >= count {
            ModelPosition::new(count - 1, usize::MAX, 0)
        } else {
            pos
        }
    };
    let start = clamp(start, paragraphs.len());
    let end = end.map(|e| clamp(e, paragraphs.len())).filter(|e| *e != start);

    match end {
        None => {
            insert_marker(&mut *paragraphs[start.paragraph], start.segment, start.offset);
        }
        Some(end) => {
            let (first, last) = if end < start { (end, start) } else { (start, end) };
            insert_marker(&mut *paragraphs[last.paragraph], last.segment, last.offset);
            insert_marker(&mut *paragraphs[first.paragraph], first.segment, first.offset);
            let mut inside = false;
            let mut seen = 0;
            for p in paragraphs.iter_mut() {
                for seg in p.segments.iter_mut() {
                    if seg.is_marker() {
                        seen += 1;
                        inside = seen == 1;
                    } else if inside {
                        seg.set_selected(true);
                    }
                }
            }
        }
    }
    true
}

/// Insert a marker at a segment/character position, splitting a text
/// segment when the offset falls inside it. Returns the marker index.
pub fn insert_marker(paragraph: &mut ContentModelParagraph, segment: usize, offset: usize) -> usize {
    let len = paragraph.segments.len();
    let index = if segment >= len {
        len
    } else {
        let mut tail = None;
        let index = match &mut paragraph.segments[segment] {
            ContentModelSegment::Text(text) => {
                if offset == 0 {
                    segment
                } else if offset >= text.char_len() {
                    segment + 1
                } else {
                    tail = Some(text.split_off(offset));
                    segment + 1
                }
            }
            _ if offset > 0 => segment + 1,
            _ => segment,
        };
        if let Some(tail) = tail {
            paragraph
                .segments
                .insert(segment + 1, ContentModelSegment::Text(tail));
        }
        index
    };
    let format = index
        .checked_sub(1)
        .and_then(|i| paragraph.segments.get(i))
        .or_else(|| paragraph.segments.get(index))
        .map(|s| s.format().clone())
        .unwrap_or_else(|| paragraph.segment_format.clone());
    paragraph.segments.insert(index, create_selection_marker(&format));
    index
}

/// True if any table cell in the document is selected.
pub fn has_table_selection(doc: &ContentModelDocument) -> bool {
    let mut found = false;
    visit_blocks(&doc.blocks, &mut |block| {
        if let ContentModelBlock::Table(t) = block {
            found |= t.rows.iter().flat_map(|r| r.cells.iter()).any(|c| c.is_selected);
        }
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::block::create_paragraph;
    use crate::model::format::{BlockFormat, SegmentFormat};
    use crate::model::segment::create_text;

    fn doc_with(texts: &[&str]) -> ContentModelDocument {
        let mut doc = ContentModelDocument::new();
        for text in texts {
            let mut p = create_paragraph(false, &BlockFormat::default(), &SegmentFormat::default(), None);
            p.segments.push(create_text(*text, &SegmentFormat::default()));
            doc.blocks.push(ContentModelBlock::Paragraph(p));
        }
        doc
    }

    fn shape(doc: &ContentModelDocument) -> Vec<Vec<String>> {
        doc.paragraphs()
            .iter()
            .map(|p| {
                p.segments
                    .iter()
                    .map(|s| match s {
                        ContentModelSegment::Text(t) if t.is_selected => format!("[{}]", t.text),
                        ContentModelSegment::Text(t) => t.text.clone(),
                        ContentModelSegment::SelectionMarker(_) => "|".into(),
                        other => other.kind().into(),
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_collapsed_selection_splits_text() {
        let mut doc = doc_with(&["abc"]);
        set_selection(&mut doc, ModelPosition::new(0, 0, 2), None);
        assert_eq!(shape(&doc), vec![vec!["ab", "|", "c"]]);
        assert_eq!(selection_kind(&doc), Some(SelectionKind::Collapsed));
        assert_eq!(find_marker(&doc), Some(ModelPosition::new(0, 1, 0)));
    }

    #[test]
    fn test_range_across_paragraphs() {
        let mut doc = doc_with(&["abc", "def"]);
        set_selection(&mut doc, ModelPosition::new(0, 0, 1), Some(ModelPosition::new(1, 0, 2)));
        assert_eq!(
            shape(&doc),
            vec![vec!["a", "|", "[bc]"], vec!["[de]", "|", "f"]]
        );
        assert_eq!(selection_kind(&doc), Some(SelectionKind::Range));
        let selected: Vec<&str> = get_selected_segments(&doc, false)
            .iter()
            .filter_map(|s| s.as_text())
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(selected, ["bc", "de"]);
    }

    #[test]
    fn test_range_inside_one_segment() {
        let mut doc = doc_with(&["abcd"]);
        set_selection(&mut doc, ModelPosition::new(0, 0, 3), Some(ModelPosition::new(0, 0, 1)));
        assert_eq!(shape(&doc), vec![vec!["a", "|", "[bc]", "|", "d"]]);
    }

    #[test]
    fn test_clear_selection() {
        let mut doc = doc_with(&["abc"]);
        set_selection(&mut doc, ModelPosition::new(0, 0, 0), Some(ModelPosition::new(0, 0, 3)));
        assert!(clear_selection(&mut doc));
        assert!(!has_selection(&doc));
        assert!(!clear_selection(&mut doc));
        assert_eq!(shape(&doc), vec![vec!["abc"]]);
    }
}
