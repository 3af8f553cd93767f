//! Model normalization, run after every parse and before every write.
//!
//! Normalizing an already normalized model changes nothing.

use crate::model::{
    ContentModelBlock, ContentModelBlockGroup, ContentModelDocument, ContentModelParagraph, ContentModelSegment,
    ContentModelTable, SegmentFormat, create_br, create_paragraph, create_table_cell,
};

/// Normalize the whole document in place. Returns true if anything changed.
pub fn normalize_content_model(doc: &mut ContentModelDocument) -> bool {
    let mut changed = dedupe_markers(doc);
    changed |= normalize_blocks(&mut doc.blocks, false);
    if changed {
        tracing::trace!(target: "trellis::parse", "normalized content model");
    }
    changed
}

fn normalize_blocks(blocks: &mut Vec<ContentModelBlock>, in_pre: bool) -> bool {
    let mut changed = false;
    for block in blocks.iter_mut() {
        changed |= match block {
            ContentModelBlock::Paragraph(p) => normalize_paragraph(p, in_pre),
            ContentModelBlock::Table(t) => normalize_table(t),
            ContentModelBlock::BlockGroup(ContentModelBlockGroup::ListItem(item)) => {
                let mut changed = normalize_blocks(&mut item.blocks, in_pre);
                if item.blocks.is_empty() {
                    item.blocks.push(br_paragraph(&item.format_holder));
                    changed = true;
                }
                changed
            }
            ContentModelBlock::BlockGroup(ContentModelBlockGroup::FormatContainer(c)) => {
                let pre = in_pre || c.tag_name == "pre" || is_pre_white_space(c.format.white_space.as_deref());
                normalize_blocks(&mut c.blocks, pre)
            }
            _ => false,
        };
    }

    let before = blocks.len();
    blocks.retain(|block| match block {
        ContentModelBlock::Paragraph(p) => !(p.is_implicit && p.segments.is_empty()),
        ContentModelBlock::BlockGroup(ContentModelBlockGroup::FormatContainer(c)) => !c.blocks.is_empty(),
        _ => true,
    });
    changed | (blocks.len() != before)
}

fn is_pre_white_space(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.starts_with("pre") || v == "break-spaces")
}

fn br_paragraph(format: &SegmentFormat) -> ContentModelBlock {
    let mut paragraph = create_paragraph(true, &Default::default(), &Default::default(), None);
    paragraph.segments.push(create_br(format));
    ContentModelBlock::Paragraph(paragraph)
}

fn normalize_paragraph(paragraph: &mut ContentModelParagraph, in_pre: bool) -> bool {
    let mut changed = false;

    if paragraph.is_implicit
        && (!paragraph.format.is_empty() || !paragraph.segment_format.is_empty() || paragraph.decorator.is_some())
    {
        paragraph.is_implicit = false;
        changed = true;
    }

    let before = paragraph.segments.len();
    paragraph
        .segments
        .retain(|s| !matches!(s, ContentModelSegment::Text(t) if t.text.is_empty()));
    changed |= paragraph.segments.len() != before;
    changed |= merge_text_runs(paragraph);

    if !in_pre && !is_pre_white_space(paragraph.format.white_space.as_deref()) {
        changed |= protect_edge_spaces(paragraph);
    }

    if !paragraph.is_implicit && paragraph.is_empty() {
        let mut format = paragraph
            .decorator
            .as_ref()
            .map(|d| d.format.clone())
            .unwrap_or_default();
        format.merge(&paragraph.segment_format);
        if let Some(marker) = paragraph.segments.last() {
            format = marker.format().clone();
        }
        paragraph.segments.push(create_br(&format));
        changed = true;
    }
    changed
}

/// Neighbouring text runs with the same format, link and code become one
/// run, the way they come back from a write. A marker keeps runs apart.
fn merge_text_runs(paragraph: &mut ContentModelParagraph) -> bool {
    let before = paragraph.segments.len();
    let segments = std::mem::take(&mut paragraph.segments);
    for segment in segments {
        if let (Some(ContentModelSegment::Text(prev)), ContentModelSegment::Text(next)) =
            (paragraph.segments.last_mut(), &segment)
        {
            if prev.same_shape(next) {
                let contiguous = prev.dom_ref.node.is_some()
                    && prev.dom_ref.node == next.dom_ref.node
                    && prev.dom_ref.offset + prev.char_len() == next.dom_ref.offset;
                if !contiguous {
                    prev.dom_ref.clear();
                }
                prev.text.push_str(&next.text);
                continue;
            }
        }
        paragraph.segments.push(segment);
    }
    paragraph.segments.len() != before
}

/// Spaces a browser would collapse away become non-breaking: the first
/// character of the paragraph, the last one, and a space right after
/// another space or a line break.
fn protect_edge_spaces(paragraph: &mut ContentModelParagraph) -> bool {
    let content: Vec<usize> = paragraph
        .segments
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.is_marker())
        .map(|(i, _)| i)
        .collect();
    let mut changed = false;

    for (position, &index) in content.iter().enumerate() {
        let previous_ends_in_space = match position.checked_sub(1).map(|p| &paragraph.segments[content[p]]) {
            None => true,
            Some(ContentModelSegment::Text(t)) => t.text.ends_with(' '),
            Some(ContentModelSegment::Br(_)) => true,
            Some(_) => false,
        };
        let is_last = position + 1 == content.len();
        let ContentModelSegment::Text(text) = &mut paragraph.segments[index] else {
            continue;
        };
        let mut edited = false;
        if previous_ends_in_space && text.text.starts_with(' ') {
            text.text.replace_range(0..1, "\u{a0}");
            edited = true;
        }
        if is_last && text.text.ends_with(' ') {
            let at = text.text.len() - 1;
            text.text.replace_range(at.., "\u{a0}");
            edited = true;
        }
        if edited {
            // The text no longer matches its node.
            text.dom_ref.clear();
            changed = true;
        }
    }
    changed
}

fn normalize_table(table: &mut ContentModelTable) -> bool {
    let mut changed = false;
    let columns = table.column_count();
    for row in &mut table.rows {
        if row.cells.len() < columns {
            row.cells.resize_with(columns, || create_table_cell(false, false, false));
            changed = true;
        }
        for cell in &mut row.cells {
            changed |= normalize_blocks(&mut cell.blocks, false);
            if !cell.is_spanned() && cell.blocks.is_empty() {
                cell.blocks.push(br_paragraph(&SegmentFormat::default()));
                changed = true;
            }
        }
    }
    changed
}

/// A collapsed selection keeps its first marker. A range keeps the first
/// and the last.
fn dedupe_markers(doc: &mut ContentModelDocument) -> bool {
    let mut total = 0;
    let mut has_selected_content = false;
    for paragraph in doc.paragraphs() {
        for segment in &paragraph.segments {
            if segment.is_marker() {
                total += 1;
            } else if segment.is_selected() {
                has_selected_content = true;
            }
        }
    }
    let keep_last = has_selected_content && total > 1;
    if total <= 1 || (keep_last && total == 2) {
        return false;
    }

    let mut seen = 0;
    for paragraph in doc.paragraphs_mut() {
        paragraph.segments.retain(|segment| {
            if !segment.is_marker() {
                return true;
            }
            seen += 1;
            seen == 1 || (keep_last && seen == total)
        });
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        BlockFormat, ContentModelBlock, create_list_item, create_list_level, create_selection_marker, create_text,
        ListType,
    };

    fn paragraph(implicit: bool, segments: Vec<ContentModelSegment>) -> ContentModelBlock {
        let mut p = create_paragraph(implicit, &BlockFormat::default(), &SegmentFormat::default(), None);
        p.segments = segments;
        ContentModelBlock::Paragraph(p)
    }

    fn text(value: &str) -> ContentModelSegment {
        create_text(value, &SegmentFormat::default())
    }

    #[test]
    fn test_empty_paragraphs() {
        let mut doc = ContentModelDocument::new();
        doc.blocks.push(paragraph(false, vec![]));
        doc.blocks.push(paragraph(true, vec![]));
        doc.blocks.push(paragraph(true, vec![text("")]));
        assert!(normalize_content_model(&mut doc));
        assert_eq!(doc.blocks.len(), 1);
        let segments = &doc.blocks[0].as_paragraph().unwrap().segments;
        assert!(matches!(segments[..], [ContentModelSegment::Br(_)]));
    }

    #[test]
    fn test_edge_spaces_become_nbsp() {
        let mut doc = ContentModelDocument::new();
        let bold = create_text(" b ", &SegmentFormat::bold());
        doc.blocks.push(paragraph(false, vec![text(" a "), bold]));
        normalize_content_model(&mut doc);
        let texts: Vec<&str> = doc.blocks[0]
            .as_paragraph()
            .unwrap()
            .segments
            .iter()
            .filter_map(|s| s.as_text())
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(texts, ["\u{a0}a ", "\u{a0}b\u{a0}"]);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let mut doc = ContentModelDocument::new();
        doc.blocks.push(paragraph(false, vec![text(" x "), create_selection_marker(&SegmentFormat::default())]));
        let mut item = create_list_item(vec![create_list_level(ListType::Ordered, None)], &SegmentFormat::default());
        item.blocks.push(paragraph(true, vec![]));
        doc.blocks.push(ContentModelBlock::BlockGroup(ContentModelBlockGroup::ListItem(item)));
        normalize_content_model(&mut doc);
        let once = doc.clone();
        assert!(!normalize_content_model(&mut doc));
        assert_eq!(doc, once);
    }

    #[test]
    fn test_duplicate_collapsed_markers() {
        let marker = || create_selection_marker(&SegmentFormat::default());
        let mut doc = ContentModelDocument::new();
        doc.blocks.push(paragraph(false, vec![text("a"), marker()]));
        doc.blocks.push(paragraph(false, vec![marker(), text("b")]));
        assert!(normalize_content_model(&mut doc));
        let markers = doc
            .paragraphs()
            .iter()
            .flat_map(|p| p.segments.iter())
            .filter(|s| s.is_marker())
            .count();
        assert_eq!(markers, 1);
        assert!(doc.blocks[0].as_paragraph().unwrap().segments[1].is_marker());
    }

    #[test]
    fn test_split_text_runs_merge() {
        let marker = create_selection_marker(&SegmentFormat::default());
        let mut doc = ContentModelDocument::new();
        doc.blocks.push(paragraph(false, vec![text("a"), text("b"), marker, text("c"), text("d")]));
        assert!(normalize_content_model(&mut doc));
        let segments = &doc.blocks[0].as_paragraph().unwrap().segments;
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].as_text().unwrap().text, "ab");
        assert!(segments[1].is_marker());
        assert_eq!(segments[2].as_text().unwrap().text, "cd");
    }

    #[test]
    fn test_different_formats_stay_apart() {
        let mut doc = ContentModelDocument::new();
        let bold = create_text("b", &SegmentFormat::bold());
        doc.blocks.push(paragraph(false, vec![text("a"), bold]));
        assert!(!normalize_content_model(&mut doc));
        assert_eq!(doc.blocks[0].as_paragraph().unwrap().segments.len(), 2);
    }

    #[test]
    fn test_pre_keeps_spaces() {
        let mut doc = ContentModelDocument::new();
        let mut pre = crate::model::create_format_container("pre", &BlockFormat::default());
        pre.blocks.push(paragraph(true, vec![text("  a  ")]));
        doc.blocks.push(ContentModelBlock::BlockGroup(ContentModelBlockGroup::FormatContainer(pre)));
        assert!(!normalize_content_model(&mut doc));
    }
}
