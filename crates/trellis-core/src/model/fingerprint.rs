//! Content fingerprints used to decide whether a cached element can be
//! reused on write-back.
//!
//! Selection state does not take part: moving the caret must not force a
//! block to be rewritten.

use super::block::{ContentModelBlock, ContentModelBlockGroup, ContentModelFormatContainer, ContentModelParagraph};
use super::dom_ref::{Fingerprint, hash_serialized};
use super::format::SegmentFormat;
use super::segment::ContentModelSegment;

/// Hash of a block's content with selection stripped. Format containers
/// hash shallowly because their children are reconciled one by one.
pub fn block_content_hash(block: &ContentModelBlock) -> u64 {
    match block {
        ContentModelBlock::BlockGroup(ContentModelBlockGroup::FormatContainer(c)) => container_content_hash(c),
        _ => {
            let mut canonical = block.clone();
            strip_selection(&mut canonical);
            hash_serialized(&canonical)
        }
    }
}

/// Hash of a format container's own element: tag and format only.
pub fn container_content_hash(container: &ContentModelFormatContainer) -> u64 {
    hash_serialized(&("FormatContainer", &container.tag_name, &container.format))
}

/// Hash of the inherited state a block is parsed or written under.
pub fn context_hash(implicit: &SegmentFormat, is_rtl: bool) -> u64 {
    hash_serialized(&(implicit, is_rtl))
}

pub fn block_fingerprint(block: &ContentModelBlock, implicit: &SegmentFormat, is_rtl: bool) -> Fingerprint {
    Fingerprint {
        content: block_content_hash(block),
        context: context_hash(implicit, is_rtl),
    }
}

/// Recompute the content half of every recorded fingerprint, keeping the
/// context half. Only valid while the model mirrors the DOM exactly.
pub fn refresh_fingerprints(blocks: &mut [ContentModelBlock]) {
    for block in blocks.iter_mut() {
        let has_fingerprint = block.dom_ref().is_some_and(|r| r.fingerprint.is_some());
        if has_fingerprint {
            let content = block_content_hash(block);
            if let Some(fp) = block.dom_ref_mut().and_then(|r| r.fingerprint.as_mut()) {
                fp.content = content;
            }
        }
        if let Some(children) = block.child_blocks_mut() {
            refresh_fingerprints(children);
        }
    }
}

fn strip_selection(block: &mut ContentModelBlock) {
    match block {
        ContentModelBlock::Paragraph(p) => canonical_segments(p),
        ContentModelBlock::Table(t) => {
            for cell in t.rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
                cell.is_selected = false;
                cell.blocks.iter_mut().for_each(strip_selection);
            }
        }
        ContentModelBlock::Divider(d) => d.is_selected = false,
        ContentModelBlock::Entity(e) => e.is_selected = false,
        _ => {
            if let Some(children) = block.child_blocks_mut() {
                children.iter_mut().for_each(strip_selection);
            }
        }
    }
}

/// Drop markers and selection flags, then merge text runs that only
/// differed by where a marker used to split them.
fn canonical_segments(paragraph: &mut ContentModelParagraph) {
    let segments = std::mem::take(&mut paragraph.segments);
    for mut seg in segments {
        if seg.is_marker() {
            continue;
        }
        seg.set_selected(false);
        if let (Some(ContentModelSegment::Text(prev)), ContentModelSegment::Text(next)) =
            (paragraph.segments.last_mut(), &seg)
        {
            if prev.same_shape(next) {
                prev.text.push_str(&next.text);
                continue;
            }
        }
        paragraph.segments.push(seg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::block::create_paragraph;
    use crate::model::format::BlockFormat;
    use crate::model::segment::{create_selection_marker, create_text};

    fn paragraph(segments: Vec<ContentModelSegment>) -> ContentModelBlock {
        let mut p = create_paragraph(false, &BlockFormat::default(), &SegmentFormat::default(), None);
        p.segments = segments;
        ContentModelBlock::Paragraph(p)
    }

    #[test]
    fn test_selection_does_not_change_hash() {
        let plain = SegmentFormat::default();
        let whole = paragraph(vec![create_text("abc", &plain)]);
        let split = paragraph(vec![
            create_text("ab", &plain),
            create_selection_marker(&plain),
            create_text("c", &plain),
        ]);
        assert_eq!(block_content_hash(&whole), block_content_hash(&split));
    }

    #[test]
    fn test_format_changes_hash() {
        let plain = paragraph(vec![create_text("abc", &SegmentFormat::default())]);
        let bold = paragraph(vec![create_text("abc", &SegmentFormat::bold())]);
        assert_ne!(block_content_hash(&plain), block_content_hash(&bold));
    }
}
