//! In-place edits over a model. These are the building blocks mutators
//! passed to `Editor::format_content_model` are made of.
//!
//! Every function returns `true` if it changed the model, so a mutator can
//! forward the result and let a no-op short-circuit the write-back.

use std::collections::HashSet;

use smol_str::{SmolStr, format_smolstr};
use trellis_dom::FragmentNode;

use super::block::{
    ContentModelBlock, ContentModelBlockGroup, ContentModelListItem, ContentModelParagraph,
    ContentModelTable, ListType, create_list_item, create_list_level, create_paragraph,
    create_table,
};
use super::document::{ContentModelDocument, visit_blocks_mut};
use super::entity::create_entity;
use super::format::SegmentFormat;
use super::metadata::{TableCellMetadata, TableMetadata, get_metadata, update_metadata};
use super::segment::{ContentModelSegment, create_selection_marker, create_text};
use super::selection::{SelectionKind, find_marker, selection_kind};

/// Type at the caret, replacing a range selection first.
pub fn insert_text(doc: &mut ContentModelDocument, text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    if matches!(selection_kind(doc), Some(SelectionKind::Range)) {
        delete_selection(doc);
    }
    let Some(pos) = find_marker(doc) else {
        return false;
    };
    let mut paragraphs = doc.paragraphs_mut();
    let paragraph = &mut *paragraphs[pos.paragraph];
    let format = paragraph.segments[pos.segment].format().clone();

    if let Some(ContentModelSegment::Text(prev)) = pos
        .segment
        .checked_sub(1)
        .and_then(|i| paragraph.segments.get_mut(i))
    {
        if prev.format == format && prev.link.is_none() && prev.code.is_none() && !prev.is_selected {
            prev.text.push_str(text);
            return true;
        }
    }
    paragraph
        .segments
        .insert(pos.segment, create_text(text, &format));
    true
}

/// Remove everything selected and leave a caret where the selection
/// started. Paragraphs at both ends of a multi-paragraph range are merged.
pub fn delete_selection(doc: &mut ContentModelDocument) -> bool {
    match selection_kind(doc) {
        None | Some(SelectionKind::Collapsed) => return false,
        Some(SelectionKind::Table) => {
            visit_blocks_mut(&mut doc.blocks, &mut |block| {
                if let ContentModelBlock::Table(t) = block {
                    for cell in t.rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
                        if cell.is_selected {
                            cell.blocks.clear();
                        }
                    }
                }
            });
            return true;
        }
        Some(SelectionKind::Range) | Some(SelectionKind::Image) => {}
    }

    merge_selected_paragraphs(&mut doc.blocks);
    remove_selected_blocks(&mut doc.blocks);

    let mut placed = false;
    for paragraph in doc.paragraphs_mut() {
        let Some(first) = paragraph.segments.iter().position(|s| s.is_selected()) else {
            continue;
        };
        let format = paragraph.segments[first].format().clone();
        paragraph.segments.retain(|s| !s.is_selected());
        if !placed {
            paragraph
                .segments
                .insert(first, create_selection_marker(&format));
            placed = true;
        }
    }
    doc.has_reverted_range_selection = false;
    true
}

fn paragraph_has_selection(block: &ContentModelBlock) -> bool {
    block
        .as_paragraph()
        .is_some_and(|p| p.segments.iter().any(|s| s.is_selected()))
}

fn merge_selected_paragraphs(blocks: &mut Vec<ContentModelBlock>) {
    let first = blocks.iter().position(paragraph_has_selection);
    let last = blocks.iter().rposition(paragraph_has_selection);
    if let (Some(first), Some(last)) = (first, last) {
        if first < last {
            let mut removed: Vec<ContentModelBlock> = blocks.drain(first + 1..=last).collect();
            let tail = removed
                .pop()
                .and_then(|b| match b {
                    ContentModelBlock::Paragraph(p) => Some(p.segments),
                    _ => None,
                })
                .unwrap_or_default();
            if let Some(p) = blocks[first].as_paragraph_mut() {
                p.segments.extend(tail);
            }
        }
    }
    for block in blocks.iter_mut() {
        match block {
            ContentModelBlock::Table(t) => {
                for cell in t.rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
                    merge_selected_paragraphs(&mut cell.blocks);
                }
            }
            _ => {
                if let Some(children) = block.child_blocks_mut() {
                    merge_selected_paragraphs(children);
                }
            }
        }
    }
}

fn remove_selected_blocks(blocks: &mut Vec<ContentModelBlock>) {
    blocks.retain(|b| match b {
        ContentModelBlock::Divider(d) => !d.is_selected,
        ContentModelBlock::Entity(e) => !e.is_selected,
        _ => true,
    });
    for block in blocks.iter_mut() {
        if let Some(children) = block.child_blocks_mut() {
            remove_selected_blocks(children);
        }
    }
}

/// Apply `update` to every selected segment. With a collapsed selection
/// the marker's format is updated, so the next typed text picks it up.
pub fn apply_segment_format(doc: &mut ContentModelDocument, mut update: impl FnMut(&mut SegmentFormat)) -> bool {
    let mut changed = false;
    for paragraph in doc.paragraphs_mut() {
        for seg in paragraph.segments.iter_mut().filter(|s| s.is_selected()) {
            update(seg.format_mut());
            changed = true;
        }
    }
    changed
}

/// Bold the selection unless all of it is already bold.
pub fn toggle_bold(doc: &mut ContentModelDocument) -> bool {
    let mut all_bold = true;
    let mut any = false;
    for paragraph in doc.paragraphs() {
        let selected: Vec<&ContentModelSegment> =
            paragraph.segments.iter().filter(|s| s.is_selected()).collect();
        let has_content = selected.iter().any(|s| !s.is_marker());
        for seg in selected.into_iter().filter(|s| !has_content || !s.is_marker()) {
            any = true;
            all_bold &= seg.format().is_bold();
        }
    }
    if !any {
        return false;
    }
    let weight = if all_bold { "normal" } else { "bold" };
    apply_segment_format(doc, |f| f.font_weight = Some(SmolStr::new_static(weight)))
}

/// Set `text-align` on every paragraph that holds part of the selection.
pub fn set_alignment(doc: &mut ContentModelDocument, align: &str) -> bool {
    let mut changed = false;
    for paragraph in doc.paragraphs_mut() {
        if paragraph.segments.iter().any(|s| s.is_selected()) {
            paragraph.format.text_align = Some(SmolStr::new(align));
            paragraph.is_implicit = false;
            changed = true;
        }
    }
    changed
}

/// Split the paragraph at the caret. The caret moves to the start of the
/// new paragraph.
pub fn split_paragraph(doc: &mut ContentModelDocument) -> bool {
    if matches!(selection_kind(doc), Some(SelectionKind::Range)) {
        delete_selection(doc);
    }
    split_in(&mut doc.blocks)
}

fn split_in(blocks: &mut Vec<ContentModelBlock>) -> bool {
    for i in 0..blocks.len() {
        if let ContentModelBlock::Paragraph(p) = &mut blocks[i] {
            if let Some(marker) = p.segments.iter().position(|s| s.is_marker()) {
                let mut next = create_paragraph(false, &p.format, &p.segment_format, p.decorator.clone());
                next.segments = p.segments.split_off(marker);
                p.is_implicit = false;
                blocks.insert(i + 1, ContentModelBlock::Paragraph(next));
                return true;
            }
        }
        let found = match &mut blocks[i] {
            ContentModelBlock::Table(t) => t
                .rows
                .iter_mut()
                .flat_map(|r| r.cells.iter_mut())
                .any(|cell| split_in(&mut cell.blocks)),
            other => other.child_blocks_mut().is_some_and(|c| split_in(c)),
        };
        if found {
            return true;
        }
    }
    false
}

/// Insert an entity at the caret and return its generated id. Inline
/// entities go before the marker; block entities go after the paragraph
/// holding it. Without a caret the entity is appended.
pub fn insert_entity(
    doc: &mut ContentModelDocument,
    entity_type: &str,
    wrapper: FragmentNode,
    is_block: bool,
    is_readonly: bool,
) -> SmolStr {
    let used: HashSet<SmolStr> = doc.entity_ids().into_iter().map(|(_, id)| id).collect();
    let id = (1..)
        .map(|n| format_smolstr!("{entity_type}_{n}"))
        .find(|candidate| !used.contains(candidate))
        .unwrap_or_else(|| SmolStr::new(entity_type));
    let entity = create_entity(entity_type, Some(id.clone()), is_readonly, wrapper);

    if is_block {
        let mut pending = Some(ContentModelBlock::Entity(entity));
        insert_after_marker(&mut doc.blocks, &mut pending);
        if let Some(block) = pending {
            doc.blocks.push(block);
        }
        return id;
    }

    let segment = ContentModelSegment::Entity(entity);
    match find_marker(doc) {
        Some(pos) => {
            let mut paragraphs = doc.paragraphs_mut();
            paragraphs[pos.paragraph].segments.insert(pos.segment, segment);
        }
        None => {
            let mut paragraph = create_paragraph(true, &Default::default(), &Default::default(), None);
            paragraph.segments.push(segment);
            doc.blocks.push(ContentModelBlock::Paragraph(paragraph));
        }
    }
    id
}

/// Insert an empty table after the paragraph holding the caret.
pub fn insert_table(doc: &mut ContentModelDocument, rows: usize, columns: usize) -> bool {
    if rows == 0 || columns == 0 {
        return false;
    }
    let mut table = create_table(rows, columns);
    table.format.border_collapse = Some(SmolStr::new_static("collapse"));
    let mut pending = Some(ContentModelBlock::Table(table));
    insert_after_marker(&mut doc.blocks, &mut pending);
    if let Some(block) = pending {
        doc.blocks.push(block);
    }
    true
}

fn insert_after_marker(blocks: &mut Vec<ContentModelBlock>, pending: &mut Option<ContentModelBlock>) {
    for i in 0..blocks.len() {
        if pending.is_none() {
            return;
        }
        let has_marker = blocks[i]
            .as_paragraph()
            .is_some_and(|p| p.segments.iter().any(|s| s.is_marker()));
        if has_marker {
            if let Some(block) = pending.take() {
                blocks.insert(i + 1, block);
            }
            return;
        }
        match &mut blocks[i] {
            ContentModelBlock::Table(t) => {
                for cell in t.rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
                    insert_after_marker(&mut cell.blocks, pending);
                }
            }
            other => {
                if let Some(children) = other.child_blocks_mut() {
                    insert_after_marker(children, pending);
                }
            }
        }
    }
}

/// Merge the rectangle of cells into its top-left cell. Covered cells keep
/// their slot (so rows stay rectangular) and are flagged as spanned; their
/// content moves into the anchor cell.
pub fn merge_table_cells(
    table: &mut ContentModelTable,
    first_row: usize,
    first_column: usize,
    last_row: usize,
    last_column: usize,
) -> bool {
    let rows = table.rows.len();
    let columns = table.column_count();
    if first_row > last_row
        || first_column > last_column
        || last_row >= rows
        || last_column >= columns
        || (first_row == last_row && first_column == last_column)
    {
        return false;
    }
    let mut moved = Vec::new();
    for r in first_row..=last_row {
        for c in first_column..=last_column {
            if r == first_row && c == first_column {
                continue;
            }
            let Some(cell) = table.rows[r].cells.get_mut(c) else {
                continue;
            };
            moved.extend(cell.blocks.drain(..).filter(|b| !is_placeholder(b)));
            cell.span_left = c > first_column;
            cell.span_above = r > first_row;
        }
    }
    if let Some(anchor) = table.rows[first_row].cells.get_mut(first_column) {
        anchor.blocks.retain(|b| !is_placeholder(b) || moved.is_empty());
        anchor.blocks.extend(moved);
    }
    true
}

/// An empty or `<br>`-only paragraph a merge can drop.
fn is_placeholder(block: &ContentModelBlock) -> bool {
    block.as_paragraph().is_some_and(|p| {
        p.segments
            .iter()
            .all(|s| matches!(s, ContentModelSegment::Br(_)))
    })
}

/// Merge the bounding box of the selected cells of the first table that has
/// a cell selection.
pub fn merge_selected_table_cells(doc: &mut ContentModelDocument) -> bool {
    let mut changed = false;
    visit_blocks_mut(&mut doc.blocks, &mut |block| {
        if changed {
            return;
        }
        if let ContentModelBlock::Table(t) = block {
            let selected: Vec<(usize, usize)> = t
                .rows
                .iter()
                .enumerate()
                .flat_map(|(r, row)| {
                    row.cells
                        .iter()
                        .enumerate()
                        .filter(|(_, c)| c.is_selected)
                        .map(move |(c, _)| (r, c))
                })
                .collect();
            if let (Some(r0), Some(r1), Some(c0), Some(c1)) = (
                selected.iter().map(|s| s.0).min(),
                selected.iter().map(|s| s.0).max(),
                selected.iter().map(|s| s.1).min(),
                selected.iter().map(|s| s.1).max(),
            ) {
                changed = merge_table_cells(t, r0, c0, r1, c1);
            }
        }
    });
    changed
}

const BORDER_WIDTH: &str = "1px solid";

/// Store table metadata and restyle cells from it. Cells that carry a
/// background or border override keep their own values.
pub fn apply_table_format(table: &mut ContentModelTable, metadata: &TableMetadata) {
    update_metadata(&mut table.dataset, |_: Option<TableMetadata>| Some(metadata.clone()));
    table.format.border_collapse = Some(SmolStr::new_static("collapse"));

    for (r, row) in table.rows.iter_mut().enumerate() {
        for (c, cell) in row.cells.iter_mut().enumerate() {
            let header_row = metadata.has_header_row && r == 0;
            cell.is_header = header_row || (metadata.has_first_column && c == 0);

            let overrides: TableCellMetadata = get_metadata(&cell.dataset).unwrap_or_default();
            if !overrides.bg_color_override {
                let body_row = if metadata.has_header_row { r.wrapping_sub(1) } else { r };
                cell.format.background_color = if header_row {
                    metadata.header_row_color.clone()
                } else if metadata.has_banded_rows && body_row % 2 == 1 {
                    metadata.banded_row_color.clone()
                } else {
                    None
                };
            }
            if !overrides.border_override {
                let border = metadata
                    .border_color
                    .as_ref()
                    .map(|color| format_smolstr!("{BORDER_WIDTH} {color}"));
                cell.format.border_top = border.clone();
                cell.format.border_right = border.clone();
                cell.format.border_bottom = border.clone();
                cell.format.border_left = border;
            }
        }
    }
}

/// Turn selected paragraphs into list items of `list_type`, or switch the
/// type of list items that already hold the selection.
pub fn set_list_type(doc: &mut ContentModelDocument, list_type: ListType) -> bool {
    let mut changed = false;
    set_list_in(&mut doc.blocks, list_type, &mut changed);
    changed
}

fn set_list_in(blocks: &mut [ContentModelBlock], list_type: ListType, changed: &mut bool) {
    for i in 0..blocks.len() {
        let continues = i > 0 && matches!(
            &blocks[i - 1],
            ContentModelBlock::BlockGroup(ContentModelBlockGroup::ListItem(prev))
                if prev.levels.last().is_some_and(|l| l.list_type == list_type)
        );
        if paragraph_has_selection(&blocks[i]) {
            let start = (list_type == ListType::Ordered && !continues).then_some(1);
            let paragraph = std::mem::replace(
                &mut blocks[i],
                ContentModelBlock::Paragraph(ContentModelParagraph::default()),
            );
            let mut item: ContentModelListItem =
                create_list_item(vec![create_list_level(list_type, start)], &SegmentFormat::default());
            item.blocks.push(paragraph);
            blocks[i] = ContentModelBlock::BlockGroup(ContentModelBlockGroup::ListItem(item));
            *changed = true;
            continue;
        }
        match &mut blocks[i] {
            ContentModelBlock::BlockGroup(ContentModelBlockGroup::ListItem(item))
                if item.blocks.iter().any(paragraph_has_selection) =>
            {
                if let Some(level) = item.levels.last_mut() {
                    if level.list_type != list_type {
                        level.list_type = list_type;
                        if list_type == ListType::Unordered {
                            level.start_number = None;
                        }
                        *changed = true;
                    }
                }
            }
            ContentModelBlock::Table(t) => {
                for cell in t.rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
                    set_list_in(&mut cell.blocks, list_type, changed);
                }
            }
            ContentModelBlock::BlockGroup(ContentModelBlockGroup::FormatContainer(c)) => {
                set_list_in(&mut c.blocks, list_type, changed);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::format::BlockFormat;
    use crate::model::selection::{ModelPosition, set_selection};

    fn doc_with(texts: &[&str]) -> ContentModelDocument {
        let mut doc = ContentModelDocument::new();
        for text in texts {
            let mut p = create_paragraph(false, &BlockFormat::default(), &SegmentFormat::default(), None);
            p.segments.push(create_text(*text, &SegmentFormat::default()));
            doc.blocks.push(ContentModelBlock::Paragraph(p));
        }
        doc
    }

    fn texts(doc: &ContentModelDocument) -> Vec<String> {
        doc.paragraphs().iter().map(|p| p.text()).collect()
    }

    #[test]
    fn test_insert_text_at_caret() {
        let mut doc = doc_with(&["abc"]);
        set_selection(&mut doc, ModelPosition::new(0, 0, 2), None);
        assert!(insert_text(&mut doc, "X"));
        assert_eq!(texts(&doc), ["abXc"]);
        let segs = &doc.paragraphs()[0].segments;
        assert!(segs[1].is_marker());
    }

    #[test]
    fn test_insert_text_replaces_range() {
        let mut doc = doc_with(&["hello", "world"]);
        set_selection(&mut doc, ModelPosition::new(0, 0, 2), Some(ModelPosition::new(1, 0, 3)));
        assert!(insert_text(&mut doc, "-"));
        assert_eq!(texts(&doc), ["he-ld"]);
    }

    #[test]
    fn test_insert_without_caret_is_noop() {
        let mut doc = doc_with(&["abc"]);
        assert!(!insert_text(&mut doc, "X"));
        assert!(!delete_selection(&mut doc));
    }

    #[test]
    fn test_split_paragraph() {
        let mut doc = doc_with(&["abcd"]);
        set_selection(&mut doc, ModelPosition::new(0, 0, 1), None);
        assert!(split_paragraph(&mut doc));
        assert_eq!(texts(&doc), ["a", "bcd"]);
        assert!(doc.paragraphs()[1].segments[0].is_marker());
    }

    #[test]
    fn test_toggle_bold_range() {
        let mut doc = doc_with(&["abc"]);
        set_selection(&mut doc, ModelPosition::new(0, 0, 0), Some(ModelPosition::new(0, 0, 3)));
        assert!(toggle_bold(&mut doc));
        assert!(doc.paragraphs()[0].segments[1].format().is_bold());
        assert!(toggle_bold(&mut doc));
        assert!(!doc.paragraphs()[0].segments[1].format().is_bold());
    }

    #[test]
    fn test_insert_entity_generates_unique_ids() {
        let mut doc = doc_with(&["abc"]);
        set_selection(&mut doc, ModelPosition::new(0, 0, 1), None);
        let first = insert_entity(&mut doc, "mention", FragmentNode::text("@a"), false, true);
        let second = insert_entity(&mut doc, "mention", FragmentNode::text("@b"), true, false);
        assert_eq!(first, "mention_1");
        assert_eq!(second, "mention_2");
        assert!(matches!(doc.blocks[1], ContentModelBlock::Entity(_)));
    }

    #[test]
    fn test_merge_cells_keeps_rows_rectangular() {
        let mut table = create_table(2, 3);
        for (r, row) in table.rows.iter_mut().enumerate() {
            for (c, cell) in row.cells.iter_mut().enumerate() {
                let mut p = create_paragraph(true, &BlockFormat::default(), &SegmentFormat::default(), None);
                p.segments.push(create_text(format!("{r}{c}"), &SegmentFormat::default()));
                cell.blocks.push(ContentModelBlock::Paragraph(p));
            }
        }
        assert!(merge_table_cells(&mut table, 0, 0, 1, 1));
        assert!(table.is_rectangular());
        assert!(table.rows[0].cells[1].span_left);
        assert!(table.rows[1].cells[0].span_above);
        assert!(table.rows[1].cells[1].span_left && table.rows[1].cells[1].span_above);
        assert_eq!(table.rows[0].cells[0].blocks.len(), 4);
        assert!(!merge_table_cells(&mut table, 1, 2, 1, 2));
    }

    #[test]
    fn test_table_format_respects_override() {
        let mut table = create_table(3, 1);
        update_metadata(&mut table.rows[2].cells[0].dataset, |_: Option<TableCellMetadata>| {
            Some(TableCellMetadata {
                bg_color_override: true,
                border_override: false,
            })
        });
        table.rows[2].cells[0].format.background_color = Some("pink".into());
        apply_table_format(
            &mut table,
            &TableMetadata {
                has_header_row: true,
                has_banded_rows: true,
                header_row_color: Some("gray".into()),
                banded_row_color: Some("yellow".into()),
                ..Default::default()
            },
        );
        assert!(table.rows[0].cells[0].is_header);
        assert_eq!(table.rows[0].cells[0].format.background_color.as_deref(), Some("gray"));
        assert_eq!(table.rows[1].cells[0].format.background_color, None);
        assert_eq!(table.rows[2].cells[0].format.background_color.as_deref(), Some("pink"));
        let meta: TableMetadata = get_metadata(&table.dataset).unwrap();
        assert!(meta.has_banded_rows);
    }

    #[test]
    fn test_set_list_type() {
        let mut doc = doc_with(&["a", "b"]);
        set_selection(&mut doc, ModelPosition::new(0, 0, 0), Some(ModelPosition::new(1, 0, 1)));
        assert!(set_list_type(&mut doc, ListType::Ordered));
        let starts: Vec<Option<u32>> = doc
            .blocks
            .iter()
            .filter_map(|b| match b {
                ContentModelBlock::BlockGroup(ContentModelBlockGroup::ListItem(item)) => {
                    Some(item.levels[0].start_number)
                }
                _ => None,
            })
            .collect();
        assert_eq!(starts, [Some(1), None]);
        assert!(set_list_type(&mut doc, ListType::Unordered));
        assert!(!set_list_type(&mut doc, ListType::Unordered));
    }
}
