//! Tables become a rectangular grid. A cell covered by a `colspan` or
//! `rowspan` is kept as a placeholder flagged with the direction it is
//! merged from.

use smol_str::SmolStr;
use trellis_dom::{Dom, NodeId};

use super::{DomToModelContext, inherit_segment_format};
use crate::format::DefaultStyle;
use crate::model::fingerprint::block_fingerprint;
use crate::model::{
    BlockFormat, ContentModelBlock, ContentModelTable, ContentModelTableCell, ContentModelTableRow, Dataset, DomRef,
    create_table_cell,
};

const MAX_SPAN: usize = 1000;

fn dataset_of(dom: &Dom, element: NodeId) -> Dataset {
    dom.dataset(element)
        .into_iter()
        .map(|(k, v)| (SmolStr::new(k), v.to_string()))
        .collect()
}

fn span(dom: &Dom, element: NodeId, name: &str) -> usize {
    dom.attribute(element, name)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .clamp(1, MAX_SPAN)
}

/// A row of the grid: a `tr`, or a run of cells found outside any `tr`.
#[derive(Clone, Debug)]
enum RowSource {
    Element(NodeId),
    Implicit(Vec<NodeId>),
}

impl RowSource {
    fn cells(&self, dom: &Dom) -> Vec<NodeId> {
        match self {
            RowSource::Element(row) => dom
                .children(*row)
                .iter()
                .copied()
                .filter(|cell| is_cell(dom, *cell))
                .collect(),
            RowSource::Implicit(cells) => cells.clone(),
        }
    }

    fn element(&self) -> Option<NodeId> {
        match self {
            RowSource::Element(row) => Some(*row),
            RowSource::Implicit(_) => None,
        }
    }
}

/// The rows of a table plus the content that sits where only rows or
/// cells belong. That content is parsed ahead of the table.
#[derive(Debug, Default)]
struct TableLayout {
    rows: Vec<RowSource>,
    stray: Vec<NodeId>,
}

fn is_cell(dom: &Dom, node: NodeId) -> bool {
    matches!(dom.tag_name(node), Some("td" | "th"))
}

fn is_blank_text(dom: &Dom, node: NodeId) -> bool {
    dom.is_text(node) && dom.text(node).unwrap_or_default().chars().all(char::is_whitespace)
}

fn collect_rows(dom: &Dom, parent: NodeId, layout: &mut TableLayout) {
    let mut loose_cells: Vec<NodeId> = Vec::new();
    for child in dom.children(parent).iter().copied() {
        if is_cell(dom, child) {
            loose_cells.push(child);
            continue;
        }
        if is_blank_text(dom, child) || dom.is_comment(child) {
            continue;
        }
        if !loose_cells.is_empty() {
            layout.rows.push(RowSource::Implicit(std::mem::take(&mut loose_cells)));
        }
        match dom.tag_name(child) {
            Some("tr") => {
                layout.rows.push(RowSource::Element(child));
                layout.stray.extend(
                    dom.children(child)
                        .iter()
                        .copied()
                        .filter(|n| !is_cell(dom, *n) && !is_blank_text(dom, *n) && !dom.is_comment(*n)),
                );
            }
            Some("thead" | "tbody" | "tfoot") => collect_rows(dom, child, layout),
            Some("caption" | "colgroup" | "col") => {}
            _ => layout.stray.push(child),
        }
    }
    if !loose_cells.is_empty() {
        layout.rows.push(RowSource::Implicit(loose_cells));
    }
}

/// Rows in document order, looking through `thead`, `tbody` and `tfoot`.
fn table_layout(dom: &Dom, table: NodeId) -> TableLayout {
    let mut layout = TableLayout::default();
    collect_rows(dom, table, &mut layout);
    layout
}

pub(crate) fn process_table(context: &mut DomToModelContext<'_>, element: NodeId) {
    let dom = context.dom;
    context.builder.close_paragraph();

    let layout = table_layout(dom, element);
    if !layout.stray.is_empty() {
        tracing::debug!(target: "trellis::parse", stray = layout.stray.len(), "content outside table cells");
        for node in &layout.stray {
            context.process_node(*node);
        }
        context.builder.close_paragraph();
    }

    let mut table = ContentModelTable {
        dataset: dataset_of(dom, element),
        ..Default::default()
    };
    context.options.formats.table.parse(
        &mut table.format,
        dom,
        element,
        &DefaultStyle::default(),
        &context.format_context(),
    );
    let selection = context.table_selection.filter(|t| t.table == element);

    let mut grid: Vec<Vec<Option<ContentModelTableCell>>> = Vec::new();
    let mut row_formats: Vec<BlockFormat> = Vec::new();
    let rows = &layout.rows;
    for (row_index, row) in rows.iter().enumerate() {
        if grid.len() <= row_index {
            grid.push(Vec::new());
        }
        let mut row_format = BlockFormat::default();
        if let Some(row) = row.element() {
            context.options.formats.table_row.parse(
                &mut row_format,
                dom,
                row,
                &DefaultStyle::default(),
                &context.format_context(),
            );
        }
        row_formats.push(row_format);

        let mut column = 0;
        for cell in row.cells(dom) {
            let Some(tag @ ("td" | "th")) = dom.tag_name(cell) else {
                continue;
            };
            while grid[row_index].get(column).is_some_and(Option::is_some) {
                column += 1;
            }
            let is_header = tag == "th";
            let colspan = span(dom, cell, "colspan");
            let rowspan = span(dom, cell, "rowspan").min(rows.len() - row_index);

            let parsed = parse_cell(context, cell, is_header);
            for dr in 0..rowspan {
                let r = row_index + dr;
                while grid.len() <= r {
                    grid.push(Vec::new());
                }
                for dc in 0..colspan {
                    let c = column + dc;
                    if grid[r].len() <= c {
                        grid[r].resize(c + 1, None);
                    }
                    grid[r][c] = Some(if dr == 0 && dc == 0 {
                        parsed.clone()
                    } else {
                        create_table_cell(dc > 0, dr > 0, is_header)
                    });
                }
            }
            column += colspan;
        }
    }

    let columns = grid.iter().map(Vec::len).max().unwrap_or(0);
    table.rows = grid
        .into_iter()
        .enumerate()
        .map(|(r, cells)| {
            let mut cells: Vec<ContentModelTableCell> = cells
                .into_iter()
                .map(|c| c.unwrap_or_else(|| create_table_cell(false, false, false)))
                .collect();
            cells.resize_with(columns, || create_table_cell(false, false, false));
            if let Some(selection) = selection {
                for (c, cell) in cells.iter_mut().enumerate() {
                    cell.is_selected = selection.contains(r, c);
                }
            }
            ContentModelTableRow {
                cells,
                format: row_formats.get(r).cloned().unwrap_or_default(),
            }
        })
        .collect();

    let mut block = ContentModelBlock::Table(table);
    // A repaired table no longer matches its element, so it is never reused.
    let is_well_formed = layout.stray.is_empty() && rows.iter().all(|r| r.element().is_some());
    if is_well_formed {
        let fingerprint = block_fingerprint(&block, &context.segment_format, context.is_rtl);
        if let Some(dom_ref) = block.dom_ref_mut() {
            *dom_ref = DomRef::new(element);
            dom_ref.fingerprint = Some(fingerprint);
        }
    }
    context.builder.add_block(block);
}

fn parse_cell(context: &mut DomToModelContext<'_>, cell: NodeId, is_header: bool) -> ContentModelTableCell {
    let dom = context.dom;
    let mut parsed = create_table_cell(false, false, is_header);
    parsed.dataset = dataset_of(dom, cell);
    context.options.formats.table_cell.parse(
        &mut parsed.format,
        dom,
        cell,
        &DefaultStyle::default(),
        &context.format_context(),
    );
    let tag = if is_header { "th" } else { "td" };
    let cell_rtl = parsed.format.direction.as_deref().map(|d| d == "rtl");
    parsed.blocks = context.stack(|context| {
        if let Some(rtl) = cell_rtl {
            context.is_rtl = rtl;
        }
        inherit_segment_format(context, cell, tag);
        context.isolate_list(|context| {
            context.builder.push_group();
            context.process_children(cell);
            context.builder.pop_group()
        })
    });
    parsed
}

#[cfg(test)]
mod tests {
    use trellis_dom::{DomSelection, TableSelection};

    use super::*;
    use crate::dom_to_model::{DomToModelOptions, dom_to_content_model};

    #[test]
    fn test_table_selection_marks_cells() {
        let (dom, root) = Dom::new_with_root(
            "div",
            "<table><tbody><tr><td>a</td><td>b</td></tr><tr><td>c</td><td>d</td></tr></tbody></table>",
        );
        let table = dom.first_child(root).unwrap();
        let selection = DomSelection::Table(TableSelection {
            table,
            first_column: 1,
            last_column: 1,
            first_row: 0,
            last_row: 1,
        });
        let doc = dom_to_content_model(&dom, root, &DomToModelOptions::default(), Some(&selection));
        let model = doc.blocks[0].as_table().unwrap();
        let flags: Vec<Vec<bool>> = model
            .rows
            .iter()
            .map(|r| r.cells.iter().map(|c| c.is_selected).collect())
            .collect();
        assert_eq!(flags, vec![vec![false, true], vec![false, true]]);
    }

    #[test]
    fn test_ragged_rows_are_padded() {
        let (dom, root) = Dom::new_with_root("div", "<table><tr><td>a</td><td>b</td></tr><tr><td>c</td></tr></table>");
        let doc = dom_to_content_model(&dom, root, &DomToModelOptions::default(), None);
        let model = doc.blocks[0].as_table().unwrap();
        assert!(model.is_rectangular());
        assert_eq!(model.rows[1].cells.len(), 2);
    }

    #[test]
    fn test_header_cells_are_bold() {
        let (dom, root) = Dom::new_with_root("div", "<table><tr><th>h</th></tr></table>");
        let doc = dom_to_content_model(&dom, root, &DomToModelOptions::default(), None);
        let cell = &doc.blocks[0].as_table().unwrap().rows[0].cells[0];
        assert!(cell.is_header);
        assert!(cell.blocks[0].as_paragraph().unwrap().segments[0].format().is_bold());
    }

    fn texts(doc: &crate::model::ContentModelDocument) -> Vec<String> {
        doc.paragraphs().iter().map(|p| p.text()).collect()
    }

    #[test]
    fn test_loose_cell_gets_implicit_row() {
        let (dom, root) = Dom::new_with_root("div", "<table><td>a<tr>b");
        let doc = dom_to_content_model(&dom, root, &DomToModelOptions::default(), None);
        let table = doc.blocks[0].as_table().unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(texts(&doc), vec!["a", "b"]);
        assert!(table.dom_ref.node.is_none());
    }

    #[test]
    fn test_stray_text_is_parsed_before_table() {
        let (dom, root) = Dom::new_with_root("div", "<table><tr><td>a</td></tr>b</table>");
        let doc = dom_to_content_model(&dom, root, &DomToModelOptions::default(), None);
        assert_eq!(doc.blocks.len(), 2);
        assert!(doc.blocks[1].as_table().is_some());
        assert_eq!(texts(&doc), vec!["b", "a"]);
    }

    #[test]
    fn test_well_formed_table_keeps_its_element() {
        let (dom, root) = Dom::new_with_root("div", "<table>\n<tr>\n<td>a</td>\n</tr>\n</table>");
        let doc = dom_to_content_model(&dom, root, &DomToModelOptions::default(), None);
        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(doc.blocks[0].as_table().unwrap().dom_ref.node, dom.first_child(root));
    }
}
