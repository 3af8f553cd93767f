use trellis_dom::{NodeId, TableSelection};

use super::context::ModelToDomContext;
use crate::format::default_style;
use crate::model::ContentModelTable;

/// Bounding box of the selected cells.
pub(crate) fn selected_cells(table: &ContentModelTable, element: NodeId) -> Option<TableSelection> {
    let mut bounds: Option<TableSelection> = None;
    for (r, row) in table.rows.iter().enumerate() {
        for (c, cell) in row.cells.iter().enumerate() {
            if !cell.is_selected {
                continue;
            }
            bounds = Some(match bounds {
                None => TableSelection {
                    table: element,
                    first_column: c,
                    last_column: c,
                    first_row: r,
                    last_row: r,
                },
                Some(b) => TableSelection {
                    first_column: b.first_column.min(c),
                    last_column: b.last_column.max(c),
                    first_row: b.first_row.min(r),
                    last_row: b.last_row.max(r),
                    ..b
                },
            });
        }
    }
    bounds
}

pub(crate) fn write_table(
    context: &mut ModelToDomContext<'_>,
    parent: NodeId,
    before: Option<NodeId>,
    table: &mut ContentModelTable,
) -> Option<NodeId> {
    let options = context.options;
    let element = context.dom.create_element("table");
    context.insert(parent, element, before);
    let format_context = context.format_context();
    options
        .formats
        .table
        .apply(&table.format, context.dom, element, &format_context);
    context.write_dataset(element, table.dataset.iter().map(|(k, v)| (k.as_str(), v.as_str())));

    let tbody = context.dom.create_element("tbody");
    context.append(element, tbody);

    for r in 0..table.rows.len() {
        let tr = context.dom.create_element("tr");
        context.append(tbody, tr);
        options
            .formats
            .table_row
            .apply(&table.rows[r].format, context.dom, tr, &format_context);

        for c in 0..table.rows[r].cells.len() {
            if table.rows[r].cells[c].is_spanned() {
                continue;
            }
            let colspan = 1 + table.rows[r].cells[c + 1..]
                .iter()
                .take_while(|cell| cell.span_left && !cell.span_above)
                .count();
            let rowspan = 1 + table.rows[r + 1..]
                .iter()
                .take_while(|row| row.cells.get(c).is_some_and(|cell| cell.span_above && !cell.span_left))
                .count();

            let cell = &mut table.rows[r].cells[c];
            let tag = if cell.is_header { "th" } else { "td" };
            let td = context.dom.create_element(tag);
            context.append(tr, td);
            if colspan > 1 {
                context.dom.set_attribute(td, "colspan", &colspan.to_string());
            }
            if rowspan > 1 {
                context.dom.set_attribute(td, "rowspan", &rowspan.to_string());
            }
            options
                .formats
                .table_cell
                .apply(&cell.format, context.dom, td, &format_context);
            context.write_dataset(td, cell.dataset.iter().map(|(k, v)| (k.as_str(), v.as_str())));

            context.stack(|context| {
                context.implicit_format.merge(&default_style(tag).segment);
                if let Some(direction) = &cell.format.direction {
                    context.is_rtl = direction == "rtl";
                }
                context.isolate_list(|context| super::write_blocks(context, td, &mut cell.blocks, None));
            });
        }
    }

    if context.table_selection.is_none() {
        context.table_selection = selected_cells(table, element);
    }
    Some(element)
}
