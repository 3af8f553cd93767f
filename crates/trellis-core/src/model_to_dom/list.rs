//! List items are written into shared `ol`/`ul` elements. Consecutive
//! items reuse the list elements of the levels they have in common with
//! the previous item, so a flat run of items nests back into the tree it
//! was parsed from.

use trellis_dom::NodeId;

use super::context::{ModelToDomContext, OpenList};
use crate::model::{ContentModelListItem, ListLevel, ListType, create_list_level};

fn continues(open: &ListLevel, level: &ListLevel) -> bool {
    level.start_number.is_none()
        && open.list_type == level.list_type
        && open.format == level.format
        && open.dataset == level.dataset
}

/// Returns the new top-level list element, if this item opened one.
pub(crate) fn write_list_item(
    context: &mut ModelToDomContext<'_>,
    parent: NodeId,
    before: Option<NodeId>,
    item: &mut ContentModelListItem,
) -> Option<NodeId> {
    let options = context.options;
    let levels = if item.levels.is_empty() {
        vec![create_list_level(ListType::Unordered, None)]
    } else {
        item.levels.clone()
    };

    let shared = context
        .list
        .stack
        .iter()
        .zip(&levels)
        .take_while(|(open, level)| continues(&open.level, level))
        .count();
    context.list.stack.truncate(shared);

    let mut added = None;
    for (depth, level) in levels.iter().enumerate().skip(shared) {
        let list = context.dom.create_element(level.list_type.tag());
        match depth.checked_sub(1).and_then(|d| context.list.stack.get(d)) {
            Some(outer) => {
                let host = outer.element;
                let target = context
                    .dom
                    .last_child(host)
                    .filter(|last| context.dom.is_tag(*last, "li"))
                    .unwrap_or(host);
                context.append(target, list);
            }
            None => {
                context.insert(parent, list, before);
                added = Some(list);
            }
        }

        let format_context = context.format_context();
        options
            .formats
            .list_level
            .apply(&level.format, context.dom, list, &format_context);
        context.write_dataset(list, level.dataset.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        if level.list_type == ListType::Ordered {
            let threads = &mut context.list.threads;
            if threads.len() <= depth {
                threads.resize(depth + 1, 0);
            }
            let start = level.start_number.unwrap_or(threads[depth] + 1);
            threads[depth] = start.saturating_sub(1);
            if start != 1 {
                context.dom.set_attribute(list, "start", &start.to_string());
            }
        }
        context.list.stack.push(OpenList {
            element: list,
            level: level.clone(),
        });
    }

    let Some(host) = context.list.stack.last().map(|open| open.element) else {
        return added;
    };
    let depth = levels.len() - 1;
    let threads = &mut context.list.threads;
    threads.truncate(depth + 1);
    threads.resize(depth + 1, 0);
    threads[depth] += 1;

    let li = context.dom.create_element("li");
    context.append(host, li);
    let format_context = context.format_context();
    options
        .formats
        .paragraph
        .apply(&item.format, context.dom, li, &format_context);
    options
        .formats
        .segment_on_block
        .apply(&item.format_holder, context.dom, li, &format_context);

    context.stack(|context| {
        context.implicit_format.merge(&item.format_holder);
        if let Some(direction) = &item.format.direction {
            context.is_rtl = direction == "rtl";
        }
        context.isolate_list(|context| super::write_blocks(context, li, &mut item.blocks, None));
    });
    added
}
