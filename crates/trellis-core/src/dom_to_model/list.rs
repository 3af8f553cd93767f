//! Lists flatten into sibling list items, each carrying the full stack of
//! levels it is nested in.

use smol_str::SmolStr;
use trellis_dom::NodeId;

use super::{DomToModelContext, inherit_segment_format};
use crate::format::DefaultStyle;
use crate::model::{
    ContentModelBlock, ContentModelBlockGroup, ListType, SegmentFormat, create_list_item, create_list_level,
};

pub(crate) fn process_list(context: &mut DomToModelContext<'_>, element: NodeId) {
    let dom = context.dom;
    let list_type = if dom.is_tag(element, "ol") {
        ListType::Ordered
    } else {
        ListType::Unordered
    };
    let depth = context.list.levels.len();

    let mut level = create_list_level(list_type, None);
    context.options.formats.list_level.parse(
        &mut level.format,
        dom,
        element,
        &DefaultStyle::default(),
        &context.format_context(),
    );
    level.dataset = dom
        .dataset(element)
        .into_iter()
        .map(|(k, v)| (SmolStr::new(k), v.to_string()))
        .collect();

    if context.list.threads.len() <= depth {
        context.list.threads.resize(depth + 1, 0);
    }
    if list_type == ListType::Ordered {
        let start = dom
            .attribute(element, "start")
            .and_then(|s| s.trim().parse::<u32>().ok())
            .unwrap_or(1);
        let thread = context.list.threads[depth];
        level.start_number = (start != thread + 1).then_some(start);
        context.list.threads[depth] = start.saturating_sub(1);
    }

    let owns_parent = context.list.parent.is_none();
    if owns_parent {
        context.builder.close_paragraph();
        context.list.parent = Some(context.builder.depth());
    }
    context.list.levels.push(level);

    let tag = dom.tag_name(element).unwrap_or("ul").to_string();
    context.stack(|context| {
        inherit_segment_format(context, element, &tag);
        context.process_children(element);
    });

    context.list.levels.pop();
    if owns_parent {
        context.list.parent = None;
        context.builder.close_paragraph();
    }
}

pub(crate) fn process_list_item(context: &mut DomToModelContext<'_>, element: NodeId) {
    let Some(depth) = context.list.levels.len().checked_sub(1) else {
        // A stray `li` outside any list reads like a `div`.
        super::block::process_block_element(context, element);
        return;
    };
    let dom = context.dom;
    let parent = context.list.parent.unwrap_or(context.builder.depth());

    context.list.threads.truncate(depth + 1);
    if let Some(thread) = context.list.threads.get_mut(depth) {
        *thread += 1;
    }

    let mut format_holder = SegmentFormat::default();
    context.options.formats.segment_on_block.parse(
        &mut format_holder,
        dom,
        element,
        &DefaultStyle::default(),
        &context.format_context(),
    );
    let mut item = create_list_item(context.list.levels.clone(), &format_holder);
    context.options.formats.paragraph.parse(
        &mut item.format,
        dom,
        element,
        &DefaultStyle::default(),
        &context.format_context(),
    );
    if let Some(level) = context.list.levels.last_mut() {
        level.start_number = None;
    }

    let slot = context.builder.reserve_slot(parent);
    let blocks = context.stack(|context| {
        inherit_segment_format(context, element, "li");
        context.builder.push_group();
        context.process_children(element);
        context.builder.pop_group()
    });
    item.blocks = blocks;
    context
        .builder
        .fill_slot(parent, slot, ContentModelBlock::BlockGroup(ContentModelBlockGroup::ListItem(item)));
}

#[cfg(test)]
mod tests {
    use crate::dom_to_model::{DomToModelOptions, html_to_content_model};
    use crate::model::{ContentModelBlock, ContentModelBlockGroup};

    #[test]
    fn test_stray_li_reads_as_div() {
        let doc = html_to_content_model("<li>a</li>", &DomToModelOptions::default());
        assert!(matches!(doc.blocks[0], ContentModelBlock::Paragraph(_)));
    }

    #[test]
    fn test_list_item_holds_paragraphs() {
        let doc = html_to_content_model("<ul><li><p>a</p><p>b</p></li></ul>", &DomToModelOptions::default());
        let ContentModelBlock::BlockGroup(ContentModelBlockGroup::ListItem(item)) = &doc.blocks[0] else {
            panic!("expected list item");
        };
        assert_eq!(item.blocks.len(), 2);
    }

    #[test]
    fn test_explicit_start() {
        let doc = html_to_content_model(r#"<ol start="3"><li>a</li><li>b</li></ol>"#, &DomToModelOptions::default());
        let starts: Vec<_> = doc
            .blocks
            .iter()
            .filter_map(|b| match b {
                ContentModelBlock::BlockGroup(ContentModelBlockGroup::ListItem(item)) => Some(item.levels[0].start_number),
                _ => None,
            })
            .collect();
        assert_eq!(starts, vec![Some(3), None]);
    }
}
