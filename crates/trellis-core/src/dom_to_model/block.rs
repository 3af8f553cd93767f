use trellis_dom::{Dom, NodeId};

use super::{DomToModelContext, inherit_segment_format};
use crate::format::{DefaultStyle, default_style};
use crate::model::fingerprint::{block_fingerprint, context_hash};
use crate::model::{
    BlockFormat, ContentModelBlock, ContentModelBlockGroup, DomRef, Fingerprint, SegmentFormat, create_divider,
    create_format_container, create_paragraph, create_paragraph_decorator,
};

/// True if the element lays out as a block, from its style or its tag.
pub(crate) fn is_block_element(dom: &Dom, element: NodeId) -> bool {
    if let Some(display) = dom.style_property(element, "display") {
        let display = display.trim();
        if display.starts_with("inline") {
            return false;
        }
        if matches!(display, "block" | "flex" | "grid" | "list-item" | "table" | "flow-root") {
            return true;
        }
    }
    dom.tag_name(element).is_some_and(|tag| default_style(tag).is_block())
}

fn parse_block_format(
    context: &DomToModelContext<'_>,
    element: NodeId,
    handlers: &crate::format::HandlerList<BlockFormat>,
) -> BlockFormat {
    let mut format = BlockFormat::default();
    handlers.parse(&mut format, context.dom, element, &DefaultStyle::default(), &context.format_context());
    format
}

fn parse_segment_on_block(context: &DomToModelContext<'_>, element: NodeId) -> SegmentFormat {
    let mut format = SegmentFormat::default();
    context.options.formats.segment_on_block.parse(
        &mut format,
        context.dom,
        element,
        &DefaultStyle::default(),
        &context.format_context(),
    );
    format
}

/// Record the element on the paragraph at `index` if nothing was added
/// after it, so the element maps to exactly one block.
fn record_paragraph(context: &mut DomToModelContext<'_>, index: usize, element: NodeId, context_fingerprint: u64) {
    if !context.builder.is_last(index) {
        return;
    }
    let Some(block) = context.builder.block_mut(index) else {
        return;
    };
    if matches!(block, ContentModelBlock::Paragraph(_)) {
        let content = crate::model::fingerprint::block_content_hash(block);
        if let Some(dom_ref) = block.dom_ref_mut() {
            *dom_ref = DomRef::new(element);
            dom_ref.fingerprint = Some(Fingerprint {
                content,
                context: context_fingerprint,
            });
        }
    }
}

/// A block element that becomes exactly one paragraph.
fn parse_as_paragraph(context: &mut DomToModelContext<'_>, element: NodeId, decorated: bool) {
    let tag = context.dom.tag_name(element).unwrap_or("div").to_string();
    let default = default_style(&tag);
    context.stack(|context| {
        let fingerprint_context = context_hash(&context.segment_format, context.is_rtl);
        let format = parse_block_format(context, element, &context.options.formats.paragraph);
        let segment_format = parse_segment_on_block(context, element);
        if let Some(direction) = &format.direction {
            context.is_rtl = direction == "rtl";
        }
        inherit_segment_format(context, element, &tag);
        if default.is_pre {
            context.is_pre = true;
        }

        let decorator = decorated.then(|| create_paragraph_decorator(&tag, &default.segment));
        context.builder.close_paragraph();
        let index = context.builder.next_index();
        context
            .builder
            .start_paragraph(create_paragraph(false, &format, &segment_format, decorator));
        context.process_children(element);
        context.builder.close_paragraph();
        record_paragraph(context, index, element, fingerprint_context);
    });
}

pub(crate) fn process_paragraph_element(context: &mut DomToModelContext<'_>, element: NodeId) {
    parse_as_paragraph(context, element, true);
}

/// `div` and friends: a paragraph when the content is inline, a format
/// container when the element carries block format around block content,
/// and otherwise transparent.
pub(crate) fn process_block_element(context: &mut DomToModelContext<'_>, element: NodeId) {
    let dom = context.dom;
    let has_block_children = dom
        .children(element)
        .iter()
        .any(|child| dom.is_element(*child) && is_block_element(dom, *child));
    if !has_block_children {
        parse_as_paragraph(context, element, false);
        return;
    }

    let format = parse_block_format(context, element, &context.options.formats.container);
    if !format.is_empty() {
        parse_format_container(context, element, format);
        return;
    }

    let tag = dom.tag_name(element).unwrap_or("div").to_string();
    context.builder.close_paragraph();
    context.stack(|context| {
        inherit_segment_format(context, element, &tag);
        context.process_children(element);
    });
    context.builder.close_paragraph();
}

/// `blockquote` and `pre` always keep their element.
pub(crate) fn process_format_container(context: &mut DomToModelContext<'_>, element: NodeId) {
    let format = parse_block_format(context, element, &context.options.formats.container);
    parse_format_container(context, element, format);
}

fn parse_format_container(context: &mut DomToModelContext<'_>, element: NodeId, format: BlockFormat) {
    let tag = context.dom.tag_name(element).unwrap_or("div").to_string();
    let default = default_style(&tag);
    let fingerprint_context = context_hash(&context.segment_format, context.is_rtl);
    let blocks = context.stack(|context| {
        if let Some(direction) = &format.direction {
            context.is_rtl = direction == "rtl";
        }
        inherit_segment_format(context, element, &tag);
        if default.is_pre {
            context.is_pre = true;
        }
        context.isolate_list(|context| {
            context.builder.push_group();
            context.process_children(element);
            context.builder.pop_group()
        })
    });

    let mut container = create_format_container(&tag, &format);
    container.blocks = blocks;
    let mut block = ContentModelBlock::BlockGroup(ContentModelBlockGroup::FormatContainer(container));
    let fingerprint = Fingerprint {
        content: crate::model::fingerprint::block_content_hash(&block),
        context: fingerprint_context,
    };
    if let Some(dom_ref) = block.dom_ref_mut() {
        *dom_ref = DomRef::new(element);
        dom_ref.fingerprint = Some(fingerprint);
    }
    context.builder.add_block(block);
}

pub(crate) fn process_divider(context: &mut DomToModelContext<'_>, element: NodeId) {
    let tag = context.dom.tag_name(element).unwrap_or("hr").to_string();
    let format = parse_block_format(context, element, &context.options.formats.divider);
    let mut divider = create_divider(&tag, &format);
    divider.is_selected = context.is_in_selection;
    let mut block = ContentModelBlock::Divider(divider);
    let fingerprint = block_fingerprint(&block, &context.segment_format, context.is_rtl);
    if let Some(dom_ref) = block.dom_ref_mut() {
        *dom_ref = DomRef::new(element);
        dom_ref.fingerprint = Some(fingerprint);
    }
    context.builder.add_block(block);
}

#[cfg(test)]
mod tests {
    use crate::dom_to_model::{DomToModelOptions, html_to_content_model};
    use crate::model::{ContentModelBlock, ContentModelBlockGroup};

    #[test]
    fn test_styled_div_becomes_container() {
        let doc = html_to_content_model(
            r#"<div style="margin-left: 40px"><p>a</p><p>b</p></div>"#,
            &DomToModelOptions::default(),
        );
        match &doc.blocks[0] {
            ContentModelBlock::BlockGroup(ContentModelBlockGroup::FormatContainer(c)) => {
                assert_eq!(c.tag_name, "div");
                assert_eq!(c.blocks.len(), 2);
                assert_eq!(c.format.margin_left.as_deref(), Some("40px"));
            }
            other => panic!("unexpected {}", other.kind()),
        }
    }

    #[test]
    fn test_plain_div_is_transparent() {
        let doc = html_to_content_model("<div><p>a</p><p>b</p></div>", &DomToModelOptions::default());
        assert_eq!(doc.blocks.len(), 2);
    }

    #[test]
    fn test_pre_keeps_whitespace() {
        let doc = html_to_content_model("<pre>a  b\nc</pre>", &DomToModelOptions::default());
        let ContentModelBlock::BlockGroup(ContentModelBlockGroup::FormatContainer(pre)) = &doc.blocks[0] else {
            panic!("expected container");
        };
        assert_eq!(pre.blocks[0].as_paragraph().unwrap().text(), "a  b\nc");
    }
}
