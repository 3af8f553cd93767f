use trellis_dom::NodeId;

use super::context::{ModelToDomContext, PendingPosition};
use super::is_live;
use crate::format::default_style;
use crate::model::entity::{entity_classes, is_entity_class, parse_entity_classes};
use crate::model::fingerprint::{container_content_hash, context_hash};
use crate::model::{
    ContentModelBlock, ContentModelDivider, ContentModelEntity, ContentModelFormatContainer,
    ContentModelGeneralBlock, ContentModelParagraph, ContentModelSegment, SegmentFormat,
};

pub(crate) fn write_paragraph(
    context: &mut ModelToDomContext<'_>,
    parent: NodeId,
    before: Option<NodeId>,
    paragraph: &mut ContentModelParagraph,
) -> Option<NodeId> {
    let needs_element = !paragraph.is_implicit
        || !paragraph.format.is_empty()
        || !paragraph.segment_format.is_empty()
        || paragraph.decorator.is_some();
    let options = context.options;

    context.stack(|context| {
        let element = needs_element.then(|| {
            let tag = paragraph.decorator.as_ref().map_or("div", |d| d.tag_name.as_str());
            let element = context.dom.create_element(tag);
            context.insert(parent, element, before);
            element
        });
        if let Some(decorator) = &paragraph.decorator {
            context.implicit_format.merge(&decorator.format);
        }
        if let Some(element) = element {
            let format_context = context.format_context();
            options
                .formats
                .paragraph
                .apply(&paragraph.format, context.dom, element, &format_context);
            options
                .formats
                .segment_on_block
                .apply(&paragraph.segment_format, context.dom, element, &format_context);
        }

        // Block background and line height are inherited by the text.
        context.implicit_format.merge(&paragraph.segment_format);
        context.implicit_format.merge(&SegmentFormat {
            background_color: paragraph.format.background_color.clone(),
            line_height: paragraph.format.line_height.clone(),
            ..Default::default()
        });
        if let Some(direction) = &paragraph.format.direction {
            context.is_rtl = direction == "rtl";
        }

        let (target, target_before) = match element {
            Some(element) => (element, None),
            None => (parent, before),
        };
        let handlers = options.handlers;
        for segment in paragraph.segments.iter_mut() {
            match segment {
                ContentModelSegment::Text(text) => (handlers.text)(context, target, target_before, text),
                ContentModelSegment::Image(image) => (handlers.image)(context, target, target_before, image),
                ContentModelSegment::Br(br) => (handlers.br)(context, target, target_before, br),
                ContentModelSegment::General(general) => {
                    (handlers.general_segment)(context, target, target_before, general)
                }
                ContentModelSegment::Entity(entity) => {
                    (handlers.entity_segment)(context, target, target_before, entity)
                }
                ContentModelSegment::SelectionMarker(_) => {}
            }
        }

        let fallback = match element {
            Some(element) => Some(PendingPosition::Start(element)),
            None if paragraph.segments.iter().any(|s| s.is_marker()) => {
                let anchor = context.dom.create_text("");
                context.insert(parent, anchor, before);
                Some(PendingPosition::Text(anchor, 0))
            }
            None => None,
        };
        if !resolve_markers(context, paragraph, fallback) {
            tracing::warn!(target: "trellis::write", "selection marker without a written neighbour");
        }
        element
    })
}

/// Selection boundary right after a segment's content.
fn boundary_after(segment: &ContentModelSegment) -> Option<PendingPosition> {
    match segment {
        ContentModelSegment::Text(text) => text
            .dom_ref
            .node
            .map(|node| PendingPosition::Text(node, text.dom_ref.offset + text.text.chars().count())),
        other => other.dom_ref().and_then(|r| r.node).map(PendingPosition::After),
    }
}

fn boundary_before(segment: &ContentModelSegment) -> Option<PendingPosition> {
    match segment {
        ContentModelSegment::Text(text) => text
            .dom_ref
            .node
            .map(|node| PendingPosition::Text(node, text.dom_ref.offset)),
        other => other.dom_ref().and_then(|r| r.node).map(PendingPosition::Before),
    }
}

/// Turn the paragraph's markers into positions next to the nodes its
/// segments point at. Nothing is recorded unless every marker resolves.
fn resolve_markers(
    context: &mut ModelToDomContext<'_>,
    paragraph: &ContentModelParagraph,
    fallback: Option<PendingPosition>,
) -> bool {
    let mut positions = Vec::new();
    for (index, segment) in paragraph.segments.iter().enumerate() {
        if !segment.is_marker() {
            continue;
        }
        let previous = paragraph.segments[..index].iter().rev().find(|s| !s.is_marker());
        let next = paragraph.segments[index + 1..].iter().find(|s| !s.is_marker());
        let position = match (previous, next) {
            (Some(segment), _) => boundary_after(segment),
            (None, Some(segment)) => boundary_before(segment),
            (None, None) => fallback,
        };
        let Some(position) = position else {
            return false;
        };
        positions.push(position);
    }
    for position in positions {
        context.push_marker(position);
    }
    true
}

/// Record the selection carried by a block that keeps its cached element.
/// False when a boundary cannot be placed in the cached nodes, in which
/// case the block has to be written again.
pub(crate) fn note_block_selection(context: &mut ModelToDomContext<'_>, block: &ContentModelBlock) -> bool {
    match block {
        ContentModelBlock::Paragraph(paragraph) => {
            for segment in &paragraph.segments {
                if let ContentModelSegment::Image(image) = segment {
                    if image.is_selected_as_image_selection {
                        match image.dom_ref.node {
                            Some(node) => context.image_selection = Some(node),
                            None => return false,
                        }
                    }
                }
            }
            let fallback = paragraph.dom_ref.node.map(PendingPosition::Start);
            resolve_markers(context, paragraph, fallback)
        }
        ContentModelBlock::Table(table) => {
            if context.table_selection.is_none() {
                if let Some(element) = table.dom_ref.node {
                    context.table_selection = super::table::selected_cells(table, element);
                }
            }
            table
                .rows
                .iter()
                .flat_map(|row| row.cells.iter())
                .flat_map(|cell| cell.blocks.iter())
                .all(|block| note_block_selection(context, block))
        }
        other => other
            .child_blocks()
            .is_none_or(|blocks| blocks.iter().all(|block| note_block_selection(context, block))),
    }
}

pub(crate) fn write_format_container(
    context: &mut ModelToDomContext<'_>,
    parent: NodeId,
    before: Option<NodeId>,
    container: &mut ContentModelFormatContainer,
) -> Option<NodeId> {
    let options = context.options;
    let shell = reusable_shell(context, parent, container);
    let element = match shell {
        Some(element) => {
            context.insert(parent, element, before);
            context.claimed.insert(element);
            element
        }
        None => {
            let element = context.dom.create_element(&container.tag_name);
            context.insert(parent, element, before);
            let format_context = context.format_context();
            options
                .formats
                .container
                .apply(&container.format, context.dom, element, &format_context);
            element
        }
    };

    let tag_format = default_style(&container.tag_name).segment;
    context.stack(|context| {
        context.implicit_format.merge(&tag_format);
        if let Some(direction) = &container.format.direction {
            context.is_rtl = direction == "rtl";
        }
        context.isolate_list(|context| super::write_blocks(context, element, &mut container.blocks, None));
    });
    Some(element)
}

/// The cached element of a container whose own tag and format are
/// unchanged. Its children are reconciled separately.
fn reusable_shell(
    context: &ModelToDomContext<'_>,
    parent: NodeId,
    container: &ContentModelFormatContainer,
) -> Option<NodeId> {
    if !context.options.reuse_cached_elements {
        return None;
    }
    let element = container.dom_ref.node.filter(|node| is_live(context.dom, *node))?;
    let recorded = container.dom_ref.fingerprint?;
    let unchanged = recorded.content == container_content_hash(container)
        && recorded.context == context_hash(&context.implicit_format, context.is_rtl);
    (unchanged && !context.claimed.contains(&element) && context.dom.parent(element) == Some(parent))
        .then_some(element)
}

pub(crate) fn write_divider(
    context: &mut ModelToDomContext<'_>,
    parent: NodeId,
    before: Option<NodeId>,
    divider: &mut ContentModelDivider,
) -> Option<NodeId> {
    let element = context.dom.create_element(&divider.tag_name);
    context.insert(parent, element, before);
    let format_context = context.format_context();
    context
        .options
        .formats
        .divider
        .apply(&divider.format, context.dom, element, &format_context);
    Some(element)
}

pub(crate) fn write_general_block(
    context: &mut ModelToDomContext<'_>,
    parent: NodeId,
    before: Option<NodeId>,
    general: &mut ContentModelGeneralBlock,
) -> Option<NodeId> {
    let element = context.dom.import_fragment(&general.element);
    context.insert(parent, element, before);
    context.keep.insert(element);
    Some(element)
}

pub(crate) fn write_entity_block(
    context: &mut ModelToDomContext<'_>,
    parent: NodeId,
    before: Option<NodeId>,
    entity: &mut ContentModelEntity,
) -> Option<NodeId> {
    let wrapper = entity_wrapper(context, parent, entity);
    context.insert(parent, wrapper, before);
    Some(wrapper)
}

/// The live wrapper of an entity, or a fresh copy of its snapshot. The
/// wrapper is moved rather than recreated so the caller's content inside
/// it keeps its identity across writes.
pub(crate) fn entity_wrapper(context: &mut ModelToDomContext<'_>, parent: NodeId, entity: &ContentModelEntity) -> NodeId {
    let live = entity
        .dom_ref
        .node
        .filter(|node| can_move_wrapper(context, parent, entity, *node));
    let wrapper = match live {
        Some(node) => node,
        None => {
            tracing::trace!(target: "trellis::write", entity_type = %entity.entity_type, "importing entity wrapper");
            context.dom.import_fragment(&entity.wrapper)
        }
    };

    let mut classes: Vec<String> = entity_classes(entity).into_iter().map(|c| c.to_string()).collect();
    classes.extend(
        context
            .dom
            .classes(wrapper)
            .into_iter()
            .filter(|c| !is_entity_class(c))
            .map(str::to_string),
    );
    context.dom.set_attribute(wrapper, "class", &classes.join(" "));
    if entity.is_readonly {
        context.dom.set_attribute(wrapper, "contenteditable", "false");
    }
    context.keep.insert(wrapper);
    context.claimed.insert(wrapper);
    wrapper
}

fn can_move_wrapper(
    context: &ModelToDomContext<'_>,
    parent: NodeId,
    entity: &ContentModelEntity,
    node: NodeId,
) -> bool {
    let dom = &*context.dom;
    if !is_live(dom, node) || context.claimed.contains(&node) || dom.contains(node, parent) {
        return false;
    }
    let same_entity = parse_entity_classes(dom.classes(node))
        .is_some_and(|info| info.id == entity.id && info.entity_type == entity.entity_type);
    let reachable = dom.is_connected(node) || context.swept.iter().any(|s| dom.contains(*s, node));
    let inside_claimed = context.claimed.iter().any(|c| dom.contains(*c, node));
    same_entity && reachable && !inside_claimed
}
