use trellis_dom::NodeId;

use super::DomToModelContext;
use super::block::is_block_element;
use crate::model::entity::parse_entity_classes;
use crate::model::fingerprint::block_fingerprint;
use crate::model::{ContentModelBlock, ContentModelSegment, DomRef, create_entity};

/// Entity wrappers are snapshotted whole; the parser never looks inside.
pub(crate) fn process_entity(context: &mut DomToModelContext<'_>, element: NodeId) {
    let dom = context.dom;
    let Some(info) = parse_entity_classes(dom.classes(element)) else {
        super::general::process_general(context, element);
        return;
    };

    tracing::trace!(target: "trellis::parse", entity_type = %info.entity_type, id = ?info.id, "entity");
    context.boundaries_inside(element, true);
    let mut entity = create_entity(info.entity_type, info.id, info.is_readonly, dom.export_fragment(element));
    entity.format = context.segment_format.clone();
    entity.is_selected = context.is_in_selection;
    entity.dom_ref = DomRef::new(element);

    if is_block_element(dom, element) {
        let mut block = ContentModelBlock::Entity(entity);
        let fingerprint = block_fingerprint(&block, &context.segment_format, context.is_rtl);
        if let Some(dom_ref) = block.dom_ref_mut() {
            dom_ref.fingerprint = Some(fingerprint);
        }
        context.builder.add_block(block);
    } else {
        context.builder.add_segment(ContentModelSegment::Entity(entity));
    }
    context.boundaries_inside(element, false);
}
