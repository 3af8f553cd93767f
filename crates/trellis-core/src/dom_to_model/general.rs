use trellis_dom::NodeId;

use super::DomToModelContext;
use super::block::is_block_element;
use crate::model::fingerprint::block_fingerprint;
use crate::model::{
    ContentModelBlock, ContentModelBlockGroup, ContentModelGeneralBlock, ContentModelGeneralSegment,
    ContentModelSegment, DomRef,
};

/// Elements without a dedicated processor are kept verbatim, as a block
/// or an inline segment depending on how they lay out.
pub(crate) fn process_general(context: &mut DomToModelContext<'_>, element: NodeId) {
    let dom = context.dom;
    tracing::trace!(target: "trellis::parse", tag = dom.tag_name(element).unwrap_or_default(), "general element");
    context.boundaries_inside(element, true);
    let snapshot = dom.export_fragment(element);

    if is_block_element(dom, element) {
        let mut block = ContentModelBlock::BlockGroup(ContentModelBlockGroup::General(ContentModelGeneralBlock {
            element: snapshot,
            dom_ref: DomRef::new(element),
        }));
        let fingerprint = block_fingerprint(&block, &context.segment_format, context.is_rtl);
        if let Some(dom_ref) = block.dom_ref_mut() {
            dom_ref.fingerprint = Some(fingerprint);
        }
        context.builder.add_block(block);
    } else {
        context
            .builder
            .add_segment(ContentModelSegment::General(ContentModelGeneralSegment {
                element: snapshot,
                format: context.segment_format.clone(),
                is_selected: context.is_in_selection,
                dom_ref: DomRef::new(element),
            }));
    }
    context.boundaries_inside(element, false);
}
