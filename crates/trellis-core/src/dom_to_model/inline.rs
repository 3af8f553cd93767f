use smol_str::SmolStr;
use trellis_dom::NodeId;

use super::{DomToModelContext, inherit_segment_format};
use crate::format::DefaultStyle;
use crate::model::{
    Code, ContentModelBr, ContentModelImage, ContentModelSegment, DomRef, Link, SegmentFormat,
};

/// Formatting tags: their format flows into the children.
pub(crate) fn process_inline(context: &mut DomToModelContext<'_>, element: NodeId) {
    if super::block::is_block_element(context.dom, element) {
        super::block::process_block_element(context, element);
        return;
    }
    let tag = context.dom.tag_name(element).unwrap_or("span").to_string();
    context.stack(|context| {
        inherit_segment_format(context, element, &tag);
        context.process_children(element);
    });
}

/// Merge only the element's own style, ignoring the tag default.
fn inherit_own_style(context: &mut DomToModelContext<'_>, element: NodeId) {
    let format_context = context.format_context();
    let mut format: SegmentFormat = context.segment_format.clone();
    context.options.formats.segment.parse(
        &mut format,
        context.dom,
        element,
        &DefaultStyle::default(),
        &format_context,
    );
    context.segment_format = format;
}

pub(crate) fn process_link(context: &mut DomToModelContext<'_>, element: NodeId) {
    let dom = context.dom;
    let mut link = Link {
        dataset: dom
            .dataset(element)
            .into_iter()
            .map(|(k, v)| (SmolStr::new(k), v.to_string()))
            .collect(),
        ..Default::default()
    };
    context.options.formats.link.parse(
        &mut link.format,
        dom,
        element,
        &DefaultStyle::default(),
        &context.format_context(),
    );
    context.stack(|context| {
        inherit_own_style(context, element);
        context.link = (!link.format.is_empty()).then_some(link);
        context.process_children(element);
    });
}

pub(crate) fn process_code(context: &mut DomToModelContext<'_>, element: NodeId) {
    context.stack(|context| {
        inherit_own_style(context, element);
        context.code = Some(Code::default());
        context.process_children(element);
    });
}

pub(crate) fn process_br(context: &mut DomToModelContext<'_>, element: NodeId) {
    let br = ContentModelBr {
        format: context.segment_format.clone(),
        is_selected: context.is_in_selection,
        dom_ref: DomRef::new(element),
    };
    context.builder.add_segment(ContentModelSegment::Br(br));
}

pub(crate) fn process_image(context: &mut DomToModelContext<'_>, element: NodeId) {
    let dom = context.dom;
    let is_image_selection = context.image_selection == Some(element);
    let mut image = ContentModelImage {
        src: dom.attribute(element, "src").unwrap_or_default().to_string(),
        alt: dom.attribute(element, "alt").map(str::to_string),
        title: dom.attribute(element, "title").map(str::to_string),
        format: context.segment_format.clone(),
        link: context.link.clone(),
        dataset: dom
            .dataset(element)
            .into_iter()
            .map(|(k, v)| (SmolStr::new(k), v.to_string()))
            .collect(),
        is_selected: context.is_in_selection || is_image_selection,
        is_selected_as_image_selection: is_image_selection,
        dom_ref: DomRef::new(element),
        ..Default::default()
    };
    context.options.formats.image.parse(
        &mut image.image_format,
        dom,
        element,
        &DefaultStyle::default(),
        &context.format_context(),
    );
    context.builder.add_segment(ContentModelSegment::Image(image));
}
