//! Segment writers. Every segment but an entity gets its own `span`; the
//! character format goes on that span once its content is in place, and
//! the optimizer later drops spans that end up carrying nothing.

use trellis_dom::NodeId;

use super::context::ModelToDomContext;
use crate::model::{
    ContentModelBr, ContentModelEntity, ContentModelGeneralSegment, ContentModelImage, ContentModelText, DomRef, Link,
    SegmentFormat,
};

fn open_span(context: &mut ModelToDomContext<'_>, parent: NodeId, before: Option<NodeId>) -> NodeId {
    let span = context.dom.create_element("span");
    context.insert(parent, span, before);
    span
}

fn apply_segment_format(context: &mut ModelToDomContext<'_>, span: NodeId, format: &SegmentFormat) {
    let format_context = context.format_context();
    context
        .options
        .formats
        .segment
        .apply(format, context.dom, span, &format_context);
}

fn write_link(context: &mut ModelToDomContext<'_>, parent: NodeId, link: &Link) -> NodeId {
    let anchor = context.dom.create_element("a");
    context.append(parent, anchor);
    let format_context = context.format_context();
    context
        .options
        .formats
        .link
        .apply(&link.format, context.dom, anchor, &format_context);
    context.write_dataset(anchor, link.dataset.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    anchor
}

pub(crate) fn write_text(
    context: &mut ModelToDomContext<'_>,
    parent: NodeId,
    before: Option<NodeId>,
    text: &mut ContentModelText,
) {
    let span = open_span(context, parent, before);
    let mut container = span;
    if let Some(link) = &text.link {
        container = write_link(context, container, link);
    }
    if let Some(code) = &text.code {
        let element = context.dom.create_element("code");
        context.append(container, element);
        let format_context = context.format_context();
        context
            .options
            .formats
            .segment
            .apply(&code.format, context.dom, element, &format_context);
        container = element;
    }
    let node = context.dom.create_text(&text.text);
    context.append(container, node);
    apply_segment_format(context, span, &text.format);
    text.dom_ref = DomRef::text(node, 0);
}

pub(crate) fn write_br(context: &mut ModelToDomContext<'_>, parent: NodeId, before: Option<NodeId>, br: &mut ContentModelBr) {
    let span = open_span(context, parent, before);
    let element = context.dom.create_element("br");
    context.append(span, element);
    apply_segment_format(context, span, &br.format);
    br.dom_ref = DomRef::new(element);
}

pub(crate) fn write_image(
    context: &mut ModelToDomContext<'_>,
    parent: NodeId,
    before: Option<NodeId>,
    image: &mut ContentModelImage,
) {
    let span = open_span(context, parent, before);
    let container = match &image.link {
        Some(link) => write_link(context, span, link),
        None => span,
    };
    let element = context.dom.create_element("img");
    context.append(container, element);
    if !image.src.is_empty() {
        context.dom.set_attribute(element, "src", &image.src);
    }
    if let Some(alt) = &image.alt {
        context.dom.set_attribute(element, "alt", alt);
    }
    if let Some(title) = &image.title {
        context.dom.set_attribute(element, "title", title);
    }
    let format_context = context.format_context();
    context
        .options
        .formats
        .image
        .apply(&image.image_format, context.dom, element, &format_context);
    context.write_dataset(element, image.dataset.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    apply_segment_format(context, span, &image.format);

    if image.is_selected_as_image_selection {
        context.image_selection = Some(element);
    }
    image.dom_ref = DomRef::new(element);
}

pub(crate) fn write_general_segment(
    context: &mut ModelToDomContext<'_>,
    parent: NodeId,
    before: Option<NodeId>,
    general: &mut ContentModelGeneralSegment,
) {
    let span = open_span(context, parent, before);
    let element = context.dom.import_fragment(&general.element);
    context.append(span, element);
    context.keep.insert(element);
    apply_segment_format(context, span, &general.format);
    general.dom_ref = DomRef::new(element);
}

pub(crate) fn write_entity_segment(
    context: &mut ModelToDomContext<'_>,
    parent: NodeId,
    before: Option<NodeId>,
    entity: &mut ContentModelEntity,
) {
    let wrapper = super::block::entity_wrapper(context, parent, entity);
    context.insert(parent, wrapper, before);
    entity.dom_ref = DomRef::new(wrapper);
}

#[cfg(test)]
mod tests {
    use crate::dom_to_model::{DomToModelOptions, html_to_content_model};
    use crate::model::{ContentModelBlock, ContentModelDocument, SegmentFormat, create_image, create_paragraph};
    use crate::model_to_dom::{ModelToDomOptions, content_model_to_html};

    fn roundtrip(html: &str) -> String {
        let model = html_to_content_model(html, &DomToModelOptions::default());
        content_model_to_html(&model, &ModelToDomOptions::default())
    }

    #[test]
    fn test_code_inside_link() {
        insta::assert_snapshot!(
            roundtrip(r#"<p><a href="https://a.example">x<code>y</code></a></p>"#),
            @r#"<p><a href="https://a.example">x<code>y</code></a></p>"#
        );
    }

    #[test]
    fn test_unknown_inline_kept_verbatim() {
        insta::assert_snapshot!(
            roundtrip(r#"<p>a<my-widget data-x="1">w</my-widget></p>"#),
            @r#"<p>a<my-widget data-x="1">w</my-widget></p>"#
        );
    }

    #[test]
    fn test_image_attributes() {
        let mut model = ContentModelDocument::new();
        let mut paragraph = create_paragraph(false, &Default::default(), &SegmentFormat::default(), None);
        let mut image = create_image("x.png", &SegmentFormat::default());
        if let crate::model::ContentModelSegment::Image(img) = &mut image {
            img.alt = Some("pic".into());
        }
        paragraph.segments.push(image);
        model.blocks.push(ContentModelBlock::Paragraph(paragraph));
        insta::assert_snapshot!(
            content_model_to_html(&model, &ModelToDomOptions::default()),
            @r#"<div><img src="x.png" alt="pic"></div>"#
        );
    }

    #[test]
    fn test_image_without_src() {
        let html = roundtrip(r#"<p><img alt="x"></p>"#);
        assert!(html.contains(r#"<img alt="x">"#), "{html}");
    }
}
