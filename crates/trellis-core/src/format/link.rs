//! Hyperlink attribute handlers.

use smol_str::SmolStr;
use trellis_dom::{Dom, NodeId};

use super::{DefaultStyle, FormatContext, FormatHandler, attribute_value};
use crate::model::LinkFormat;

pub const LINK_HANDLERS: &[FormatHandler<LinkFormat>] = &[
    FormatHandler {
        key: "href",
        depends_on: &[],
        parse: |format, dom, element, _, _| {
            if let Some(href) = attribute_value(dom, element, "href") {
                format.href = Some(href.to_string());
            }
        },
        apply: |format, dom, element, _| {
            if let Some(href) = &format.href {
                dom.set_attribute(element, "href", href);
            }
        },
    },
    FormatHandler {
        key: "target",
        depends_on: &[],
        parse: |format, dom, element, _, _| read(&mut format.target, dom, element, "target"),
        apply: |format, dom, element, _| write(&format.target, dom, element, "target"),
    },
    FormatHandler {
        key: "title",
        depends_on: &[],
        parse: parse_title,
        apply: |format, dom, element, _| {
            if let Some(title) = &format.title {
                dom.set_attribute(element, "title", title);
            }
        },
    },
    FormatHandler {
        key: "rel",
        depends_on: &[],
        parse: |format, dom, element, _, _| read(&mut format.rel, dom, element, "rel"),
        apply: |format, dom, element, _| write(&format.rel, dom, element, "rel"),
    },
    FormatHandler {
        key: "name",
        depends_on: &[],
        parse: |format, dom, element, _, _| read(&mut format.name, dom, element, "name"),
        apply: |format, dom, element, _| write(&format.name, dom, element, "name"),
    },
];

fn read(slot: &mut Option<SmolStr>, dom: &Dom, element: NodeId, name: &str) {
    if let Some(value) = attribute_value(dom, element, name) {
        *slot = Some(SmolStr::new(value));
    }
}

fn write(slot: &Option<SmolStr>, dom: &mut Dom, element: NodeId, name: &str) {
    if let Some(value) = slot {
        dom.set_attribute(element, name, value);
    }
}

fn parse_title(format: &mut LinkFormat, dom: &Dom, element: NodeId, _: &DefaultStyle, _: &FormatContext) {
    if let Some(title) = dom.attribute(element, "title") {
        format.title = Some(title.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatHandlerRegistry;

    #[test]
    fn test_link_attributes_roundtrip() {
        let (mut dom, root) =
            Dom::new_with_root("div", r#"<a href="https://example.com" target="_blank" rel="noopener" title="Ex">x</a>"#);
        let a = dom.first_child(root).unwrap();
        let registry = FormatHandlerRegistry::default();
        let mut format = LinkFormat::default();
        registry.link.parse(&mut format, &dom, a, &DefaultStyle::default(), &FormatContext::default());
        assert_eq!(format.href.as_deref(), Some("https://example.com"));
        assert_eq!(format.target.as_deref(), Some("_blank"));
        assert_eq!(format.title.as_deref(), Some("Ex"));

        let copy = dom.create_element("a");
        registry.link.apply(&format, &mut dom, copy, &FormatContext::default());
        insta::assert_snapshot!(
            dom.outer_html(copy),
            @r#"<a href="https://example.com" target="_blank" title="Ex" rel="noopener"></a>"#
        );
    }
}
