//! Image box handlers.

use smol_str::SmolStr;
use trellis_dom::{Dom, NodeId};

use super::block::parse_dimension;
use super::{FormatHandler, style_value};
use crate::model::ImageFormat;

pub const IMAGE_HANDLERS: &[FormatHandler<ImageFormat>] = &[
    FormatHandler {
        key: "size",
        depends_on: &[],
        parse: |format, dom, element, _, _| {
            parse_dimension(&mut format.width, dom, element, "width");
            parse_dimension(&mut format.height, dom, element, "height");
        },
        apply: |format, dom, element, _| {
            write(&format.width, dom, element, "width");
            write(&format.height, dom, element, "height");
        },
    },
    FormatHandler {
        key: "maxWidth",
        depends_on: &["size"],
        parse: |format, dom, element, _, _| read(&mut format.max_width, dom, element, "max-width"),
        apply: |format, dom, element, _| write(&format.max_width, dom, element, "max-width"),
    },
    FormatHandler {
        key: "float",
        depends_on: &[],
        parse: |format, dom, element, _, _| read(&mut format.float, dom, element, "float"),
        apply: |format, dom, element, _| write(&format.float, dom, element, "float"),
    },
    FormatHandler {
        key: "verticalAlign",
        depends_on: &[],
        parse: |format, dom, element, _, _| read(&mut format.vertical_align, dom, element, "vertical-align"),
        apply: |format, dom, element, _| write(&format.vertical_align, dom, element, "vertical-align"),
    },
    FormatHandler {
        key: "border",
        depends_on: &[],
        parse: |format, dom, element, _, _| read(&mut format.border, dom, element, "border"),
        apply: |format, dom, element, _| write(&format.border, dom, element, "border"),
    },
];

fn read(slot: &mut Option<SmolStr>, dom: &Dom, element: NodeId, name: &str) {
    if let Some(value) = style_value(dom, element, name) {
        *slot = Some(SmolStr::new(value));
    }
}

fn write(slot: &Option<SmolStr>, dom: &mut Dom, element: NodeId, name: &str) {
    if let Some(value) = slot {
        dom.set_style(element, name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{DefaultStyle, FormatContext, FormatHandlerRegistry};

    #[test]
    fn test_width_attribute_becomes_pixels() {
        let (dom, root) = Dom::new_with_root("div", r#"<img src="a.png" width="120" style="float: left">"#);
        let img = dom.first_child(root).unwrap();
        let mut format = ImageFormat::default();
        FormatHandlerRegistry::default().image.parse(
            &mut format,
            &dom,
            img,
            &DefaultStyle::default(),
            &FormatContext::default(),
        );
        assert_eq!(format.width.as_deref(), Some("120px"));
        assert_eq!(format.float.as_deref(), Some("left"));
        assert_eq!(format.height, None);
    }
}
