//! Block format handlers.
//!
//! Block handlers only look at the element's own style and attributes;
//! nothing here is inherited from the tag.

use smol_str::SmolStr;
use trellis_dom::{Dom, NodeId};

use super::{DefaultStyle, FormatContext, FormatHandler, attribute_value, style_value};
use crate::model::BlockFormat;

const DIRECTION: FormatHandler<BlockFormat> = FormatHandler {
    key: "direction",
    depends_on: &[],
    parse: parse_direction,
    apply: apply_direction,
};

const TEXT_ALIGN: FormatHandler<BlockFormat> = FormatHandler {
    key: "textAlign",
    depends_on: &["direction"],
    parse: parse_text_align,
    apply: apply_text_align,
};

const MARGIN: FormatHandler<BlockFormat> = FormatHandler {
    key: "margin",
    depends_on: &[],
    parse: parse_margin,
    apply: apply_margin,
};

const PADDING: FormatHandler<BlockFormat> = FormatHandler {
    key: "padding",
    depends_on: &[],
    parse: parse_padding,
    apply: apply_padding,
};

const BORDER: FormatHandler<BlockFormat> = FormatHandler {
    key: "border",
    depends_on: &[],
    parse: parse_border,
    apply: apply_border,
};

const BORDER_COLLAPSE: FormatHandler<BlockFormat> = FormatHandler {
    key: "borderCollapse",
    depends_on: &[],
    parse: parse_border_collapse,
    apply: apply_border_collapse,
};

const BACKGROUND_COLOR: FormatHandler<BlockFormat> = FormatHandler {
    key: "backgroundColor",
    depends_on: &[],
    parse: parse_background_color,
    apply: apply_background_color,
};

const LINE_HEIGHT: FormatHandler<BlockFormat> = FormatHandler {
    key: "lineHeight",
    depends_on: &[],
    parse: parse_line_height,
    apply: apply_line_height,
};

const WHITE_SPACE: FormatHandler<BlockFormat> = FormatHandler {
    key: "whiteSpace",
    depends_on: &[],
    parse: parse_white_space,
    apply: apply_white_space,
};

const TEXT_INDENT: FormatHandler<BlockFormat> = FormatHandler {
    key: "textIndent",
    depends_on: &[],
    parse: parse_text_indent,
    apply: apply_text_indent,
};

const SIZE: FormatHandler<BlockFormat> = FormatHandler {
    key: "size",
    depends_on: &[],
    parse: parse_size,
    apply: apply_size,
};

const VERTICAL_ALIGN: FormatHandler<BlockFormat> = FormatHandler {
    key: "verticalAlign",
    depends_on: &[],
    parse: parse_vertical_align,
    apply: apply_vertical_align,
};

const LIST_STYLE_TYPE: FormatHandler<BlockFormat> = FormatHandler {
    key: "listStyleType",
    depends_on: &[],
    parse: parse_list_style_type,
    apply: apply_list_style_type,
};

pub const PARAGRAPH_HANDLERS: &[FormatHandler<BlockFormat>] = &[
    DIRECTION,
    TEXT_ALIGN,
    MARGIN,
    PADDING,
    BACKGROUND_COLOR,
    LINE_HEIGHT,
    WHITE_SPACE,
    TEXT_INDENT,
];

pub const CONTAINER_HANDLERS: &[FormatHandler<BlockFormat>] = &[
    DIRECTION,
    TEXT_ALIGN,
    MARGIN,
    PADDING,
    BORDER,
    BACKGROUND_COLOR,
    LINE_HEIGHT,
    WHITE_SPACE,
    TEXT_INDENT,
    SIZE,
];

pub const TABLE_HANDLERS: &[FormatHandler<BlockFormat>] = &[
    DIRECTION,
    MARGIN,
    BORDER,
    BORDER_COLLAPSE,
    BACKGROUND_COLOR,
    SIZE,
];

pub const TABLE_CELL_HANDLERS: &[FormatHandler<BlockFormat>] = &[
    DIRECTION,
    TEXT_ALIGN,
    VERTICAL_ALIGN,
    PADDING,
    BORDER,
    BACKGROUND_COLOR,
    SIZE,
];

pub const TABLE_ROW_HANDLERS: &[FormatHandler<BlockFormat>] = &[BACKGROUND_COLOR, SIZE];

pub const LIST_LEVEL_HANDLERS: &[FormatHandler<BlockFormat>] = &[
    DIRECTION,
    TEXT_ALIGN,
    MARGIN,
    PADDING,
    LIST_STYLE_TYPE,
];

pub const DIVIDER_HANDLERS: &[FormatHandler<BlockFormat>] = &[MARGIN, BORDER, SIZE];

fn read(slot: &mut Option<SmolStr>, value: Option<&str>) {
    if let Some(value) = value {
        *slot = Some(SmolStr::new(value));
    }
}

fn write(dom: &mut Dom, element: NodeId, name: &str, value: &Option<SmolStr>) {
    if let Some(value) = value {
        dom.set_style(element, name, value);
    }
}

fn parse_direction(format: &mut BlockFormat, dom: &Dom, element: NodeId, _: &DefaultStyle, _: &FormatContext) {
    let value = style_value(dom, element, "direction").or_else(|| attribute_value(dom, element, "dir"));
    match value.map(str::to_ascii_lowercase).as_deref() {
        Some("rtl") => format.direction = Some(SmolStr::new_static("rtl")),
        Some("ltr") => format.direction = Some(SmolStr::new_static("ltr")),
        _ => {}
    }
}

fn apply_direction(format: &BlockFormat, dom: &mut Dom, element: NodeId, _: &FormatContext) {
    write(dom, element, "direction", &format.direction);
}

fn is_rtl(format: &BlockFormat, context: &FormatContext) -> bool {
    match format.direction.as_deref() {
        Some(direction) => direction == "rtl",
        None => context.is_rtl,
    }
}

/// Physical alignments are stored as logical `start`/`end` so they survive
/// a direction change.
fn parse_text_align(format: &mut BlockFormat, dom: &Dom, element: NodeId, _: &DefaultStyle, context: &FormatContext) {
    let Some(value) = style_value(dom, element, "text-align").or_else(|| attribute_value(dom, element, "align")) else {
        return;
    };
    let rtl = is_rtl(format, context);
    let logical = match value.to_ascii_lowercase().as_str() {
        "left" => if rtl { "end" } else { "start" },
        "right" => if rtl { "start" } else { "end" },
        "center" | "middle" => "center",
        "justify" => "justify",
        "start" => "start",
        "end" => "end",
        _ => return,
    };
    format.text_align = Some(SmolStr::new_static(logical));
}

fn apply_text_align(format: &BlockFormat, dom: &mut Dom, element: NodeId, context: &FormatContext) {
    let Some(align) = format.text_align.as_deref() else {
        return;
    };
    let rtl = is_rtl(format, context);
    let physical = match align {
        "start" => if rtl { "right" } else { "left" },
        "end" => if rtl { "left" } else { "right" },
        other => other,
    };
    dom.set_style(element, "text-align", physical);
}

/// Expand a 1-4 value box shorthand into top, right, bottom, left.
fn expand_box(value: &str) -> Option<[&str; 4]> {
    let parts: Vec<&str> = value.split_ascii_whitespace().collect();
    match parts.as_slice() {
        [all] => Some([*all; 4]),
        [vertical, horizontal] => Some([*vertical, *horizontal, *vertical, *horizontal]),
        [top, horizontal, bottom] => Some([*top, *horizontal, *bottom, *horizontal]),
        [top, right, bottom, left] => Some([*top, *right, *bottom, *left]),
        _ => None,
    }
}

fn parse_box(sides: [&mut Option<SmolStr>; 4], dom: &Dom, element: NodeId, property: &str) {
    let expanded = style_value(dom, element, property).and_then(expand_box);
    for (i, (slot, side)) in sides.into_iter().zip(["top", "right", "bottom", "left"]).enumerate() {
        if let Some(shorthand) = expanded {
            *slot = Some(SmolStr::new(shorthand[i]));
        }
        read(slot, style_value(dom, element, &format!("{property}-{side}")));
    }
}

fn apply_box(sides: [&Option<SmolStr>; 4], dom: &mut Dom, element: NodeId, property: &str) {
    if sides.iter().all(|s| s.is_some() && *s == sides[0]) {
        write(dom, element, property, sides[0]);
        return;
    }
    for (slot, side) in sides.into_iter().zip(["top", "right", "bottom", "left"]) {
        write(dom, element, &format!("{property}-{side}"), slot);
    }
}

fn parse_margin(format: &mut BlockFormat, dom: &Dom, element: NodeId, _: &DefaultStyle, _: &FormatContext) {
    parse_box(
        [&mut format.margin_top, &mut format.margin_right, &mut format.margin_bottom, &mut format.margin_left],
        dom,
        element,
        "margin",
    );
}

fn apply_margin(format: &BlockFormat, dom: &mut Dom, element: NodeId, _: &FormatContext) {
    apply_box(
        [&format.margin_top, &format.margin_right, &format.margin_bottom, &format.margin_left],
        dom,
        element,
        "margin",
    );
}

fn parse_padding(format: &mut BlockFormat, dom: &Dom, element: NodeId, _: &DefaultStyle, _: &FormatContext) {
    parse_box(
        [&mut format.padding_top, &mut format.padding_right, &mut format.padding_bottom, &mut format.padding_left],
        dom,
        element,
        "padding",
    );
}

fn apply_padding(format: &BlockFormat, dom: &mut Dom, element: NodeId, _: &FormatContext) {
    apply_box(
        [&format.padding_top, &format.padding_right, &format.padding_bottom, &format.padding_left],
        dom,
        element,
        "padding",
    );
}

fn parse_border(format: &mut BlockFormat, dom: &Dom, element: NodeId, _: &DefaultStyle, _: &FormatContext) {
    let shorthand = style_value(dom, element, "border");
    let sides = [
        (&mut format.border_top, "border-top"),
        (&mut format.border_right, "border-right"),
        (&mut format.border_bottom, "border-bottom"),
        (&mut format.border_left, "border-left"),
    ];
    for (slot, name) in sides {
        read(slot, shorthand);
        read(slot, style_value(dom, element, name));
    }
}

fn apply_border(format: &BlockFormat, dom: &mut Dom, element: NodeId, _: &FormatContext) {
    apply_box(
        [&format.border_top, &format.border_right, &format.border_bottom, &format.border_left],
        dom,
        element,
        "border",
    );
}

fn parse_border_collapse(format: &mut BlockFormat, dom: &Dom, element: NodeId, _: &DefaultStyle, _: &FormatContext) {
    read(&mut format.border_collapse, style_value(dom, element, "border-collapse"));
}

fn apply_border_collapse(format: &BlockFormat, dom: &mut Dom, element: NodeId, _: &FormatContext) {
    write(dom, element, "border-collapse", &format.border_collapse);
}

fn parse_background_color(format: &mut BlockFormat, dom: &Dom, element: NodeId, _: &DefaultStyle, _: &FormatContext) {
    read(
        &mut format.background_color,
        style_value(dom, element, "background-color").or_else(|| attribute_value(dom, element, "bgcolor")),
    );
}

fn apply_background_color(format: &BlockFormat, dom: &mut Dom, element: NodeId, _: &FormatContext) {
    write(dom, element, "background-color", &format.background_color);
}

fn parse_line_height(format: &mut BlockFormat, dom: &Dom, element: NodeId, _: &DefaultStyle, _: &FormatContext) {
    read(&mut format.line_height, style_value(dom, element, "line-height"));
}

fn apply_line_height(format: &BlockFormat, dom: &mut Dom, element: NodeId, _: &FormatContext) {
    write(dom, element, "line-height", &format.line_height);
}

fn parse_white_space(format: &mut BlockFormat, dom: &Dom, element: NodeId, _: &DefaultStyle, _: &FormatContext) {
    read(&mut format.white_space, style_value(dom, element, "white-space"));
}

fn apply_white_space(format: &BlockFormat, dom: &mut Dom, element: NodeId, _: &FormatContext) {
    write(dom, element, "white-space", &format.white_space);
}

fn parse_text_indent(format: &mut BlockFormat, dom: &Dom, element: NodeId, _: &DefaultStyle, _: &FormatContext) {
    read(&mut format.text_indent, style_value(dom, element, "text-indent"));
}

fn apply_text_indent(format: &BlockFormat, dom: &mut Dom, element: NodeId, _: &FormatContext) {
    write(dom, element, "text-indent", &format.text_indent);
}

/// Legacy `width="100"` means pixels.
fn dimension_attribute(dom: &Dom, element: NodeId, name: &str) -> Option<String> {
    let value = attribute_value(dom, element, name)?;
    if value.chars().all(|c| c.is_ascii_digit()) {
        Some(format!("{value}px"))
    } else {
        Some(value.to_string())
    }
}

pub(crate) fn parse_dimension(slot: &mut Option<SmolStr>, dom: &Dom, element: NodeId, name: &str) {
    if let Some(value) = style_value(dom, element, name) {
        *slot = Some(SmolStr::new(value));
    } else if let Some(value) = dimension_attribute(dom, element, name) {
        *slot = Some(SmolStr::new(value));
    }
}

fn parse_size(format: &mut BlockFormat, dom: &Dom, element: NodeId, _: &DefaultStyle, _: &FormatContext) {
    parse_dimension(&mut format.width, dom, element, "width");
    parse_dimension(&mut format.height, dom, element, "height");
}

fn apply_size(format: &BlockFormat, dom: &mut Dom, element: NodeId, _: &FormatContext) {
    write(dom, element, "width", &format.width);
    write(dom, element, "height", &format.height);
}

fn parse_vertical_align(format: &mut BlockFormat, dom: &Dom, element: NodeId, _: &DefaultStyle, _: &FormatContext) {
    read(
        &mut format.vertical_align,
        style_value(dom, element, "vertical-align").or_else(|| attribute_value(dom, element, "valign")),
    );
}

fn apply_vertical_align(format: &BlockFormat, dom: &mut Dom, element: NodeId, _: &FormatContext) {
    write(dom, element, "vertical-align", &format.vertical_align);
}

fn parse_list_style_type(format: &mut BlockFormat, dom: &Dom, element: NodeId, _: &DefaultStyle, _: &FormatContext) {
    if let Some(value) = style_value(dom, element, "list-style-type") {
        format.list_style_type = Some(SmolStr::new(value));
        return;
    }
    let mapped = match attribute_value(dom, element, "type") {
        Some("1") => "decimal",
        Some("a") => "lower-alpha",
        Some("A") => "upper-alpha",
        Some("i") => "lower-roman",
        Some("I") => "upper-roman",
        Some(other @ ("disc" | "circle" | "square")) => other,
        _ => return,
    };
    format.list_style_type = Some(SmolStr::new(mapped));
}

fn apply_list_style_type(format: &BlockFormat, dom: &mut Dom, element: NodeId, _: &FormatContext) {
    write(dom, element, "list-style-type", &format.list_style_type);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatHandlerRegistry;

    fn parse_paragraph(html: &str, is_rtl: bool) -> BlockFormat {
        let (dom, root) = Dom::new_with_root("div", html);
        let element = dom.first_child(root).unwrap();
        let mut format = BlockFormat::default();
        let context = FormatContext {
            is_rtl,
            ..Default::default()
        };
        FormatHandlerRegistry::default().container.parse(
            &mut format,
            &dom,
            element,
            &DefaultStyle::default(),
            &context,
        );
        format
    }

    #[test]
    fn test_alignment_is_logical() {
        let format = parse_paragraph(r#"<p style="text-align: right">x</p>"#, false);
        assert_eq!(format.text_align.as_deref(), Some("end"));

        let format = parse_paragraph(r#"<p dir="rtl" align="right">x</p>"#, false);
        assert_eq!(format.direction.as_deref(), Some("rtl"));
        assert_eq!(format.text_align.as_deref(), Some("start"));

        let format = parse_paragraph(r#"<p style="text-align: left">x</p>"#, true);
        assert_eq!(format.text_align.as_deref(), Some("end"));
    }

    #[test]
    fn test_box_shorthand_and_longhand() {
        let format = parse_paragraph(r#"<div style="margin: 1px 2px; margin-left: 5px">x</div>"#, false);
        assert_eq!(format.margin_top.as_deref(), Some("1px"));
        assert_eq!(format.margin_right.as_deref(), Some("2px"));
        assert_eq!(format.margin_bottom.as_deref(), Some("1px"));
        assert_eq!(format.margin_left.as_deref(), Some("5px"));
    }

    #[test]
    fn test_apply_collapses_equal_sides() {
        let (mut dom, root) = Dom::new_with_root("div", "<div>x</div>");
        let element = dom.first_child(root).unwrap();
        let format = BlockFormat {
            padding_top: Some("4px".into()),
            padding_right: Some("4px".into()),
            padding_bottom: Some("4px".into()),
            padding_left: Some("4px".into()),
            text_align: Some("end".into()),
            direction: Some("rtl".into()),
            ..Default::default()
        };
        FormatHandlerRegistry::default().container.apply(&format, &mut dom, element, &FormatContext::default());
        insta::assert_snapshot!(
            dom.inner_html(root),
            @r#"<div style="direction: rtl; text-align: left; padding: 4px">x</div>"#
        );
    }

    #[test]
    fn test_legacy_attributes() {
        let (dom, root) = Dom::new_with_root("div", r#"<table><tr><td width="40" valign="top" bgcolor="red">x</td></tr></table>"#);
        let td = dom
            .descendants(root)
            .into_iter()
            .find(|n| dom.is_tag(*n, "td"))
            .unwrap();
        let mut format = BlockFormat::default();
        FormatHandlerRegistry::default().table_cell.parse(
            &mut format,
            &dom,
            td,
            &DefaultStyle::default(),
            &FormatContext::default(),
        );
        assert_eq!(format.width.as_deref(), Some("40px"));
        assert_eq!(format.vertical_align.as_deref(), Some("top"));
        assert_eq!(format.background_color.as_deref(), Some("red"));
    }
}
