//! Character format handlers.
//!
//! Parsing reads the inline style first and falls back to the tag's
//! default. Applying runs on an element whose content is already written;
//! handlers that prefer a semantic tag (`<b>`, `<i>`, ...) wrap the
//! element's children in it, the rest set inline style. A value equal to
//! the inherited one is never written.

use smol_str::SmolStr;
use trellis_dom::{Dom, NodeId};

use super::{DefaultStyle, FormatContext, FormatHandler, attribute_value, style_value};
use crate::model::SegmentFormat;

pub const SEGMENT_HANDLERS: &[FormatHandler<SegmentFormat>] = &[
    FormatHandler {
        key: "superOrSubScript",
        depends_on: &[],
        parse: parse_super_or_sub,
        apply: apply_super_or_sub,
    },
    FormatHandler {
        key: "strikethrough",
        depends_on: &[],
        parse: parse_strikethrough,
        apply: apply_strikethrough,
    },
    FormatHandler {
        key: "fontFamily",
        depends_on: &[],
        parse: parse_font_family,
        apply: apply_font_family,
    },
    FormatHandler {
        key: "fontSize",
        depends_on: &[],
        parse: parse_font_size,
        apply: apply_font_size,
    },
    FormatHandler {
        key: "underline",
        depends_on: &[],
        parse: parse_underline,
        apply: apply_underline,
    },
    FormatHandler {
        key: "textColor",
        depends_on: &[],
        parse: parse_text_color,
        apply: apply_text_color,
    },
    FormatHandler {
        key: "backgroundColor",
        depends_on: &[],
        parse: parse_background_color,
        apply: apply_background_color,
    },
    FormatHandler {
        key: "bold",
        depends_on: &[],
        parse: parse_bold,
        apply: apply_bold,
    },
    FormatHandler {
        key: "italic",
        depends_on: &[],
        parse: parse_italic,
        apply: apply_italic,
    },
    FormatHandler {
        key: "letterSpacing",
        depends_on: &[],
        parse: parse_letter_spacing,
        apply: apply_letter_spacing,
    },
    FormatHandler {
        key: "lineHeight",
        depends_on: &[],
        parse: parse_line_height,
        apply: apply_line_height,
    },
];

/// Character format written as style on a block element. Background and
/// line height belong to the block format there, so they are not listed.
pub const SEGMENT_ON_BLOCK_HANDLERS: &[FormatHandler<SegmentFormat>] = &[
    FormatHandler {
        key: "fontFamily",
        depends_on: &[],
        parse: parse_font_family,
        apply: apply_font_family,
    },
    FormatHandler {
        key: "fontSize",
        depends_on: &[],
        parse: parse_font_size,
        apply: apply_font_size,
    },
    FormatHandler {
        key: "textColor",
        depends_on: &[],
        parse: parse_text_color,
        apply: apply_text_color,
    },
    FormatHandler {
        key: "bold",
        depends_on: &[],
        parse: parse_bold,
        apply: apply_font_weight_style,
    },
    FormatHandler {
        key: "italic",
        depends_on: &[],
        parse: parse_italic,
        apply: apply_font_style,
    },
    FormatHandler {
        key: "textDecoration",
        depends_on: &[],
        parse: parse_text_decoration,
        apply: apply_text_decoration_style,
    },
    FormatHandler {
        key: "letterSpacing",
        depends_on: &[],
        parse: parse_letter_spacing,
        apply: apply_letter_spacing,
    },
];

/// Move every child of `element` into a new `tag` element appended to it.
pub(crate) fn wrap_children(dom: &mut Dom, element: NodeId, tag: &str) {
    let wrapper = dom.create_element(tag);
    let moved = dom
        .move_children(element, wrapper)
        .and_then(|_| dom.append_child(element, wrapper));
    if let Err(err) = moved {
        tracing::warn!(target: "trellis::format", %err, tag, "cannot wrap element children");
    }
}

fn changed<'a, T: PartialEq>(value: &'a Option<T>, implicit: &Option<T>) -> Option<&'a T> {
    value.as_ref().filter(|_| value != implicit)
}

fn set_from_style(slot: &mut Option<SmolStr>, dom: &Dom, element: NodeId, name: &str) -> bool {
    match style_value(dom, element, name) {
        Some(value) => {
            *slot = Some(SmolStr::new(value));
            true
        }
        None => false,
    }
}

fn parse_super_or_sub(format: &mut SegmentFormat, dom: &Dom, element: NodeId, default: &DefaultStyle, _: &FormatContext) {
    match style_value(dom, element, "vertical-align") {
        Some(value @ ("super" | "sub")) => format.super_or_sub_script = Some(SmolStr::new(value)),
        _ => {
            if default.segment.super_or_sub_script.is_some() {
                format.super_or_sub_script = default.segment.super_or_sub_script.clone();
            }
        }
    }
}

fn apply_super_or_sub(format: &SegmentFormat, dom: &mut Dom, element: NodeId, context: &FormatContext) {
    match changed(&format.super_or_sub_script, &context.implicit_segment.super_or_sub_script).map(SmolStr::as_str) {
        Some("super") => wrap_children(dom, element, "sup"),
        Some("sub") => wrap_children(dom, element, "sub"),
        Some(other) => dom.set_style(element, "vertical-align", other),
        None => {}
    }
}

fn decoration(dom: &Dom, element: NodeId) -> Option<&str> {
    style_value(dom, element, "text-decoration").or_else(|| style_value(dom, element, "text-decoration-line"))
}

fn parse_decoration_flag(
    slot: &mut Option<bool>,
    line: &str,
    default: Option<bool>,
    dom: &Dom,
    element: NodeId,
) {
    match decoration(dom, element) {
        Some(value) if value.split_ascii_whitespace().any(|v| v == line) => *slot = Some(true),
        Some("none") => *slot = Some(false),
        _ => {
            if default.is_some() {
                *slot = default;
            }
        }
    }
}

fn parse_strikethrough(format: &mut SegmentFormat, dom: &Dom, element: NodeId, default: &DefaultStyle, _: &FormatContext) {
    parse_decoration_flag(&mut format.strikethrough, "line-through", default.segment.strikethrough, dom, element);
}

fn parse_underline(format: &mut SegmentFormat, dom: &Dom, element: NodeId, default: &DefaultStyle, _: &FormatContext) {
    parse_decoration_flag(&mut format.underline, "underline", default.segment.underline, dom, element);
}

fn parse_text_decoration(format: &mut SegmentFormat, dom: &Dom, element: NodeId, default: &DefaultStyle, context: &FormatContext) {
    parse_underline(format, dom, element, default, context);
    parse_strikethrough(format, dom, element, default, context);
}

fn apply_strikethrough(format: &SegmentFormat, dom: &mut Dom, element: NodeId, context: &FormatContext) {
    match changed(&format.strikethrough, &context.implicit_segment.strikethrough) {
        Some(true) => wrap_children(dom, element, "s"),
        Some(false) => dom.set_style(element, "text-decoration", "none"),
        None => {}
    }
}

fn apply_underline(format: &SegmentFormat, dom: &mut Dom, element: NodeId, context: &FormatContext) {
    match changed(&format.underline, &context.implicit_segment.underline) {
        Some(true) => wrap_children(dom, element, "u"),
        Some(false) => dom.set_style(element, "text-decoration", "none"),
        None => {}
    }
}

fn apply_text_decoration_style(format: &SegmentFormat, dom: &mut Dom, element: NodeId, context: &FormatContext) {
    let implicit = &context.implicit_segment;
    if format.underline == implicit.underline && format.strikethrough == implicit.strikethrough {
        return;
    }
    let mut lines = Vec::new();
    if format.underline == Some(true) {
        lines.push("underline");
    }
    if format.strikethrough == Some(true) {
        lines.push("line-through");
    }
    let value = if lines.is_empty() { "none".to_string() } else { lines.join(" ") };
    dom.set_style(element, "text-decoration", &value);
}

fn parse_font_family(format: &mut SegmentFormat, dom: &Dom, element: NodeId, default: &DefaultStyle, _: &FormatContext) {
    if set_from_style(&mut format.font_family, dom, element, "font-family") {
        return;
    }
    if dom.is_tag(element, "font") {
        if let Some(face) = attribute_value(dom, element, "face") {
            format.font_family = Some(SmolStr::new(face));
            return;
        }
    }
    if default.segment.font_family.is_some() {
        format.font_family = default.segment.font_family.clone();
    }
}

fn apply_font_family(format: &SegmentFormat, dom: &mut Dom, element: NodeId, context: &FormatContext) {
    if let Some(value) = changed(&format.font_family, &context.implicit_segment.font_family) {
        dom.set_style(element, "font-family", value);
    }
}

fn parse_font_size(format: &mut SegmentFormat, dom: &Dom, element: NodeId, default: &DefaultStyle, _: &FormatContext) {
    if !set_from_style(&mut format.font_size, dom, element, "font-size") && default.segment.font_size.is_some() {
        format.font_size = default.segment.font_size.clone();
    }
}

fn apply_font_size(format: &SegmentFormat, dom: &mut Dom, element: NodeId, context: &FormatContext) {
    if let Some(value) = changed(&format.font_size, &context.implicit_segment.font_size) {
        dom.set_style(element, "font-size", value);
    }
}

fn parse_text_color(format: &mut SegmentFormat, dom: &Dom, element: NodeId, _: &DefaultStyle, _: &FormatContext) {
    if set_from_style(&mut format.text_color, dom, element, "color") {
        return;
    }
    if dom.is_tag(element, "font") {
        if let Some(color) = attribute_value(dom, element, "color") {
            format.text_color = Some(SmolStr::new(color));
        }
    }
}

fn apply_text_color(format: &SegmentFormat, dom: &mut Dom, element: NodeId, context: &FormatContext) {
    if let Some(value) = changed(&format.text_color, &context.implicit_segment.text_color) {
        dom.set_style(element, "color", value);
    }
}

fn parse_background_color(format: &mut SegmentFormat, dom: &Dom, element: NodeId, _: &DefaultStyle, _: &FormatContext) {
    set_from_style(&mut format.background_color, dom, element, "background-color");
}

fn apply_background_color(format: &SegmentFormat, dom: &mut Dom, element: NodeId, context: &FormatContext) {
    if let Some(value) = changed(&format.background_color, &context.implicit_segment.background_color) {
        dom.set_style(element, "background-color", value);
    }
}

fn parse_bold(format: &mut SegmentFormat, dom: &Dom, element: NodeId, default: &DefaultStyle, _: &FormatContext) {
    if !set_from_style(&mut format.font_weight, dom, element, "font-weight") && default.segment.font_weight.is_some() {
        format.font_weight = default.segment.font_weight.clone();
    }
}

fn apply_bold(format: &SegmentFormat, dom: &mut Dom, element: NodeId, context: &FormatContext) {
    match changed(&format.font_weight, &context.implicit_segment.font_weight).map(SmolStr::as_str) {
        Some("bold") => wrap_children(dom, element, "b"),
        Some(weight) => dom.set_style(element, "font-weight", weight),
        None => {}
    }
}

fn apply_font_weight_style(format: &SegmentFormat, dom: &mut Dom, element: NodeId, context: &FormatContext) {
    if let Some(weight) = changed(&format.font_weight, &context.implicit_segment.font_weight) {
        dom.set_style(element, "font-weight", weight);
    }
}

fn parse_italic(format: &mut SegmentFormat, dom: &Dom, element: NodeId, default: &DefaultStyle, _: &FormatContext) {
    match style_value(dom, element, "font-style") {
        Some("italic" | "oblique") => format.italic = Some(true),
        Some("normal") => format.italic = Some(false),
        _ => {
            if default.segment.italic.is_some() {
                format.italic = default.segment.italic;
            }
        }
    }
}

fn apply_italic(format: &SegmentFormat, dom: &mut Dom, element: NodeId, context: &FormatContext) {
    match changed(&format.italic, &context.implicit_segment.italic) {
        Some(true) => wrap_children(dom, element, "i"),
        Some(false) => dom.set_style(element, "font-style", "normal"),
        None => {}
    }
}

fn apply_font_style(format: &SegmentFormat, dom: &mut Dom, element: NodeId, context: &FormatContext) {
    if let Some(italic) = changed(&format.italic, &context.implicit_segment.italic) {
        dom.set_style(element, "font-style", if *italic { "italic" } else { "normal" });
    }
}

fn parse_letter_spacing(format: &mut SegmentFormat, dom: &Dom, element: NodeId, _: &DefaultStyle, _: &FormatContext) {
    set_from_style(&mut format.letter_spacing, dom, element, "letter-spacing");
}

fn apply_letter_spacing(format: &SegmentFormat, dom: &mut Dom, element: NodeId, context: &FormatContext) {
    if let Some(value) = changed(&format.letter_spacing, &context.implicit_segment.letter_spacing) {
        dom.set_style(element, "letter-spacing", value);
    }
}

fn parse_line_height(format: &mut SegmentFormat, dom: &Dom, element: NodeId, _: &DefaultStyle, _: &FormatContext) {
    set_from_style(&mut format.line_height, dom, element, "line-height");
}

fn apply_line_height(format: &SegmentFormat, dom: &mut Dom, element: NodeId, context: &FormatContext) {
    if let Some(value) = changed(&format.line_height, &context.implicit_segment.line_height) {
        dom.set_style(element, "line-height", value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{FormatHandlerRegistry, default_style};

    fn parse(html: &str) -> SegmentFormat {
        let (dom, root) = Dom::new_with_root("div", html);
        let element = dom.first_child(root).unwrap();
        let tag = dom.tag_name(element).unwrap().to_string();
        let mut format = SegmentFormat::default();
        FormatHandlerRegistry::default().segment.parse(
            &mut format,
            &dom,
            element,
            &default_style(&tag),
            &FormatContext::default(),
        );
        format
    }

    fn apply(format: &SegmentFormat, implicit: SegmentFormat) -> String {
        let (mut dom, root) = Dom::new_with_root("div", "<span>x</span>");
        let span = dom.first_child(root).unwrap();
        let context = FormatContext {
            implicit_segment: implicit,
            is_rtl: false,
        };
        FormatHandlerRegistry::default().segment.apply(format, &mut dom, span, &context);
        dom.inner_html(root)
    }

    #[test]
    fn test_style_wins_over_tag_default() {
        let format = parse(r#"<b style="font-weight: normal">x</b>"#);
        assert_eq!(format.font_weight.as_deref(), Some("normal"));
        let format = parse("<strong>x</strong>");
        assert!(format.is_bold());
    }

    #[test]
    fn test_font_tag_attributes() {
        let format = parse(r#"<font face="Arial" color="red">x</font>"#);
        assert_eq!(format.font_family.as_deref(), Some("Arial"));
        assert_eq!(format.text_color.as_deref(), Some("red"));
    }

    #[test]
    fn test_decorations() {
        let format = parse(r#"<span style="text-decoration: underline line-through">x</span>"#);
        assert_eq!(format.underline, Some(true));
        assert_eq!(format.strikethrough, Some(true));
        let format = parse(r#"<u style="text-decoration: none">x</u>"#);
        assert_eq!(format.underline, Some(false));
    }

    #[test]
    fn test_apply_wraps_semantic_tags() {
        let format = SegmentFormat {
            italic: Some(true),
            font_weight: Some("bold".into()),
            text_color: Some("red".into()),
            ..Default::default()
        };
        insta::assert_snapshot!(
            apply(&format, SegmentFormat::default()),
            @r#"<span style="color: red"><i><b>x</b></i></span>"#
        );
    }

    #[test]
    fn test_apply_skips_implicit_values() {
        let format = SegmentFormat::bold();
        assert_eq!(apply(&format, SegmentFormat::bold()), "<span>x</span>");

        let normal = SegmentFormat {
            font_weight: Some("normal".into()),
            ..Default::default()
        };
        assert_eq!(
            apply(&normal, SegmentFormat::bold()),
            r#"<span style="font-weight: normal">x</span>"#
        );
    }
}
