//! DOM to Content Model.
//!
//! The walk dispatches every element to a processor chosen by tag. The
//! processors share one [`DomToModelContext`] holding the inherited
//! format, the open list levels and the pending selection boundaries, and
//! add blocks and segments through its [`ModelBuilder`].

mod block;
pub mod context;
mod entity;
mod general;
mod inline;
mod list;
mod table;
mod text;

use std::collections::HashMap;

use smol_str::SmolStr;
use trellis_dom::{Dom, DomSelection, NodeId};

use crate::model::{ContentModelDocument, SegmentFormat};
use crate::normalize::normalize_content_model;

pub use context::{
    CHILDREN_KEY, DomToModelContext, DomToModelOptions, ElementProcessor, ElementProcessorMap, ENTITY_KEY,
    FALLBACK_KEY, ListContext, ModelBuilder, TEXT_KEY,
};

/// Build a model of `root`'s children. `selection`, when it points into
/// the subtree, becomes selection markers and flags in the model.
#[tracing::instrument(level = "debug", target = "trellis::parse", skip_all)]
pub fn dom_to_content_model(
    dom: &Dom,
    root: NodeId,
    options: &DomToModelOptions,
    selection: Option<&DomSelection>,
) -> ContentModelDocument {
    let mut context = DomToModelContext::new(dom, root, options, selection);
    if let Some(direction) = dom.style_property(root, "direction").or_else(|| dom.attribute(root, "dir")) {
        context.is_rtl = direction.trim().eq_ignore_ascii_case("rtl");
    }
    context.process_children(root);

    let reverted = context.range.is_some_and(|r| r.range.is_reverted && !r.range.is_collapsed());
    let mut document = ContentModelDocument::with_format(&options.default_format);
    document.blocks = context.builder.finish();
    document.has_reverted_range_selection = reverted;
    normalize_content_model(&mut document);

    tracing::debug!(
        target: "trellis::parse",
        blocks = document.blocks.len(),
        nodes = dom.descendants(root).len(),
        "parsed content model"
    );
    document
}

/// Parse an HTML fragment into a model. DOM references point into a
/// scratch tree and are cleared.
pub fn html_to_content_model(html: &str, options: &DomToModelOptions) -> ContentModelDocument {
    let (dom, root) = Dom::new_with_root("div", html);
    let mut document = dom_to_content_model(&dom, root, options, None);
    document.clear_dom_refs();
    document
}

/// Walk children in order, turning element-offset selection boundaries
/// into markers as they are passed.
pub fn process_child_nodes(context: &mut DomToModelContext<'_>, element: NodeId) {
    let dom = context.dom;
    let children = dom.children(element);
    for (index, child) in children.iter().enumerate() {
        context.check_boundary(element, index);
        context.process_node(*child);
    }
    context.check_boundary(element, children.len());
}

pub(crate) fn default_processors() -> ElementProcessorMap {
    let mut map: HashMap<SmolStr, ElementProcessor> = HashMap::new();
    let mut add = |tags: &[&str], processor: ElementProcessor| {
        for tag in tags {
            map.insert(SmolStr::new(tag), processor);
        }
    };

    add(&["p", "h1", "h2", "h3", "h4", "h5", "h6"], block::process_paragraph_element);
    add(
        &[
            "div", "address", "article", "aside", "center", "details", "dialog", "dd", "dl", "dt",
            "fieldset", "figcaption", "figure", "footer", "form", "header", "hgroup", "main", "menu",
            "nav", "section", "summary",
        ],
        block::process_block_element,
    );
    add(&["blockquote", "pre"], block::process_format_container);
    add(&["hr"], block::process_divider);
    add(&["ol", "ul"], list::process_list);
    add(&["li"], list::process_list_item);
    add(&["table"], table::process_table);
    // Table parts reached outside a table grid.
    add(&["thead", "tbody", "tfoot", "tr", "td", "th"], block::process_block_element);
    add(&["br"], inline::process_br);
    add(&["img"], inline::process_image);
    add(&["a"], inline::process_link);
    add(&["code"], inline::process_code);
    add(
        &[
            "abbr", "b", "bdi", "bdo", "big", "cite", "del", "dfn", "em", "font", "i", "ins", "kbd",
            "label", "mark", "q", "s", "samp", "small", "span", "strike", "strong", "sub", "sup", "time",
            "tt", "u", "var",
        ],
        inline::process_inline,
    );
    add(
        &[
            "base", "head", "link", "meta", "noscript", "script", "style", "template", "title", "wbr",
            "caption", "colgroup", "col",
        ],
        skip,
    );
    add(&[FALLBACK_KEY], general::process_general);
    add(&[TEXT_KEY], text::process_text);
    add(&[CHILDREN_KEY], process_child_nodes);
    add(&[ENTITY_KEY], entity::process_entity);

    ElementProcessorMap::new(map)
}

fn skip(_: &mut DomToModelContext<'_>, _: NodeId) {}

/// Merge the character format an element declares into the inherited one.
pub(crate) fn inherit_segment_format(context: &mut DomToModelContext<'_>, element: NodeId, tag: &str) {
    let default = crate::format::default_style(tag);
    let format_context = context.format_context();
    let mut format: SegmentFormat = context.segment_format.clone();
    context
        .options
        .formats
        .segment
        .parse(&mut format, context.dom, element, &default, &format_context);
    context.segment_format = format;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContentModelBlock, ContentModelBlockGroup, ContentModelSegment, ListType};

    fn parse(html: &str) -> ContentModelDocument {
        html_to_content_model(html, &DomToModelOptions::default())
    }

    fn to_json(doc: &ContentModelDocument) -> String {
        serde_json::to_string(&doc.blocks).unwrap()
    }

    #[test]
    fn test_paragraph_with_bold() {
        let doc = parse("<p>Hello <b>World</b></p>");
        insta::assert_snapshot!(
            to_json(&doc),
            @r#"[{"blockType":"Paragraph","segments":[{"segmentType":"Text","text":"Hello "},{"segmentType":"Text","text":"World","format":{"fontWeight":"bold"}}],"decorator":{"tagName":"p"}}]"#
        );
    }

    #[test]
    fn test_whitespace_collapses() {
        let doc = parse("<div>  a \n  b  <span> c</span></div>");
        let paragraph = doc.blocks[0].as_paragraph().unwrap();
        assert_eq!(paragraph.text(), "a b c");
        assert!(!paragraph.is_implicit);
    }

    #[test]
    fn test_heading_decorator() {
        let doc = parse("<h1>Title</h1>");
        let paragraph = doc.blocks[0].as_paragraph().unwrap();
        let decorator = paragraph.decorator.as_ref().unwrap();
        assert_eq!(decorator.tag_name, "h1");
        assert!(decorator.format.is_bold());
        assert!(paragraph.segments[0].format().is_bold());
    }

    #[test]
    fn test_implicit_paragraphs_around_blocks() {
        let doc = parse("a<hr>b");
        assert_eq!(doc.blocks.len(), 3);
        assert!(doc.blocks[0].as_paragraph().unwrap().is_implicit);
        assert!(matches!(doc.blocks[1], ContentModelBlock::Divider(_)));
    }

    #[test]
    fn test_nested_list_flattens() {
        let doc = parse("<ol><li>a<ul><li>b</li></ul></li><li>c</li></ol>");
        let items: Vec<_> = doc
            .blocks
            .iter()
            .map(|b| match b {
                ContentModelBlock::BlockGroup(ContentModelBlockGroup::ListItem(item)) => item,
                other => panic!("unexpected block {}", other.kind()),
            })
            .collect();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].levels.len(), 1);
        assert_eq!(items[1].levels.len(), 2);
        assert_eq!(items[1].levels[1].list_type, ListType::Unordered);
        assert_eq!(items[2].levels.len(), 1);
    }

    #[test]
    fn test_list_numbering_thread() {
        let doc = parse(r#"<ol><li>a</li></ol><p>x</p><ol start="2"><li>b</li></ol><ol start="7"><li>c</li></ol>"#);
        let starts: Vec<_> = doc
            .blocks
            .iter()
            .filter_map(|b| match b {
                ContentModelBlock::BlockGroup(ContentModelBlockGroup::ListItem(item)) => Some(item.levels[0].start_number),
                _ => None,
            })
            .collect();
        assert_eq!(starts, vec![None, None, Some(7)]);
    }

    #[test]
    fn test_table_spans_are_rectangular() {
        let doc = parse(r#"<table><tr><td colspan="2">a</td></tr><tr><td>b</td><td rowspan="2">c</td></tr><tr><td>d</td></tr></table>"#);
        let table = doc.blocks[0].as_table().unwrap();
        assert!(table.is_rectangular());
        assert_eq!(table.column_count(), 2);
        assert!(table.rows[0].cells[1].span_left);
        assert!(table.rows[2].cells[1].span_above);
    }

    #[test]
    fn test_range_selection_markers() {
        let (dom, root) = Dom::new_with_root("div", "<p>abcd</p>");
        let text = dom.first_child(dom.first_child(root).unwrap()).unwrap();
        let selection = DomSelection::Range(trellis_dom::DomRange::new(
            trellis_dom::DomPosition::new(text, 1),
            trellis_dom::DomPosition::new(text, 3),
        ));
        let doc = dom_to_content_model(&dom, root, &DomToModelOptions::default(), Some(&selection));
        let segments = &doc.blocks[0].as_paragraph().unwrap().segments;
        let shape: Vec<_> = segments
            .iter()
            .map(|s| match s {
                ContentModelSegment::Text(t) => format!("{}{}", t.text, if t.is_selected { "*" } else { "" }),
                other => other.kind().to_string(),
            })
            .collect();
        assert_eq!(shape, vec!["a", "SelectionMarker", "bc*", "SelectionMarker", "d"]);
    }

    #[test]
    fn test_caret_in_empty_root() {
        let (dom, root) = Dom::new_with_root("div", "");
        let selection = DomSelection::caret(root, 0);
        let doc = dom_to_content_model(&dom, root, &DomToModelOptions::default(), Some(&selection));
        assert_eq!(doc.blocks.len(), 1);
        let paragraph = doc.blocks[0].as_paragraph().unwrap();
        assert!(paragraph.is_implicit);
        assert!(matches!(paragraph.segments[..], [ContentModelSegment::SelectionMarker(_)]));
    }

    #[test]
    fn test_entity_and_general() {
        let doc = parse(r#"<p>x<span class="_Entity _EType_mention _EId_m1 _EReadonly_1">@bob</span><my-widget>w</my-widget></p>"#);
        let segments = &doc.blocks[0].as_paragraph().unwrap().segments;
        assert!(matches!(&segments[1], ContentModelSegment::Entity(e) if e.id.as_deref() == Some("m1") && e.is_readonly));
        assert!(matches!(&segments[2], ContentModelSegment::General(_)));
    }

    #[test]
    fn test_custom_processor_override() {
        fn drop_images(_: &mut DomToModelContext<'_>, _: NodeId) {}
        let options = DomToModelOptions::default().with_processor("img", drop_images);
        let doc = html_to_content_model(r#"<p>a<img src="x.png">b</p>"#, &options);
        assert_eq!(doc.blocks[0].as_paragraph().unwrap().segments.len(), 2);
    }
}
