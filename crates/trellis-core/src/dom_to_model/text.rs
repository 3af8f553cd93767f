use trellis_dom::NodeId;

use super::DomToModelContext;
use crate::model::{ContentModelSegment, ContentModelText, DomRef, split_at_char};

fn is_collapsible(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0c')
}

/// Collapse whitespace runs to one space. The map takes a raw character
/// offset to its offset in the collapsed text.
fn collapse(raw: &str) -> (String, Vec<usize>) {
    let mut out = String::with_capacity(raw.len());
    let mut map = Vec::with_capacity(raw.len() + 1);
    let mut out_len = 0;
    let mut in_space = false;
    for c in raw.chars() {
        map.push(out_len);
        if is_collapsible(c) {
            if !in_space {
                out.push(' ');
                out_len += 1;
            }
            in_space = true;
        } else {
            out.push(c);
            out_len += 1;
            in_space = false;
        }
    }
    map.push(out_len);
    (out, map)
}

/// A leading space is dropped at the start of a paragraph and after
/// content that already ends in whitespace or a line break.
fn trims_leading_space(context: &DomToModelContext<'_>) -> bool {
    let Some(paragraph) = context.builder.open_paragraph() else {
        return true;
    };
    match paragraph.segments.iter().rev().find(|s| !s.is_marker()) {
        None => true,
        Some(ContentModelSegment::Text(t)) => t.text.ends_with(' '),
        Some(ContentModelSegment::Br(_)) => true,
        Some(_) => false,
    }
}

pub(crate) fn process_text(context: &mut DomToModelContext<'_>, node: NodeId) {
    let dom = context.dom;
    let raw = dom.text(node).unwrap_or_default();
    let raw_len = raw.chars().count();
    let boundaries = context.boundaries_in(node);

    let (mut text, map) = if context.is_pre {
        (raw.to_string(), (0..=raw_len).collect())
    } else {
        collapse(raw)
    };
    let mut shift = 0;
    if !context.is_pre && text.starts_with(' ') && trims_leading_space(context) {
        text.remove(0);
        shift = 1;
    }

    let whitespace_only = text.chars().all(is_collapsible);
    if text.is_empty() || (whitespace_only && !context.is_pre && !context.builder.has_open_paragraph()) {
        for offset in boundaries {
            context.check_boundary(node, offset);
        }
        return;
    }

    let unchanged = text == raw;
    let len = text.chars().count();
    let mut start = 0;
    for raw_offset in boundaries {
        let cut = map[raw_offset.min(raw_len)].saturating_sub(shift).min(len);
        if cut > start {
            add_text(context, &text, start, cut, node, unchanged);
            start = cut;
        }
        context.check_boundary(node, raw_offset);
    }
    if start < len {
        add_text(context, &text, start, len, node, unchanged);
    }
}

fn add_text(context: &mut DomToModelContext<'_>, text: &str, start: usize, end: usize, node: NodeId, unchanged: bool) {
    let (_, tail) = split_at_char(text, start);
    let (piece, _) = split_at_char(tail, end - start);
    let segment = ContentModelText {
        text: piece.to_string(),
        format: context.segment_format.clone(),
        link: context.link.clone(),
        code: context.code.clone(),
        is_selected: context.is_in_selection,
        dom_ref: if unchanged { DomRef::text(node, start) } else { DomRef::default() },
    };
    context.builder.add_segment(ContentModelSegment::Text(segment));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_map() {
        let (text, map) = collapse("a  \n b");
        assert_eq!(text, "a b");
        assert_eq!(map, vec![0, 1, 2, 2, 2, 2, 3]);
    }

    #[test]
    fn test_nbsp_is_kept() {
        let (text, _) = collapse("a\u{a0}\u{a0}b");
        assert_eq!(text, "a\u{a0}\u{a0}b");
    }
}
