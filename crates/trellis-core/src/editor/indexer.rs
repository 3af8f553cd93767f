//! Text node index over a cached model.
//!
//! Every text segment that still points at the text node it was parsed from
//! or written to is indexed by that node. Character-data changes on an
//! indexed node can then be patched into the model without a re-parse, and
//! live carets inside indexed nodes map straight to model positions.

use std::collections::HashMap;

use trellis_dom::{DomPosition, DomSelection, NodeId};

use crate::model::{ContentModelDocument, ContentModelSegment, ModelPosition, clear_selection, set_selection};

/// Where one text segment lives inside a text node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextSlot {
    /// Paragraph index in document order.
    pub paragraph: usize,
    pub segment: usize,
    /// Character offset of the segment inside the node.
    pub offset: usize,
    pub len: usize,
}

#[derive(Clone, Debug, Default)]
pub struct DomIndex {
    text: HashMap<NodeId, Vec<TextSlot>>,
}

impl DomIndex {
    pub fn build(doc: &ContentModelDocument) -> Self {
        let mut text: HashMap<NodeId, Vec<TextSlot>> = HashMap::new();
        for (pi, paragraph) in doc.paragraphs().iter().enumerate() {
            for (si, segment) in paragraph.segments.iter().enumerate() {
                let ContentModelSegment::Text(t) = segment else {
                    continue;
                };
                let Some(node) = t.dom_ref.node else {
                    continue;
                };
                text.entry(node).or_default().push(TextSlot {
                    paragraph: pi,
                    segment: si,
                    offset: t.dom_ref.offset,
                    len: t.char_len(),
                });
            }
        }
        for slots in text.values_mut() {
            slots.sort_by_key(|s| s.offset);
        }
        tracing::trace!(target: "trellis::cache", nodes = text.len(), "indexed text nodes");
        Self { text }
    }

    /// Number of indexed text nodes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.text.contains_key(&node)
    }

    pub fn slots(&self, node: NodeId) -> &[TextSlot] {
        self.text.get(&node).map(Vec::as_slice).unwrap_or_default()
    }

    /// The text the model holds for `node`. `None` unless the node's
    /// segments cover it contiguously from the first character.
    pub fn model_text(&self, doc: &ContentModelDocument, node: NodeId) -> Option<String> {
        let slots = self.text.get(&node)?;
        let paragraphs = doc.paragraphs();
        let mut expected = 0;
        let mut out = String::new();
        for slot in slots {
            if slot.offset != expected {
                return None;
            }
            let text = paragraphs.get(slot.paragraph)?.segments.get(slot.segment)?.as_text()?;
            out.push_str(&text.text);
            expected += slot.len;
        }
        Some(out)
    }

    /// Map a boundary point inside an indexed text node to a model
    /// position. A point between two segments belongs to the first.
    pub fn model_position(&self, position: DomPosition) -> Option<ModelPosition> {
        self.text
            .get(&position.node)?
            .iter()
            .find(|slot| slot.offset <= position.offset && position.offset <= slot.offset + slot.len)
            .map(|slot| ModelPosition::new(slot.paragraph, slot.segment, position.offset - slot.offset))
    }

    /// Patch the model after the text of `node` changed from `old` (which
    /// the model holds) to `current`. Later segments in the same node have
    /// their offsets shifted. Returns false when the edit spans more than
    /// one segment; the model is left untouched then.
    pub fn apply_text_change(&mut self, doc: &mut ContentModelDocument, node: NodeId, old: &str, current: &str) -> bool {
        let Some(slots) = self.text.get_mut(&node) else {
            return false;
        };
        let old_chars: Vec<char> = old.chars().collect();
        let new_chars: Vec<char> = current.chars().collect();
        let prefix = old_chars.iter().zip(&new_chars).take_while(|(a, b)| a == b).count();
        let room = old_chars.len().min(new_chars.len()) - prefix;
        let suffix = old_chars
            .iter()
            .rev()
            .zip(new_chars.iter().rev())
            .take(room)
            .take_while(|(a, b)| a == b)
            .count();
        let removed_end = old_chars.len() - suffix;
        let inserted: String = new_chars[prefix..new_chars.len() - suffix].iter().collect();

        let Some(target) = slots
            .iter()
            .position(|s| s.offset <= prefix && removed_end <= s.offset + s.len)
        else {
            return false;
        };
        let slot = slots[target];
        let mut paragraphs = doc.paragraphs_mut();
        let Some(text) = paragraphs
            .get_mut(slot.paragraph)
            .and_then(|p| p.segments.get_mut(slot.segment))
            .and_then(ContentModelSegment::as_text_mut)
        else {
            return false;
        };
        let chars: Vec<char> = text.text.chars().collect();
        let (start, end) = (prefix - slot.offset, removed_end - slot.offset);
        if end > chars.len() {
            return false;
        }
        let mut patched: String = chars[..start].iter().collect();
        patched.push_str(&inserted);
        patched.extend(&chars[end..]);
        text.text = patched;
        let new_len = text.char_len();

        slots[target].len = new_len;
        let mut next_offset = slot.offset + new_len;
        for later in &mut slots[target + 1..] {
            later.offset = next_offset;
            next_offset += later.len;
            if let Some(t) = paragraphs
                .get_mut(later.paragraph)
                .and_then(|p| p.segments.get_mut(later.segment))
                .and_then(ContentModelSegment::as_text_mut)
            {
                t.dom_ref.offset = later.offset;
            }
        }
        tracing::trace!(
            target: "trellis::cache",
            paragraph = slot.paragraph,
            segment = slot.segment,
            removed = end - start,
            inserted = %inserted,
            "patched text segment"
        );
        true
    }
}

/// Replace the model selection with the live one. Returns false when the
/// live selection cannot be located through indexed nodes; the model is
/// left without a selection then.
pub fn reconcile_selection(doc: &mut ContentModelDocument, selection: Option<&DomSelection>) -> bool {
    clear_selection(doc);
    let Some(selection) = selection else {
        return true;
    };
    match selection {
        DomSelection::Range(range) => {
            // Built after clearing: removing markers shifts segment indices.
            let index = DomIndex::build(doc);
            let (Some(start), Some(end)) = (index.model_position(range.start), index.model_position(range.end)) else {
                return false;
            };
            let collapsed = range.is_collapsed();
            set_selection(doc, start, (!collapsed).then_some(end));
            doc.has_reverted_range_selection = range.is_reverted && !collapsed;
            true
        }
        DomSelection::Image(image) => {
            let mut found = false;
            for paragraph in doc.paragraphs_mut() {
                for segment in &mut paragraph.segments {
                    if let ContentModelSegment::Image(img) = segment {
                        if img.dom_ref.node == Some(*image) {
                            img.is_selected = true;
                            img.is_selected_as_image_selection = true;
                            found = true;
                        }
                    }
                }
            }
            found
        }
        DomSelection::Table(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use trellis_dom::{Dom, DomRange};

    use super::*;
    use crate::dom_to_model::{DomToModelOptions, dom_to_content_model};
    use crate::model::selection::find_marker;

    fn parsed(html: &str) -> (Dom, NodeId, ContentModelDocument) {
        let (dom, root) = Dom::new_with_root("div", html);
        let model = dom_to_content_model(&dom, root, &DomToModelOptions::default(), None);
        (dom, root, model)
    }

    #[test]
    fn test_indexes_parsed_text_nodes() {
        let (dom, root, model) = parsed("<p>ab<b>c</b></p>");
        let paragraph = dom.first_child(root).unwrap();
        let ab = dom.first_child(paragraph).unwrap();
        let index = DomIndex::build(&model);
        assert_eq!(index.len(), 2);
        assert_eq!(index.model_text(&model, ab).as_deref(), Some("ab"));
        assert_eq!(
            index.model_position(DomPosition::new(ab, 1)),
            Some(ModelPosition::new(0, 0, 1))
        );
    }

    #[test]
    fn test_text_change_shifts_later_segments() {
        let (mut dom, root, mut model) = parsed("<p>abc</p>");
        let paragraph = dom.first_child(root).unwrap();
        let node = dom.first_child(paragraph).unwrap();
        reconcile_selection(&mut model, Some(&DomSelection::caret(node, 1)));

        let mut index = DomIndex::build(&model);
        assert_eq!(index.slots(node).len(), 2);
        dom.set_text(node, "aXbc");
        assert!(index.apply_text_change(&mut model, node, "abc", "aXbc"));

        let texts: Vec<_> = model.paragraphs()[0]
            .segments
            .iter()
            .filter_map(|s| s.as_text())
            .map(|t| (t.text.clone(), t.dom_ref.offset))
            .collect();
        assert_eq!(texts, vec![("aX".to_string(), 0), ("bc".to_string(), 2)]);
        assert_eq!(index.model_text(&model, node).as_deref(), Some("aXbc"));
    }

    #[test]
    fn test_edit_across_segments_is_refused() {
        let (dom, root, mut model) = parsed("<p>abcd</p>");
        let paragraph = dom.first_child(root).unwrap();
        let node = dom.first_child(paragraph).unwrap();
        reconcile_selection(&mut model, Some(&DomSelection::caret(node, 2)));
        let mut index = DomIndex::build(&model);
        assert!(!index.apply_text_change(&mut model, node, "abcd", "ad"));
        assert_eq!(model.paragraphs()[0].text(), "abcd");
    }

    #[test]
    fn test_reconcile_range_selection() {
        let (dom, root, mut model) = parsed("<p>hello</p>");
        let paragraph = dom.first_child(root).unwrap();
        let node = dom.first_child(paragraph).unwrap();
        let mut range = DomRange::new(DomPosition::new(node, 1), DomPosition::new(node, 4));
        range.is_reverted = true;
        assert!(reconcile_selection(&mut model, Some(&DomSelection::Range(range))));
        assert!(model.has_reverted_range_selection);
        let selected: Vec<_> = crate::model::get_selected_segments(&model, false)
            .into_iter()
            .filter_map(|s| s.as_text())
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(selected, vec!["ell"]);
    }

    #[test]
    fn test_reconcile_outside_index_fails() {
        let (_dom, root, mut model) = parsed("<p>hello</p>");
        assert!(!reconcile_selection(&mut model, Some(&DomSelection::caret(root, 0))));
        assert_eq!(find_marker(&model), None);
    }
}
