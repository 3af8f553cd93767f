//! Post-write cleanup of the inline elements the segment writers produce.
//!
//! Attribute-less spans are unwrapped first, then adjacent inline siblings
//! with the same tag and attributes are merged. Text nodes are never
//! merged, so text positions recorded during the write stay valid.

use std::collections::HashSet;

use trellis_dom::{Dom, NodeId};

const MERGEABLE_TAGS: &[&str] = &["span", "b", "i", "u", "s", "sup", "sub", "a", "code", "strong", "em"];

/// Optimize the subtree under `root`, skipping everything in `keep`.
pub fn optimize(dom: &mut Dom, root: NodeId, keep: &HashSet<NodeId>) {
    let children = dom.children(root).to_vec();
    for child in &children {
        if dom.is_element(*child) && !keep.contains(child) {
            optimize(dom, *child, keep);
        }
    }
    for child in children {
        if !keep.contains(&child) && dom.is_tag(child, "span") && !dom.has_attributes(child) {
            unwrap(dom, child);
        }
    }
    merge_siblings(dom, root, keep);
}

fn unwrap(dom: &mut Dom, element: NodeId) {
    let Some(parent) = dom.parent(element) else {
        return;
    };
    for child in dom.children(element).to_vec() {
        if let Err(err) = dom.insert_before(parent, child, Some(element)) {
            tracing::warn!(target: "trellis::write", %err, "cannot unwrap element");
            return;
        }
    }
    dom.remove(element);
}

fn same_shape(dom: &Dom, a: NodeId, b: NodeId) -> bool {
    let attributes = |id| dom.attributes(id).collect::<Vec<_>>();
    let style = |id| dom.style(id).map(|s| s.to_css_text()).unwrap_or_default();
    attributes(a) == attributes(b) && style(a) == style(b)
}

fn can_merge(dom: &Dom, a: NodeId, b: NodeId, keep: &HashSet<NodeId>) -> bool {
    if keep.contains(&a) || keep.contains(&b) {
        return false;
    }
    match (dom.tag_name(a), dom.tag_name(b)) {
        (Some(x), Some(y)) => x == y && MERGEABLE_TAGS.contains(&x) && same_shape(dom, a, b),
        _ => false,
    }
}

fn merge_siblings(dom: &mut Dom, parent: NodeId, keep: &HashSet<NodeId>) {
    let mut index = 1;
    while let (Some(previous), Some(node)) = (dom.child_at(parent, index - 1), dom.child_at(parent, index)) {
        if !can_merge(dom, previous, node, keep) {
            index += 1;
            continue;
        }
        if let Err(err) = dom.move_children(node, previous) {
            tracing::warn!(target: "trellis::write", %err, "cannot merge elements");
            index += 1;
            continue;
        }
        dom.remove(node);
        merge_siblings(dom, previous, keep);
    }
}
