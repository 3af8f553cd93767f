//! Selection boundary points and live selection shapes.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::node::{Dom, NodeId};

/// A boundary point: a node plus an offset into it.
///
/// For text nodes the offset counts characters; for elements it counts
/// children (offset `n` sits before child `n`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DomPosition {
    pub node: NodeId,
    pub offset: usize,
}

impl DomPosition {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }

    /// Position just before `node` in its parent.
    pub fn before(dom: &Dom, node: NodeId) -> Option<Self> {
        let parent = dom.parent(node)?;
        Some(Self::new(parent, dom.index_in_parent(node)?))
    }

    /// Position just after `node` in its parent.
    pub fn after(dom: &Dom, node: NodeId) -> Option<Self> {
        let parent = dom.parent(node)?;
        Some(Self::new(parent, dom.index_in_parent(node)? + 1))
    }

    /// Lexicographic sort key: the node's child-index path followed by the
    /// offset. Detached positions have no key.
    fn sort_key(&self, dom: &Dom) -> Option<Vec<usize>> {
        let mut key = dom.path(self.node)?;
        key.push(self.offset);
        Some(key)
    }

    /// Document order of two connected positions.
    pub fn compare(&self, other: &DomPosition, dom: &Dom) -> Option<Ordering> {
        Some(self.sort_key(dom)?.cmp(&other.sort_key(dom)?))
    }

    /// Clamp the offset to the node's length.
    pub fn clamped(self, dom: &Dom) -> Self {
        Self::new(self.node, self.offset.min(dom.node_length(self.node)))
    }

    /// Descend into the deepest node at this point, preferring the text
    /// node an element offset points at.
    pub fn normalized(self, dom: &Dom) -> Self {
        let mut pos = self.clamped(dom);
        loop {
            if dom.is_text(pos.node) {
                return pos;
            }
            let count = dom.child_count(pos.node);
            if count == 0 {
                return pos;
            }
            let next = if pos.offset < count {
                dom.child_at(pos.node, pos.offset)
                    .map(|child| DomPosition::new(child, 0))
            } else {
                dom.last_child(pos.node)
                    .map(|child| DomPosition::new(child, dom.node_length(child)))
            };
            match next {
                Some(next) if dom.is_text(next.node) || dom.is_element(next.node) => pos = next,
                _ => return pos,
            }
        }
    }
}

/// A contiguous range between two boundary points.
///
/// `start` is always before or equal to `end` in document order;
/// `is_reverted` remembers that the user selected backwards (focus before
/// anchor).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DomRange {
    pub start: DomPosition,
    pub end: DomPosition,
    pub is_reverted: bool,
}

impl DomRange {
    pub fn new(start: DomPosition, end: DomPosition) -> Self {
        Self {
            start,
            end,
            is_reverted: false,
        }
    }

    pub fn collapsed(pos: DomPosition) -> Self {
        Self::new(pos, pos)
    }

    /// Build a range from anchor/focus, ordering the endpoints.
    pub fn from_anchor_focus(dom: &Dom, anchor: DomPosition, focus: DomPosition) -> Self {
        match anchor.compare(&focus, dom) {
            Some(Ordering::Greater) => Self {
                start: focus,
                end: anchor,
                is_reverted: true,
            },
            _ => Self::new(anchor, focus),
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    pub fn anchor(&self) -> DomPosition {
        if self.is_reverted { self.end } else { self.start }
    }

    pub fn focus(&self) -> DomPosition {
        if self.is_reverted { self.start } else { self.end }
    }
}

/// A cell-rectangle selection inside a table element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableSelection {
    pub table: NodeId,
    pub first_column: usize,
    pub last_column: usize,
    pub first_row: usize,
    pub last_row: usize,
}

impl TableSelection {
    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.first_row..=self.last_row).contains(&row)
            && (self.first_column..=self.last_column).contains(&col)
    }
}

/// The live selection of an editable surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DomSelection {
    Range(DomRange),
    Table(TableSelection),
    Image(NodeId),
}

impl DomSelection {
    pub fn caret(node: NodeId, offset: usize) -> Self {
        DomSelection::Range(DomRange::collapsed(DomPosition::new(node, offset)))
    }

    pub fn as_range(&self) -> Option<&DomRange> {
        match self {
            DomSelection::Range(r) => Some(r),
            _ => None,
        }
    }

    /// Every node referenced by the selection is still attached.
    pub fn is_connected(&self, dom: &Dom) -> bool {
        match self {
            DomSelection::Range(r) => dom.is_connected(r.start.node) && dom.is_connected(r.end.node),
            DomSelection::Table(t) => dom.is_connected(t.table),
            DomSelection::Image(img) => dom.is_connected(*img),
        }
    }
}
