//! Mutation records, the tree's equivalent of a `MutationObserver` feed.

use smol_str::SmolStr;

use crate::node::NodeId;

/// A single observed change to a connected node.
///
/// Records are only produced for nodes attached to the document while
/// observation is enabled (`Dom::observe`). Building detached subtrees is
/// silent until the subtree is inserted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationRecord {
    /// Children were inserted into or removed from `target`.
    ChildList {
        target: NodeId,
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    /// An attribute (including `style` and `class`) of `target` changed.
    Attributes {
        target: NodeId,
        name: SmolStr,
        old_value: Option<String>,
    },
    /// The text of a text or comment node changed.
    CharacterData { target: NodeId, old_value: String },
}

impl MutationRecord {
    pub fn target(&self) -> NodeId {
        match self {
            MutationRecord::ChildList { target, .. }
            | MutationRecord::Attributes { target, .. }
            | MutationRecord::CharacterData { target, .. } => *target,
        }
    }

    /// Check if this record only touched character data.
    pub fn is_character_data(&self) -> bool {
        matches!(self, MutationRecord::CharacterData { .. })
    }
}
