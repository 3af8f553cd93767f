//! Error types for tree operations.

use miette::Diagnostic;

use crate::node::NodeId;

/// Errors raised by structural tree operations.
///
/// Parsing never fails; only operations that would corrupt the tree (cycles,
/// text children, foreign node ids) are rejected.
#[derive(thiserror::Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DomError {
    /// The node id does not belong to this tree.
    #[error("unknown node {0:?}")]
    #[diagnostic(code(trellis::dom::unknown_node))]
    UnknownNode(NodeId),

    /// Inserting `child` under `parent` would create a cycle or put children
    /// under a leaf node.
    #[error("cannot insert {child:?} under {parent:?}")]
    #[diagnostic(
        code(trellis::dom::hierarchy),
        help("a node cannot be inserted into itself, its descendants, or a text/comment node")
    )]
    HierarchyRequest { parent: NodeId, child: NodeId },

    /// The reference node passed to `insert_before` is not a child of `parent`.
    #[error("{reference:?} is not a child of {parent:?}")]
    #[diagnostic(code(trellis::dom::not_found))]
    NotFound { parent: NodeId, reference: NodeId },
}
