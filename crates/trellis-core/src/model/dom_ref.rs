//! Live DOM bookkeeping carried on model nodes.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::Serialize;
use trellis_dom::NodeId;

/// Back-reference from a model node to the DOM node it was parsed from or
/// last written to.
///
/// This is a relation, not ownership: the node may have been detached or
/// rewritten since, so every use re-validates it against the tree. It never
/// takes part in equality, hashing or serialization of the model.
#[derive(Clone, Copy, Debug, Default)]
pub struct DomRef {
    pub node: Option<NodeId>,
    /// Character offset of a text segment inside its text node.
    pub offset: usize,
    /// Content hash recorded when the node was produced; a block whose
    /// current fingerprint differs must be rewritten.
    pub fingerprint: Option<Fingerprint>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fingerprint {
    pub content: u64,
    /// Hash of the inherited format the element was written under.
    pub context: u64,
}

impl DomRef {
    pub fn new(node: NodeId) -> Self {
        Self {
            node: Some(node),
            offset: 0,
            fingerprint: None,
        }
    }

    pub fn text(node: NodeId, offset: usize) -> Self {
        Self {
            node: Some(node),
            offset,
            fingerprint: None,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl PartialEq for DomRef {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for DomRef {}

impl Hash for DomRef {
    fn hash<H: Hasher>(&self, _state: &mut H) {}
}

/// Hash a string with the std hasher.
pub fn hash_source(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

/// Hash the serialized form of a model value. DOM references are skipped by
/// serialization, so two structurally equal values hash the same.
pub fn hash_serialized<T: Serialize>(value: &T) -> u64 {
    match serde_json::to_string(value) {
        Ok(json) => hash_source(&json),
        Err(err) => {
            tracing::warn!(target: "trellis::write", %err, "cannot fingerprint model value");
            0
        }
    }
}
