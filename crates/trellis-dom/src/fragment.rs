//! Owned subtree snapshots.
//!
//! Content the model does not understand (custom elements, entity wrappers)
//! is kept as a `FragmentNode` so it can be written back verbatim into any
//! tree, including a fresh one.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::node::{Dom, NodeData, NodeId};
use crate::style::StyleDeclaration;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FragmentNode {
    Element {
        tag: SmolStr,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        attributes: Vec<(SmolStr, String)>,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        style: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<FragmentNode>,
    },
    Text {
        text: String,
    },
    Comment {
        text: String,
    },
}

impl FragmentNode {
    pub fn text(text: impl Into<String>) -> Self {
        FragmentNode::Text { text: text.into() }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            FragmentNode::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Serialize the snapshot as HTML.
    pub fn to_html(&self) -> String {
        let mut dom = Dom::new();
        let node = dom.import_fragment(self);
        dom.outer_html(node)
    }
}

impl Dom {
    /// Snapshot `id` and its descendants. The document node has no
    /// standalone form and exports as empty text.
    pub fn export_fragment(&self, id: NodeId) -> FragmentNode {
        match &self.node(id).data {
            NodeData::Element(e) => FragmentNode::Element {
                tag: e.tag.clone(),
                attributes: e.attrs.clone(),
                style: e.style.to_css_text(),
                children: self
                    .children(id)
                    .iter()
                    .map(|child| self.export_fragment(*child))
                    .collect(),
            },
            NodeData::Text(t) => FragmentNode::Text { text: t.clone() },
            NodeData::Comment(t) => FragmentNode::Comment { text: t.clone() },
            NodeData::Document => FragmentNode::Text {
                text: String::new(),
            },
        }
    }

    /// Build a detached copy of a snapshot in this tree.
    pub fn import_fragment(&mut self, fragment: &FragmentNode) -> NodeId {
        match fragment {
            FragmentNode::Element {
                tag,
                attributes,
                style,
                children,
            } => {
                let element = self.create_element(tag);
                for (name, value) in attributes {
                    self.set_attribute(element, name, value);
                }
                if !style.is_empty() {
                    self.set_style_declaration(element, StyleDeclaration::parse(style));
                }
                for child in children {
                    let child = self.import_fragment(child);
                    // A freshly created element always accepts children.
                    let _ = self.append_child(element, child);
                }
                element
            }
            FragmentNode::Text { text } => self.create_text(text),
            FragmentNode::Comment { text } => self.create_comment(text),
        }
    }
}
