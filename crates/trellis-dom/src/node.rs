//! Node arena and structural operations.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::DomError;
use crate::mutation::MutationRecord;
use crate::style::StyleDeclaration;

/// Index of a node inside a [`Dom`].
///
/// Ids are stable for the lifetime of the tree. Removed nodes are detached,
/// not freed, so an id held by a cache stays valid (it just stops being
/// connected).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Public node classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Text,
    Comment,
}

#[derive(Clone, Debug)]
pub(crate) struct ElementData {
    pub(crate) tag: SmolStr,
    pub(crate) attrs: Vec<(SmolStr, String)>,
    pub(crate) style: StyleDeclaration,
}

#[derive(Clone, Debug)]
pub(crate) enum NodeData {
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Clone, Debug)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) data: NodeData,
}

/// A mutable element/text tree rooted at a document node.
///
/// Every structural or character change on a connected node bumps
/// [`Dom::mutation_count`]. While [`Dom::observe`] is on, the change is also
/// queued as a [`MutationRecord`] for [`Dom::take_records`]. Writes that
/// would not change anything (same text, same attribute value) are skipped
/// entirely.
///
/// Methods taking a [`NodeId`] panic if the id was not produced by this
/// tree, the same way slice indexing does.
#[derive(Clone, Debug)]
pub struct Dom {
    nodes: Vec<Node>,
    document: NodeId,
    observing: bool,
    records: Vec<MutationRecord>,
    mutation_count: u64,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
            document: NodeId(0),
            observing: false,
            records: Vec::new(),
            mutation_count: 0,
        }
    }

    /// Create a tree holding a single connected element of `tag` whose
    /// children are parsed from `inner_html`.
    pub fn new_with_root(tag: &str, inner_html: &str) -> (Self, NodeId) {
        let mut dom = Self::new();
        let root = dom.create_element(tag);
        let document = dom.document;
        dom.nodes[document.index()].children.push(root);
        dom.nodes[root.index()].parent = Some(document);
        dom.set_inner_html(root, inner_html);
        (dom, root)
    }

    pub fn document(&self) -> NodeId {
        self.document
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    fn check(&self, id: NodeId) -> Result<(), DomError> {
        if id.index() < self.nodes.len() {
            Ok(())
        } else {
            Err(DomError::UnknownNode(id))
        }
    }

    // --- creation ---

    /// Create a detached element. The tag is lower-cased.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeData::Element(ElementData {
            tag: SmolStr::new(tag.to_ascii_lowercase()),
            attrs: Vec::new(),
            style: StyleDeclaration::new(),
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::Text(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::Comment(text.to_string()))
    }

    /// Copy a node. With `deep`, the whole subtree is copied. The copy is
    /// detached.
    pub fn clone_node(&mut self, id: NodeId, deep: bool) -> NodeId {
        let data = self.node(id).data.clone();
        let copy = self.alloc(data);
        if deep {
            let children = self.node(id).children.clone();
            for child in children {
                let child_copy = self.clone_node(child, true);
                self.node_mut(child_copy).parent = Some(copy);
                self.node_mut(copy).children.push(child_copy);
            }
        }
        copy
    }

    // --- observation ---

    /// Enable or disable queuing of mutation records.
    pub fn observe(&mut self, enabled: bool) {
        self.observing = enabled;
    }

    pub fn is_observing(&self) -> bool {
        self.observing
    }

    /// Drain queued mutation records.
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn has_pending_records(&self) -> bool {
        !self.records.is_empty()
    }

    /// Total number of changes applied to connected nodes since creation.
    pub fn mutation_count(&self) -> u64 {
        self.mutation_count
    }

    fn record(&mut self, record: MutationRecord) {
        if !self.is_connected(record.target()) {
            return;
        }
        self.mutation_count += 1;
        if self.observing {
            self.records.push(record);
        }
    }

    // --- structure queries ---

    pub fn kind(&self, id: NodeId) -> NodeKind {
        match self.node(id).data {
            NodeData::Document => NodeKind::Document,
            NodeData::Element(_) => NodeKind::Element,
            NodeData::Text(_) => NodeKind::Text,
            NodeData::Comment(_) => NodeKind::Comment,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.kind(id) == NodeKind::Element
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.kind(id) == NodeKind::Text
    }

    pub fn is_comment(&self, id: NodeId) -> bool {
        self.kind(id) == NodeKind::Comment
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.node(id).children.len()
    }

    pub fn child_at(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.node(id).children.get(index).copied()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).children.first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).children.last().copied()
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.node(parent).children.iter().position(|c| *c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.child_at(parent, index + 1)
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index.checked_sub(1).and_then(|i| self.child_at(parent, i))
    }

    /// Inclusive ancestry check.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// True if the node is attached (transitively) to the document.
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(self.document, id)
    }

    /// Child indices from the document down to `id`, or `None` if detached.
    pub fn path(&self, id: NodeId) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        let mut current = id;
        while current != self.document {
            path.push(self.index_in_parent(current)?);
            current = self.parent(current)?;
        }
        path.reverse();
        Some(path)
    }

    /// Follow child indices from `from`.
    pub fn node_at_path(&self, from: NodeId, path: &[usize]) -> Option<NodeId> {
        path.iter()
            .try_fold(from, |node, index| self.child_at(node, *index))
    }

    /// Pre-order descendants, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Length used for boundary offsets: characters for text and comment
    /// nodes, child count otherwise.
    pub fn node_length(&self, id: NodeId) -> usize {
        match &self.node(id).data {
            NodeData::Text(t) | NodeData::Comment(t) => t.chars().count(),
            _ => self.child_count(id),
        }
    }

    // --- structure mutation ---

    fn can_have_children(&self, id: NodeId) -> bool {
        matches!(
            self.node(id).data,
            NodeData::Document | NodeData::Element(_)
        )
    }

    fn validate_insert(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check(parent)?;
        self.check(child)?;
        if !self.can_have_children(parent)
            || child == self.document
            || self.contains(child, parent)
        {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        Ok(())
    }

    /// Append `child` as the last child of `parent`, moving it if attached
    /// elsewhere.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference` (or at the end when `None`).
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.validate_insert(parent, child)?;
        if let Some(reference) = reference {
            self.check(reference)?;
            if self.parent(reference) != Some(parent) {
                return Err(DomError::NotFound { parent, reference });
            }
            if reference == child {
                return Ok(());
            }
        }

        // Already in place.
        if self.parent(child) == Some(parent) {
            let next = self.next_sibling(child);
            if next == reference {
                return Ok(());
            }
        }

        self.remove(child);

        let index = match reference {
            Some(reference) => self
                .node(parent)
                .children
                .iter()
                .position(|c| *c == reference)
                .unwrap_or(self.child_count(parent)),
            None => self.child_count(parent),
        };
        self.node_mut(parent).children.insert(index, child);
        self.node_mut(child).parent = Some(parent);
        self.record(MutationRecord::ChildList {
            target: parent,
            added: vec![child],
            removed: Vec::new(),
        });
        Ok(())
    }

    /// Detach a node from its parent. Detached nodes stay valid.
    pub fn remove(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        self.node_mut(parent).children.retain(|c| *c != id);
        self.node_mut(id).parent = None;
        self.record(MutationRecord::ChildList {
            target: parent,
            added: Vec::new(),
            removed: vec![id],
        });
    }

    /// Detach all children of `id`.
    pub fn remove_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.node_mut(id).children);
        if children.is_empty() {
            return;
        }
        for child in &children {
            self.node_mut(*child).parent = None;
        }
        self.record(MutationRecord::ChildList {
            target: id,
            added: Vec::new(),
            removed: children,
        });
    }

    /// Swap `old` for `new` under `old`'s parent.
    pub fn replace_with(&mut self, old: NodeId, new: NodeId) -> Result<(), DomError> {
        if old == new {
            return Ok(());
        }
        let Some(parent) = self.parent(old) else {
            return Ok(());
        };
        self.insert_before(parent, new, Some(old))?;
        self.remove(old);
        Ok(())
    }

    /// Move all children of `from` to the end of `to`.
    pub fn move_children(&mut self, from: NodeId, to: NodeId) -> Result<(), DomError> {
        let children = self.children(from).to_vec();
        for child in children {
            self.append_child(to, child)?;
        }
        Ok(())
    }

    // --- character data ---

    /// Text of a text or comment node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Text(t) | NodeData::Comment(t) => Some(t),
            _ => None,
        }
    }

    /// Replace the text of a text or comment node. No-op on elements.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        let old_value = match &mut self.node_mut(id).data {
            NodeData::Text(t) | NodeData::Comment(t) => {
                if t == text {
                    return;
                }
                std::mem::replace(t, text.to_string())
            }
            _ => return,
        };
        self.record(MutationRecord::CharacterData {
            target: id,
            old_value,
        });
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(text) = self.text(id).filter(|_| self.is_text(id)) {
            out.push_str(text);
            return out;
        }
        for node in self.descendants(id) {
            if let NodeData::Text(t) = &self.node(node).data {
                out.push_str(t);
            }
        }
        out
    }

    // --- element queries ---

    pub(crate) fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.node(id).data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.node_mut(id).data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Lower-case tag name, `None` for non-elements.
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag_name(id).is_some_and(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Attribute value. `style` is exposed through [`Dom::style`] instead.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?
            .attrs
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Non-style attributes in document order.
    pub fn attributes(&self, id: NodeId) -> impl Iterator<Item = (&str, &str)> {
        self.element(id)
            .into_iter()
            .flat_map(|e| e.attrs.iter().map(|(n, v)| (n.as_str(), v.as_str())))
    }

    /// True if the element carries any attribute, including a non-empty style.
    pub fn has_attributes(&self, id: NodeId) -> bool {
        self.element(id)
            .is_some_and(|e| !e.attrs.is_empty() || !e.style.is_empty())
    }

    /// Set an attribute. Setting `style` replaces the whole declaration.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        if name.eq_ignore_ascii_case("style") {
            self.set_style_declaration(id, StyleDeclaration::parse(value));
            return;
        }
        let Some(element) = self.element_mut(id) else {
            return;
        };
        let old_value = match element
            .attrs
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some((_, v)) if v == value => return,
            Some((_, v)) => Some(std::mem::replace(v, value.to_string())),
            None => {
                element
                    .attrs
                    .push((SmolStr::new(name.to_ascii_lowercase()), value.to_string()));
                None
            }
        };
        self.record(MutationRecord::Attributes {
            target: id,
            name: SmolStr::new(name.to_ascii_lowercase()),
            old_value,
        });
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        if name.eq_ignore_ascii_case("style") {
            self.set_style_declaration(id, StyleDeclaration::new());
            return;
        }
        let Some(element) = self.element_mut(id) else {
            return;
        };
        let Some(index) = element
            .attrs
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
        else {
            return;
        };
        let (name, old_value) = element.attrs.remove(index);
        self.record(MutationRecord::Attributes {
            target: id,
            name,
            old_value: Some(old_value),
        });
    }

    // --- style ---

    pub fn style(&self, id: NodeId) -> Option<&StyleDeclaration> {
        self.element(id).map(|e| &e.style)
    }

    pub fn style_property(&self, id: NodeId, name: &str) -> Option<&str> {
        self.style(id)?.get(name)
    }

    pub fn set_style(&mut self, id: NodeId, name: &str, value: &str) {
        let Some(mut style) = self.style(id).cloned() else {
            return;
        };
        style.set(name, value);
        self.set_style_declaration(id, style);
    }

    pub fn remove_style(&mut self, id: NodeId, name: &str) {
        let Some(mut style) = self.style(id).cloned() else {
            return;
        };
        if style.remove(name) {
            self.set_style_declaration(id, style);
        }
    }

    pub fn set_style_declaration(&mut self, id: NodeId, style: StyleDeclaration) {
        let Some(element) = self.element_mut(id) else {
            return;
        };
        if element.style == style {
            return;
        }
        let old = std::mem::replace(&mut element.style, style);
        let old_value = (!old.is_empty()).then(|| old.to_css_text());
        self.record(MutationRecord::Attributes {
            target: id,
            name: SmolStr::new_static("style"),
            old_value,
        });
    }

    // --- classes and data ---

    pub fn classes(&self, id: NodeId) -> Vec<&str> {
        self.attribute(id, "class")
            .map(|c| c.split_ascii_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.classes(id).contains(&class)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) {
            return;
        }
        let mut classes: Vec<String> = self.classes(id).iter().map(|c| c.to_string()).collect();
        classes.push(class.to_string());
        self.set_attribute(id, "class", &classes.join(" "));
    }

    /// `data-*` attributes with the prefix stripped.
    pub fn dataset(&self, id: NodeId) -> Vec<(&str, &str)> {
        self.attributes(id)
            .filter_map(|(n, v)| n.strip_prefix("data-").map(|k| (k, v)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected_div(dom: &mut Dom) -> NodeId {
        let div = dom.create_element("DIV");
        let document = dom.document();
        dom.append_child(document, div).unwrap();
        div
    }

    #[test]
    fn test_append_and_siblings() {
        let mut dom = Dom::new();
        let div = connected_div(&mut dom);
        let a = dom.create_text("a");
        let b = dom.create_element("b");
        dom.append_child(div, a).unwrap();
        dom.append_child(div, b).unwrap();

        assert_eq!(dom.tag_name(div), Some("div"));
        assert_eq!(dom.children(div), &[a, b]);
        assert_eq!(dom.next_sibling(a), Some(b));
        assert_eq!(dom.previous_sibling(b), Some(a));
        assert_eq!(dom.previous_sibling(a), None);
        assert_eq!(dom.index_in_parent(b), Some(1));
        assert!(dom.is_connected(b));
    }

    #[test]
    fn test_insert_before_moves_node() {
        let mut dom = Dom::new();
        let div = connected_div(&mut dom);
        let a = dom.create_element("a");
        let b = dom.create_element("b");
        dom.append_child(div, a).unwrap();
        dom.append_child(div, b).unwrap();
        dom.insert_before(div, b, Some(a)).unwrap();
        assert_eq!(dom.children(div), &[b, a]);
    }

    #[test]
    fn test_hierarchy_errors() {
        let mut dom = Dom::new();
        let div = connected_div(&mut dom);
        let inner = dom.create_element("span");
        dom.append_child(div, inner).unwrap();
        let text = dom.create_text("x");

        assert!(matches!(
            dom.append_child(inner, div),
            Err(DomError::HierarchyRequest { .. })
        ));
        assert!(matches!(
            dom.append_child(text, inner),
            Err(DomError::HierarchyRequest { .. })
        ));
        let stray = dom.create_element("i");
        assert!(matches!(
            dom.insert_before(div, text, Some(stray)),
            Err(DomError::NotFound { .. })
        ));
    }

    #[test]
    fn test_records_only_connected_and_observed() {
        let mut dom = Dom::new();
        let div = connected_div(&mut dom);
        dom.observe(true);
        let count = dom.mutation_count();

        // Building a detached subtree is silent.
        let span = dom.create_element("span");
        let text = dom.create_text("hi");
        dom.append_child(span, text).unwrap();
        assert_eq!(dom.mutation_count(), count);

        dom.append_child(div, span).unwrap();
        dom.set_text(text, "ho");
        dom.set_text(text, "ho");
        dom.set_attribute(span, "title", "t");

        let records = dom.take_records();
        assert_eq!(records.len(), 3);
        assert!(matches!(&records[0], MutationRecord::ChildList { target, .. } if *target == div));
        assert_eq!(
            records[1],
            MutationRecord::CharacterData {
                target: text,
                old_value: "hi".into()
            }
        );
        assert_eq!(dom.mutation_count(), count + 3);
        assert!(!dom.has_pending_records());
    }

    #[test]
    fn test_unobserved_changes_still_counted() {
        let mut dom = Dom::new();
        let div = connected_div(&mut dom);
        let before = dom.mutation_count();
        dom.set_style(div, "color", "red");
        assert_eq!(dom.mutation_count(), before + 1);
        assert!(dom.take_records().is_empty());
    }

    #[test]
    fn test_style_and_classes() {
        let mut dom = Dom::new();
        let div = connected_div(&mut dom);
        dom.set_attribute(div, "style", "font-weight: bold");
        dom.set_style(div, "color", "red");
        assert_eq!(dom.style_property(div, "font-weight"), Some("bold"));
        assert_eq!(dom.attribute(div, "style"), None);
        assert!(dom.has_attributes(div));

        dom.add_class(div, "_Entity");
        dom.add_class(div, "_EType_x");
        dom.add_class(div, "_Entity");
        assert_eq!(dom.classes(div), vec!["_Entity", "_EType_x"]);

        dom.set_attribute(div, "data-id", "7");
        assert_eq!(dom.dataset(div), vec![("id", "7")]);
    }

    #[test]
    fn test_clone_and_paths() {
        let (mut dom, root) = Dom::new_with_root("div", "<p>a<b>c</b></p>");
        let p = dom.first_child(root).unwrap();
        let copy = dom.clone_node(p, true);
        assert!(!dom.is_connected(copy));
        assert_eq!(dom.text_content(copy), "ac");

        let b = dom.child_at(p, 1).unwrap();
        let path = dom.path(b).unwrap();
        assert_eq!(path, vec![0, 0, 1]);
        assert_eq!(dom.node_at_path(dom.document(), &path), Some(b));
        assert_eq!(dom.path(copy), None);
    }
}
