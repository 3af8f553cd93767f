//! Cached content model kept in step with the live tree.
//!
//! Between transactions the editor keeps the model it last wrote. Mutation
//! records that arrive in the meantime are classified one by one: character
//! data on an indexed text node is patched into the model, mutations inside
//! entity wrappers are ignored, and everything else drops the cache so the
//! next transaction re-parses.

use std::collections::HashSet;

use trellis_dom::{Dom, MutationRecord, NodeId};

use super::indexer::DomIndex;
use crate::model::entity::ENTITY_CLASS;
use crate::model::fingerprint::refresh_fingerprints;
use crate::model::ContentModelDocument;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CacheState {
    /// The cached model matches the live tree.
    Clean,
    /// A text-only mutation is being patched in.
    Dirty,
    /// No usable model; the next acquire re-parses.
    #[default]
    Invalid,
}

/// Verdict on a single mutation record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationClass {
    /// Irrelevant to the model.
    Ignored,
    /// Character data of an indexed text node whose old value the model
    /// still holds.
    Text { node: NodeId, old_value: String },
    /// Anything the cache cannot follow.
    Invalid(&'static str),
}

/// Nearest entity wrapper around `node` (inclusive), stopping at `root`.
fn entity_wrapper_of(dom: &Dom, root: NodeId, node: NodeId) -> Option<NodeId> {
    let mut current = Some(node);
    while let Some(id) = current {
        if id == root {
            return None;
        }
        if dom.has_class(id, ENTITY_CLASS) {
            return Some(id);
        }
        current = dom.parent(id);
    }
    None
}

/// Inside `pre` or a `white-space: pre*` element, up to `root`.
fn preserves_whitespace(dom: &Dom, root: NodeId, node: NodeId) -> bool {
    let mut current = dom.parent(node);
    while let Some(id) = current {
        let pre_style = dom
            .style_property(id, "white-space")
            .is_some_and(|v| v.starts_with("pre") || v == "break-spaces");
        if dom.is_tag(id, "pre") || pre_style {
            return true;
        }
        if id == root {
            break;
        }
        current = dom.parent(id);
    }
    false
}

/// A parse keeps `text` as is only if it has no whitespace to collapse or
/// trim: no runs, no tabs or newlines, no space at either end.
fn is_parse_stable(text: &str) -> bool {
    !text.starts_with(' ')
        && !text.ends_with(' ')
        && !text.contains("  ")
        && !text.contains(['\t', '\n', '\r', '\x0c'])
}

/// Classify one record against the cached model. Anything not provably
/// text-only or irrelevant is `Invalid`.
pub fn classify_mutation(
    dom: &Dom,
    root: NodeId,
    index: &DomIndex,
    model: &ContentModelDocument,
    record: &MutationRecord,
) -> MutationClass {
    let target = record.target();
    if !dom.contains(root, target) {
        // Detached since, or outside the editable root.
        return if dom.contains(target, root) {
            MutationClass::Invalid("ancestor of the root changed")
        } else {
            MutationClass::Ignored
        };
    }
    if let Some(wrapper) = entity_wrapper_of(dom, root, target) {
        let on_wrapper_itself = wrapper == target && matches!(record, MutationRecord::Attributes { .. });
        if !on_wrapper_itself {
            return MutationClass::Ignored;
        }
    }
    match record {
        MutationRecord::CharacterData { target, old_value } => {
            if !dom.is_text(*target) {
                return MutationClass::Ignored;
            }
            if !index.contains(*target) {
                return MutationClass::Invalid("text node is not indexed");
            }
            let current = dom.text(*target).unwrap_or_default();
            if !is_parse_stable(current) && !preserves_whitespace(dom, root, *target) {
                return MutationClass::Invalid("whitespace would collapse");
            }
            match index.model_text(model, *target) {
                Some(text) if text == *old_value => MutationClass::Text {
                    node: *target,
                    old_value: old_value.clone(),
                },
                _ => MutationClass::Invalid("text does not match the model"),
            }
        }
        MutationRecord::ChildList { .. } => MutationClass::Invalid("child list changed"),
        MutationRecord::Attributes { .. } => MutationClass::Invalid("attribute changed"),
    }
}

/// The cached model plus its text node index.
#[derive(Debug, Default)]
pub struct ModelCache {
    state: CacheState,
    model: Option<ContentModelDocument>,
    /// Built lazily; dropped whenever the model changes shape.
    index: Option<DomIndex>,
}

impl ModelCache {
    pub fn state(&self) -> CacheState {
        self.state
    }

    pub fn model(&self) -> Option<&ContentModelDocument> {
        self.model.as_ref()
    }

    pub fn invalidate(&mut self) {
        if self.state != CacheState::Invalid {
            tracing::debug!(target: "trellis::cache", "cache invalidated");
        }
        self.state = CacheState::Invalid;
        self.model = None;
        self.index = None;
    }

    /// Keep `model` as the image of the live tree.
    pub fn store(&mut self, model: ContentModelDocument) {
        self.state = CacheState::Clean;
        self.model = Some(model);
        self.index = None;
    }

    /// Take the model out if it is clean. The cache is left `Invalid`
    /// until the model is stored again.
    pub fn take(&mut self) -> Option<ContentModelDocument> {
        if self.state != CacheState::Clean {
            return None;
        }
        let model = self.model.take();
        self.invalidate();
        model
    }

    /// Apply pending mutation records. Only the first record per text node
    /// is compared; the patch uses the node's current text, so later
    /// records for the same node are already accounted for.
    pub fn replay(&mut self, dom: &Dom, root: NodeId, records: &[MutationRecord]) {
        if records.is_empty() || self.state == CacheState::Invalid {
            return;
        }
        let mut patched: HashSet<NodeId> = HashSet::new();
        for record in records {
            if patched.contains(&record.target()) && record.is_character_data() {
                continue;
            }
            let Some(model) = self.model.as_mut() else {
                self.invalidate();
                return;
            };
            let index = self.index.get_or_insert_with(|| DomIndex::build(model));
            match classify_mutation(dom, root, index, model, record) {
                MutationClass::Ignored => {}
                MutationClass::Text { node, old_value } => {
                    self.state = CacheState::Dirty;
                    let current = dom.text(node).unwrap_or_default();
                    if !index.apply_text_change(model, node, &old_value, current) {
                        tracing::debug!(target: "trellis::cache", "text edit spans segments");
                        self.invalidate();
                        return;
                    }
                    refresh_fingerprints(&mut model.blocks);
                    patched.insert(node);
                    self.state = CacheState::Clean;
                }
                MutationClass::Invalid(reason) => {
                    tracing::debug!(target: "trellis::cache", reason, "mutation not reconcilable");
                    self.invalidate();
                    return;
                }
            }
        }
        tracing::trace!(target: "trellis::cache", records = records.len(), patched = patched.len(), "replayed mutations");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom_to_model::{DomToModelOptions, dom_to_content_model};

    fn cached(html: &str) -> (Dom, NodeId, ModelCache) {
        let (mut dom, root) = Dom::new_with_root("div", html);
        let model = dom_to_content_model(&dom, root, &DomToModelOptions::default(), None);
        let mut cache = ModelCache::default();
        cache.store(model);
        dom.observe(true);
        (dom, root, cache)
    }

    #[test]
    fn test_typing_keeps_cache_clean() {
        let (mut dom, root, mut cache) = cached("<p>ab</p>");
        let text = dom.first_child(dom.first_child(root).unwrap()).unwrap();
        dom.set_text(text, "abc");
        dom.set_text(text, "abcd");
        let records = dom.take_records();
        cache.replay(&dom, root, &records);
        assert_eq!(cache.state(), CacheState::Clean);
        assert_eq!(cache.model().unwrap().paragraphs()[0].text(), "abcd");
    }

    #[test]
    fn test_structure_change_invalidates() {
        let (mut dom, root, mut cache) = cached("<p>ab</p>");
        let br = dom.create_element("br");
        dom.append_child(root, br).unwrap();
        let records = dom.take_records();
        cache.replay(&dom, root, &records);
        assert_eq!(cache.state(), CacheState::Invalid);
        assert!(cache.take().is_none());
    }

    #[test]
    fn test_entity_internals_ignored() {
        let (mut dom, root, mut cache) =
            cached(r#"<p>a<span class="_Entity _EType_chip _EId_c1">chip</span></p>"#);
        let paragraph = dom.first_child(root).unwrap();
        let wrapper = dom.child_at(paragraph, 1).unwrap();
        let inner = dom.first_child(wrapper).unwrap();
        dom.set_text(inner, "changed");
        let extra = dom.create_element("i");
        dom.append_child(wrapper, extra).unwrap();
        let records = dom.take_records();
        cache.replay(&dom, root, &records);
        assert_eq!(cache.state(), CacheState::Clean);
    }

    #[test]
    fn test_classify_mismatched_text() {
        let (mut dom, root, cache) = cached("<p>ab</p>");
        let text = dom.first_child(dom.first_child(root).unwrap()).unwrap();
        let model = cache.model().unwrap();
        let index = DomIndex::build(model);
        let record = MutationRecord::CharacterData {
            target: text,
            old_value: "zz".into(),
        };
        dom.set_text(text, "abc");
        assert_eq!(
            classify_mutation(&dom, root, &index, model, &record),
            MutationClass::Invalid("text does not match the model")
        );
    }

    #[test]
    fn test_collapsible_whitespace_invalidates() {
        let (mut dom, root, mut cache) = cached("<p>ab</p>");
        let text = dom.first_child(dom.first_child(root).unwrap()).unwrap();
        dom.set_text(text, "a   b");
        let records = dom.take_records();
        cache.replay(&dom, root, &records);
        assert_eq!(cache.state(), CacheState::Invalid);
    }

    #[test]
    fn test_trailing_space_invalidates() {
        let (mut dom, root, mut cache) = cached("<p>ab</p>");
        let text = dom.first_child(dom.first_child(root).unwrap()).unwrap();
        dom.set_text(text, "ab ");
        let records = dom.take_records();
        cache.replay(&dom, root, &records);
        assert_eq!(cache.state(), CacheState::Invalid);
    }

    #[test]
    fn test_whitespace_kept_inside_pre() {
        let (mut dom, root, mut cache) = cached("<pre>ab</pre>");
        let text = dom.first_child(dom.first_child(root).unwrap()).unwrap();
        dom.set_text(text, "a   b");
        let records = dom.take_records();
        cache.replay(&dom, root, &records);
        assert_eq!(cache.state(), CacheState::Clean);
        assert_eq!(cache.model().unwrap().paragraphs()[0].text(), "a   b");
    }

    #[test]
    fn test_take_leaves_cache_invalid() {
        let (_dom, _root, mut cache) = cached("<p>ab</p>");
        assert!(cache.take().is_some());
        assert_eq!(cache.state(), CacheState::Invalid);
    }
}
