//! `format_content_model`: acquire the model, let a mutator change it, and
//! write the result back with the selection carried across.

use std::collections::BTreeSet;
use std::convert::Infallible;

use smol_str::SmolStr;
use trellis_dom::{Dom, DomPosition, DomRange, DomSelection, NodeId};
use web_time::Instant;

use super::Editor;
use super::cache::ModelCache;
use crate::error::EditorError;
use crate::model::{ContentModelBlock, ContentModelDocument, visit_blocks};
use crate::model_to_dom::{WriteResult, content_model_to_dom};
use crate::normalize::normalize_content_model;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatContentModelOptions {
    /// Free-form tag carried into the change event.
    pub api_name: Option<SmolStr>,
    /// Kind of change, e.g. `Format` or `Keyboard`.
    pub source: SmolStr,
}

impl Default for FormatContentModelOptions {
    fn default() -> Self {
        Self {
            api_name: None,
            source: SmolStr::new_static("Format"),
        }
    }
}

impl FormatContentModelOptions {
    pub fn api(name: &str) -> Self {
        Self {
            api_name: Some(SmolStr::new(name)),
            ..Default::default()
        }
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = SmolStr::new(source);
        self
    }
}

/// Handed to the mutator next to the model.
#[derive(Clone, Debug, Default)]
pub struct FormatContentModelContext {
    changed_blocks: Option<BTreeSet<usize>>,
    skip_undo_snapshot: bool,
}

impl FormatContentModelContext {
    /// Narrow the write to marked top-level blocks. Once anything is
    /// marked, unmarked blocks keep their elements without being compared.
    pub fn mark_block_changed(&mut self, index: usize) {
        self.changed_blocks.get_or_insert_with(BTreeSet::new).insert(index);
    }

    pub fn changed_blocks(&self) -> Option<&BTreeSet<usize>> {
        self.changed_blocks.as_ref()
    }

    pub fn skip_undo_snapshot(&mut self) {
        self.skip_undo_snapshot = true;
    }
}

#[derive(Clone, Debug)]
pub struct ContentChangedEvent {
    pub source: SmolStr,
    pub api_name: Option<SmolStr>,
    /// Top-level elements created by the write.
    pub added_blocks: Vec<NodeId>,
    /// Top-level elements removed by the write. Detached by now.
    pub removed_blocks: Vec<NodeId>,
    /// `(type, id)` of entities that appeared.
    pub new_entities: Vec<(SmolStr, SmolStr)>,
    pub deleted_entities: Vec<(SmolStr, SmolStr)>,
    pub selection: Option<DomSelection>,
    pub timestamp: Instant,
}

impl ContentChangedEvent {
    pub(super) fn new(source: &str, api_name: Option<SmolStr>, result: &WriteResult) -> Self {
        Self {
            source: SmolStr::new(source),
            api_name,
            added_blocks: result.added_blocks.clone(),
            removed_blocks: result.removed_blocks.clone(),
            new_entities: Vec::new(),
            deleted_entities: Vec::new(),
            selection: result.selection,
            timestamp: Instant::now(),
        }
    }

    pub(super) fn with_entities(mut self, before: &[(SmolStr, SmolStr)], after: &[(SmolStr, SmolStr)]) -> Self {
        self.new_entities = after.iter().filter(|e| !before.contains(e)).cloned().collect();
        self.deleted_entities = before.iter().filter(|e| !after.contains(e)).cloned().collect();
        self
    }
}

/// Invalidates the model cache unless the transaction commits.
struct TransactionGuard<'a> {
    cache: &'a mut ModelCache,
    committed: bool,
}

impl TransactionGuard<'_> {
    fn commit(mut self, model: Option<ContentModelDocument>) {
        if let Some(model) = model {
            self.cache.store(model);
        }
        self.committed = true;
    }
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            tracing::debug!(target: "trellis::format", "transaction aborted");
            self.cache.invalidate();
        }
    }
}

impl Editor {
    /// Run `mutator` against the current model and write the result back.
    ///
    /// The mutator returns whether it changed anything. `false` skips the
    /// write, the undo snapshot and the change event, so it must only be
    /// returned for an untouched model.
    pub fn format_content_model(
        &mut self,
        options: FormatContentModelOptions,
        mutator: impl FnOnce(&mut ContentModelDocument, &mut FormatContentModelContext) -> bool,
    ) -> Result<bool, EditorError> {
        self.try_format_content_model(options, |model, context| Ok::<_, Infallible>(mutator(model, context)))
    }

    /// Like [`Editor::format_content_model`] with a fallible mutator. On
    /// error the tree is left untouched and the cached model is dropped.
    pub fn try_format_content_model<E>(
        &mut self,
        options: FormatContentModelOptions,
        mutator: impl FnOnce(&mut ContentModelDocument, &mut FormatContentModelContext) -> Result<bool, E>,
    ) -> Result<bool, EditorError>
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        self.ensure_alive()?;
        let span = tracing::debug_span!(
            target: "trellis::format",
            "format_content_model",
            api = options.api_name.as_deref().unwrap_or("")
        );
        let _enter = span.enter();

        let mut model = self.acquire();
        let entities_before = model.entity_ids();
        let anchor = selected_block_index(&model);
        let had_selection = self.live_selection().is_some();

        let guard = TransactionGuard {
            cache: &mut self.cache,
            committed: false,
        };
        let mut context = FormatContentModelContext::default();
        let changed = mutator(&mut model, &mut context).map_err(EditorError::mutator)?;
        if !changed {
            tracing::debug!(target: "trellis::format", "mutator reported no change");
            guard.commit(self.options.enable_cache.then_some(model));
            return Ok(false);
        }

        normalize_content_model(&mut model);
        let mut result = content_model_to_dom(
            &mut self.dom,
            self.root,
            &mut model,
            &self.write_options,
            context.changed_blocks(),
        );
        self.stats.writes += 1;
        if result.selection.is_none() && had_selection {
            result.selection = Some(fallback_selection(&self.dom, self.root, &model, anchor));
        }
        let entities_after = model.entity_ids();
        guard.commit(self.options.enable_cache.then_some(model));

        self.selection = result.selection;
        if !context.skip_undo_snapshot {
            self.record_snapshot();
        }
        let event = ContentChangedEvent::new(&options.source, options.api_name.clone(), &result)
            .with_entities(&entities_before, &entities_after);
        self.notify(&event);
        Ok(true)
    }
}

/// Index of the first top-level block holding any part of the selection.
fn selected_block_index(model: &ContentModelDocument) -> Option<usize> {
    model.blocks.iter().position(|block| {
        let mut found = false;
        visit_blocks(std::slice::from_ref(block), &mut |b| {
            found |= match b {
                ContentModelBlock::Paragraph(p) => p.segments.iter().any(|s| s.is_selected()),
                ContentModelBlock::Table(t) => t.rows.iter().flat_map(|r| r.cells.iter()).any(|c| c.is_selected),
                ContentModelBlock::Divider(d) => d.is_selected,
                ContentModelBlock::Entity(e) => e.is_selected,
                ContentModelBlock::BlockGroup(_) => false,
            }
        });
        found
    })
}

/// A node the block was written to, from its first or last end.
fn block_node(dom: &Dom, root: NodeId, block: &ContentModelBlock, last: bool) -> Option<NodeId> {
    let live = |node: &NodeId| dom.contains(root, *node);
    if let Some(node) = block.dom_ref().and_then(|r| r.node).filter(live) {
        return Some(node);
    }
    match block {
        ContentModelBlock::Paragraph(p) => {
            let mut nodes = p.segments.iter().filter_map(|s| s.dom_ref().and_then(|r| r.node)).filter(live);
            if last { nodes.last() } else { nodes.next() }
        }
        _ => {
            let children = block.child_blocks()?;
            if last {
                children.iter().rev().find_map(|b| block_node(dom, root, b, true))
            } else {
                children.iter().find_map(|b| block_node(dom, root, b, false))
            }
        }
    }
}

/// Caret position at the very start or end of `node`'s content.
fn edge_position(dom: &Dom, node: NodeId, at_end: bool) -> Option<DomPosition> {
    let mut leaf = node;
    while let Some(child) = if at_end { dom.last_child(leaf) } else { dom.first_child(leaf) } {
        leaf = child;
    }
    if dom.is_text(leaf) {
        let offset = if at_end { dom.node_length(leaf) } else { 0 };
        return Some(DomPosition::new(leaf, offset));
    }
    if at_end && !dom.is_tag(leaf, "br") {
        DomPosition::after(dom, leaf)
    } else {
        DomPosition::before(dom, leaf)
    }
}

/// Where the caret goes when the selected content was deleted: the end of
/// the nearest block before it, else the start of the first block, else
/// the root itself.
fn fallback_selection(dom: &Dom, root: NodeId, model: &ContentModelDocument, anchor: Option<usize>) -> DomSelection {
    let before = anchor.unwrap_or(model.blocks.len()).min(model.blocks.len());
    let position = model.blocks[..before]
        .iter()
        .rev()
        .find_map(|b| block_node(dom, root, b, true))
        .and_then(|node| edge_position(dom, node, true))
        .or_else(|| {
            model
                .blocks
                .iter()
                .find_map(|b| block_node(dom, root, b, false))
                .and_then(|node| edge_position(dom, node, false))
        })
        .unwrap_or(DomPosition::new(root, 0));
    tracing::debug!(target: "trellis::format", ?position, "selection fell back");
    DomSelection::Range(DomRange::collapsed(position))
}
