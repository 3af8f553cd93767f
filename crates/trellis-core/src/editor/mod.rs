//! The editor: owns the live tree, the cached model and the undo history,
//! and runs format transactions against them.
//!
//! Everything goes through `&mut Editor`, so a transaction has the model to
//! itself from acquire to write-back. Only clones escape, through
//! [`Editor::get_content_model_copy`].

pub mod cache;
mod format;
pub mod indexer;
pub mod undo;

use trellis_dom::{Dom, DomPosition, DomRange, DomSelection, NodeId};

use crate::config::EditorOptions;
use crate::dom_to_model::{DomToModelOptions, dom_to_content_model};
use crate::error::EditorError;
use crate::model::entity::parse_entity_classes;
use crate::model::ContentModelDocument;
use crate::model_to_dom::{ModelToDomOptions, WriteResult, content_model_to_dom};
use crate::normalize::normalize_content_model;

pub use cache::{CacheState, ModelCache, MutationClass, classify_mutation};
pub use format::{ContentChangedEvent, FormatContentModelContext, FormatContentModelOptions};
pub use indexer::{DomIndex, reconcile_selection};
pub use undo::{Snapshot, SnapshotPosition, SnapshotStack, UndoManager};

/// What kind of copy `get_content_model_copy` returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CopyMode {
    /// Cached model with live DOM references and the current selection.
    Connected,
    /// Same content, DOM references cleared.
    Disconnected,
    /// Fresh parse without selection or DOM references.
    Clean,
}

/// Work counters, mostly for tests and diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EditorStats {
    /// DOM to model parses.
    pub full_parses: usize,
    /// Transactions served from the cached model.
    pub fast_path: usize,
    /// Model to DOM writes.
    pub writes: usize,
}

type Subscriber = Box<dyn FnMut(&ContentChangedEvent)>;

pub struct Editor {
    dom: Dom,
    root: NodeId,
    options: EditorOptions,
    parse_options: DomToModelOptions,
    write_options: ModelToDomOptions,
    cache: ModelCache,
    selection: Option<DomSelection>,
    history: SnapshotStack,
    subscribers: Vec<Subscriber>,
    stats: EditorStats,
    disposed: bool,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("root", &self.root)
            .field("cache", &self.cache.state())
            .field("selection", &self.selection)
            .field("stats", &self.stats)
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

impl Editor {
    /// Editor over a fresh `div` root holding `html`.
    pub fn new(html: &str, options: EditorOptions) -> Self {
        let (dom, root) = Dom::new_with_root("div", html);
        Self::with_dom(dom, root, options)
    }

    /// Editor over an existing tree. Observation is switched on; records
    /// queued before this point are dropped.
    pub fn with_dom(mut dom: Dom, root: NodeId, options: EditorOptions) -> Self {
        dom.observe(true);
        dom.take_records();
        let parse_options =
            DomToModelOptions::default().with_default_format(options.default_segment_format.clone());
        let write_options = ModelToDomOptions {
            optimize: options.optimize,
            reuse_cached_elements: options.reuse_cached_elements,
            ..Default::default()
        };
        let history = SnapshotStack::new(options.undo_depth);
        let mut editor = Self {
            dom,
            root,
            options,
            parse_options,
            write_options,
            cache: ModelCache::default(),
            selection: None,
            history,
            subscribers: Vec::new(),
            stats: EditorStats::default(),
            disposed: false,
        };
        editor.record_snapshot();
        editor
    }

    /// Replace the processors and format handlers used for parsing.
    pub fn with_parse_options(mut self, options: DomToModelOptions) -> Self {
        self.parse_options = options;
        self.cache.invalidate();
        self
    }

    /// Replace the handlers used for writing. The editor's reuse and
    /// optimizer switches still apply.
    pub fn with_write_options(mut self, options: ModelToDomOptions) -> Self {
        self.write_options = ModelToDomOptions {
            optimize: self.options.optimize,
            reuse_cached_elements: self.options.reuse_cached_elements,
            ..options
        };
        self
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    /// The live tree, for changes made the way user input would make them.
    /// They are picked up from mutation records by the next transaction.
    pub fn dom_mut(&mut self) -> &mut Dom {
        &mut self.dom
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    pub fn stats(&self) -> EditorStats {
        self.stats
    }

    pub fn cache_state(&self) -> CacheState {
        self.cache.state()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Serialized content of the root.
    pub fn html(&self) -> String {
        self.dom.inner_html(self.root)
    }

    fn ensure_alive(&self) -> Result<(), EditorError> {
        if self.disposed {
            Err(EditorError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Call `subscriber` after every committed change.
    pub fn subscribe(&mut self, subscriber: impl FnMut(&ContentChangedEvent) + 'static) -> Result<(), EditorError> {
        self.ensure_alive()?;
        self.subscribers.push(Box::new(subscriber));
        Ok(())
    }

    fn notify(&mut self, event: &ContentChangedEvent) {
        tracing::debug!(
            target: "trellis::format",
            source = %event.source,
            api = event.api_name.as_deref().unwrap_or(""),
            added = event.added_blocks.len(),
            removed = event.removed_blocks.len(),
            "content changed"
        );
        for subscriber in &mut self.subscribers {
            subscriber(event);
        }
    }

    fn selection_in_root(&self, selection: &DomSelection) -> bool {
        let inside = |node| self.dom.contains(self.root, node);
        match selection {
            DomSelection::Range(range) => inside(range.start.node) && inside(range.end.node),
            DomSelection::Table(table) => inside(table.table),
            DomSelection::Image(image) => inside(*image),
        }
    }

    /// The current selection, if it still points into the root.
    fn live_selection(&self) -> Option<DomSelection> {
        self.selection.filter(|s| self.selection_in_root(s))
    }

    pub fn get_dom_selection(&self) -> Result<Option<DomSelection>, EditorError> {
        self.ensure_alive()?;
        Ok(self.live_selection())
    }

    /// Set the live selection. A selection outside the root clears it.
    pub fn set_dom_selection(&mut self, selection: Option<DomSelection>) -> Result<(), EditorError> {
        self.ensure_alive()?;
        self.selection = selection.filter(|s| self.selection_in_root(s));
        if selection.is_some() && self.selection.is_none() {
            tracing::debug!(target: "trellis::format", "selection outside the editable root ignored");
        }
        Ok(())
    }

    /// The model of the live tree: the cached one when pending mutations
    /// could be reconciled, else a fresh parse. The cache is left empty
    /// until the caller stores the model back.
    fn acquire(&mut self) -> ContentModelDocument {
        let records = self.dom.take_records();
        let selection = self.live_selection();
        if self.options.enable_cache {
            self.cache.replay(&self.dom, self.root, &records);
            if let Some(mut model) = self.cache.take() {
                if reconcile_selection(&mut model, selection.as_ref()) {
                    self.stats.fast_path += 1;
                    tracing::trace!(target: "trellis::cache", "using cached model");
                    return model;
                }
                tracing::debug!(target: "trellis::cache", "selection not in indexed text, re-parsing");
            }
        } else {
            self.cache.invalidate();
        }
        self.stats.full_parses += 1;
        dom_to_content_model(&self.dom, self.root, &self.parse_options, selection.as_ref())
    }

    fn store(&mut self, model: ContentModelDocument) {
        if self.options.enable_cache {
            self.cache.store(model);
        }
    }

    pub fn get_content_model_copy(&mut self, mode: CopyMode) -> Result<ContentModelDocument, EditorError> {
        self.ensure_alive()?;
        if mode == CopyMode::Clean {
            self.stats.full_parses += 1;
            let mut model = dom_to_content_model(&self.dom, self.root, &self.parse_options, None);
            model.clear_dom_refs();
            return Ok(model);
        }
        let model = self.acquire();
        let mut copy = model.clone();
        self.store(model);
        if mode == CopyMode::Disconnected {
            copy.clear_dom_refs();
        }
        Ok(copy)
    }

    /// Replace the content with `model`. Elements its DOM references still
    /// point at are reused.
    pub fn set_content_model(&mut self, mut model: ContentModelDocument) -> Result<WriteResult, EditorError> {
        self.ensure_alive()?;
        self.dom.take_records();
        self.cache.invalidate();
        let entities_before = live_entity_ids(&self.dom, self.root);

        normalize_content_model(&mut model);
        let result = content_model_to_dom(&mut self.dom, self.root, &mut model, &self.write_options, None);
        self.stats.writes += 1;
        self.selection = result.selection;
        self.store(model);
        self.record_snapshot();

        let entities_after = live_entity_ids(&self.dom, self.root);
        let event = ContentChangedEvent::new("SetContentModel", None, &result)
            .with_entities(&entities_before, &entities_after);
        self.notify(&event);
        Ok(result)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Step back one snapshot. Content typed since the last transaction is
    /// recorded first so it can be redone.
    pub fn undo(&mut self) -> Result<bool, EditorError> {
        self.ensure_alive()?;
        let html = self.html();
        if self.history.current().is_some_and(|s| s.html != html) {
            self.record_snapshot();
        }
        let Some(snapshot) = self.history.undo().cloned() else {
            return Ok(false);
        };
        self.restore(snapshot, "Undo");
        Ok(true)
    }

    pub fn redo(&mut self) -> Result<bool, EditorError> {
        self.ensure_alive()?;
        let Some(snapshot) = self.history.redo().cloned() else {
            return Ok(false);
        };
        self.restore(snapshot, "Redo");
        Ok(true)
    }

    fn restore(&mut self, snapshot: Snapshot, source: &'static str) {
        let entities_before = live_entity_ids(&self.dom, self.root);
        let removed = self.dom.children(self.root).to_vec();
        self.dom.set_inner_html(self.root, &snapshot.html);
        self.dom.take_records();
        self.cache.invalidate();

        self.selection = snapshot.selection.and_then(|(start, end)| {
            let start = self.resolve_snapshot_position(&start)?;
            let end = self.resolve_snapshot_position(&end)?;
            Some(DomSelection::Range(DomRange::new(start, end)))
        });
        let result = WriteResult {
            added_blocks: self.dom.children(self.root).to_vec(),
            removed_blocks: removed,
            selection: self.selection,
            ..Default::default()
        };
        let entities_after = live_entity_ids(&self.dom, self.root);
        let event = ContentChangedEvent::new(source, None, &result).with_entities(&entities_before, &entities_after);
        self.notify(&event);
    }

    fn snapshot_position(&self, position: DomPosition) -> Option<SnapshotPosition> {
        let mut path = Vec::new();
        let mut current = position.node;
        while current != self.root {
            path.push(self.dom.index_in_parent(current)?);
            current = self.dom.parent(current)?;
        }
        path.reverse();
        Some(SnapshotPosition {
            path,
            offset: position.offset,
        })
    }

    fn resolve_snapshot_position(&self, position: &SnapshotPosition) -> Option<DomPosition> {
        let node = self.dom.node_at_path(self.root, &position.path)?;
        Some(DomPosition::new(node, position.offset).clamped(&self.dom))
    }

    fn record_snapshot(&mut self) {
        let selection = self
            .live_selection()
            .and_then(|s| s.as_range().copied())
            .and_then(|r| Some((self.snapshot_position(r.start)?, self.snapshot_position(r.end)?)));
        let html = self.html();
        self.history.record(Snapshot { html, selection });
    }

    /// Stop accepting calls. Subscribers and the cached model are dropped.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.subscribers.clear();
        self.cache.invalidate();
        self.history.clear_history();
        self.dom.observe(false);
        self.dom.take_records();
        tracing::debug!(target: "trellis::format", "editor disposed");
    }
}

/// `(type, id)` of every entity wrapper in the live tree.
fn live_entity_ids(dom: &Dom, root: NodeId) -> Vec<(smol_str::SmolStr, smol_str::SmolStr)> {
    dom.descendants(root)
        .into_iter()
        .filter(|node| dom.is_element(*node))
        .filter_map(|node| parse_entity_classes(dom.classes(node)))
        .filter_map(|info| info.id.map(|id| (info.entity_type, id)))
        .collect()
}
