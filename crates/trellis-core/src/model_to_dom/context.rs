//! Write state threaded through the block and segment handlers.

use std::collections::HashSet;

use trellis_dom::{Dom, NodeId, TableSelection};

use super::ModelToDomOptions;
use crate::format::FormatContext;
use crate::model::{ListLevel, SegmentFormat};

/// A selection boundary recorded while writing. Text positions stay valid
/// through the optimizer because it never touches text nodes; element
/// positions are resolved once the tree has its final shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PendingPosition {
    Text(NodeId, usize),
    Before(NodeId),
    After(NodeId),
    Start(NodeId),
}

/// A list element opened for one nesting level.
#[derive(Clone, Debug)]
pub struct OpenList {
    pub element: NodeId,
    pub level: ListLevel,
}

#[derive(Clone, Debug, Default)]
pub struct ListState {
    pub stack: Vec<OpenList>,
    /// Last number used per depth.
    pub threads: Vec<u32>,
}

pub struct ModelToDomContext<'a> {
    pub dom: &'a mut Dom,
    pub options: &'a ModelToDomOptions,
    /// Segment format the enclosing elements already imply.
    pub implicit_format: SegmentFormat,
    pub is_rtl: bool,
    pub list: ListState,
    pub(crate) markers: Vec<PendingPosition>,
    pub(crate) table_selection: Option<TableSelection>,
    pub(crate) image_selection: Option<NodeId>,
    /// Reused elements and opaque content the optimizer leaves alone.
    pub(crate) keep: HashSet<NodeId>,
    /// Cached elements already placed in this write.
    pub(crate) claimed: HashSet<NodeId>,
    /// Reference node of every group being written, innermost last.
    pub(crate) cursors: Vec<Option<NodeId>>,
    /// Nodes swept out during this write.
    pub(crate) swept: Vec<NodeId>,
    pub(crate) added_blocks: Vec<NodeId>,
    pub(crate) removed_blocks: Vec<NodeId>,
    pub(crate) reused: usize,
    pub(crate) written: usize,
}

impl std::fmt::Debug for ModelToDomContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelToDomContext")
            .field("implicit_format", &self.implicit_format)
            .field("is_rtl", &self.is_rtl)
            .field("depth", &self.cursors.len())
            .field("markers", &self.markers)
            .finish_non_exhaustive()
    }
}

impl<'a> ModelToDomContext<'a> {
    pub fn new(dom: &'a mut Dom, options: &'a ModelToDomOptions, implicit_format: &SegmentFormat) -> Self {
        Self {
            dom,
            options,
            implicit_format: implicit_format.clone(),
            is_rtl: false,
            list: ListState::default(),
            markers: Vec::new(),
            table_selection: None,
            image_selection: None,
            keep: HashSet::new(),
            claimed: HashSet::new(),
            cursors: Vec::new(),
            swept: Vec::new(),
            added_blocks: Vec::new(),
            removed_blocks: Vec::new(),
            reused: 0,
            written: 0,
        }
    }

    pub fn format_context(&self) -> FormatContext {
        FormatContext {
            implicit_segment: self.implicit_format.clone(),
            is_rtl: self.is_rtl,
        }
    }

    /// Run `f` with the implicit format and direction restored afterwards.
    pub fn stack<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let implicit_format = self.implicit_format.clone();
        let is_rtl = self.is_rtl;
        let result = f(self);
        self.implicit_format = implicit_format;
        self.is_rtl = is_rtl;
        result
    }

    /// Run `f` with fresh list state.
    pub fn isolate_list<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = std::mem::take(&mut self.list);
        let result = f(self);
        self.list = saved;
        result
    }

    /// True while writing the direct children of the root.
    pub fn is_top_level(&self) -> bool {
        self.cursors.len() == 1
    }

    /// Insert `node` under `parent` before `before`, moving it if it is
    /// attached elsewhere. A group cursor resting on `node` steps past it
    /// first so the walk over that group is not lost.
    pub fn insert(&mut self, parent: NodeId, node: NodeId, before: Option<NodeId>) {
        for index in 0..self.cursors.len() {
            if self.cursors[index] == Some(node) {
                self.cursors[index] = self.dom.next_sibling(node);
            }
        }
        if before == Some(node) {
            return;
        }
        if let Err(err) = self.dom.insert_before(parent, node, before) {
            tracing::warn!(target: "trellis::write", %err, "cannot insert node");
        }
    }

    pub fn append(&mut self, parent: NodeId, node: NodeId) {
        self.insert(parent, node, None);
    }

    /// Write `data-*` attributes.
    pub fn write_dataset<'d>(&mut self, element: NodeId, dataset: impl IntoIterator<Item = (&'d str, &'d str)>) {
        for (key, value) in dataset {
            self.dom.set_attribute(element, &format!("data-{key}"), value);
        }
    }

    pub(crate) fn push_marker(&mut self, position: PendingPosition) {
        self.markers.push(position);
    }
}
