//! Parse state threaded through the element processors.

use std::collections::HashMap;

use smol_str::SmolStr;
use trellis_dom::{Dom, DomPosition, DomRange, DomSelection, NodeId, TableSelection};

use crate::format::{FormatContext, FormatHandlerRegistry};
use crate::model::{
    Code, ContentModelBlock, ContentModelParagraph, ContentModelSegment, Link, ListLevel, SegmentFormat,
    create_paragraph, create_selection_marker,
};

pub type ElementProcessor = fn(&mut DomToModelContext<'_>, NodeId);

/// Processor lookup by lower-case tag. Besides tags, a few reserved keys
/// cover the non-tag steps: `*` for unknown elements, `#text` for text
/// nodes, `#children` for walking an element's children and `#entity` for
/// entity wrappers.
#[derive(Clone)]
pub struct ElementProcessorMap {
    processors: HashMap<SmolStr, ElementProcessor>,
}

impl std::fmt::Debug for ElementProcessorMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.processors.keys().collect();
        keys.sort();
        f.debug_set().entries(keys).finish()
    }
}

pub const FALLBACK_KEY: &str = "*";
pub const TEXT_KEY: &str = "#text";
pub const CHILDREN_KEY: &str = "#children";
pub const ENTITY_KEY: &str = "#entity";

impl ElementProcessorMap {
    pub fn new(processors: HashMap<SmolStr, ElementProcessor>) -> Self {
        Self { processors }
    }

    /// Replace the processor for a tag or reserved key.
    pub fn set(&mut self, key: &str, processor: ElementProcessor) {
        self.processors.insert(SmolStr::new(key), processor);
    }

    /// Processor for `tag`, or the fallback.
    pub fn get(&self, tag: &str) -> ElementProcessor {
        self.processors
            .get(tag)
            .or_else(|| self.processors.get(FALLBACK_KEY))
            .copied()
            .unwrap_or(super::general::process_general)
    }

    pub(crate) fn reserved(&self, key: &str, default: ElementProcessor) -> ElementProcessor {
        self.processors.get(key).copied().unwrap_or(default)
    }
}

impl Default for ElementProcessorMap {
    fn default() -> Self {
        super::default_processors()
    }
}

#[derive(Clone, Debug, Default)]
pub struct DomToModelOptions {
    pub formats: FormatHandlerRegistry,
    pub processors: ElementProcessorMap,
    /// Format every segment starts from.
    pub default_format: SegmentFormat,
}

impl DomToModelOptions {
    pub fn with_processor(mut self, key: &str, processor: ElementProcessor) -> Self {
        self.processors.set(key, processor);
        self
    }

    pub fn with_formats(mut self, formats: FormatHandlerRegistry) -> Self {
        self.formats = formats;
        self
    }

    pub fn with_default_format(mut self, format: SegmentFormat) -> Self {
        self.default_format = format;
        self
    }
}

/// Open list state while walking nested `ol`/`ul` elements.
#[derive(Clone, Debug, Default)]
pub struct ListContext {
    pub levels: Vec<ListLevel>,
    /// Last number used per depth, so a later list can continue it.
    pub threads: Vec<u32>,
    /// Builder depth that list items are added to.
    pub parent: Option<usize>,
}

#[derive(Debug, Default)]
struct OpenGroup {
    blocks: Vec<ContentModelBlock>,
    paragraph_open: bool,
}

/// Accumulates blocks for the group being parsed and the groups around it.
#[derive(Debug)]
pub struct ModelBuilder {
    groups: Vec<OpenGroup>,
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self {
            groups: vec![OpenGroup::default()],
        }
    }
}

impl ModelBuilder {
    /// Index of the innermost open group.
    pub fn depth(&self) -> usize {
        self.groups.len() - 1
    }

    fn top(&mut self) -> &mut OpenGroup {
        let depth = self.depth();
        &mut self.groups[depth]
    }

    pub fn push_group(&mut self) {
        self.close_paragraph();
        self.groups.push(OpenGroup::default());
    }

    /// Close the innermost group and hand back its blocks. The outermost
    /// group is never popped.
    pub fn pop_group(&mut self) -> Vec<ContentModelBlock> {
        if self.groups.len() == 1 {
            return std::mem::take(&mut self.groups[0].blocks);
        }
        self.groups.pop().map(|g| g.blocks).unwrap_or_default()
    }

    pub fn finish(mut self) -> Vec<ContentModelBlock> {
        self.groups.truncate(1);
        self.pop_group()
    }

    pub fn close_paragraph(&mut self) {
        self.top().paragraph_open = false;
    }

    pub fn start_paragraph(&mut self, paragraph: ContentModelParagraph) {
        let top = self.top();
        top.blocks.push(ContentModelBlock::Paragraph(paragraph));
        top.paragraph_open = true;
    }

    pub fn add_block(&mut self, block: ContentModelBlock) {
        let top = self.top();
        top.paragraph_open = false;
        top.blocks.push(block);
    }

    /// Index the next block of the innermost group will get.
    pub fn next_index(&self) -> usize {
        self.groups[self.depth()].blocks.len()
    }

    pub fn block_mut(&mut self, index: usize) -> Option<&mut ContentModelBlock> {
        self.top().blocks.get_mut(index)
    }

    /// True if `index` is the last block of the innermost group.
    pub fn is_last(&self, index: usize) -> bool {
        self.next_index() == index + 1
    }

    /// Reserve a block position in the group at `depth`, filled later with
    /// [`ModelBuilder::fill_slot`].
    pub fn reserve_slot(&mut self, depth: usize) -> usize {
        let depth = depth.min(self.groups.len() - 1);
        let group = &mut self.groups[depth];
        group.paragraph_open = false;
        group
            .blocks
            .push(ContentModelBlock::Paragraph(ContentModelParagraph::default()));
        group.blocks.len() - 1
    }

    pub fn fill_slot(&mut self, depth: usize, slot: usize, block: ContentModelBlock) {
        let depth = depth.min(self.groups.len() - 1);
        if let Some(target) = self.groups[depth].blocks.get_mut(slot) {
            *target = block;
        }
    }

    pub fn open_paragraph_mut(&mut self) -> Option<&mut ContentModelParagraph> {
        let top = self.top();
        if !top.paragraph_open {
            return None;
        }
        top.blocks.last_mut().and_then(ContentModelBlock::as_paragraph_mut)
    }

    pub fn open_paragraph(&self) -> Option<&ContentModelParagraph> {
        let top = &self.groups[self.depth()];
        if !top.paragraph_open {
            return None;
        }
        top.blocks.last().and_then(ContentModelBlock::as_paragraph)
    }

    pub fn has_open_paragraph(&self) -> bool {
        self.groups[self.depth()].paragraph_open
    }

    /// Append to the open paragraph, starting an implicit one if needed.
    pub fn add_segment(&mut self, segment: ContentModelSegment) {
        if let Some(paragraph) = self.open_paragraph_mut() {
            paragraph.segments.push(segment);
            return;
        }
        let mut paragraph = create_paragraph(true, &Default::default(), &Default::default(), None);
        paragraph.segments.push(segment);
        self.start_paragraph(paragraph);
    }

    /// Place a selection marker. Between blocks it goes to the end of the
    /// previous paragraph when there is one.
    pub fn add_marker(&mut self, marker: ContentModelSegment) {
        if self.has_open_paragraph() {
            self.add_segment(marker);
            return;
        }
        match self.top().blocks.last_mut() {
            Some(ContentModelBlock::Paragraph(p)) => p.segments.push(marker),
            _ => self.add_segment(marker),
        }
    }
}

/// Selection boundaries still to be turned into markers.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PendingRange {
    pub range: DomRange,
    pub start_seen: bool,
    pub end_seen: bool,
}

#[derive(Debug)]
pub struct DomToModelContext<'a> {
    pub dom: &'a Dom,
    pub options: &'a DomToModelOptions,
    pub builder: ModelBuilder,
    /// Inherited character format.
    pub segment_format: SegmentFormat,
    pub is_rtl: bool,
    pub link: Option<Link>,
    pub code: Option<Code>,
    pub is_pre: bool,
    pub list: ListContext,
    /// Content parsed now lies inside the selected range.
    pub is_in_selection: bool,
    pub(crate) range: Option<PendingRange>,
    pub table_selection: Option<TableSelection>,
    pub image_selection: Option<NodeId>,
}

/// Inherited state saved by [`DomToModelContext::stack`].
struct Saved {
    segment_format: SegmentFormat,
    is_rtl: bool,
    link: Option<Link>,
    code: Option<Code>,
    is_pre: bool,
}

impl<'a> DomToModelContext<'a> {
    /// Context for parsing the children of `root`.
    pub fn new(dom: &'a Dom, root: NodeId, options: &'a DomToModelOptions, selection: Option<&DomSelection>) -> Self {
        let mut context = Self {
            dom,
            options,
            builder: ModelBuilder::default(),
            segment_format: options.default_format.clone(),
            is_rtl: false,
            link: None,
            code: None,
            is_pre: false,
            list: ListContext::default(),
            is_in_selection: false,
            range: None,
            table_selection: None,
            image_selection: None,
        };
        match selection {
            Some(DomSelection::Range(range)) => {
                let range = DomRange {
                    start: leaf_position(dom, root, range.start),
                    end: leaf_position(dom, root, range.end),
                    is_reverted: range.is_reverted,
                };
                context.range = Some(PendingRange {
                    range,
                    start_seen: false,
                    end_seen: false,
                });
            }
            Some(DomSelection::Table(table)) => context.table_selection = Some(*table),
            Some(DomSelection::Image(image)) => context.image_selection = Some(*image),
            None => {}
        }
        context
    }

    pub fn format_context(&self) -> FormatContext {
        FormatContext {
            implicit_segment: self.segment_format.clone(),
            is_rtl: self.is_rtl,
        }
    }

    /// Run `f` with the inherited format state restored afterwards.
    pub fn stack<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = Saved {
            segment_format: self.segment_format.clone(),
            is_rtl: self.is_rtl,
            link: self.link.clone(),
            code: self.code.clone(),
            is_pre: self.is_pre,
        };
        let result = f(self);
        self.segment_format = saved.segment_format;
        self.is_rtl = saved.is_rtl;
        self.link = saved.link;
        self.code = saved.code;
        self.is_pre = saved.is_pre;
        result
    }

    /// Run `f` with an empty list context, as block groups that are not
    /// list items start fresh numbering.
    pub fn isolate_list<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = std::mem::take(&mut self.list);
        let result = f(self);
        self.list = saved;
        result
    }

    /// Dispatch any node to its processor.
    pub fn process_node(&mut self, node: NodeId) {
        if self.dom.is_text(node) {
            let processor = self.options.processors.reserved(TEXT_KEY, super::text::process_text);
            processor(self, node);
        } else if self.dom.is_element(node) {
            self.process_element(node);
        }
    }

    pub fn process_element(&mut self, element: NodeId) {
        let is_entity = self
            .dom
            .classes(element)
            .contains(&crate::model::entity::ENTITY_CLASS);
        let processor = if is_entity {
            self.options.processors.reserved(ENTITY_KEY, super::entity::process_entity)
        } else {
            let tag = self.dom.tag_name(element).unwrap_or_default();
            self.options.processors.get(tag)
        };
        processor(self, element);
    }

    pub fn process_children(&mut self, element: NodeId) {
        let processor = self
            .options
            .processors
            .reserved(CHILDREN_KEY, super::process_child_nodes);
        processor(self, element);
    }

    /// Turn a boundary at `(node, offset)` into a marker if the selection
    /// has one there.
    pub fn check_boundary(&mut self, node: NodeId, offset: usize) {
        let Some(pending) = self.range.as_mut() else {
            return;
        };
        let here = DomPosition::new(node, offset);
        if !pending.start_seen && pending.range.start == here {
            pending.start_seen = true;
            if pending.range.is_collapsed() {
                pending.end_seen = true;
            } else {
                self.is_in_selection = true;
            }
            self.add_marker();
        } else if pending.start_seen && !pending.end_seen && pending.range.end == here {
            pending.end_seen = true;
            self.is_in_selection = false;
            self.add_marker();
        }
    }

    /// Boundary offsets of the pending selection that fall inside `node`.
    pub fn boundaries_in(&self, node: NodeId) -> Vec<usize> {
        let Some(pending) = &self.range else {
            return Vec::new();
        };
        let mut offsets = Vec::new();
        if !pending.start_seen && pending.range.start.node == node {
            offsets.push(pending.range.start.offset);
        }
        if !pending.end_seen && pending.range.end.node == node {
            offsets.push(pending.range.end.offset);
        }
        offsets.sort_unstable();
        offsets.dedup();
        offsets
    }

    /// Resolve boundaries inside an opaque element (entity or general
    /// element) to just before or just after it.
    pub fn boundaries_inside(&mut self, element: NodeId, before: bool) {
        let Some(pending) = self.range else {
            return;
        };
        let dom = self.dom;
        let inside = |pos: DomPosition| dom.contains(element, pos.node);
        let start_inside = !pending.start_seen && inside(pending.range.start);
        let end_inside = !pending.end_seen && inside(pending.range.end);
        if before && start_inside {
            let start = pending.range.start;
            self.check_boundary(start.node, start.offset);
        }
        if !before && end_inside {
            let end = pending.range.end;
            self.check_boundary(end.node, end.offset);
        }
    }

    fn add_marker(&mut self) {
        let marker = create_selection_marker(&self.segment_format);
        self.builder.add_marker(marker);
    }
}

/// Point boundaries on childless elements at the element's slot in its
/// parent, where the child walker sees them. The root's own boundaries
/// are seen by the walk over its children, even when it has none.
fn leaf_position(dom: &Dom, root: NodeId, position: DomPosition) -> DomPosition {
    if position.node == root || !dom.is_element(position.node) || dom.child_count(position.node) > 0 {
        return position;
    }
    let at = if position.offset == 0 {
        DomPosition::before(dom, position.node)
    } else {
        DomPosition::after(dom, position.node)
    };
    at.unwrap_or(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::create_text;

    #[test]
    fn test_marker_between_blocks_joins_previous_paragraph() {
        let mut builder = ModelBuilder::default();
        builder.add_segment(create_text("a", &SegmentFormat::default()));
        builder.close_paragraph();
        builder.add_marker(create_selection_marker(&SegmentFormat::default()));
        let blocks = builder.finish();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].as_paragraph().unwrap().segments.len(), 2);
    }

    #[test]
    fn test_slots_keep_document_order() {
        let mut builder = ModelBuilder::default();
        let first = builder.reserve_slot(0);
        builder.push_group();
        let second = builder.reserve_slot(0);
        builder.add_segment(create_text("inner", &SegmentFormat::default()));
        let inner = builder.pop_group();
        builder.fill_slot(0, first, ContentModelBlock::Paragraph(ContentModelParagraph {
            segments: vec![create_text("first", &SegmentFormat::default())],
            ..Default::default()
        }));
        builder.fill_slot(0, second, inner.into_iter().next().unwrap());
        let blocks = builder.finish();
        assert_eq!(blocks[0].as_paragraph().unwrap().text(), "first");
        assert_eq!(blocks[1].as_paragraph().unwrap().text(), "inner");
    }
}
