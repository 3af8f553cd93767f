//! Content Model to DOM.
//!
//! The writer walks the blocks of each group with a reference node, the
//! way a reconciler walks keyed children: a block whose cached element is
//! still valid keeps that element (moved into place when needed), every
//! other block gets fresh elements inserted before the reference node, and
//! whatever is left behind the walk at the end is removed.

mod block;
pub mod context;
mod list;
pub mod optimize;
mod segment;
pub mod selection;
mod table;

use std::collections::BTreeSet;

use trellis_dom::{Dom, DomSelection, NodeId};

use crate::format::FormatHandlerRegistry;
use crate::model::fingerprint::{block_fingerprint, context_hash};
use crate::model::{
    ContentModelBlock, ContentModelBlockGroup, ContentModelBr, ContentModelDivider, ContentModelDocument,
    ContentModelEntity, ContentModelFormatContainer, ContentModelGeneralBlock, ContentModelGeneralSegment,
    ContentModelImage, ContentModelListItem, ContentModelParagraph, ContentModelTable, ContentModelText, Fingerprint,
};

pub use context::{ListState, ModelToDomContext, OpenList, PendingPosition};

/// Writes one kind of block before the reference node and returns the
/// element it created, if any.
pub type BlockHandler<B> = fn(&mut ModelToDomContext<'_>, NodeId, Option<NodeId>, &mut B) -> Option<NodeId>;
/// Writes one kind of segment before the reference node.
pub type SegmentHandler<S> = fn(&mut ModelToDomContext<'_>, NodeId, Option<NodeId>, &mut S);

/// Per-type writers. Replace an entry to customise how a model node turns
/// into DOM.
#[derive(Clone, Copy)]
pub struct ModelToDomHandlers {
    pub paragraph: BlockHandler<ContentModelParagraph>,
    pub table: BlockHandler<ContentModelTable>,
    pub list_item: BlockHandler<ContentModelListItem>,
    pub format_container: BlockHandler<ContentModelFormatContainer>,
    pub general_block: BlockHandler<ContentModelGeneralBlock>,
    pub divider: BlockHandler<ContentModelDivider>,
    pub entity: BlockHandler<ContentModelEntity>,
    pub text: SegmentHandler<ContentModelText>,
    pub image: SegmentHandler<ContentModelImage>,
    pub br: SegmentHandler<ContentModelBr>,
    pub general_segment: SegmentHandler<ContentModelGeneralSegment>,
    pub entity_segment: SegmentHandler<ContentModelEntity>,
}

impl Default for ModelToDomHandlers {
    fn default() -> Self {
        Self {
            paragraph: block::write_paragraph,
            table: table::write_table,
            list_item: list::write_list_item,
            format_container: block::write_format_container,
            general_block: block::write_general_block,
            divider: block::write_divider,
            entity: block::write_entity_block,
            text: segment::write_text,
            image: segment::write_image,
            br: segment::write_br,
            general_segment: segment::write_general_segment,
            entity_segment: segment::write_entity_segment,
        }
    }
}

impl std::fmt::Debug for ModelToDomHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelToDomHandlers").finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
pub struct ModelToDomOptions {
    pub formats: FormatHandlerRegistry,
    pub handlers: ModelToDomHandlers,
    /// Merge and unwrap redundant inline elements after writing.
    pub optimize: bool,
    /// Keep elements of blocks whose fingerprint did not change.
    pub reuse_cached_elements: bool,
}

impl Default for ModelToDomOptions {
    fn default() -> Self {
        Self {
            formats: FormatHandlerRegistry::default(),
            handlers: ModelToDomHandlers::default(),
            optimize: true,
            reuse_cached_elements: true,
        }
    }
}

impl ModelToDomOptions {
    pub fn with_formats(mut self, formats: FormatHandlerRegistry) -> Self {
        self.formats = formats;
        self
    }

    pub fn with_handlers(mut self, handlers: ModelToDomHandlers) -> Self {
        self.handlers = handlers;
        self
    }
}

/// What a write changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteResult {
    /// Top-level elements created by this write.
    pub added_blocks: Vec<NodeId>,
    /// Top-level elements removed by this write.
    pub removed_blocks: Vec<NodeId>,
    /// Selection described by the model, in terms of the new tree.
    pub selection: Option<DomSelection>,
    /// Blocks that kept their cached element.
    pub reused: usize,
    /// Blocks written from scratch.
    pub written: usize,
}

/// Write `model` as the children of `root`.
///
/// With `changed_blocks`, top-level blocks outside the set keep their cached
/// element without comparing fingerprints.
#[tracing::instrument(level = "debug", target = "trellis::write", skip_all)]
pub fn content_model_to_dom(
    dom: &mut Dom,
    root: NodeId,
    model: &mut ContentModelDocument,
    options: &ModelToDomOptions,
    changed_blocks: Option<&BTreeSet<usize>>,
) -> WriteResult {
    let observing = dom.is_observing();
    dom.observe(false);

    let is_rtl = dom
        .style_property(root, "direction")
        .or_else(|| dom.attribute(root, "dir"))
        .is_some_and(|direction| direction.trim().eq_ignore_ascii_case("rtl"));
    let mut context = ModelToDomContext::new(dom, options, &model.format);
    context.is_rtl = is_rtl;
    write_blocks(&mut context, root, &mut model.blocks, changed_blocks);

    if options.optimize {
        optimize::optimize(context.dom, root, &context.keep);
    }
    let selection = selection::build_selection(&context, model.has_reverted_range_selection);

    let result = WriteResult {
        added_blocks: context.added_blocks,
        removed_blocks: context.removed_blocks,
        selection,
        reused: context.reused,
        written: context.written,
    };
    dom.observe(observing);

    tracing::debug!(
        target: "trellis::write",
        reused = result.reused,
        written = result.written,
        added = result.added_blocks.len(),
        removed = result.removed_blocks.len(),
        "wrote content model"
    );
    result
}

/// Serialize a model into a detached container and return its HTML.
pub fn content_model_to_html(model: &ContentModelDocument, options: &ModelToDomOptions) -> String {
    let (mut dom, root) = Dom::new_with_root("div", "");
    let mut model = model.clone();
    model.clear_dom_refs();
    content_model_to_dom(&mut dom, root, &mut model, options, None);
    dom.inner_html(root)
}

/// Reconcile the children of `parent` with `blocks`.
pub fn write_blocks(
    context: &mut ModelToDomContext<'_>,
    parent: NodeId,
    blocks: &mut [ContentModelBlock],
    changed_blocks: Option<&BTreeSet<usize>>,
) {
    let first = context.dom.first_child(parent);
    context.cursors.push(first);
    let depth = context.cursors.len() - 1;

    for (index, block) in blocks.iter_mut().enumerate() {
        if !matches!(block, ContentModelBlock::BlockGroup(ContentModelBlockGroup::ListItem(_))) {
            context.list.stack.clear();
        }
        let unchanged = changed_blocks.is_some_and(|set| !set.contains(&index));
        write_block(context, parent, block, unchanged);
    }

    let top_level = context.is_top_level();
    let mut leftover = context.cursors[depth];
    while let Some(node) = leftover {
        leftover = context.dom.next_sibling(node);
        context.dom.remove(node);
        context.swept.push(node);
        if top_level && context.dom.is_element(node) {
            context.removed_blocks.push(node);
        }
    }
    context.cursors.pop();
}

fn cursor(context: &ModelToDomContext<'_>) -> Option<NodeId> {
    context.cursors.last().copied().flatten()
}

/// Put a reused element at the cursor.
fn place(context: &mut ModelToDomContext<'_>, parent: NodeId, element: NodeId) {
    let at = cursor(context);
    context.insert(parent, element, at);
    context.claimed.insert(element);
    context.keep.insert(element);
    context.reused += 1;
}

fn write_block(context: &mut ModelToDomContext<'_>, parent: NodeId, block: &mut ContentModelBlock, unchanged: bool) {
    if let Some(element) = reusable_element(context, parent, block, unchanged) {
        if block::note_block_selection(context, block) {
            tracing::trace!(target: "trellis::write", kind = block.kind(), ?element, "reusing element");
            place(context, parent, element);
            return;
        }
    }

    let fingerprint_context = context_hash(&context.implicit_format, context.is_rtl);
    let before = cursor(context);
    let handlers = context.options.handlers;
    let element = match block {
        ContentModelBlock::Paragraph(p) => (handlers.paragraph)(context, parent, before, p),
        ContentModelBlock::Table(t) => (handlers.table)(context, parent, before, t),
        ContentModelBlock::BlockGroup(ContentModelBlockGroup::ListItem(item)) => {
            (handlers.list_item)(context, parent, before, item)
        }
        ContentModelBlock::BlockGroup(ContentModelBlockGroup::FormatContainer(c)) => {
            (handlers.format_container)(context, parent, before, c)
        }
        ContentModelBlock::BlockGroup(ContentModelBlockGroup::General(g)) => {
            (handlers.general_block)(context, parent, before, g)
        }
        ContentModelBlock::Divider(d) => (handlers.divider)(context, parent, before, d),
        ContentModelBlock::Entity(e) => (handlers.entity)(context, parent, before, e),
    };
    context.written += 1;

    if let Some(element) = element {
        if context.is_top_level() && !context.claimed.contains(&element) {
            context.added_blocks.push(element);
        }
    }
    let content = crate::model::fingerprint::block_content_hash(block);
    if let Some(dom_ref) = block.dom_ref_mut() {
        dom_ref.node = element;
        dom_ref.offset = 0;
        dom_ref.fingerprint = element.map(|_| Fingerprint {
            content,
            context: fingerprint_context,
        });
    }
}

/// The cached element of `block` if it can stand in for a fresh write.
fn reusable_element(
    context: &ModelToDomContext<'_>,
    parent: NodeId,
    block: &ContentModelBlock,
    unchanged: bool,
) -> Option<NodeId> {
    if !context.options.reuse_cached_elements {
        return None;
    }
    // Containers keep their element but always reconcile their children.
    if matches!(block, ContentModelBlock::BlockGroup(ContentModelBlockGroup::FormatContainer(_))) {
        return None;
    }
    let dom_ref = block.dom_ref()?;
    let element = dom_ref.node.filter(|node| is_live(context.dom, *node))?;
    if context.claimed.contains(&element) || context.dom.parent(element) != Some(parent) {
        return None;
    }
    if unchanged && context.is_top_level() {
        return Some(element);
    }
    let recorded = dom_ref.fingerprint?;
    let current = block_fingerprint(block, &context.implicit_format, context.is_rtl);
    (recorded == current).then_some(element)
}

/// References from a model built against another tree may point past the
/// end of this one.
pub(crate) fn is_live(dom: &Dom, node: NodeId) -> bool {
    node.index() < dom.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom_to_model::{DomToModelOptions, dom_to_content_model, html_to_content_model};
    use crate::model::{ListType, SegmentFormat, create_list_item, create_list_level, create_paragraph, create_text};

    fn roundtrip(html: &str) -> String {
        let model = html_to_content_model(html, &DomToModelOptions::default());
        content_model_to_html(&model, &ModelToDomOptions::default())
    }

    #[test]
    fn test_paragraph_html() {
        insta::assert_snapshot!(roundtrip("<div><p>Hello <b>World</b></p></div>"), @"<p>Hello <b>World</b></p>");
    }

    #[test]
    fn test_empty_paragraph_gets_br() {
        insta::assert_snapshot!(roundtrip("<p></p>"), @"<p><br></p>");
    }

    #[test]
    fn test_adjacent_bold_merges() {
        insta::assert_snapshot!(roundtrip("<p><b>a</b><b>b</b></p>"), @"<p><b>ab</b></p>");
    }

    #[test]
    fn test_heading_does_not_repeat_bold() {
        insta::assert_snapshot!(roundtrip("<h2>Title</h2>"), @"<h2>Title</h2>");
    }

    #[test]
    fn test_link_and_styles() {
        insta::assert_snapshot!(
            roundtrip(r#"<p><a href="https://a.example"><span style="color: red">x</span></a></p>"#),
            @r#"<p><span style="color: red"><a href="https://a.example">x</a></span></p>"#
        );
    }

    #[test]
    fn test_list_numbering_written_back() {
        let html = r#"<ol><li>a</li></ol><p>x</p><ol start="2"><li>b</li></ol><ol start="7"><li>c</li></ol>"#;
        insta::assert_snapshot!(
            roundtrip(html),
            @r#"<ol><li>a</li></ol><p>x</p><ol start="2"><li>b</li></ol><ol start="7"><li>c</li></ol>"#
        );
    }

    #[test]
    fn test_nested_list() {
        insta::assert_snapshot!(
            roundtrip("<ul><li>a<ul><li>b</li></ul></li><li>c</li></ul>"),
            @"<ul><li>a<ul><li>b</li></ul></li><li>c</li></ul>"
        );
    }

    #[test]
    fn test_table_spans() {
        insta::assert_snapshot!(
            roundtrip(r#"<table><tbody><tr><td colspan="2">a</td></tr><tr><td>b</td><td>c</td></tr></tbody></table>"#),
            @r#"<table><tbody><tr><td colspan="2">a</td></tr><tr><td>b</td><td>c</td></tr></tbody></table>"#
        );
    }

    #[test]
    fn test_unchanged_paragraphs_are_reused() {
        let (mut dom, root) = Dom::new_with_root("div", "<p>a</p><p>b</p>");
        let first = dom.first_child(root).unwrap();
        let mut model = dom_to_content_model(&dom, root, &DomToModelOptions::default(), None);
        model.blocks[1]
            .as_paragraph_mut()
            .unwrap()
            .segments
            .push(create_text("c", &SegmentFormat::default()));

        let result = content_model_to_dom(&mut dom, root, &mut model, &ModelToDomOptions::default(), None);
        assert_eq!(result.reused, 1);
        assert_eq!(result.written, 1);
        assert_eq!(result.removed_blocks.len(), 1);
        assert_eq!(dom.first_child(root), Some(first));
        assert_eq!(dom.inner_html(root), "<p>a</p><p>bc</p>");
    }

    #[test]
    fn test_moved_block_keeps_element() {
        let (mut dom, root) = Dom::new_with_root("div", "<p>a</p><hr><p>b</p>");
        let hr = dom.child_at(root, 1).unwrap();
        let mut model = dom_to_content_model(&dom, root, &DomToModelOptions::default(), None);
        model.blocks.swap(0, 1);
        content_model_to_dom(&mut dom, root, &mut model, &ModelToDomOptions::default(), None);
        assert_eq!(dom.first_child(root), Some(hr));
        assert_eq!(dom.inner_html(root), "<hr><p>a</p><p>b</p>");
    }

    #[test]
    fn test_list_item_from_model() {
        let mut model = ContentModelDocument::new();
        let mut item = create_list_item(vec![create_list_level(ListType::Ordered, Some(3))], &SegmentFormat::default());
        let mut paragraph = create_paragraph(true, &Default::default(), &SegmentFormat::default(), None);
        paragraph.segments.push(create_text("x", &SegmentFormat::default()));
        item.blocks.push(ContentModelBlock::Paragraph(paragraph));
        model.blocks.push(ContentModelBlock::BlockGroup(ContentModelBlockGroup::ListItem(item)));
        insta::assert_snapshot!(
            content_model_to_html(&model, &ModelToDomOptions::default()),
            @r#"<ol start="3"><li>x</li></ol>"#
        );
    }
}
