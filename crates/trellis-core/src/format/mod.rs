//! Format handler registry.
//!
//! A format handler is a parse/apply pair for one key of a format record.
//! `parse` reads the key from an element (inline style, attributes, the
//! tag's default style) and `apply` writes it back. Handlers run in
//! registration order, and a handler may only depend on keys registered
//! before it; text alignment reads the direction parsed just ahead of it.

pub mod block;
pub mod default_styles;
pub mod image;
pub mod link;
pub mod segment;

use trellis_dom::{Dom, NodeId};

use crate::error::FormatError;
use crate::model::{BlockFormat, ImageFormat, LinkFormat, SegmentFormat};

pub use default_styles::{DefaultStyle, Display, default_style};

/// State inherited from the enclosing elements while parsing or applying.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormatContext {
    /// Segment format implied by enclosing elements. `apply` skips values
    /// that equal it.
    pub implicit_segment: SegmentFormat,
    /// Inherited text direction, used to resolve `start`/`end` alignment.
    pub is_rtl: bool,
}

pub type ParseFn<F> = fn(&mut F, &Dom, NodeId, &DefaultStyle, &FormatContext);
pub type ApplyFn<F> = fn(&F, &mut Dom, NodeId, &FormatContext);

pub struct FormatHandler<F> {
    pub key: &'static str,
    pub depends_on: &'static [&'static str],
    pub parse: ParseFn<F>,
    pub apply: ApplyFn<F>,
}

impl<F> Clone for FormatHandler<F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F> Copy for FormatHandler<F> {}

impl<F> std::fmt::Debug for FormatHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatHandler")
            .field("key", &self.key)
            .field("depends_on", &self.depends_on)
            .finish()
    }
}

/// Ordered handlers for one kind of format record.
pub struct HandlerList<F> {
    handlers: Vec<FormatHandler<F>>,
}

impl<F> Clone for HandlerList<F> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<F> std::fmt::Debug for HandlerList<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.handlers.iter().map(|h| h.key)).finish()
    }
}

impl<F> Default for HandlerList<F> {
    fn default() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }
}

impl<F> HandlerList<F> {
    /// Built-in lists are declared in dependency order.
    pub(crate) fn from_static(handlers: &[FormatHandler<F>]) -> Self {
        let mut list = Self::default();
        for handler in handlers {
            let registered = list.register(*handler);
            debug_assert!(registered.is_ok(), "built-in handler order: {registered:?}");
        }
        list
    }

    /// Add a handler, or replace the handler with the same key in place.
    /// Every key it depends on must already be registered ahead of it.
    pub fn register(&mut self, handler: FormatHandler<F>) -> Result<(), FormatError> {
        let position = self.handlers.iter().position(|h| h.key == handler.key);
        let ahead = &self.handlers[..position.unwrap_or(self.handlers.len())];
        if let Some(missing) = handler
            .depends_on
            .iter()
            .find(|dep| !ahead.iter().any(|h| h.key == **dep))
        {
            return Err(FormatError::MissingDependency {
                key: handler.key.to_string(),
                dependency: missing.to_string(),
            });
        }
        match position {
            Some(index) => {
                tracing::debug!(target: "trellis::format", key = handler.key, "overriding format handler");
                self.handlers[index] = handler;
            }
            None => self.handlers.push(handler),
        }
        Ok(())
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.iter().map(|h| h.key)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn parse(&self, format: &mut F, dom: &Dom, element: NodeId, default: &DefaultStyle, context: &FormatContext) {
        for handler in &self.handlers {
            (handler.parse)(format, dom, element, default, context);
        }
    }

    pub fn apply(&self, format: &F, dom: &mut Dom, element: NodeId, context: &FormatContext) {
        for handler in &self.handlers {
            (handler.apply)(format, dom, element, context);
        }
    }
}

/// Handler lists keyed by the kind of element they serve.
#[derive(Clone, Debug)]
pub struct FormatHandlerRegistry {
    /// Character format of inline elements.
    pub segment: HandlerList<SegmentFormat>,
    /// Character format set directly on a block element (style only).
    pub segment_on_block: HandlerList<SegmentFormat>,
    pub paragraph: HandlerList<BlockFormat>,
    pub container: HandlerList<BlockFormat>,
    pub table: HandlerList<BlockFormat>,
    pub table_row: HandlerList<BlockFormat>,
    pub table_cell: HandlerList<BlockFormat>,
    pub list_level: HandlerList<BlockFormat>,
    pub divider: HandlerList<BlockFormat>,
    pub image: HandlerList<ImageFormat>,
    pub link: HandlerList<LinkFormat>,
}

impl Default for FormatHandlerRegistry {
    fn default() -> Self {
        Self {
            segment: HandlerList::from_static(segment::SEGMENT_HANDLERS),
            segment_on_block: HandlerList::from_static(segment::SEGMENT_ON_BLOCK_HANDLERS),
            paragraph: HandlerList::from_static(block::PARAGRAPH_HANDLERS),
            container: HandlerList::from_static(block::CONTAINER_HANDLERS),
            table: HandlerList::from_static(block::TABLE_HANDLERS),
            table_row: HandlerList::from_static(block::TABLE_ROW_HANDLERS),
            table_cell: HandlerList::from_static(block::TABLE_CELL_HANDLERS),
            list_level: HandlerList::from_static(block::LIST_LEVEL_HANDLERS),
            divider: HandlerList::from_static(block::DIVIDER_HANDLERS),
            image: HandlerList::from_static(image::IMAGE_HANDLERS),
            link: HandlerList::from_static(link::LINK_HANDLERS),
        }
    }
}

/// Non-empty inline style value. `inherit` and `initial` count as unset.
pub(crate) fn style_value<'a>(dom: &'a Dom, element: NodeId, name: &str) -> Option<&'a str> {
    dom.style_property(element, name)
        .map(str::trim)
        .filter(|v| !v.is_empty() && !matches!(*v, "inherit" | "initial" | "unset"))
}

/// Non-empty attribute value.
pub(crate) fn attribute_value<'a>(dom: &'a Dom, element: NodeId, name: &str) -> Option<&'a str> {
    dom.attribute(element, name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
