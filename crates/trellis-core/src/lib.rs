//! trellis-core: a rich-text content model kept in sync with a live tree.
//!
//! This crate provides:
//! - `ContentModelDocument` - the serializable block/segment model
//! - `FormatHandlerRegistry` - paired parse/apply handlers per format kind
//! - `dom_to_content_model` / `content_model_to_dom` - the two sync directions
//! - `normalize_content_model` - the invariants every write relies on
//! - `Editor` - `format_content_model` transactions over a cached model

pub mod config;
pub mod dom_to_model;
pub mod editor;
pub mod error;
pub mod format;
pub mod model;
pub mod model_to_dom;
pub mod normalize;

pub use config::EditorOptions;
pub use dom_to_model::{DomToModelOptions, dom_to_content_model, html_to_content_model};
pub use editor::{
    CacheState, ContentChangedEvent, CopyMode, Editor, EditorStats, FormatContentModelContext,
    FormatContentModelOptions,
};
pub use error::{EditorError, FormatError};
pub use format::{FormatHandler, FormatHandlerRegistry};
pub use model::{ContentModelBlock, ContentModelDocument, ContentModelSegment, SegmentFormat};
pub use model_to_dom::{ModelToDomOptions, WriteResult, content_model_to_dom, content_model_to_html};
pub use normalize::normalize_content_model;
pub use smol_str::SmolStr;
pub use trellis_dom;
