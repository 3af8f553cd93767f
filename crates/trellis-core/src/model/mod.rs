//! The Content Model: a serializable tree of blocks and segments that
//! mirrors an editable DOM subtree.

pub mod block;
pub mod document;
pub mod dom_ref;
pub mod edit;
pub mod entity;
pub mod fingerprint;
pub mod format;
pub mod metadata;
pub mod segment;
pub mod selection;

pub use block::{
    ContentModelBlock, ContentModelBlockGroup, ContentModelDivider, ContentModelFormatContainer,
    ContentModelGeneralBlock, ContentModelListItem, ContentModelParagraph, ContentModelTable,
    ContentModelTableCell, ContentModelTableRow, ListLevel, ListType, ParagraphDecorator,
    create_divider, create_format_container, create_list_item, create_list_level, create_paragraph,
    create_paragraph_decorator, create_table, create_table_cell,
};
pub use document::{ContentModelDocument, visit_blocks, visit_blocks_mut};
pub use dom_ref::{DomRef, Fingerprint};
pub use entity::{ContentModelEntity, create_entity};
pub use format::{BlockFormat, ImageFormat, LinkFormat, SegmentFormat};
pub use metadata::{Dataset, ListMetadata, TableCellMetadata, TableMetadata};
pub use segment::{
    Code, ContentModelBr, ContentModelGeneralSegment, ContentModelImage, ContentModelSegment,
    ContentModelSelectionMarker, ContentModelText, Link, create_br, create_general_segment,
    create_image, create_link, create_selection_marker, create_text, split_at_char,
};
pub use selection::{
    ModelPosition, SelectedItem, SelectionKind, clear_selection, get_selected_segments,
    has_selection, iterate_selections, selection_kind, set_selection,
};
