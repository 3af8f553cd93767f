use trellis_dom::{Dom, DomPosition, DomRange, DomSelection};

use super::context::{ModelToDomContext, PendingPosition};

/// Resolve a recorded boundary against the final tree.
pub fn resolve_position(dom: &Dom, position: PendingPosition) -> Option<DomPosition> {
    match position {
        PendingPosition::Text(node, offset) => Some(DomPosition::new(node, offset)),
        PendingPosition::Before(node) => DomPosition::before(dom, node),
        PendingPosition::After(node) => DomPosition::after(dom, node),
        PendingPosition::Start(node) => Some(DomPosition::new(node, 0)),
    }
}

/// The selection the written model describes. A table selection wins
/// over an image selection, which wins over a range.
pub(crate) fn build_selection(context: &ModelToDomContext<'_>, reverted: bool) -> Option<DomSelection> {
    if let Some(table) = context.table_selection {
        return Some(DomSelection::Table(table));
    }
    if let Some(image) = context.image_selection {
        return Some(DomSelection::Image(image));
    }
    let dom: &Dom = context.dom;
    let start = resolve_position(dom, *context.markers.first()?)?;
    let end = resolve_position(dom, *context.markers.last()?)?;
    let mut range = DomRange::new(start, end);
    range.is_reverted = reverted && !range.is_collapsed();
    Some(DomSelection::Range(range))
}
