//! trellis-dom: a live, mutable element/text/comment tree.
//!
//! This crate stands in for the browser DOM that the content model is kept in
//! sync with. It provides:
//! - `Dom` - an arena of nodes with attribute, style and class helpers
//! - HTML parsing (`Dom::set_inner_html`) and serialization (`Dom::inner_html`)
//! - `MutationRecord` - what changed, recorded while observation is enabled
//! - `DomPosition` / `DomRange` / `DomSelection` - selection boundary points
//! - `FragmentNode` - owned snapshots of subtrees that outlive a `Dom`

pub mod error;
pub mod fragment;
pub mod html;
pub mod mutation;
pub mod node;
pub mod selection;
pub mod style;

pub use error::DomError;
pub use fragment::FragmentNode;
pub use mutation::MutationRecord;
pub use node::{Dom, NodeId, NodeKind};
pub use selection::{DomPosition, DomRange, DomSelection, TableSelection};
pub use smol_str::SmolStr;
pub use style::StyleDeclaration;
