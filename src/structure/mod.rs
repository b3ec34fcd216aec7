//! Logical structure tree: classification, rendering, and bbox injection.

pub mod node;
pub mod walker;

pub use node::{ElemNode, StructNode};
pub use walker::{ensure_layout_bboxes, show_structure, StructWalker};
