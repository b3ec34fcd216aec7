// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::needless_range_loop)]
#![allow(clippy::match_like_matches_macro)]

//! # tagwalk
//!
//! Accessibility post-processing for tagged PDF documents.
//!
//! Operates on an already-parsed document graph (every indirect object
//! keyed by its reference) and walks the logical structure tree hanging
//! off `/StructTreeRoot`:
//!
//! - **Structure rendering**: [`show_structure`] turns the tree into
//!   indented tag-like text (`<Document>`, `<Figure ...>`) for inspection
//!   and diffing.
//! - **Figure bbox injection**: [`ensure_layout_bboxes`] replays each
//!   page's content stream to locate drawn images, then writes a
//!   `/A << /O /Layout /BBox [...] >>` attribute onto every `Figure`
//!   element that lacks one. Idempotent across runs.
//! - **Artifact marking**: [`mark_paths_as_artifacts`] wraps bare
//!   rectangle-paint sequences in `/Artifact BMC ... EMC` so decorative
//!   rules are skipped by screen readers.
//!
//! Malformed nodes degrade to logged skips or `[Unhandled type: ...]`
//! placeholders; only missing preconditions (no structure tree, no
//! readable page list) fail an operation outright.
//!
//! ## Quick Start
//!
//! ```
//! use tagwalk::{Graph, Object, ObjectRef};
//!
//! let mut graph = Graph::new();
//! let catalog = ObjectRef::new(1, 0);
//! graph.insert(
//!     catalog,
//!     Object::Dictionary(
//!         [("Type".to_string(), Object::name("Catalog"))]
//!             .into_iter()
//!             .collect(),
//!     ),
//! );
//! graph.set_root(catalog);
//!
//! // No structure tree yet, so the walk refuses to start
//! assert!(tagwalk::show_structure(&graph).is_err());
//! ```
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 (<http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license (<http://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]

// Error handling
pub mod error;

// Document graph model
pub mod graph;
pub mod object;

// Content stream replay
pub mod content;
pub mod geometry;

// Structure tree walks
pub mod structure;

// Content rewriting
pub mod artifacts;

pub use artifacts::mark_paths_as_artifacts;
pub use content::{locate_images, mcid_bbox_map, tokenize, ContentToken, ImageInfo, ImageLocator};
pub use error::{Error, Result};
pub use geometry::{Matrix, Point, Rect};
pub use graph::{Graph, NodeRef, PathStep};
pub use object::{Object, ObjectRef};
pub use structure::{ensure_layout_bboxes, show_structure, StructNode, StructWalker};
