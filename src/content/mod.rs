//! Content-stream replay: token model, tokenizer and the image locator.
//!
//! The locator consumes a flat token sequence, so hosts with their own
//! content parser can feed [`ContentToken`]s directly; the nom-based
//! [`tokenize`] helper covers the common case of replaying a page's decoded
//! content bytes.

pub mod locator;
pub mod tokenizer;
pub mod tokens;

pub use locator::{locate_images, mcid_bbox_map, ImageInfo, ImageLocator};
pub use tokenizer::tokenize;
pub use tokens::ContentToken;
