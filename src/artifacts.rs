//! Artifact marking for untagged path content.
//!
//! Decorative rule lines and table borders are usually drawn as bare
//! rectangle-then-paint sequences (`x y w h re S`) with no marked-content
//! wrapper, which makes screen readers announce them as unlabeled content.
//! This pass rewrites every page content stream, wrapping each such
//! sequence in `/Artifact BMC ... EMC` so conforming readers skip it.

use crate::error::Result;
use crate::graph::{Graph, NodeRef};
use crate::object::Object;
use bytes::Bytes;
use lazy_static::lazy_static;
use regex::bytes::Regex;

lazy_static! {
    // Four numeric operands, `re`, then any of the path-painting operators.
    static ref PATH_PAINT: Regex = Regex::new(
        r"((?:[-+]?\d*\.?\d+(?:e[-+]?\d+)?\s+){4}re\s+(?:S|s|f\*?|F|B\*?|b\*?|n))"
    )
    .unwrap();
}

/// Wrap every bare rectangle-paint sequence in an artifact marker.
fn mark_paths(content: &[u8]) -> Vec<u8> {
    PATH_PAINT
        .replace_all(content, &b"/Artifact BMC\n$1\nEMC"[..])
        .into_owned()
}

/// Rewrite every content stream of every page, marking bare path-painting
/// sequences as artifacts. Streams without a match are left byte-identical.
pub fn mark_paths_as_artifacts(graph: &mut Graph) -> Result<()> {
    let pages = graph.pages()?;
    for page in pages {
        let contents = NodeRef::indirect(page).key("Contents");
        let stream_refs: Vec<NodeRef> = match graph.node(&contents) {
            Some(Object::Stream { .. }) => vec![contents],
            Some(Object::Array(items)) => (0..items.len()).map(|i| contents.index(i)).collect(),
            Some(other) => {
                log::warn!("/Contents of page {} is a {}, skipping", page, other.type_name());
                continue;
            },
            None => continue,
        };

        for stream_ref in stream_refs {
            rewrite_stream(graph, &stream_ref);
        }
    }
    Ok(())
}

fn rewrite_stream(graph: &mut Graph, stream_ref: &NodeRef) {
    let rewritten = match graph.node(stream_ref) {
        Some(Object::Stream { data, .. }) => {
            if !PATH_PAINT.is_match(data) {
                return;
            }
            mark_paths(data)
        },
        _ => {
            log::warn!("Content node at {} is not a stream, skipping", stream_ref.anchor);
            return;
        },
    };

    match graph.node_mut(stream_ref) {
        Ok(Object::Stream { dict, data }) => {
            dict.insert("Length".to_string(), Object::Integer(rewritten.len() as i64));
            *data = Bytes::from(rewritten);
        },
        Ok(_) => {},
        Err(e) => log::warn!("Failed to rewrite content stream: {}", e),
    }
}
