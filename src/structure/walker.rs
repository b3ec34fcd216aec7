//! Structure-tree walks.
//!
//! A [`StructWalker`] carries the per-document context a walk needs: the
//! page object map (page identity to 1-based page number, in page tree
//! order) and, for the injection pass, the located image bboxes keyed by
//! marked-content id. The two top-level operations, [`show_structure`] and
//! [`ensure_layout_bboxes`], assemble that context and drive every root in
//! order.

use crate::content::mcid_bbox_map;
use crate::error::Result;
use crate::geometry::Rect;
use crate::graph::{Graph, NodeRef};
use crate::object::ObjectRef;
use crate::structure::node::StructNode;
use std::collections::HashMap;

/// Shared context for structure-tree walks.
#[derive(Debug, Clone, Default)]
pub struct StructWalker {
    page_map: HashMap<ObjectRef, u32>,
    mcid_bboxes: HashMap<i64, Rect>,
}

impl StructWalker {
    /// Build a walker from the document's pages in page tree order.
    pub fn new(pages: &[ObjectRef]) -> Self {
        let page_map = pages
            .iter()
            .enumerate()
            .map(|(i, &page)| (page, i as u32 + 1))
            .collect();
        StructWalker {
            page_map,
            mcid_bboxes: HashMap::new(),
        }
    }

    /// Attach located image bboxes for the injection pass.
    pub fn with_mcid_bboxes(mut self, bboxes: HashMap<i64, Rect>) -> Self {
        self.mcid_bboxes = bboxes;
        self
    }

    /// 1-based page number of a page object, if it is in the page tree.
    pub fn page_number(&self, page: ObjectRef) -> Option<u32> {
        self.page_map.get(&page).copied()
    }

    /// Located bbox for a marked-content id, if any content stream placed
    /// an image under it.
    pub fn mcid_bbox(&self, mcid: i64) -> Option<Rect> {
        self.mcid_bboxes.get(&mcid).copied()
    }

    /// Render every root in order as one text block.
    pub fn render(&self, graph: &Graph, roots: &[NodeRef]) -> String {
        let mut out = String::new();
        for root in roots {
            StructNode::from_graph(graph, root).render(graph, self, 0, &mut out);
        }
        out
    }

    /// Run the bbox-injection pass over every root in order.
    pub fn ensure_layout_bboxes(&self, graph: &mut Graph, roots: &[NodeRef]) {
        for root in roots {
            let node = StructNode::from_graph(graph, root);
            node.ensure_layout_bbox(graph, self);
        }
    }
}

/// Render the document's structure tree as indented text.
///
/// Fails if the document has no structure tree or no readable page list;
/// malformed nodes inside the tree degrade to `[Unhandled type: ...]`
/// lines instead of failing the walk.
pub fn show_structure(graph: &Graph) -> Result<String> {
    let roots = graph.structure_roots()?;
    let pages = graph.pages()?;
    let walker = StructWalker::new(&pages);
    Ok(walker.render(graph, &roots))
}

/// Give every `Figure` element a `/A << /O /Layout /BBox [...] >>`
/// attribute, preferring bboxes located by replaying the page content
/// streams and falling back to the page crop box.
///
/// Idempotent: figures that already carry a layout bbox are left alone.
pub fn ensure_layout_bboxes(graph: &mut Graph) -> Result<()> {
    let roots = graph.structure_roots()?;
    let pages = graph.pages()?;
    let bboxes = mcid_bbox_map(graph, &pages);
    let walker = StructWalker::new(&pages).with_mcid_bboxes(bboxes);
    walker.ensure_layout_bboxes(graph, &roots);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::object::Object;

    #[test]
    fn test_page_numbers_are_one_based_in_order() {
        let a = ObjectRef::new(10, 0);
        let b = ObjectRef::new(11, 0);
        let walker = StructWalker::new(&[a, b]);
        assert_eq!(walker.page_number(a), Some(1));
        assert_eq!(walker.page_number(b), Some(2));
        assert_eq!(walker.page_number(ObjectRef::new(12, 0)), None);
    }

    #[test]
    fn test_show_structure_requires_struct_tree() {
        let mut g = Graph::new();
        let catalog = ObjectRef::new(1, 0);
        g.insert(
            catalog,
            Object::Dictionary(
                [("Type".to_string(), Object::name("Catalog"))]
                    .into_iter()
                    .collect(),
            ),
        );
        g.set_root(catalog);
        assert!(matches!(
            show_structure(&g),
            Err(Error::MissingStructTree)
        ));
    }
}
