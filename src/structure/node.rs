//! Structure-tree node model.
//!
//! A [`StructNode`] is a transient, typed view over one graph node: it is
//! classified fresh for every walk, renders itself as indented tag-like
//! text, and knows how to propagate a layout-bbox injection request to its
//! children. The closed variant set makes the classification precedence
//! auditable in one place ([`StructNode::from_graph`]).
//!
//! Walks follow `/K` downward and `/P`/`/Pg` upward. Parent links are
//! addressed through the graph arena, never owned; termination of the
//! upward walks relies on the document's parent chain being acyclic, which
//! this module does not verify.

use crate::graph::{rect_to_object, Graph, NodeRef};
use crate::object::{strip_slash, Object, ObjectRef};
use crate::structure::walker::StructWalker;
use std::collections::HashMap;
use std::fmt::Write as _;

/// A classified structure-tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum StructNode {
    /// A general structure element dictionary
    Elem(ElemNode),
    /// A structure element tagged `Figure`; the only variant with custom
    /// bbox-injection behavior
    Figure(ElemNode),
    /// A bare marked-content identifier (plain integer child)
    Mcid(i64),
    /// An explicit marked-content reference dictionary (`/Type /MCR`)
    Mcr {
        /// Marked-content identifier
        mcid: i64,
        /// Identity of the referenced page object
        page: ObjectRef,
        /// 1-based page number; unset until a consumer resolves it
        page_number: Option<u32>,
    },
    /// A stream child, rendered by payload size only
    Stream {
        /// Decoded payload length in bytes
        length: usize,
    },
    /// A graph array, recursing into each element in order
    Array(Vec<StructNode>),
    /// Fallback for any shape not matching the above
    Unknown(String),
}

/// View over a structure element dictionary (general or `Figure`).
#[derive(Debug, Clone, PartialEq)]
pub struct ElemNode {
    node: NodeRef,
}

impl StructNode {
    /// Classify a graph node into exactly one variant.
    ///
    /// Total over all node shapes and a pure function of the node's shape
    /// and keys; an unresolvable address degrades to `Unknown`.
    pub fn from_graph(graph: &Graph, node: &NodeRef) -> StructNode {
        let obj = match graph.node(node) {
            Some(o) => o,
            None => return StructNode::Unknown("Unresolved".to_string()),
        };

        match obj {
            Object::Integer(i) => StructNode::Mcid(*i),

            Object::Array(items) => {
                let children = (0..items.len())
                    .map(|i| StructNode::from_graph(graph, &node.index(i)))
                    .collect();
                StructNode::Array(children)
            },

            Object::Dictionary(dict) => {
                let type_name = dict.get("Type").and_then(|o| o.as_name()).map(strip_slash);
                if type_name == Some("MCR")
                    && dict.contains_key("MCID")
                    && dict.contains_key("Pg")
                {
                    let mcid = graph
                        .node(&node.key("MCID"))
                        .and_then(|o| o.as_integer())
                        .unwrap_or(0);
                    let page = dict
                        .get("Pg")
                        .and_then(|o| o.as_reference())
                        .unwrap_or(ObjectRef::new(0, 0));
                    return StructNode::Mcr {
                        mcid,
                        page,
                        page_number: None,
                    };
                }

                let elem = ElemNode {
                    node: graph.canonical(node).unwrap_or_else(|| node.clone()),
                };
                let tag = dict.get("S").and_then(|o| o.as_name()).map(strip_slash);
                if tag == Some("Figure") {
                    StructNode::Figure(elem)
                } else if dict.contains_key("S") || type_name == Some("StructElem") {
                    StructNode::Elem(elem)
                } else {
                    StructNode::Unknown("Dictionary".to_string())
                }
            },

            Object::Stream { data, .. } => StructNode::Stream { length: data.len() },

            other => StructNode::Unknown(other.type_name().to_string()),
        }
    }

    /// Render this node (and its subtree) as indented text.
    pub fn to_text(&self, graph: &Graph, walker: &StructWalker) -> String {
        let mut out = String::new();
        self.render(graph, walker, 0, &mut out);
        out
    }

    pub(crate) fn render(&self, graph: &Graph, walker: &StructWalker, level: usize, out: &mut String) {
        match self {
            StructNode::Array(children) => {
                for child in children {
                    child.render(graph, walker, level, out);
                }
            },
            StructNode::Elem(elem) | StructNode::Figure(elem) => {
                elem.render(graph, walker, level, out);
            },
            StructNode::Mcid(value) => {
                indent(out, level);
                let _ = writeln!(out, "[MCID: {}]", value);
            },
            StructNode::Mcr {
                mcid,
                page,
                page_number,
            } => {
                indent(out, level);
                let _ = write!(out, "[MCR: MCID={} PageObj={} Gen={}", mcid, page.id, page.gen);
                let resolved = page_number.or_else(|| walker.page_number(*page));
                if let Some(n) = resolved {
                    let _ = write!(out, " PageNumber={}", n);
                }
                let _ = writeln!(out, "]");
            },
            StructNode::Stream { length } => {
                indent(out, level);
                let _ = writeln!(out, "[Stream: length={}]", length);
            },
            StructNode::Unknown(type_name) => {
                indent(out, level);
                let _ = writeln!(out, "[Unhandled type: {}]", type_name);
            },
        }
    }

    /// Ensure every image-bearing element below this node carries a layout
    /// bbox. Only `Figure` elements mutate; everything else recurses.
    pub fn ensure_layout_bbox(&self, graph: &mut Graph, walker: &StructWalker) {
        match self {
            StructNode::Array(children) => {
                for child in children {
                    child.ensure_layout_bbox(graph, walker);
                }
            },
            StructNode::Elem(elem) => elem.recurse_children(graph, walker),
            StructNode::Figure(elem) => elem.ensure_figure_bbox(graph, walker),
            _ => {},
        }
    }
}

fn indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str("  ");
    }
}

impl ElemNode {
    /// The element's stripped `/S` tag, defaulting to `Unknown`.
    fn structure_tag(&self, graph: &Graph) -> String {
        graph
            .node(&self.node.key("S"))
            .and_then(|o| o.as_name())
            .map(|n| strip_slash(n).to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// Resolve the element's 1-based page number: walk the `/P` parent
    /// chain starting at the element itself, returning the first `/Pg`
    /// reference found in the page object map.
    fn find_page_number(&self, graph: &Graph, walker: &StructWalker) -> Option<u32> {
        let mut cur = self.node.clone();
        loop {
            let obj = graph.node(&cur)?;
            if obj.as_dict().is_none() {
                return None;
            }
            if let Some(Object::Reference(r)) = obj.get("Pg") {
                if let Some(n) = walker.page_number(*r) {
                    return Some(n);
                }
            }
            if obj.get("P").is_some() {
                cur = cur.key("P");
            } else {
                return None;
            }
        }
    }

    fn render(&self, graph: &Graph, walker: &StructWalker, level: usize, out: &mut String) {
        let tag = self.structure_tag(graph);
        let page_number = self.find_page_number(graph, walker);

        self.write_opening_tag(graph, level, &tag, page_number, out);

        // /K may be a single child or an array; classification handles both
        let has_kids = graph
            .node(&self.node)
            .map_or(false, |o| o.get("K").is_some());
        if has_kids {
            let child = StructNode::from_graph(graph, &self.node.key("K"));
            child.render(graph, walker, level + 1, out);
        }

        indent(out, level);
        let _ = writeln!(out, "</{}>", tag);
    }

    fn write_opening_tag(
        &self,
        graph: &Graph,
        level: usize,
        tag: &str,
        page_number: Option<u32>,
        out: &mut String,
    ) {
        indent(out, level);
        let _ = write!(out, "<{}", tag);

        if let Some(r) = self.node.object_ref() {
            let _ = write!(out, " obj=\"{} {}\"", r.id, r.gen);
        }

        self.string_attribute(graph, "Alt", "Alt", out);
        self.string_attribute(graph, "ActualText", "ActualText", out);
        self.string_attribute(graph, "T", "Title", out);
        self.string_attribute(graph, "Lang", "Lang", out);
        self.string_attribute(graph, "ID", "ID", out);

        self.class_attribute(graph, out);
        self.bbox_attribute(graph, out);

        if tag == "Artifact" {
            if let Some(t) = graph.node(&self.node.key("Type")).and_then(|o| o.as_name()) {
                let _ = write!(out, " ArtifactType=\"{}\"", strip_slash(t));
            }
        }

        self.namespace_attribute(graph, out);

        match graph.node(&self.node.key("Type")) {
            Some(Object::Name(n)) => {
                let _ = write!(out, " Type=\"{}\"", strip_slash(n));
            },
            Some(Object::String(s)) => {
                let _ = write!(out, " Type=\"{}\"", String::from_utf8_lossy(s));
            },
            _ => {},
        }

        if let Some(n) = page_number {
            let _ = write!(out, " Page=\"{}\"", n);
        }

        let _ = writeln!(out, ">");
    }

    /// Emit `name="value"` when the key is present with a string value;
    /// absent or non-string keys emit nothing.
    fn string_attribute(&self, graph: &Graph, key: &str, name: &str, out: &mut String) {
        if let Some(Object::String(s)) = graph.node(&self.node.key(key)) {
            let _ = write!(out, " {}=\"{}\"", name, String::from_utf8_lossy(s));
        }
    }

    /// `/C` is a single class name or an array of names, space-joined.
    fn class_attribute(&self, graph: &Graph, out: &mut String) {
        match graph.node(&self.node.key("C")) {
            Some(Object::Name(n)) => {
                let _ = write!(out, " Class=\"{}\"", strip_slash(n));
            },
            Some(Object::Array(items)) => {
                let names: Vec<&str> = items
                    .iter()
                    .filter_map(|o| o.as_name())
                    .map(strip_slash)
                    .collect();
                let _ = write!(out, " Class=\"{}\"", names.join(" "));
            },
            _ => {},
        }
    }

    /// BBox resolution order: the element's own `/BBox` (four numbers,
    /// space-separated), else the first layout bbox found under `/A`
    /// (bracketed, comma-separated). At most one attribute is emitted.
    fn bbox_attribute(&self, graph: &Graph, out: &mut String) {
        if let Some(arr) = graph.node(&self.node.key("BBox")).and_then(|o| o.as_array()) {
            if arr.len() == 4 {
                let _ = write!(out, " BBox=\"");
                for (i, item) in arr.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    if let Some(n) = item.as_number() {
                        let _ = write!(out, "{}", n);
                    }
                }
                out.push('"');
                return;
            }
        }

        if let Some(bbox) = self.attr_layout_bbox(graph) {
            let _ = write!(
                out,
                " BBox=\"[{}, {}, {}, {}]\"",
                bbox[0], bbox[1], bbox[2], bbox[3]
            );
        }
    }

    /// Namespace name from `/NS /NS`.
    fn namespace_attribute(&self, graph: &Graph, out: &mut String) {
        if let Some(n) = graph
            .node(&self.node.key("NS").key("NS"))
            .and_then(|o| o.as_name())
        {
            let _ = write!(out, " NS=\"{}\"", strip_slash(n));
        }
    }

    /// The four numbers of a bbox carried by `/A`: directly on an attribute
    /// dictionary, or on the first `/O /Layout` entry of an attribute array.
    fn attr_layout_bbox(&self, graph: &Graph) -> Option<[f64; 4]> {
        let attrs = self.node.key("A");
        match graph.node(&attrs)? {
            Object::Dictionary(d) if d.contains_key("BBox") => {
                bbox_numbers(graph, &attrs.key("BBox"))
            },
            Object::Array(items) => {
                let count = items.len();
                for i in 0..count {
                    let entry = attrs.index(i);
                    if is_layout_bbox_dict(graph, &entry) {
                        return bbox_numbers(graph, &entry.key("BBox"));
                    }
                }
                None
            },
            _ => None,
        }
    }

    /// Recurse the bbox-injection pass into `/K` without touching this
    /// element.
    fn recurse_children(&self, graph: &mut Graph, walker: &StructWalker) {
        let has_kids = graph
            .node(&self.node)
            .map_or(false, |o| o.get("K").is_some());
        if has_kids {
            let child = StructNode::from_graph(graph, &self.node.key("K"));
            child.ensure_layout_bbox(graph, walker);
        }
    }

    /// Figure-specific injection: recurse first, then write a
    /// `/A << /O /Layout /BBox [...] >>` attribute unless one already
    /// exists. Running twice never duplicates or overwrites.
    fn ensure_figure_bbox(&self, graph: &mut Graph, walker: &StructWalker) {
        self.recurse_children(graph, walker);

        if self.has_layout_bbox(graph) {
            return;
        }

        let mcid = graph.node(&self.node.key("K")).and_then(|o| o.as_integer());

        let page = match self.owning_page(graph) {
            Some(p) => p,
            None => {
                log::warn!("No /Pg found for figure (MCID {:?}), cannot add BBox", mcid);
                return;
            },
        };

        // The located image bbox wins; the page crop box (or media box) is
        // the fallback.
        let bbox = mcid
            .and_then(|m| walker.mcid_bbox(m))
            .or_else(|| graph.crop_box(page));
        let bbox = match bbox {
            Some(b) => b,
            None => {
                log::warn!(
                    "Page {} has no crop or media box and MCID {:?} was not located, skipping figure",
                    page,
                    mcid
                );
                return;
            },
        };

        let mut attrs = HashMap::new();
        attrs.insert("O".to_string(), Object::name("Layout"));
        attrs.insert("BBox".to_string(), rect_to_object(&bbox));
        if let Err(e) = graph.set_key(&self.node, "A", Object::Dictionary(attrs)) {
            log::warn!("Failed to write /A on figure: {}", e);
        }
    }

    /// Whether `/A` already carries a `/O /Layout` entry with a `/BBox`,
    /// anywhere (dictionary form or attribute array form).
    fn has_layout_bbox(&self, graph: &Graph) -> bool {
        let attrs = self.node.key("A");
        match graph.node(&attrs) {
            Some(Object::Dictionary(_)) => is_layout_bbox_dict(graph, &attrs),
            Some(Object::Array(items)) => {
                let count = items.len();
                (0..count).any(|i| is_layout_bbox_dict(graph, &attrs.index(i)))
            },
            _ => false,
        }
    }

    /// Locate the page owning this figure: first `/Pg` reached by walking
    /// the `/P` chain; if the chain carries no `/Pg` at all, the first
    /// dictionary child of `/K` with a `/Pg`. A `/Pg` that is not an
    /// indirect reference fails the lookup.
    fn owning_page(&self, graph: &Graph) -> Option<ObjectRef> {
        let mut cur = self.node.clone();
        loop {
            let obj = match graph.node(&cur) {
                Some(o) if o.as_dict().is_some() => o,
                _ => break,
            };
            if let Some(pg) = obj.get("Pg") {
                return pg.as_reference();
            }
            if obj.get("P").is_some() {
                cur = cur.key("P");
            } else {
                break;
            }
        }

        let kids = self.node.key("K");
        let count = match graph.node(&kids) {
            Some(Object::Array(items)) => items.len(),
            _ => 0,
        };
        for i in 0..count {
            if let Some(obj) = graph.node(&kids.index(i)) {
                if obj.as_dict().is_some() {
                    if let Some(pg) = obj.get("Pg") {
                        return pg.as_reference();
                    }
                }
            }
        }
        None
    }
}

/// Whether the node is a dictionary with `/O /Layout` and a `/BBox` key.
fn is_layout_bbox_dict(graph: &Graph, node: &NodeRef) -> bool {
    match graph.node(node) {
        Some(Object::Dictionary(d)) => {
            d.get("O").and_then(|o| o.as_name()).map(strip_slash) == Some("Layout")
                && d.contains_key("BBox")
        },
        _ => false,
    }
}

/// Read a 4-number bbox array at an address.
fn bbox_numbers(graph: &Graph, node: &NodeRef) -> Option<[f64; 4]> {
    let arr = graph.node(node)?.as_array()?;
    if arr.len() != 4 {
        return None;
    }
    Some([
        arr[0].as_number()?,
        arr[1].as_number()?,
        arr[2].as_number()?,
        arr[3].as_number()?,
    ])
}
