//! The document graph arena.
//!
//! Holds every indirect object of an already-parsed document, keyed by
//! [`ObjectRef`]. The walkers never own graph nodes; they address them with a
//! [`NodeRef`] (the nearest enclosing indirect object plus the key/index path
//! down to the node) and read or mutate through the arena. Reference chains
//! are collapsed transparently on every lookup, with a bounded chain depth so
//! a malformed self-referential graph degrades to a logged skip instead of
//! looping.

use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::object::{Object, ObjectRef};
use std::collections::HashMap;

/// Longest tolerated chain of `Reference -> Reference` indirections.
const MAX_REF_DEPTH: u32 = 32;

/// Depth cap for page-tree and inheritance walks.
const MAX_TREE_DEPTH: u32 = 64;

/// One step of a path from an indirect object down to a nested node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    /// Dictionary (or stream dictionary) key
    Key(String),
    /// Array index
    Index(usize),
}

/// Address of a node inside the graph arena.
///
/// `anchor` is the nearest enclosing indirect object; `path` descends from it
/// through direct containers only. A canonical `NodeRef` with an empty path
/// denotes the indirect object itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRef {
    /// Nearest enclosing indirect object
    pub anchor: ObjectRef,
    /// Key/index steps from the anchor's object down to the node
    pub path: Vec<PathStep>,
}

impl NodeRef {
    /// Address an indirect object directly.
    pub fn indirect(anchor: ObjectRef) -> Self {
        Self {
            anchor,
            path: Vec::new(),
        }
    }

    /// Address a dictionary entry below this node.
    pub fn key(&self, key: &str) -> NodeRef {
        let mut path = self.path.clone();
        path.push(PathStep::Key(key.to_string()));
        NodeRef {
            anchor: self.anchor,
            path,
        }
    }

    /// Address an array element below this node.
    pub fn index(&self, index: usize) -> NodeRef {
        let mut path = self.path.clone();
        path.push(PathStep::Index(index));
        NodeRef {
            anchor: self.anchor,
            path,
        }
    }

    /// The indirect identity of this node, when it is one.
    pub fn object_ref(&self) -> Option<ObjectRef> {
        if self.path.is_empty() {
            Some(self.anchor)
        } else {
            None
        }
    }
}

/// Arena of indirect objects plus the catalog entry point.
#[derive(Debug, Default)]
pub struct Graph {
    objects: HashMap<ObjectRef, Object>,
    root: Option<ObjectRef>,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) an indirect object.
    pub fn insert(&mut self, obj_ref: ObjectRef, obj: Object) {
        self.objects.insert(obj_ref, obj);
    }

    /// Set the document catalog reference.
    pub fn set_root(&mut self, root: ObjectRef) {
        self.root = Some(root);
    }

    /// The document catalog reference, if set.
    pub fn root(&self) -> Option<ObjectRef> {
        self.root
    }

    /// Look up an indirect object without resolving reference chains.
    pub fn object(&self, obj_ref: &ObjectRef) -> Option<&Object> {
        self.objects.get(obj_ref)
    }

    /// Follow the object at `anchor` through any chain of references,
    /// updating `anchor` to the final indirect identity.
    fn deref_anchor(&self, anchor: &mut ObjectRef) -> Option<&Object> {
        let mut depth = 0;
        loop {
            let obj = self.objects.get(anchor)?;
            match obj {
                Object::Reference(r) => {
                    depth += 1;
                    if depth > MAX_REF_DEPTH {
                        log::warn!("Reference chain at {} exceeds depth {}, skipping", anchor, MAX_REF_DEPTH);
                        return None;
                    }
                    *anchor = *r;
                },
                _ => return Some(obj),
            }
        }
    }

    /// Normalize a node address: resolve the anchor's reference chain and
    /// every reference crossed along the path, so the canonical path descends
    /// through direct containers only.
    pub fn canonical(&self, node: &NodeRef) -> Option<NodeRef> {
        let mut anchor = node.anchor;
        let mut obj = self.deref_anchor(&mut anchor)?;
        let mut path: Vec<PathStep> = Vec::new();

        for step in &node.path {
            obj = match step {
                PathStep::Key(k) => obj.get(k)?,
                PathStep::Index(i) => obj.as_array()?.get(*i)?,
            };
            path.push(step.clone());
            if let Object::Reference(r) = obj {
                anchor = *r;
                path.clear();
                obj = self.deref_anchor(&mut anchor)?;
            }
        }

        Some(NodeRef { anchor, path })
    }

    /// Read the node at an address, fully resolved.
    pub fn node(&self, node: &NodeRef) -> Option<&Object> {
        let canon = self.canonical(node)?;
        let mut obj = self.objects.get(&canon.anchor)?;
        for step in &canon.path {
            obj = match step {
                PathStep::Key(k) => obj.get(k)?,
                PathStep::Index(i) => obj.as_array()?.get(*i)?,
            };
        }
        Some(obj)
    }

    /// Mutable access to the node at an address.
    pub fn node_mut(&mut self, node: &NodeRef) -> Result<&mut Object> {
        let canon = self
            .canonical(node)
            .ok_or(Error::ObjectNotFound(node.anchor))?;
        let mut obj = self
            .objects
            .get_mut(&canon.anchor)
            .ok_or(Error::ObjectNotFound(canon.anchor))?;
        for step in &canon.path {
            obj = match step {
                PathStep::Key(k) => match obj {
                    Object::Dictionary(d) => d.get_mut(k.as_str()),
                    Object::Stream { dict, .. } => dict.get_mut(k.as_str()),
                    _ => None,
                },
                PathStep::Index(i) => match obj {
                    Object::Array(a) => a.get_mut(*i),
                    _ => None,
                },
            }
            .ok_or(Error::ObjectNotFound(canon.anchor))?;
        }
        Ok(obj)
    }

    /// Replace a key on the dictionary at an address, in place.
    ///
    /// Later reads of the same node observe the new value.
    pub fn set_key(&mut self, node: &NodeRef, key: &str, value: Object) -> Result<()> {
        match self.node_mut(node)? {
            Object::Dictionary(d) => {
                d.insert(key.to_string(), value);
                Ok(())
            },
            Object::Stream { dict, .. } => {
                dict.insert(key.to_string(), value);
                Ok(())
            },
            other => Err(Error::InvalidObjectType {
                expected: "Dictionary".to_string(),
                found: other.type_name().to_string(),
            }),
        }
    }

    /// Enumerate the document's pages in document order.
    ///
    /// Walks `/Root -> /Pages -> /Kids` depth-first. Malformed branches are
    /// logged and skipped so one broken node does not lose the whole list.
    pub fn pages(&self) -> Result<Vec<ObjectRef>> {
        let root = self
            .root
            .ok_or_else(|| Error::InvalidPageTree("no document catalog".to_string()))?;
        let catalog = self.objects.get(&root).ok_or(Error::ObjectNotFound(root))?;
        let pages_ref = catalog
            .get("Pages")
            .and_then(|o| o.as_reference())
            .ok_or_else(|| Error::InvalidPageTree("catalog missing /Pages reference".to_string()))?;

        let mut pages = Vec::new();
        self.collect_pages(pages_ref, 0, &mut pages);
        Ok(pages)
    }

    fn collect_pages(&self, node_ref: ObjectRef, depth: u32, pages: &mut Vec<ObjectRef>) {
        if depth > MAX_TREE_DEPTH {
            log::warn!("Page tree deeper than {}, skipping branch", MAX_TREE_DEPTH);
            return;
        }
        let dict = match self.objects.get(&node_ref).and_then(|n| n.as_dict()) {
            Some(d) => d,
            None => {
                log::warn!("Page tree node {} is not a dictionary, skipping", node_ref);
                return;
            },
        };
        match dict.get("Type").and_then(|o| o.as_name()) {
            Some("Page") => pages.push(node_ref),
            Some("Pages") => {
                let kids = match dict.get("Kids").and_then(|o| o.as_array()) {
                    Some(k) => k,
                    None => {
                        log::warn!("Pages node {} missing /Kids array, skipping", node_ref);
                        return;
                    },
                };
                for kid in kids {
                    match kid.as_reference() {
                        Some(kid_ref) => self.collect_pages(kid_ref, depth + 1, pages),
                        None => log::warn!("Kid of pages node {} is not a reference, skipping", node_ref),
                    }
                }
            },
            other => {
                log::warn!("Page tree node {} has unexpected type {:?}, skipping", node_ref, other);
            },
        }
    }

    /// Look up an attribute on a page, walking `/Parent` links until found.
    pub fn inherited(&self, page: ObjectRef, key: &str) -> Option<&Object> {
        let mut cur = page;
        let mut depth = 0;
        loop {
            let obj = self.objects.get(&cur)?;
            if let Some(v) = obj.get(key) {
                return match v {
                    Object::Reference(r) => self.objects.get(r),
                    _ => Some(v),
                };
            }
            cur = obj.get("Parent").and_then(|o| o.as_reference())?;
            depth += 1;
            if depth > MAX_TREE_DEPTH {
                log::warn!("/Parent chain from {} exceeds depth {}, giving up", page, MAX_TREE_DEPTH);
                return None;
            }
        }
    }

    /// The page's inherited crop box, falling back to the inherited media box.
    pub fn crop_box(&self, page: ObjectRef) -> Option<Rect> {
        self.inherited(page, "CropBox")
            .and_then(rect_from_object)
            .or_else(|| self.media_box(page))
    }

    /// The page's inherited media box.
    pub fn media_box(&self, page: ObjectRef) -> Option<Rect> {
        self.inherited(page, "MediaBox").and_then(rect_from_object)
    }

    /// Concatenated decoded content bytes of a page.
    ///
    /// `/Contents` may be a single stream or an array of streams; multiple
    /// streams are joined with a newline, matching how viewers concatenate
    /// them before tokenizing.
    pub fn page_content(&self, page: ObjectRef) -> Option<Vec<u8>> {
        let contents = NodeRef::indirect(page).key("Contents");
        let mut out = Vec::new();
        match self.node(&contents)? {
            Object::Stream { data, .. } => out.extend_from_slice(data),
            Object::Array(items) => {
                for i in 0..items.len() {
                    match self.node(&contents.index(i)) {
                        Some(Object::Stream { data, .. }) => {
                            if !out.is_empty() {
                                out.push(b'\n');
                            }
                            out.extend_from_slice(data);
                        },
                        _ => log::warn!("Content stream {} of page {} is not a stream, skipping", i, page),
                    }
                }
            },
            other => {
                log::warn!("/Contents of page {} is a {}, skipping", page, other.type_name());
                return None;
            },
        }
        Some(out)
    }

    /// Top-level children of the structure tree, as addresses.
    ///
    /// Mirrors the document's `/StructTreeRoot /K` being either a single node
    /// or an array: always normalized to an ordered sequence. A missing
    /// structure tree root is a precondition failure.
    pub fn structure_roots(&self) -> Result<Vec<NodeRef>> {
        let root = self.root.ok_or(Error::MissingStructTree)?;
        let catalog = self.objects.get(&root).ok_or(Error::ObjectNotFound(root))?;
        let st = catalog.get("StructTreeRoot").ok_or(Error::MissingStructTree)?;

        let st_ref = match st {
            Object::Reference(r) => NodeRef::indirect(*r),
            _ => NodeRef::indirect(root).key("StructTreeRoot"),
        };
        match self.node(&st_ref) {
            Some(obj) if obj.as_dict().is_some() => {},
            _ => return Err(Error::MissingStructTree),
        }

        let kids = st_ref.key("K");
        match self.node(&kids) {
            None => Ok(Vec::new()),
            Some(Object::Array(a)) => Ok((0..a.len()).map(|i| kids.index(i)).collect()),
            Some(_) => Ok(vec![kids]),
        }
    }
}

/// Interpret an object as a `[llx lly urx ury]` rectangle.
pub fn rect_from_object(obj: &Object) -> Option<Rect> {
    let arr = obj.as_array()?;
    if arr.len() != 4 {
        return None;
    }
    Some(Rect::new(
        arr[0].as_number()?,
        arr[1].as_number()?,
        arr[2].as_number()?,
        arr[3].as_number()?,
    ))
}

/// Build a `[llx lly urx ury]` array object from a rectangle.
pub fn rect_to_object(rect: &Rect) -> Object {
    Object::Array(rect.to_array().iter().map(|v| Object::Real(*v)).collect())
}
