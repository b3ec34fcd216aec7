//! Content-stream image locator.
//!
//! A single-pass stack machine that replays one page's operator sequence to
//! recover, for each image XObject drawn, the placement transform in effect
//! at its `Do`, the enclosing marked-content id, and the derived page-space
//! bounding box.
//!
//! The machine tracks three stacks: the operand stack (cleared by any
//! operator it does not model), the graphics-state stack (`q`/`Q`, holding
//! only the current transform) and the marked-content stack (`BDC`/`EMC`).
//! Both state stacks tolerate unbalanced input: popping empty leaves the
//! transform at identity and resets the marked-content id to unset.

use crate::content::tokens::ContentToken;
use crate::error::{Error, Result};
use crate::geometry::{Matrix, Rect};
use crate::graph::{Graph, NodeRef};
use crate::object::{Object, ObjectRef};
use std::collections::{BTreeMap, HashMap};

/// What the locator learned about one drawn image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    /// Enclosing marked-content id at the time of `Do`, if any
    pub mcid: Option<i64>,
    /// Intrinsic pixel width (`/Width`)
    pub width: f64,
    /// Intrinsic pixel height (`/Height`)
    pub height: f64,
    /// Placement transform in effect at the `Do`
    pub matrix: Matrix,
    /// Derived bbox in page user space, clamped to the page media box
    pub bbox: Rect,
}

/// Stack machine replaying one page's content-stream tokens.
///
/// Fresh per page; no state crosses page boundaries.
pub struct ImageLocator<'a> {
    graph: &'a Graph,
    page: ObjectRef,
    operands: Vec<Object>,
    matrix: Matrix,
    matrix_stack: Vec<Matrix>,
    mcid: Option<i64>,
    mcid_stack: Vec<Option<i64>>,
    images: BTreeMap<String, ImageInfo>,
}

impl<'a> ImageLocator<'a> {
    /// Create a locator for one page with identity transform and no
    /// marked-content id active.
    pub fn new(graph: &'a Graph, page: ObjectRef) -> Self {
        Self {
            graph,
            page,
            operands: Vec::new(),
            matrix: Matrix::identity(),
            matrix_stack: Vec::new(),
            mcid: None,
            mcid_stack: Vec::new(),
            images: BTreeMap::new(),
        }
    }

    /// Replay a token sequence left to right.
    pub fn run(&mut self, tokens: &[ContentToken]) -> Result<()> {
        for token in tokens {
            match token {
                ContentToken::Operand(obj) => self.operands.push(obj.clone()),
                ContentToken::Operator(op) => self.execute(op)?,
            }
        }
        Ok(())
    }

    /// The per-page name -> info mapping; the most recent placement of a
    /// name wins.
    pub fn into_images(self) -> BTreeMap<String, ImageInfo> {
        self.images
    }

    fn execute(&mut self, op: &str) -> Result<()> {
        match op {
            "cm" if self.operands.len() >= 6 => {
                let mut vals = [0.0f64; 6];
                let base = self.operands.len() - 6;
                for (i, operand) in self.operands[base..].iter().enumerate() {
                    vals[i] = operand.as_number().ok_or_else(|| Error::InvalidOperand {
                        operator: "cm".to_string(),
                        found: operand.type_name().to_string(),
                    })?;
                }
                // Overwrites rather than concatenates: only the transform in
                // effect at the next Do matters here.
                self.matrix = Matrix::from_array(vals);
                self.operands.truncate(base);
            },
            "q" => self.matrix_stack.push(self.matrix),
            "Q" => {
                if let Some(m) = self.matrix_stack.pop() {
                    self.matrix = m;
                }
            },
            "BDC" if self.operands.len() >= 2 => {
                self.mcid_stack.push(self.mcid);
                let props = &self.operands[self.operands.len() - 1];
                self.mcid = self.resolve_mcid(props);
                let base = self.operands.len() - 2;
                self.operands.truncate(base);
            },
            "EMC" => {
                self.mcid = self.mcid_stack.pop().unwrap_or(None);
            },
            "Do" if !self.operands.is_empty() => {
                match self.operands.last().and_then(|o| o.as_name()).map(String::from) {
                    Some(name) => self.record_image(&name),
                    None => log::debug!("Do with a non-name operand on page {}, ignoring", self.page),
                }
                self.operands.pop();
            },
            _ => self.operands.clear(),
        }
        Ok(())
    }

    /// Marked-content id for a `BDC` property operand: inline dictionaries
    /// carry `/MCID` directly, names resolve through the page's
    /// `/Resources /Properties`.
    fn resolve_mcid(&self, props: &Object) -> Option<i64> {
        match props {
            Object::Dictionary(d) => d.get("MCID").and_then(|o| o.as_integer()),
            Object::Name(name) => {
                let entry = NodeRef::indirect(self.page)
                    .key("Resources")
                    .key("Properties")
                    .key(name)
                    .key("MCID");
                self.graph.node(&entry).and_then(|o| o.as_integer())
            },
            _ => None,
        }
    }

    fn record_image(&mut self, name: &str) {
        let xobject_ref = NodeRef::indirect(self.page)
            .key("Resources")
            .key("XObject")
            .key(name);
        let dict = match self.graph.node(&xobject_ref) {
            Some(Object::Stream { dict, .. }) => dict,
            _ => {
                log::debug!("XObject {} not found on page {}, ignoring Do", name, self.page);
                return;
            },
        };
        if dict.get("Subtype").and_then(|o| o.as_name()) != Some("Image") {
            // Form XObjects are not tracked
            return;
        }

        let width = dict.get("Width").and_then(|o| o.as_integer()).unwrap_or(0) as f64;
        let height = dict.get("Height").and_then(|o| o.as_integer()).unwrap_or(0) as f64;

        let mut bbox = self.matrix.transformed_bbox(width, height);
        match self.graph.media_box(self.page) {
            Some(media) => bbox = bbox.clamp_to(&media),
            None => log::warn!("Page {} has no media box, image bbox left unclamped", self.page),
        }

        self.images.insert(
            name.to_string(),
            ImageInfo {
                mcid: self.mcid,
                width,
                height,
                matrix: self.matrix,
                bbox,
            },
        );
    }
}

/// Replay one page's tokens and return its name -> [`ImageInfo`] mapping.
pub fn locate_images(
    graph: &Graph,
    page: ObjectRef,
    tokens: &[ContentToken],
) -> Result<BTreeMap<String, ImageInfo>> {
    let mut locator = ImageLocator::new(graph, page);
    locator.run(tokens)?;
    Ok(locator.into_images())
}

/// Aggregate every page's image placements into a marked-content id -> bbox
/// mapping.
///
/// Entries with no marked-content id are dropped. A page whose content
/// stream fails to tokenize or replay is logged and skipped; one bad page
/// never aborts the aggregation.
pub fn mcid_bbox_map(graph: &Graph, pages: &[ObjectRef]) -> HashMap<i64, Rect> {
    let mut map = HashMap::new();
    for &page in pages {
        let content = match graph.page_content(page) {
            Some(c) => c,
            None => continue,
        };
        let tokens = match crate::content::tokenize(&content) {
            Ok(t) => t,
            Err(e) => {
                log::warn!("Failed to tokenize content of page {}: {}, skipping", page, e);
                continue;
            },
        };
        match locate_images(graph, page, &tokens) {
            Ok(images) => {
                for info in images.values() {
                    if let Some(mcid) = info.mcid {
                        map.insert(mcid, info.bbox);
                    }
                }
            },
            Err(e) => {
                log::warn!("Failed to replay content of page {}: {}, skipping", page, e);
            },
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::tokenize;

    fn dict(entries: &[(&str, Object)]) -> Object {
        Object::Dictionary(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    /// One page with one 5x5 image XObject and a 15x15 media box.
    fn image_page() -> (Graph, ObjectRef) {
        let mut g = Graph::new();
        let page = ObjectRef::new(3, 0);
        let image = ObjectRef::new(7, 0);

        g.insert(
            image,
            Object::Stream {
                dict: [
                    ("Subtype".to_string(), Object::name("Image")),
                    ("Width".to_string(), Object::Integer(5)),
                    ("Height".to_string(), Object::Integer(5)),
                ]
                .into_iter()
                .collect(),
                data: bytes::Bytes::new(),
            },
        );
        g.insert(
            page,
            dict(&[
                ("Type", Object::name("Page")),
                (
                    "MediaBox",
                    Object::Array(vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(15),
                        Object::Integer(15),
                    ]),
                ),
                (
                    "Resources",
                    dict(&[
                        ("XObject", dict(&[("Im1", Object::Reference(image))])),
                        (
                            "Properties",
                            dict(&[("P1", dict(&[("MCID", Object::Integer(4))]))]),
                        ),
                    ]),
                ),
            ]),
        );
        (g, page)
    }

    #[test]
    fn test_transform_and_media_box_clamp() {
        let (g, page) = image_page();
        let tokens = tokenize(b"q 2 0 0 2 10 10 cm /Im1 Do Q").unwrap();
        let images = locate_images(&g, page, &tokens).unwrap();

        let info = &images["Im1"];
        assert_eq!(info.width, 5.0);
        assert_eq!(info.height, 5.0);
        // [2 0 0 2 10 10] maps the 5x5 unit rect to [10,10,20,20],
        // clamped to the [0,0,15,15] media box
        assert_eq!(info.bbox, Rect::new(10.0, 10.0, 15.0, 15.0));
        assert_eq!(info.mcid, None);
    }

    #[test]
    fn test_nested_marked_content_ids() {
        let (g, page) = image_page();
        let tokens = tokenize(
            b"/P <</MCID 7>> BDC /P <</MCID 9>> BDC 1 0 0 1 0 0 cm /Im1 Do EMC EMC",
        )
        .unwrap();
        let images = locate_images(&g, page, &tokens).unwrap();
        // Innermost active id at the time of Do
        assert_eq!(images["Im1"].mcid, Some(9));
    }

    #[test]
    fn test_emc_restores_outer_id() {
        let (g, page) = image_page();
        let tokens =
            tokenize(b"/P <</MCID 7>> BDC /P <</MCID 9>> BDC EMC /Im1 Do EMC").unwrap();
        let images = locate_images(&g, page, &tokens).unwrap();
        assert_eq!(images["Im1"].mcid, Some(7));
    }

    #[test]
    fn test_bdc_name_resolves_through_properties() {
        let (g, page) = image_page();
        let tokens = tokenize(b"/Span /P1 BDC /Im1 Do EMC").unwrap();
        let images = locate_images(&g, page, &tokens).unwrap();
        assert_eq!(images["Im1"].mcid, Some(4));
    }

    #[test]
    fn test_unbalanced_q_and_emc_are_tolerated() {
        let (g, page) = image_page();
        let tokens = tokenize(b"Q EMC Q /Im1 Do").unwrap();
        let images = locate_images(&g, page, &tokens).unwrap();
        // State stayed at its defaults: identity matrix, no id
        let info = &images["Im1"];
        assert_eq!(info.matrix, Matrix::identity());
        assert_eq!(info.mcid, None);
        assert_eq!(info.bbox, Rect::new(0.0, 0.0, 5.0, 5.0));
    }

    #[test]
    fn test_q_restore_discards_inner_transform() {
        let (g, page) = image_page();
        let tokens = tokenize(b"q 2 0 0 2 0 0 cm Q /Im1 Do").unwrap();
        let images = locate_images(&g, page, &tokens).unwrap();
        assert_eq!(images["Im1"].matrix, Matrix::identity());
    }

    #[test]
    fn test_cm_with_non_numeric_operand_is_hard_error() {
        let (g, page) = image_page();
        let tokens = tokenize(b"1 0 0 1 0 /Oops cm").unwrap();
        let err = locate_images(&g, page, &tokens).unwrap_err();
        assert!(matches!(err, Error::InvalidOperand { .. }));
    }

    #[test]
    fn test_unknown_operator_clears_operand_stack() {
        let (g, page) = image_page();
        // The stray "5 5 m" must not leak operands into the cm count
        let tokens = tokenize(b"5 5 m 2 0 0 2 0 0 cm /Im1 Do").unwrap();
        let images = locate_images(&g, page, &tokens).unwrap();
        assert_eq!(
            images["Im1"].matrix,
            Matrix::from_array([2.0, 0.0, 0.0, 2.0, 0.0, 0.0])
        );
    }

    #[test]
    fn test_form_xobjects_are_ignored() {
        let (mut g, page) = image_page();
        let form = ObjectRef::new(8, 0);
        g.insert(
            form,
            Object::Stream {
                dict: [("Subtype".to_string(), Object::name("Form"))]
                    .into_iter()
                    .collect(),
                data: bytes::Bytes::new(),
            },
        );
        let resources = NodeRef::indirect(page).key("Resources").key("XObject");
        g.set_key(&resources, "Fm1", Object::Reference(form)).unwrap();

        let tokens = tokenize(b"/Fm1 Do /Im1 Do").unwrap();
        let images = locate_images(&g, page, &tokens).unwrap();
        assert!(images.contains_key("Im1"));
        assert!(!images.contains_key("Fm1"));
    }

    #[test]
    fn test_latest_placement_wins() {
        let (g, page) = image_page();
        let tokens = tokenize(b"1 0 0 1 0 0 cm /Im1 Do 2 0 0 2 0 0 cm /Im1 Do").unwrap();
        let images = locate_images(&g, page, &tokens).unwrap();
        assert_eq!(
            images["Im1"].matrix,
            Matrix::from_array([2.0, 0.0, 0.0, 2.0, 0.0, 0.0])
        );
    }

    #[test]
    fn test_mcid_bbox_map_aggregates_page_content() {
        let (mut g, page) = image_page();
        let contents = ObjectRef::new(9, 0);
        g.insert(
            contents,
            Object::Stream {
                dict: HashMap::new(),
                data: bytes::Bytes::from_static(b"/P <</MCID 2>> BDC 2 0 0 2 0 0 cm /Im1 Do EMC"),
            },
        );
        g.set_key(&NodeRef::indirect(page), "Contents", Object::Reference(contents))
            .unwrap();

        let map = mcid_bbox_map(&g, &[page]);
        assert_eq!(map.len(), 1);
        assert_eq!(map[&2], Rect::new(0.0, 0.0, 10.0, 10.0));
    }
}
