//! Integration tests for structure-tree rendering.

use tagwalk::{show_structure, Graph, Object, ObjectRef};

fn dict(entries: &[(&str, Object)]) -> Object {
    Object::Dictionary(
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    )
}

const CATALOG: ObjectRef = ObjectRef { id: 1, gen: 0 };
const PAGES: ObjectRef = ObjectRef { id: 2, gen: 0 };
const PAGE: ObjectRef = ObjectRef { id: 3, gen: 0 };
const STRUCT_ROOT: ObjectRef = ObjectRef { id: 10, gen: 0 };
const DOC_ELEM: ObjectRef = ObjectRef { id: 11, gen: 0 };
const FIGURE: ObjectRef = ObjectRef { id: 12, gen: 0 };

/// One page, one Document element holding one Figure with a plain MCID kid.
fn tagged_document() -> Graph {
    let mut g = Graph::new();
    g.insert(
        CATALOG,
        dict(&[
            ("Type", Object::name("Catalog")),
            ("Pages", Object::Reference(PAGES)),
            ("StructTreeRoot", Object::Reference(STRUCT_ROOT)),
        ]),
    );
    g.insert(
        PAGES,
        dict(&[
            ("Type", Object::name("Pages")),
            ("Kids", Object::Array(vec![Object::Reference(PAGE)])),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ]),
            ),
        ]),
    );
    g.insert(
        PAGE,
        dict(&[
            ("Type", Object::name("Page")),
            ("Parent", Object::Reference(PAGES)),
        ]),
    );
    g.insert(
        STRUCT_ROOT,
        dict(&[
            ("Type", Object::name("StructTreeRoot")),
            ("K", Object::Reference(DOC_ELEM)),
        ]),
    );
    g.insert(
        DOC_ELEM,
        dict(&[
            ("S", Object::name("Document")),
            ("P", Object::Reference(STRUCT_ROOT)),
            ("K", Object::Reference(FIGURE)),
        ]),
    );
    g.insert(
        FIGURE,
        dict(&[
            ("S", Object::name("Figure")),
            ("P", Object::Reference(DOC_ELEM)),
            ("Pg", Object::Reference(PAGE)),
            ("Alt", Object::String(b"A chart".to_vec())),
            ("K", Object::Integer(0)),
        ]),
    );
    g.set_root(CATALOG);
    g
}

#[test]
fn test_two_level_tree_renders_indented() {
    let g = tagged_document();
    let text = show_structure(&g).unwrap();
    let expected = [
        "<Document obj=\"11 0\">",
        "  <Figure obj=\"12 0\" Alt=\"A chart\" Page=\"1\">",
        "    [MCID: 0]",
        "  </Figure>",
        "</Document>",
    ]
    .join("\n")
        + "\n";
    assert_eq!(text, expected);
}

#[test]
fn test_mcr_child_resolves_page_number() {
    let mut g = tagged_document();
    g.insert(
        FIGURE,
        dict(&[
            ("S", Object::name("Figure")),
            ("P", Object::Reference(DOC_ELEM)),
            ("Pg", Object::Reference(PAGE)),
            (
                "K",
                Object::Array(vec![
                    Object::Integer(0),
                    dict(&[
                        ("Type", Object::name("MCR")),
                        ("MCID", Object::Integer(3)),
                        ("Pg", Object::Reference(PAGE)),
                    ]),
                ]),
            ),
        ]),
    );
    let text = show_structure(&g).unwrap();
    assert!(text.contains("    [MCID: 0]\n"));
    assert!(text.contains("    [MCR: MCID=3 PageObj=3 Gen=0 PageNumber=1]\n"));
}

#[test]
fn test_mcr_to_unknown_page_omits_page_number() {
    let mut g = tagged_document();
    g.insert(
        FIGURE,
        dict(&[
            ("S", Object::name("Figure")),
            ("P", Object::Reference(DOC_ELEM)),
            (
                "K",
                dict(&[
                    ("Type", Object::name("MCR")),
                    ("MCID", Object::Integer(3)),
                    ("Pg", Object::Reference(ObjectRef::new(99, 0))),
                ]),
            ),
        ]),
    );
    let text = show_structure(&g).unwrap();
    assert!(text.contains("[MCR: MCID=3 PageObj=99 Gen=0]\n"));
}

#[test]
fn test_page_number_inherited_through_parent_chain() {
    // The Figure loses its own /Pg; its /P chain reaches an element
    // carrying one
    let mut g = tagged_document();
    g.insert(
        DOC_ELEM,
        dict(&[
            ("S", Object::name("Document")),
            ("P", Object::Reference(STRUCT_ROOT)),
            ("Pg", Object::Reference(PAGE)),
            ("K", Object::Reference(FIGURE)),
        ]),
    );
    g.insert(
        FIGURE,
        dict(&[
            ("S", Object::name("Figure")),
            ("P", Object::Reference(DOC_ELEM)),
            ("K", Object::Integer(0)),
        ]),
    );
    let text = show_structure(&g).unwrap();
    assert!(text.contains("<Figure obj=\"12 0\" Page=\"1\">"));
}

#[test]
fn test_unknown_shapes_render_placeholders() {
    let mut g = tagged_document();
    g.insert(
        FIGURE,
        dict(&[
            ("S", Object::name("Figure")),
            ("P", Object::Reference(DOC_ELEM)),
            ("Pg", Object::Reference(PAGE)),
            (
                "K",
                Object::Array(vec![
                    Object::Boolean(true),
                    dict(&[("NoTag", Object::Integer(1))]),
                ]),
            ),
        ]),
    );
    let text = show_structure(&g).unwrap();
    assert!(text.contains("    [Unhandled type: Boolean]\n"));
    assert!(text.contains("    [Unhandled type: Dictionary]\n"));
}

#[test]
fn test_element_without_tag_renders_unknown() {
    let mut g = tagged_document();
    g.insert(
        DOC_ELEM,
        dict(&[
            ("Type", Object::name("StructElem")),
            ("P", Object::Reference(STRUCT_ROOT)),
        ]),
    );
    let text = show_structure(&g).unwrap();
    assert_eq!(text, "<Unknown obj=\"11 0\" Type=\"StructElem\">\n</Unknown>\n");
}

#[test]
fn test_string_and_class_attributes() {
    let mut g = tagged_document();
    g.insert(
        DOC_ELEM,
        dict(&[
            ("S", Object::name("Sect")),
            ("P", Object::Reference(STRUCT_ROOT)),
            ("Lang", Object::String(b"en-US".to_vec())),
            ("T", Object::String(b"Intro".to_vec())),
            (
                "C",
                Object::Array(vec![Object::name("Heading"), Object::name("Wide")]),
            ),
        ]),
    );
    let text = show_structure(&g).unwrap();
    assert_eq!(
        text,
        "<Sect obj=\"11 0\" Title=\"Intro\" Lang=\"en-US\" Class=\"Heading Wide\">\n</Sect>\n"
    );
}

#[test]
fn test_own_bbox_wins_over_attribute_bbox() {
    let mut g = tagged_document();
    g.insert(
        DOC_ELEM,
        dict(&[
            ("S", Object::name("Figure")),
            ("P", Object::Reference(STRUCT_ROOT)),
            (
                "BBox",
                Object::Array(vec![
                    Object::Integer(1),
                    Object::Integer(2),
                    Object::Integer(3),
                    Object::Integer(4),
                ]),
            ),
            (
                "A",
                dict(&[
                    ("O", Object::name("Layout")),
                    (
                        "BBox",
                        Object::Array(vec![
                            Object::Integer(9),
                            Object::Integer(9),
                            Object::Integer(9),
                            Object::Integer(9),
                        ]),
                    ),
                ]),
            ),
        ]),
    );
    let text = show_structure(&g).unwrap();
    assert!(text.contains("BBox=\"1 2 3 4\""));
    assert!(!text.contains("[9, 9"));
}

#[test]
fn test_attribute_array_layout_bbox() {
    let mut g = tagged_document();
    g.insert(
        DOC_ELEM,
        dict(&[
            ("S", Object::name("Figure")),
            ("P", Object::Reference(STRUCT_ROOT)),
            (
                "A",
                Object::Array(vec![
                    dict(&[("O", Object::name("List"))]),
                    dict(&[
                        ("O", Object::name("Layout")),
                        (
                            "BBox",
                            Object::Array(vec![
                                Object::Integer(10),
                                Object::Integer(20),
                                Object::Real(30.5),
                                Object::Integer(40),
                            ]),
                        ),
                    ]),
                ]),
            ),
        ]),
    );
    let text = show_structure(&g).unwrap();
    assert!(text.contains("BBox=\"[10, 20, 30.5, 40]\""));
}

#[test]
fn test_multiple_roots_render_in_order() {
    let mut g = tagged_document();
    let second = ObjectRef::new(13, 0);
    g.insert(second, dict(&[("S", Object::name("Part"))]));
    g.insert(
        STRUCT_ROOT,
        dict(&[
            ("Type", Object::name("StructTreeRoot")),
            (
                "K",
                Object::Array(vec![
                    Object::Reference(DOC_ELEM),
                    Object::Reference(second),
                ]),
            ),
        ]),
    );
    let text = show_structure(&g).unwrap();
    let doc_at = text.find("<Document").unwrap();
    let part_at = text.find("<Part").unwrap();
    assert!(doc_at < part_at);
}
