//! Browser tests for the live-DOM tree.
//!
//! Run with: `wasm-pack test --headless --firefox` or `--chrome`

use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

use web_sys::{Document, Element, Node};

use inkmark_core::offsets::{flattened_text, TreeRange};
use inkmark_core::{
    map_selection_to_offsets, Annotation, HighlightColor, HighlightConfig, Reconciler, TextRange,
    TextTree,
};
use inkmark_web::dom::DomTree;
use inkmark_web::Highlighter;

fn document() -> Document {
    web_sys::window().unwrap().document().unwrap()
}

/// Mount `markup` in a fresh host element attached to the body
fn mount(markup: &str) -> Element {
    let document = document();
    let host = document.create_element("div").unwrap();
    host.set_inner_html(markup);
    document.body().unwrap().append_child(&host).unwrap();
    host
}

fn tree() -> DomTree {
    DomTree::new(document(), HighlightConfig::default())
}

/// `(id, text)` of every wrapper under `host`, in document order
fn wrappers(host: &Element) -> Vec<(String, String)> {
    let nodes = host.query_selector_all("mark[data-highlight-id]").unwrap();
    (0..nodes.length())
        .filter_map(|i| nodes.get(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .map(|el| {
            (
                el.get_attribute("data-highlight-id").unwrap(),
                el.text_content().unwrap_or_default(),
            )
        })
        .collect()
}

#[wasm_bindgen_test]
fn test_reconcile_survives_rerender() {
    let host = mount(r#"<p data-container-id="w1">The quick brown fox</p>"#);
    let mut tree = tree();
    let reconciler = Reconciler::default();
    let set = vec![
        Annotation::new("w1", TextRange::new(4, 15), HighlightColor::Yellow, "quick brown"),
        Annotation::new("w1", TextRange::new(10, 19), HighlightColor::Green, "brown fox"),
    ];

    let report = reconciler.reconcile_live(&mut tree, "w1", &set).unwrap();
    assert_eq!(report.applied, 2);
    assert_eq!(report.stripped, 0);

    // Host re-renders the same text with different structure
    host.set_inner_html(r#"<p data-container-id="w1"><span>The q</span>uick <em>brown</em> fox</p>"#);
    let report = reconciler.reconcile_live(&mut tree, "w1", &set).unwrap();
    assert_eq!(report.applied, 2);
    assert!(report.drifted.is_empty());

    let container = tree.find_container("w1").unwrap();
    assert_eq!(flattened_text(&tree, &container), "The quick brown fox");

    for annotation in &set {
        let id = annotation.id.to_string();
        let wrapped: String = wrappers(&host)
            .into_iter()
            .filter(|(wrapper_id, _)| *wrapper_id == id)
            .map(|(_, text)| text)
            .collect();
        assert_eq!(wrapped, annotation.source_text);
    }

    // Five wrappers, one nested: "q", "uick ", "brown" (holding green) and " fox"
    // are outermost, and a second pass strips those before re-applying
    assert_eq!(wrappers(&host).len(), 5);
    let report = reconciler.reconcile_live(&mut tree, "w1", &set).unwrap();
    assert_eq!(report.stripped, 4);
    assert_eq!(wrappers(&host).len(), 5);
    assert_eq!(flattened_text(&tree, &container), "The quick brown fox");

    host.remove();
}

#[wasm_bindgen_test]
fn test_unannotate_restores_text_leaves() {
    let host = mount(r#"<p data-container-id="w2">alpha <b>beta</b> gamma</p>"#);
    let mut tree = tree();
    let reconciler = Reconciler::default();
    let set = vec![Annotation::new("w2", TextRange::new(3, 13), HighlightColor::Green, "ha beta ga")];

    reconciler.reconcile_live(&mut tree, "w2", &set).unwrap();
    assert_eq!(wrappers(&host).len(), 3);

    let container = tree.find_container("w2").unwrap();
    assert_eq!(reconciler.unannotate(&mut tree, &container), 3);
    assert!(wrappers(&host).is_empty());
    assert_eq!(
        host.inner_html(),
        r#"<p data-container-id="w2">alpha <b>beta</b> gamma</p>"#
    );

    host.remove();
}

#[wasm_bindgen_test]
fn test_point_converts_utf16_and_child_index() {
    let host = mount("<p data-container-id=\"w3\">a\u{1F600}b<i>cd</i></p>");
    let tree = tree();
    let container = tree.find_container("w3").unwrap();
    let first_leaf = container.first_child().unwrap();

    // Offset 3 in UTF-16 units lands after the emoji
    let start = tree.point(first_leaf, 3);
    assert_eq!(start.offset, 2);

    // Element anchor: after the second child of the paragraph
    let end = tree.point(container.clone(), 2);
    let mapped = map_selection_to_offsets(&tree, &container, &TreeRange::new(start, end)).unwrap();
    assert_eq!(mapped.range, TextRange::new(2, 5));
    assert_eq!(mapped.text, "bcd");

    host.remove();
}

#[wasm_bindgen_test]
fn test_opaque_elements_are_not_text() {
    let host = mount(r#"<p data-container-id="w4">a<script>var b = 1;</script><style>p{}</style>c</p>"#);
    let tree = tree();
    let container = tree.find_container("w4").unwrap();
    assert_eq!(flattened_text(&tree, &container), "ac");

    host.remove();
}

#[wasm_bindgen_test]
fn test_hit_test_finds_innermost_wrapper() {
    let host = mount(r#"<p data-container-id="w5">abcdefghijkl</p>"#);
    let mut tree = tree();
    let outer = Annotation::new("w5", TextRange::new(0, 10), HighlightColor::Yellow, "abcdefghij");
    let inner = Annotation::new("w5", TextRange::new(2, 5), HighlightColor::Green, "cde");
    Reconciler::default()
        .reconcile_live(&mut tree, "w5", &[outer.clone(), inner.clone()])
        .unwrap();

    let selector = format!("[data-highlight-id=\"{}\"]", inner.id);
    let inner_el = host.query_selector(&selector).unwrap().unwrap();
    assert_eq!(inner_el.text_content().as_deref(), Some("cde"));
    assert_eq!(tree.hit_test(&inner_el), Some(("w5".to_string(), inner.id)));

    let container: Node = tree.find_container("w5").unwrap();
    let container_el: Element = container.dyn_into().unwrap();
    assert_eq!(tree.hit_test(&container_el), None);

    host.remove();
}

/// Select characters `[start, end)` of the first text node in `container`
fn select_text(container: &Node, start: u32, end: u32) {
    let document = document();
    let text = container.first_child().unwrap();
    let range = document.create_range().unwrap();
    range.set_start(&text, start).unwrap();
    range.set_end(&text, end).unwrap();
    let selection = web_sys::window().unwrap().get_selection().unwrap().unwrap();
    selection.remove_all_ranges().unwrap();
    selection.add_range(&range).unwrap();
}

fn annotation_count(highlighter: &Highlighter, container_id: &str) -> u32 {
    let list = highlighter.list_annotations(container_id).unwrap();
    js_sys::Array::from(&list).length()
}

#[wasm_bindgen_test]
fn test_clearing_dismisses_pending_prompt() {
    let host = mount(r#"<p data-container-id="c1">The quick fox</p>"#);
    let mut highlighter = Highlighter::new("clear-flow", JsValue::UNDEFINED).unwrap();
    highlighter.clear_all();
    let container = tree().find_container("c1").unwrap();

    select_text(&container, 4, 9);
    assert!(highlighter.on_selection_end("c1", 0.0, 0.0));
    highlighter.clear_container("c1");

    // The selection prompt closed with the clear, so the pick has nothing to commit
    assert!(highlighter.pick_color("yellow").unwrap().is_null());
    assert_eq!(annotation_count(&highlighter, "c1"), 0);

    select_text(&container, 4, 9);
    assert!(highlighter.on_selection_end("c1", 0.0, 0.0));
    assert!(!highlighter.pick_color("green").unwrap().is_null());
    assert_eq!(annotation_count(&highlighter, "c1"), 1);
    assert_eq!(wrappers(&host).len(), 1);

    highlighter.clear_all();
    assert_eq!(annotation_count(&highlighter, "c1"), 0);
    assert!(wrappers(&host).is_empty());

    host.remove();
}
