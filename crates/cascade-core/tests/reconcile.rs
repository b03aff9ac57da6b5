use std::cell::RefCell;

use cascade_core::{
    element, Component, Descriptor, MutableRef, NodeRef, PatchOp, Props, RenderError, RenderScope,
};
use cascade_testing::{init_logging, TestHarness};

fn list(keys: &[i64]) -> Descriptor {
    let items: Vec<Descriptor> = keys
        .iter()
        .map(|&key| {
            element!(
                "li",
                Props::new().key(key).attr("id", format!("item-{key}")),
                format!("item {key}"),
            )
        })
        .collect();
    element!("ul", Props::new(), items)
}

fn count_ops(ops: &[PatchOp], predicate: impl Fn(&PatchOp) -> bool) -> usize {
    ops.iter().filter(|op| predicate(op)).count()
}

#[test]
fn rendering_the_same_tree_twice_emits_nothing() {
    init_logging();
    let mut harness = TestHarness::new();
    let tree = || {
        element!(
            "main",
            Props::new()
                .attr("id", "app")
                .attr("hidden", false)
                .style([("color", "red")]),
            element!("h1", Props::new(), "Title"),
            list(&[1, 2, 3]),
            element!(LABEL, Props::new().attr("text", "hello")),
        )
    };

    harness.render(tree()).expect("first render");
    assert!(!harness.last_patch().is_empty());

    harness.render(tree()).expect("second render");
    assert!(
        harness.last_patch().is_empty(),
        "unexpected ops: {:?}",
        harness.last_patch()
    );
}

#[test]
fn keyed_children_are_reordered_not_recreated() {
    init_logging();
    let mut harness = TestHarness::new();
    harness.render(list(&[1, 2, 3])).expect("first render");
    let before: Vec<_> = ["item-1", "item-2", "item-3"]
        .iter()
        .map(|id| harness.find(id).expect("item mounted"))
        .collect();

    harness.render(list(&[3, 1, 2])).expect("reorder");

    let after: Vec<_> = ["item-1", "item-2", "item-3"]
        .iter()
        .map(|id| harness.find(id).expect("item still mounted"))
        .collect();
    assert_eq!(before, after);
    let ops = harness.last_patch();
    assert_eq!(count_ops(ops, PatchOp::is_create), 0);
    assert_eq!(count_ops(ops, PatchOp::is_remove), 0);
    assert!(ops.iter().all(|op| matches!(op, PatchOp::Move { .. })));
    assert_eq!(
        harness.markup(),
        "<ul><li id=\"item-3\">item 3</li><li id=\"item-1\">item 1</li><li id=\"item-2\">item 2</li></ul>"
    );
}

#[test]
fn keyed_children_can_be_dropped_and_added() {
    let mut harness = TestHarness::new();
    harness.render(list(&[1, 2, 3, 4])).expect("first render");
    let kept = harness.find("item-3").expect("item 3");

    harness.render(list(&[5, 3])).expect("second render");

    assert_eq!(harness.find("item-3"), Some(kept));
    assert_eq!(harness.find("item-1"), None);
    assert_eq!(
        harness.markup(),
        "<ul><li id=\"item-5\">item 5</li><li id=\"item-3\">item 3</li></ul>"
    );
}

#[test]
fn reversed_list_is_moved_in_place() {
    let mut harness = TestHarness::new();
    harness.render(list(&[1, 2, 3, 4, 5])).expect("first render");
    let before: Vec<_> = (1..=5)
        .map(|key| harness.find(&format!("item-{key}")).expect("item mounted"))
        .collect();

    harness.render(list(&[5, 4, 3, 2, 1])).expect("reverse");

    let after: Vec<_> = (1..=5)
        .map(|key| harness.find(&format!("item-{key}")).expect("item still mounted"))
        .collect();
    assert_eq!(before, after);
    let ops = harness.last_patch();
    assert!(ops.iter().all(|op| matches!(op, PatchOp::Move { .. })));
    assert_eq!(ops.len(), 4);
    let ul = harness.host().children(harness.container())[0];
    let reversed: Vec<_> = before.iter().rev().copied().collect();
    assert_eq!(harness.host().children(ul).to_vec(), reversed);
}

#[test]
fn mixed_inserts_removals_and_moves_land_in_order() {
    let mut harness = TestHarness::new();
    harness.render(list(&[1, 2, 3, 4, 5])).expect("first render");
    let kept: Vec<_> = ["item-1", "item-2", "item-5"]
        .iter()
        .map(|id| harness.find(id).expect("item mounted"))
        .collect();

    harness.render(list(&[5, 6, 2, 1])).expect("second render");

    assert_eq!(
        harness.markup(),
        "<ul><li id=\"item-5\">item 5</li><li id=\"item-6\">item 6</li>\
         <li id=\"item-2\">item 2</li><li id=\"item-1\">item 1</li></ul>"
    );
    let ops = harness.last_patch();
    assert_eq!(count_ops(ops, PatchOp::is_remove), 2);
    assert_eq!(count_ops(ops, PatchOp::is_create), 1);
    assert_eq!(count_ops(ops, |op| matches!(op, PatchOp::Move { .. })), 2);
    assert_eq!(harness.find("item-1"), Some(kept[0]));
    assert_eq!(harness.find("item-2"), Some(kept[1]));
    assert_eq!(harness.find("item-5"), Some(kept[2]));
}

#[test]
fn unkeyed_children_match_by_position() {
    let mut harness = TestHarness::new();
    let row = |id: &str| element!("li", Props::new().attr("id", id.to_owned()));
    harness
        .render(element!("ul", Props::new(), row("x"), row("y")))
        .expect("first render");
    let x = harness.find("x").expect("x");
    let y = harness.find("y").expect("y");

    harness
        .render(element!("ul", Props::new(), row("x"), row("y"), row("z")))
        .expect("second render");

    assert_eq!(harness.find("x"), Some(x));
    assert_eq!(harness.find("y"), Some(y));
    let ops = harness.last_patch();
    assert_eq!(count_ops(ops, PatchOp::is_create), 1);
    assert_eq!(count_ops(ops, PatchOp::is_remove), 0);
    let z = harness.find("z").expect("z");
    assert!(ops
        .iter()
        .any(|op| matches!(op, PatchOp::Create { node, index: None, .. } if *node == z)));
}

#[test]
fn unmatched_key_falls_back_to_position() {
    let mut harness = TestHarness::new();
    harness
        .render(element!(
            "ul",
            Props::new(),
            element!("li", Props::new().attr("id", "plain"))
        ))
        .expect("first render");
    let plain = harness.find("plain").expect("plain");

    harness
        .render(element!(
            "ul",
            Props::new(),
            element!("li", Props::new().key("k").attr("id", "keyed")),
            element!("li", Props::new().attr("id", "plain")),
        ))
        .expect("second render");

    // "k" has no old match, so the row at index 0 is reused by position and
    // the trailing unkeyed row is mounted fresh.
    assert_eq!(harness.find("keyed"), Some(plain));
    assert_ne!(harness.find("plain"), Some(plain));
}

#[test]
fn changing_tag_replaces_in_place() {
    let mut harness = TestHarness::new();
    let page = |middle: &str| {
        element!(
            "div",
            Props::new(),
            element!("h1", Props::new(), "top"),
            element!(middle, Props::new().attr("id", "middle"), "body"),
            element!("footer", Props::new(), "bottom"),
        )
    };
    harness.render(page("span")).expect("first render");
    let old = harness.find("middle").expect("span");

    harness.render(page("p")).expect("second render");

    let new = harness.find("middle").expect("p");
    assert_ne!(old, new);
    assert_eq!(
        harness.markup(),
        "<div><h1>top</h1><p id=\"middle\">body</p><footer>bottom</footer></div>"
    );
    let ops = harness.last_patch();
    assert!(ops
        .iter()
        .any(|op| matches!(op, PatchOp::Remove { node, .. } if *node == old)));
    assert!(ops
        .iter()
        .any(|op| matches!(op, PatchOp::Create { node, index: Some(1), .. } if *node == new)));
}

#[test]
fn root_of_another_kind_replaces_container_content() {
    let mut harness = TestHarness::new();
    harness
        .render(element!("div", Props::new(), "one"))
        .expect("first render");
    harness
        .render(element!("section", Props::new(), "two"))
        .expect("second render");

    assert_eq!(harness.markup(), "<section>two</section>");
}

#[test]
fn text_children_update_in_place() {
    let mut harness = TestHarness::new();
    harness
        .render(element!("p", Props::new().attr("id", "p"), "before"))
        .expect("first render");
    let p = harness.find("p").expect("p");
    let text = harness.host().children(p)[0];

    harness
        .render(element!("p", Props::new().attr("id", "p"), "after"))
        .expect("second render");

    assert_eq!(harness.host().children(p), &[text]);
    assert_eq!(harness.markup(), "<p id=\"p\">after</p>");
    assert_eq!(harness.last_patch().len(), 1);
}

#[test]
fn text_swapped_for_element_is_replaced() {
    let mut harness = TestHarness::new();
    harness
        .render(element!("p", Props::new(), "text"))
        .expect("first render");
    harness
        .render(element!("p", Props::new(), element!("b", Props::new(), "bold")))
        .expect("second render");

    assert_eq!(harness.markup(), "<p><b>bold</b></p>");
}

fn label(_: &mut RenderScope<'_>, props: &Props) -> Result<Descriptor, RenderError> {
    Ok(element!(
        "span",
        Props::new(),
        props.str("text").unwrap_or_default().to_owned()
    ))
}

const LABEL: Component = Component::new("Label", label);

fn badge(_: &mut RenderScope<'_>, props: &Props) -> Result<Descriptor, RenderError> {
    Ok(element!(
        "b",
        Props::new(),
        props.str("text").unwrap_or_default().to_owned()
    ))
}

const BADGE: Component = Component::new("Badge", badge);

#[test]
fn components_are_transparent_wrappers() {
    let mut harness = TestHarness::new();
    harness
        .render(element!(
            "div",
            Props::new(),
            element!(LABEL, Props::new().attr("text", "a")),
            element!(LABEL, Props::new().attr("text", "b")),
        ))
        .expect("first render");
    assert_eq!(harness.markup(), "<div><span>a</span><span>b</span></div>");

    harness
        .render(element!(
            "div",
            Props::new(),
            element!(LABEL, Props::new().attr("text", "a")),
            element!(BADGE, Props::new().attr("text", "b")),
        ))
        .expect("swap component");
    assert_eq!(harness.markup(), "<div><span>a</span><b>b</b></div>");
}

thread_local! {
    static REFS: RefCell<Vec<NodeRef>> = RefCell::new(Vec::new());
}

fn with_ref(scope: &mut RenderScope<'_>, props: &Props) -> Result<Descriptor, RenderError> {
    let node_ref = scope.use_node_ref()?;
    REFS.with(|refs| refs.borrow_mut().push(node_ref.clone()));
    let id = props.str("id").unwrap_or_default().to_owned();
    Ok(element!("input", Props::new().attr("id", id).node_ref(node_ref)))
}

const WITH_REF: Component = Component::new("WithRef", with_ref);

fn ref_list(keys: &[i64]) -> Descriptor {
    let items: Vec<Descriptor> = keys
        .iter()
        .map(|&key| element!(WITH_REF, Props::new().key(key).attr("id", format!("field-{key}"))))
        .collect();
    element!("form", Props::new(), items)
}

#[test]
fn refs_survive_reordering_and_clear_on_removal() {
    REFS.with(|refs| refs.borrow_mut().clear());
    let mut harness = TestHarness::new();
    harness.render(ref_list(&[1, 2])).expect("first render");
    let first_render: Vec<NodeRef> = REFS.with(|refs| refs.borrow_mut().drain(..).collect());
    let field_1 = harness.find("field-1").expect("field 1");
    assert_eq!(first_render[0].current(), Some(field_1));

    harness.render(ref_list(&[2, 1])).expect("reorder");
    let second_render: Vec<NodeRef> = REFS.with(|refs| refs.borrow_mut().drain(..).collect());
    assert!(second_render[1].ptr_eq(&first_render[0]));
    assert_eq!(first_render[0].current(), Some(field_1));

    harness.render(ref_list(&[2])).expect("remove");
    assert_eq!(first_render[0].current(), None);
    assert!(first_render[1].current().is_some());
}

#[test]
fn external_refs_bind_to_host_nodes() {
    let mut harness = TestHarness::new();
    let node_ref: NodeRef = MutableRef::new(None);
    harness
        .render(element!(
            "div",
            Props::new(),
            element!("canvas", Props::new().attr("id", "c").node_ref(node_ref.clone()))
        ))
        .expect("render");

    assert_eq!(node_ref.current(), harness.find("c"));

    harness.unmount();
    assert_eq!(node_ref.current(), None);
    assert_eq!(harness.markup(), "");
}
