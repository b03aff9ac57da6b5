use std::rc::Rc;

use cascade_core::{element, EventHandler, Mutation, PatchOp, Props};
use cascade_testing::TestHarness;

fn applied(harness: &TestHarness) -> Vec<String> {
    harness
        .last_patch()
        .iter()
        .flat_map(|op| match op {
            PatchOp::Update { mutations, .. } => mutations.clone(),
            _ => Vec::new(),
        })
        .map(|mutation| match mutation {
            Mutation::SetText(text) => format!("text {text}"),
            Mutation::SetAttribute { name, .. } => format!("set {name}"),
            Mutation::RemoveAttribute { name } => format!("remove {name}"),
            Mutation::AddListener { event, .. } => format!("listen {event}"),
            Mutation::RemoveListener { event, .. } => format!("unlisten {event}"),
            Mutation::SetCssText(css) => format!("css {css:?}"),
            Mutation::SetStyle { name, .. } => format!("style {name}"),
            Mutation::RemoveStyle { name } => format!("unstyle {name}"),
            other => format!("{other:?}"),
        })
        .collect()
}

#[test]
fn clearing_props_leaves_no_residue() {
    let mut harness = TestHarness::new();
    harness
        .render(element!(
            "input",
            Props::new()
                .attr("id", "field")
                .attr("required", true)
                .attr("maxlength", 12)
                .on("input", |_| {})
                .style([("color", "red"), ("width", "10px")])
                .object("model", Rc::new(String::from("ignored"))),
        ))
        .expect("render");
    let field = harness.find("field").expect("field");
    assert_eq!(harness.host().attribute(field, "required"), Some(""));
    assert_eq!(harness.host().style(field, "width"), Some("10px"));
    assert_eq!(harness.host().listener_count(field, "input"), 1);
    assert_eq!(harness.host().attribute(field, "model"), None);

    harness
        .render(element!("input", Props::new()))
        .expect("clear");

    let node = harness.host().node(field).expect("same node");
    assert!(node.attributes.is_empty());
    assert!(node.styles.is_empty());
    assert!(node.listeners.is_empty());
    assert_eq!(harness.markup(), "<input></input>");
}

#[test]
fn stable_handlers_are_not_rebound() {
    let mut harness = TestHarness::new();
    let handler = EventHandler::new(|_| {});
    let button = |label: &str| {
        element!(
            "button",
            Props::new().attr("id", "b").listener("click", handler.clone()),
            label.to_owned()
        )
    };

    harness.render(button("one")).expect("render");
    harness.render(button("two")).expect("rerender");

    let node = harness.find("b").expect("button");
    assert_eq!(harness.host().listener_count(node, "click"), 1);
    assert_eq!(applied(&harness), vec!["text two"]);
}

#[test]
fn fresh_handlers_replace_the_old_listener() {
    let mut harness = TestHarness::new();
    let render = |harness: &mut TestHarness| {
        harness
            .render(element!(
                "button",
                Props::new().attr("id", "b").on("click", |_| {})
            ))
            .expect("render");
    };

    render(&mut harness);
    render(&mut harness);

    let node = harness.find("b").expect("button");
    assert_eq!(harness.host().listener_count(node, "click"), 1);
    assert_eq!(applied(&harness), vec!["unlisten click", "listen click"]);
}

#[test]
fn style_keys_follow_the_latest_map() {
    let mut harness = TestHarness::new();
    harness
        .render(element!(
            "div",
            Props::new()
                .attr("id", "d")
                .style([("color", "red"), ("margin", "0")])
        ))
        .expect("render");
    harness
        .render(element!(
            "div",
            Props::new().attr("id", "d").style([("color", "blue")])
        ))
        .expect("rerender");

    let node = harness.find("d").expect("div");
    assert_eq!(harness.host().style(node, "color"), Some("blue"));
    assert_eq!(harness.host().style(node, "margin"), None);
    assert_eq!(applied(&harness), vec!["unstyle margin", "style color"]);
}
