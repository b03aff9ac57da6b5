use super::*;
use crate::host::EventHandler;

fn names(mutations: &[Mutation]) -> Vec<String> {
    mutations
        .iter()
        .map(|mutation| match mutation {
            Mutation::SetText(text) => format!("text {text}"),
            Mutation::SetAttribute { name, value } => format!("set {name}={value}"),
            Mutation::RemoveAttribute { name } => format!("remove {name}"),
            Mutation::AddListener { event, .. } => format!("listen {event}"),
            Mutation::RemoveListener { event, .. } => format!("unlisten {event}"),
            Mutation::SetCssText(css) => format!("css {css:?}"),
            Mutation::SetStyle { name, value } => format!("style {name}={value}"),
            Mutation::RemoveStyle { name } => format!("unstyle {name}"),
            Mutation::BindRef(_) => "bind".to_owned(),
            Mutation::UnbindRef(_) => "unbind".to_owned(),
        })
        .collect()
}

#[test]
fn identical_props_produce_nothing() {
    let handler = EventHandler::new(|_| {});
    let props = Props::new()
        .attr("id", "a")
        .attr("tabindex", 3)
        .listener("click", handler)
        .style([("color", "red")]);

    assert!(diff_props(&props, &props.clone()).is_empty());
}

#[test]
fn literal_values_become_attributes() {
    let props = Props::new()
        .attr("id", "main")
        .attr("hidden", true)
        .attr("disabled", false)
        .attr("width", 1.5)
        .attr("data", None::<&str>);

    assert_eq!(
        names(&diff_props(&Props::new(), &props)),
        vec!["set id=main", "set hidden=", "set width=1.5"]
    );
}

#[test]
fn object_values_are_never_written() {
    let props = Props::new().object("model", std::rc::Rc::new(5_u8));

    assert!(diff_props(&Props::new(), &props).is_empty());
}

#[test]
fn dropping_every_prop_leaves_no_residue() {
    let old = Props::new()
        .attr("id", "main")
        .on("click", |_| {})
        .style_text("color: red");

    assert_eq!(
        names(&diff_props(&old, &Props::new())),
        vec!["remove id", "unlisten click", "css \"\""]
    );
}

#[test]
fn changed_listener_is_unbound_before_rebinding() {
    let old = Props::new().on("Click", |_| {});
    let new = Props::new().on("Click", |_| {});

    assert_eq!(
        names(&diff_props(&old, &new)),
        vec!["unlisten click", "listen click"]
    );
}

#[test]
fn on_prefixed_literals_stay_attributes() {
    let props = Props::new().attr("one", "1");

    assert_eq!(names(&diff_props(&Props::new(), &props)), vec!["set one=1"]);
}

#[test]
fn false_removes_a_present_attribute() {
    let old = Props::new().attr("checked", true);
    let new = Props::new().attr("checked", false);

    assert_eq!(names(&diff_props(&old, &new)), vec!["remove checked"]);
}

#[test]
fn style_maps_are_diffed_per_key() {
    let old = Props::new().style([("color", "red"), ("margin", "0")]);
    let new = Props::new().style([("color", "blue"), ("padding", "4px")]);

    assert_eq!(
        names(&diff_props(&old, &new)),
        vec!["unstyle margin", "style color=blue", "style padding=4px"]
    );
}

#[test]
fn switching_from_css_text_to_map_clears_first() {
    let old = Props::new().style_text("color: red");
    let new = Props::new().style([("margin", "0")]);

    assert_eq!(
        names(&diff_props(&old, &new)),
        vec!["css \"\"", "style margin=0"]
    );
}

#[test]
fn string_style_is_css_text() {
    let new = Props::new().attr("style", "color: red");

    assert_eq!(
        names(&diff_props(&Props::new(), &new)),
        vec!["css \"color: red\""]
    );
}
