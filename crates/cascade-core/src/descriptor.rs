//! Immutable element descriptors.
//!
//! A [`Descriptor`] says what one node should look like after the next commit:
//! a host tag or a [`Component`], its [`Props`], its children and an optional
//! identity [`Key`]. Descriptors are rebuilt on every render and never compared
//! as a whole; the reconciler only looks at their parts.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::hooks::{NodeRef, RenderScope};
use crate::host::EventHandler;
use crate::RenderError;

/// Identity hint used to match children across renders.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Str(Rc<str>),
    Int(i64),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Str(value) => f.write_str(value),
            Key::Int(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Str(Rc::from(value))
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Str(Rc::from(value))
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Int(i64::from(value))
    }
}

impl From<u32> for Key {
    fn from(value: u32) -> Self {
        Key::Int(i64::from(value))
    }
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        Key::Int(value as i64)
    }
}

/// Signature of a component render function.
pub type RenderFn = fn(&mut RenderScope<'_>, &Props) -> Result<Descriptor, RenderError>;

/// A named render function. Two components are the same kind when they wrap
/// the same function.
///
/// Identity is the function pointer. Rust does not promise one address per
/// function: identical bodies may be folded into one, and a function may get
/// more than one address across codegen units. Declare each component once as
/// a `const` and build descriptors from that constant.
#[derive(Clone, Copy)]
pub struct Component {
    name: &'static str,
    render: RenderFn,
}

impl Component {
    pub const fn new(name: &'static str, render: RenderFn) -> Self {
        Self { name, render }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn render(
        &self,
        scope: &mut RenderScope<'_>,
        props: &Props,
    ) -> Result<Descriptor, RenderError> {
        (self.render)(scope, props)
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.render as usize == other.render as usize
    }
}

impl Eq for Component {}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Component").field(&self.name).finish()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ElementKind {
    Host(Rc<str>),
    Component(Component),
}

impl From<&str> for ElementKind {
    fn from(tag: &str) -> Self {
        ElementKind::Host(Rc::from(tag))
    }
}

impl From<String> for ElementKind {
    fn from(tag: String) -> Self {
        ElementKind::Host(Rc::from(tag))
    }
}

impl From<Component> for ElementKind {
    fn from(component: Component) -> Self {
        ElementKind::Component(component)
    }
}

/// Value of the reserved `style` prop.
#[derive(Clone, Debug, PartialEq)]
pub enum Style {
    /// Raw css text, replaces the whole inline style.
    Text(String),
    /// Style property to value, applied per key.
    Map(IndexMap<String, String>),
}

impl Style {
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Style::Map(
            entries
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

#[derive(Clone)]
pub enum PropValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Style(Style),
    Listener(EventHandler),
    /// Opaque shared value handed to components. Compared by identity and
    /// never written to the host as an attribute.
    Object(Rc<dyn Any>),
}

impl PropValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_listener(&self) -> Option<&EventHandler> {
        match self {
            PropValue::Listener(handler) => Some(handler),
            _ => None,
        }
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        match self {
            PropValue::Object(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Attribute text for literal values.
    pub(crate) fn literal(&self) -> Option<String> {
        match self {
            PropValue::Int(value) => Some(value.to_string()),
            PropValue::Float(value) => Some(value.to_string()),
            PropValue::Str(value) => Some(value.to_string()),
            _ => None,
        }
    }
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropValue::Null, PropValue::Null) => true,
            (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
            (PropValue::Int(a), PropValue::Int(b)) => a == b,
            (PropValue::Float(a), PropValue::Float(b)) => a == b,
            (PropValue::Str(a), PropValue::Str(b)) => a == b,
            (PropValue::Style(a), PropValue::Style(b)) => a == b,
            (PropValue::Listener(a), PropValue::Listener(b)) => a == b,
            (PropValue::Object(a), PropValue::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Null => f.write_str("Null"),
            PropValue::Bool(value) => write!(f, "Bool({value})"),
            PropValue::Int(value) => write!(f, "Int({value})"),
            PropValue::Float(value) => write!(f, "Float({value})"),
            PropValue::Str(value) => write!(f, "Str({value:?})"),
            PropValue::Style(style) => write!(f, "Style({style:?})"),
            PropValue::Listener(handler) => write!(f, "Listener({handler:?})"),
            PropValue::Object(_) => f.write_str("Object(..)"),
        }
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Int(i64::from(value))
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<u32> for PropValue {
    fn from(value: u32) -> Self {
        PropValue::Int(i64::from(value))
    }
}

impl From<usize> for PropValue {
    fn from(value: usize) -> Self {
        PropValue::Int(value as i64)
    }
}

impl From<f32> for PropValue {
    fn from(value: f32) -> Self {
        PropValue::Float(f64::from(value))
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Float(value)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(Rc::from(value))
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(Rc::from(value))
    }
}

impl From<Style> for PropValue {
    fn from(style: Style) -> Self {
        PropValue::Style(style)
    }
}

impl From<EventHandler> for PropValue {
    fn from(handler: EventHandler) -> Self {
        PropValue::Listener(handler)
    }
}

impl<T: Into<PropValue>> From<Option<T>> for PropValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(PropValue::Null, Into::into)
    }
}

/// Ordered property bag. `key` and `ref` are kept apart from the other
/// entries and lifted onto the [`Descriptor`] by [`build`].
#[derive(Clone, Default, PartialEq)]
pub struct Props {
    entries: IndexMap<String, PropValue>,
    key: Option<Key>,
    node_ref: Option<NodeRef>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a prop. The reserved name `key` becomes the identity key.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        let name = name.into();
        let value = value.into();
        if name == "key" {
            self.key = match value {
                PropValue::Str(value) => Some(Key::Str(value)),
                PropValue::Int(value) => Some(Key::Int(value)),
                other => {
                    log::debug!("ignoring key {other:?}; keys are strings or integers");
                    None
                }
            };
            return self;
        }
        self.entries.insert(name, value);
        self
    }

    /// Registers a listener under `on<event>`.
    pub fn on(self, event: &str, handler: impl Fn(&crate::Event) + 'static) -> Self {
        self.listener(event, EventHandler::new(handler))
    }

    /// Registers an existing handler under `on<event>`. Reusing one handler
    /// across renders keeps the listener attached without rebinding.
    pub fn listener(self, event: &str, handler: EventHandler) -> Self {
        self.attr(format!("on{event}"), handler)
    }

    pub fn style<K, V>(self, entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.attr("style", Style::map(entries))
    }

    pub fn style_text(self, css: impl Into<String>) -> Self {
        self.attr("style", Style::Text(css.into()))
    }

    pub fn object(self, name: impl Into<String>, value: Rc<dyn Any>) -> Self {
        self.attr(name, PropValue::Object(value))
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn node_ref(mut self, node_ref: NodeRef) -> Self {
        self.node_ref = Some(node_ref);
        self
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(PropValue::as_str)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(PropValue::as_int)
    }

    pub fn object_ref<T: 'static>(&self, name: &str) -> Option<&T> {
        self.get(name).and_then(PropValue::downcast_ref::<T>)
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

/// A normalised child: either an element or a text node.
#[derive(Clone, Debug)]
pub enum Child {
    Element(Descriptor),
    Text(String),
}

impl Child {
    pub fn key(&self) -> Option<&Key> {
        match self {
            Child::Element(descriptor) => descriptor.key(),
            Child::Text(_) => None,
        }
    }
}

/// Anything accepted as a child before normalisation.
#[derive(Clone, Debug)]
pub enum ChildInput {
    Empty,
    Text(String),
    Element(Descriptor),
    List(Vec<ChildInput>),
}

impl From<()> for ChildInput {
    fn from(_: ()) -> Self {
        ChildInput::Empty
    }
}

impl From<bool> for ChildInput {
    fn from(_: bool) -> Self {
        ChildInput::Empty
    }
}

impl From<&str> for ChildInput {
    fn from(value: &str) -> Self {
        ChildInput::Text(value.to_owned())
    }
}

impl From<String> for ChildInput {
    fn from(value: String) -> Self {
        ChildInput::Text(value)
    }
}

impl From<&String> for ChildInput {
    fn from(value: &String) -> Self {
        ChildInput::Text(value.clone())
    }
}

impl From<char> for ChildInput {
    fn from(value: char) -> Self {
        ChildInput::Text(value.to_string())
    }
}

macro_rules! text_child_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ChildInput {
                fn from(value: $ty) -> Self {
                    ChildInput::Text(value.to_string())
                }
            }
        )*
    };
}

text_child_from_number!(i32, i64, u32, u64, usize, f32, f64);

impl From<Descriptor> for ChildInput {
    fn from(descriptor: Descriptor) -> Self {
        ChildInput::Element(descriptor)
    }
}

impl From<Child> for ChildInput {
    fn from(child: Child) -> Self {
        match child {
            Child::Element(descriptor) => ChildInput::Element(descriptor),
            Child::Text(text) => ChildInput::Text(text),
        }
    }
}

impl<T: Into<ChildInput>> From<Option<T>> for ChildInput {
    fn from(value: Option<T>) -> Self {
        value.map_or(ChildInput::Empty, Into::into)
    }
}

impl<T: Into<ChildInput>> From<Vec<T>> for ChildInput {
    fn from(values: Vec<T>) -> Self {
        ChildInput::List(values.into_iter().map(Into::into).collect())
    }
}

struct DescriptorInner {
    kind: ElementKind,
    props: Props,
    children: Vec<Child>,
    key: Option<Key>,
    node_ref: Option<NodeRef>,
}

/// Immutable description of one node. Cloning is cheap.
#[derive(Clone)]
pub struct Descriptor {
    inner: Rc<DescriptorInner>,
}

impl Descriptor {
    pub fn kind(&self) -> &ElementKind {
        &self.inner.kind
    }

    pub fn props(&self) -> &Props {
        &self.inner.props
    }

    pub fn children(&self) -> &[Child] {
        &self.inner.children
    }

    pub fn key(&self) -> Option<&Key> {
        self.inner.key.as_ref()
    }

    pub fn node_ref(&self) -> Option<&NodeRef> {
        self.inner.node_ref.as_ref()
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("kind", &self.inner.kind)
            .field("key", &self.inner.key)
            .field("props", &self.inner.props)
            .field("children", &self.inner.children)
            .finish()
    }
}

/// Builds a descriptor, flattening nested child lists, dropping empty and
/// boolean children and turning numbers into text.
pub fn build(
    kind: impl Into<ElementKind>,
    props: Props,
    children: impl IntoIterator<Item = ChildInput>,
) -> Descriptor {
    let Props {
        entries,
        key,
        node_ref,
    } = props;
    let mut flat = Vec::new();
    for child in children {
        flatten_into(child, &mut flat);
    }
    Descriptor {
        inner: Rc::new(DescriptorInner {
            kind: kind.into(),
            props: Props {
                entries,
                key: None,
                node_ref: None,
            },
            children: flat,
            key,
            node_ref,
        }),
    }
}

fn flatten_into(input: ChildInput, out: &mut Vec<Child>) {
    match input {
        ChildInput::Empty => {}
        ChildInput::Text(text) => out.push(Child::Text(text)),
        ChildInput::Element(descriptor) => out.push(Child::Element(descriptor)),
        ChildInput::List(items) => {
            for item in items {
                flatten_into(item, out);
            }
        }
    }
}

/// Variadic front end for [`build`].
///
/// ```ignore
/// element!("ul", Props::new().attr("class", "tasks"),
///     element!("li", Props::new().key(1), "first"),
///     items,
/// )
/// ```
#[macro_export]
macro_rules! element {
    ($kind:expr) => {
        $crate::build($kind, $crate::Props::new(), ::std::vec::Vec::new())
    };
    ($kind:expr, $props:expr $(, $child:expr)* $(,)?) => {
        $crate::build(
            $kind,
            $props,
            ::std::vec![$($crate::ChildInput::from($child)),*],
        )
    };
}

#[cfg(test)]
#[path = "tests/descriptor_tests.rs"]
mod tests;
