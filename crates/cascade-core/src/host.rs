//! The host tree seam. The renderer never touches a concrete node type; every
//! change goes through [`HostTree`].

use std::fmt;
use std::rc::Rc;

use crate::NodeError;

pub type NodeId = usize;

/// Event delivered to listeners.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub name: String,
    pub target: NodeId,
}

/// Shared event callback. Equality is identity, so a handler kept across
/// renders is recognised as unchanged.
#[derive(Clone)]
pub struct EventHandler(Rc<dyn Fn(&Event)>);

impl EventHandler {
    pub fn new(handler: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(handler))
    }

    pub fn call(&self, event: &Event) {
        (self.0)(event)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for EventHandler {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHandler({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

/// Mutable view of the platform's node tree.
///
/// Nodes are created during the render pass and attached only when its ops are
/// dispatched. Nodes created by a pass that fails are never attached and the
/// renderer never asks for them again; hosts that track node storage may
/// reclaim any node left without a parent.
pub trait HostTree {
    fn create_element(&mut self, tag: &str) -> NodeId;

    fn create_text(&mut self, text: &str) -> NodeId;

    fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), NodeError>;

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError>;

    /// Inserts `child` in front of the child currently at `index`.
    fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        index: usize,
    ) -> Result<(), NodeError>;

    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError>;

    fn contains_child(&self, parent: NodeId, child: NodeId) -> bool;

    fn child_count(&self, parent: NodeId) -> usize;

    fn add_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: EventHandler,
    ) -> Result<(), NodeError>;

    fn remove_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), NodeError>;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), NodeError>;

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), NodeError>;

    fn set_style(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), NodeError>;

    fn remove_style(&mut self, node: NodeId, name: &str) -> Result<(), NodeError>;

    /// Replaces the whole inline style. An empty string clears it.
    fn set_css_text(&mut self, node: NodeId, css: &str) -> Result<(), NodeError>;
}
