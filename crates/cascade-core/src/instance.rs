//! Live instance tree. Instances persist across renders; descriptors do not.

use std::rc::Rc;

use slotmap::{new_key_type, SlotMap};

use crate::descriptor::{Child, Component, Descriptor, ElementKind, Key};
use crate::hooks::HookSlot;
use crate::host::NodeId;

new_key_type! {
    /// Stable identity of a mounted instance. Removed ids are never reused.
    pub struct InstanceId;
}

pub(crate) type InstanceTree = SlotMap<InstanceId, Instance>;

/// Topmost ancestor of `id`.
pub(crate) fn root_of(tree: &InstanceTree, id: InstanceId) -> InstanceId {
    let mut current = id;
    while let Some(parent) = tree.get(current).and_then(|instance| instance.parent) {
        current = parent;
    }
    current
}

pub(crate) enum InstanceKind {
    Host(Rc<str>),
    Component(Component),
    Text(String),
}

pub(crate) struct Instance {
    pub(crate) kind: InstanceKind,
    /// Own node for host and text instances, the adopted child node for
    /// components.
    pub(crate) node: Option<NodeId>,
    pub(crate) parent: Option<InstanceId>,
    pub(crate) children: Vec<InstanceId>,
    pub(crate) hooks: Vec<HookSlot>,
    /// Last applied descriptor. `None` for text instances.
    pub(crate) descriptor: Option<Descriptor>,
    /// Host children as of the last commit. Host instances only.
    pub(crate) attached: Vec<NodeId>,
}

impl Instance {
    pub(crate) fn new(kind: InstanceKind, parent: Option<InstanceId>) -> Self {
        Self {
            kind,
            node: None,
            parent,
            children: Vec::new(),
            hooks: Vec::new(),
            descriptor: None,
            attached: Vec::new(),
        }
    }

    pub(crate) fn key(&self) -> Option<&Key> {
        self.descriptor.as_ref().and_then(Descriptor::key)
    }

    /// Whether `child` can update this instance in place instead of
    /// replacing it.
    pub(crate) fn matches(&self, child: &Child) -> bool {
        match (&self.kind, child) {
            (InstanceKind::Text(_), Child::Text(_)) => true,
            (InstanceKind::Host(tag), Child::Element(descriptor)) => {
                matches!(descriptor.kind(), ElementKind::Host(other) if other == tag)
            }
            (InstanceKind::Component(component), Child::Element(descriptor)) => {
                matches!(descriptor.kind(), ElementKind::Component(other) if other == component)
            }
            _ => false,
        }
    }

    pub(crate) fn is_component(&self) -> bool {
        matches!(self.kind, InstanceKind::Component(_))
    }
}
