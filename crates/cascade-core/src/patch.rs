//! Patch operations produced by a render pass and their application to a
//! [`HostTree`].

use crate::hooks::NodeRef;
use crate::host::{EventHandler, HostTree, NodeId};
use crate::NodeError;

/// One change to a node's own state.
#[derive(Clone, Debug)]
pub enum Mutation {
    SetText(String),
    SetAttribute { name: String, value: String },
    RemoveAttribute { name: String },
    AddListener { event: String, handler: EventHandler },
    RemoveListener { event: String, handler: EventHandler },
    SetCssText(String),
    SetStyle { name: String, value: String },
    RemoveStyle { name: String },
    /// Points the ref at the node.
    BindRef(NodeRef),
    /// Clears the ref if it still points at the node.
    UnbindRef(NodeRef),
}

/// Structural or state change for one host node, in commit order.
#[derive(Clone, Debug)]
pub enum PatchOp {
    /// Attach a node created during the render pass. `index: None` appends.
    Create {
        node: NodeId,
        parent: NodeId,
        index: Option<usize>,
    },
    /// Reposition a node that already lives under `parent`.
    Move {
        node: NodeId,
        parent: NodeId,
        index: usize,
    },
    Update {
        node: NodeId,
        mutations: Vec<Mutation>,
    },
    Remove {
        node: NodeId,
        parent: NodeId,
    },
}

impl PatchOp {
    pub fn node(&self) -> NodeId {
        match self {
            PatchOp::Create { node, .. }
            | PatchOp::Move { node, .. }
            | PatchOp::Update { node, .. }
            | PatchOp::Remove { node, .. } => *node,
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(self, PatchOp::Create { .. })
    }

    pub fn is_remove(&self) -> bool {
        matches!(self, PatchOp::Remove { .. })
    }
}

/// Applies `ops` in order. A failing op is logged and skipped; the rest of the
/// batch still runs.
pub fn dispatch<H: HostTree + ?Sized>(host: &mut H, ops: &[PatchOp]) {
    for op in ops {
        if let Err(err) = apply_op(host, op) {
            log::warn!("skipping {op:?}: {err}");
        }
    }
}

fn apply_op<H: HostTree + ?Sized>(host: &mut H, op: &PatchOp) -> Result<(), NodeError> {
    match op {
        PatchOp::Create {
            node,
            parent,
            index,
        } => place(host, *parent, *node, *index),
        PatchOp::Move {
            node,
            parent,
            index,
        } => place(host, *parent, *node, Some(*index)),
        PatchOp::Update { node, mutations } => {
            for mutation in mutations {
                if let Err(err) = apply_mutation(host, *node, mutation) {
                    log::warn!("skipping {mutation:?} on node {node}: {err}");
                }
            }
            Ok(())
        }
        PatchOp::Remove { node, parent } => {
            if host.contains_child(*parent, *node) {
                host.remove_child(*parent, *node)
            } else {
                Ok(())
            }
        }
    }
}

fn place<H: HostTree + ?Sized>(
    host: &mut H,
    parent: NodeId,
    node: NodeId,
    index: Option<usize>,
) -> Result<(), NodeError> {
    if host.contains_child(parent, node) {
        host.remove_child(parent, node)?;
    }
    match index {
        Some(index) if index < host.child_count(parent) => host.insert_before(parent, node, index),
        _ => host.append_child(parent, node),
    }
}

fn apply_mutation<H: HostTree + ?Sized>(
    host: &mut H,
    node: NodeId,
    mutation: &Mutation,
) -> Result<(), NodeError> {
    match mutation {
        Mutation::SetText(text) => host.set_text(node, text),
        Mutation::SetAttribute { name, value } => host.set_attribute(node, name, value),
        Mutation::RemoveAttribute { name } => host.remove_attribute(node, name),
        Mutation::AddListener { event, handler } => host.add_listener(node, event, handler.clone()),
        Mutation::RemoveListener { event, handler } => host.remove_listener(node, event, handler),
        Mutation::SetCssText(css) => host.set_css_text(node, css),
        Mutation::SetStyle { name, value } => host.set_style(node, name, value),
        Mutation::RemoveStyle { name } => host.remove_style(node, name),
        Mutation::BindRef(node_ref) => {
            node_ref.set(Some(node));
            Ok(())
        }
        Mutation::UnbindRef(node_ref) => {
            if node_ref.current() == Some(node) {
                node_ref.set(None);
            }
            Ok(())
        }
    }
}
