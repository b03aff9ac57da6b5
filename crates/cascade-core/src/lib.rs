#![doc = r"Core runtime pieces for the Cascade component renderer."]

pub mod collections;
pub mod descriptor;
mod diff;
pub mod hooks;
pub mod host;
mod instance;
pub mod memory;
pub mod patch;
pub mod platform;
mod reconcile;
pub mod renderer;
pub mod runtime;

pub use descriptor::{
    build, Child, ChildInput, Component, Descriptor, ElementKind, Key, PropValue, Props, RenderFn,
    Style,
};
pub use hooks::{EffectResult, EffectScope, MutableRef, NodeRef, RenderScope, StateSetter};
pub use host::{Event, EventHandler, HostTree, NodeId};
pub use instance::InstanceId;
pub use memory::{MemoryHost, MemoryNode, MemoryNodeKind};
pub use patch::{Mutation, PatchOp};
pub use platform::RuntimeScheduler;
pub use renderer::Renderer;
pub use runtime::{DefaultScheduler, Runtime, RuntimeHandle};

#[cfg(test)]
pub use runtime::TestScheduler;

use std::fmt;

/// Failure reported by a [`HostTree`] implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    Missing { id: NodeId },
    NotAChild { parent: NodeId, child: NodeId },
    NotAnElement { id: NodeId },
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeError::Missing { id } => write!(f, "node {id} missing"),
            NodeError::NotAChild { parent, child } => {
                write!(f, "node {child} is not a child of node {parent}")
            }
            NodeError::NotAnElement { id } => write!(f, "node {id} is not an element"),
        }
    }
}

impl std::error::Error for NodeError {}

/// Failure that aborts a render pass. Nothing from the failed pass is committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// A hook call found a slot of another kind or value type at its position.
    /// Hooks must be called in the same order on every render.
    HookMismatch {
        component: &'static str,
        index: usize,
        expected: &'static str,
    },
    /// A component function gave up on rendering.
    Component {
        component: &'static str,
        message: String,
    },
}

impl RenderError {
    pub fn component(component: &'static str, message: impl Into<String>) -> Self {
        RenderError::Component {
            component,
            message: message.into(),
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::HookMismatch {
                component,
                index,
                expected,
            } => write!(
                f,
                "hook #{index} in {component} does not match its slot; expected {expected}"
            ),
            RenderError::Component { component, message } => {
                write!(f, "{component} failed to render: {message}")
            }
        }
    }
}

impl std::error::Error for RenderError {}
