//! Diffing of descriptors against the live instance tree.
//!
//! A [`Reconciler`] walks the instance tree depth first and records every host
//! change as a [`PatchOp`]. Nodes created during the walk stay detached until
//! the ops are dispatched, so a pass that fails leaves the visible tree as it
//! was.

use std::mem;

use crate::collections::map::{HashMap, HashSet};
use crate::descriptor::{Child, Component, Descriptor, ElementKind, Key, Props};
use crate::diff::diff_props;
use crate::hooks::{effect_cleanups, RenderScope};
use crate::host::{HostTree, NodeId};
use crate::instance::{Instance, InstanceId, InstanceKind, InstanceTree};
use crate::patch::{Mutation, PatchOp};
use crate::runtime::{EffectJob, RuntimeHandle};
use crate::RenderError;

pub(crate) struct Reconciler<'a, H: HostTree + ?Sized> {
    tree: &'a mut InstanceTree,
    host: &'a mut H,
    runtime: &'a RuntimeHandle,
    ops: Vec<PatchOp>,
}

impl<'a, H: HostTree + ?Sized> Reconciler<'a, H> {
    pub(crate) fn new(
        tree: &'a mut InstanceTree,
        host: &'a mut H,
        runtime: &'a RuntimeHandle,
    ) -> Self {
        Self {
            tree,
            host,
            runtime,
            ops: Vec::new(),
        }
    }

    pub(crate) fn finish(self) -> Vec<PatchOp> {
        self.ops
    }

    pub(crate) fn contains(&self, id: InstanceId) -> bool {
        self.tree.contains_key(id)
    }

    pub(crate) fn is_component(&self, id: InstanceId) -> bool {
        self.tree.get(id).is_some_and(Instance::is_component)
    }

    pub(crate) fn node_of(&self, id: InstanceId) -> Option<NodeId> {
        self.tree.get(id).and_then(|instance| instance.node)
    }

    /// Builds a fresh instance subtree for `child`.
    pub(crate) fn mount(
        &mut self,
        child: &Child,
        parent: Option<InstanceId>,
    ) -> Result<InstanceId, RenderError> {
        let descriptor = match child {
            Child::Text(text) => {
                let node = self.host.create_text(text);
                let mut instance = Instance::new(InstanceKind::Text(text.clone()), parent);
                instance.node = Some(node);
                return Ok(self.tree.insert(instance));
            }
            Child::Element(descriptor) => descriptor,
        };

        match descriptor.kind() {
            ElementKind::Host(tag) => {
                let node = self.host.create_element(tag);
                let mut instance = Instance::new(InstanceKind::Host(tag.clone()), parent);
                instance.node = Some(node);
                instance.descriptor = Some(descriptor.clone());
                let id = self.tree.insert(instance);

                let mut mutations = diff_props(&Props::default(), descriptor.props());
                if let Some(node_ref) = descriptor.node_ref() {
                    mutations.push(Mutation::BindRef(node_ref.clone()));
                }
                self.push_update(node, mutations);

                for child in descriptor.children() {
                    match self.mount(child, Some(id)) {
                        Ok(child_id) => self.tree[id].children.push(child_id),
                        Err(err) => {
                            self.forget(id);
                            return Err(err);
                        }
                    }
                }
                self.sync_host_children(id);
                Ok(id)
            }
            ElementKind::Component(component) => {
                let mut instance = Instance::new(InstanceKind::Component(*component), parent);
                instance.descriptor = Some(descriptor.clone());
                let id = self.tree.insert(instance);
                log::trace!("mounting {} as {id:?}", component.name());
                if let Err(err) = self.render_child(id, *component, descriptor) {
                    self.forget(id);
                    return Err(err);
                }
                Ok(id)
            }
        }
    }

    /// Brings instance `id` in line with `child`. Returns the id now standing
    /// in its place, which differs from `id` when the instance was replaced.
    pub(crate) fn update(
        &mut self,
        id: InstanceId,
        child: &Child,
    ) -> Result<InstanceId, RenderError> {
        let Some(instance) = self.tree.get_mut(id) else {
            return self.mount(child, None);
        };
        if !instance.matches(child) {
            return self.replace(id, child);
        }

        let descriptor = match child {
            Child::Text(text) => {
                let node = instance.node;
                if let (InstanceKind::Text(current), Some(node)) = (&mut instance.kind, node) {
                    if current != text {
                        *current = text.clone();
                        self.push_update(node, vec![Mutation::SetText(text.clone())]);
                    }
                }
                return Ok(id);
            }
            Child::Element(descriptor) => descriptor,
        };

        match descriptor.kind() {
            ElementKind::Host(_) => {
                let previous = instance.descriptor.replace(descriptor.clone());
                let Some(node) = instance.node else {
                    return Ok(id);
                };
                let mut mutations = Vec::new();
                let old_ref = previous.as_ref().and_then(Descriptor::node_ref);
                let new_ref = descriptor.node_ref();
                if old_ref != new_ref {
                    if let Some(old_ref) = old_ref {
                        mutations.push(Mutation::UnbindRef(old_ref.clone()));
                    }
                    if let Some(new_ref) = new_ref {
                        mutations.push(Mutation::BindRef(new_ref.clone()));
                    }
                }
                match &previous {
                    Some(previous) => {
                        mutations.extend(diff_props(previous.props(), descriptor.props()))
                    }
                    None => mutations.extend(diff_props(&Props::default(), descriptor.props())),
                }
                self.push_update(node, mutations);
                self.reconcile_children(id, descriptor.children())?;
                Ok(id)
            }
            ElementKind::Component(component) => {
                instance.descriptor = Some(descriptor.clone());
                self.render_child(id, *component, descriptor)?;
                Ok(id)
            }
        }
    }

    /// Re-renders component `id` against its last descriptor.
    pub(crate) fn rerender(&mut self, id: InstanceId) -> Result<(), RenderError> {
        let Some(instance) = self.tree.get(id) else {
            return Ok(());
        };
        let (InstanceKind::Component(component), Some(descriptor)) =
            (&instance.kind, instance.descriptor.clone())
        else {
            return Ok(());
        };
        let component = *component;
        log::trace!("re-rendering {} ({id:?})", component.name());
        self.render_child(id, component, &descriptor)
    }

    /// Propagates a changed node of `id` up through component ancestors and
    /// re-syncs the nearest host ancestor. Returns the root instance when no
    /// host ancestor exists.
    pub(crate) fn settle_ancestors(&mut self, id: InstanceId) -> Option<InstanceId> {
        let mut current = id;
        loop {
            let Some(parent) = self.tree.get(current).and_then(|instance| instance.parent) else {
                return Some(current);
            };
            let node = self.node_of(current);
            let parent_instance = self.tree.get_mut(parent)?;
            if !parent_instance.is_component() {
                self.sync_host_children(parent);
                return None;
            }
            parent_instance.node = node;
            current = parent;
        }
    }

    /// Removes the instance subtree rooted at `id`. Effect cleanups are
    /// queued, not run; bound refs are cleared at commit.
    pub(crate) fn remove(&mut self, id: InstanceId) {
        let Some(instance) = self.tree.remove(id) else {
            return;
        };
        for cleanup in effect_cleanups(&instance.hooks) {
            self.runtime
                .enqueue_effect(EffectJob::Cleanup(cleanup.clone()));
        }
        if let (InstanceKind::Host(_), Some(node)) = (&instance.kind, instance.node) {
            if let Some(node_ref) = instance.descriptor.as_ref().and_then(Descriptor::node_ref) {
                self.push_update(node, vec![Mutation::UnbindRef(node_ref.clone())]);
            }
        }
        for child in instance.children {
            self.remove(child);
        }
    }

    /// Emits the ops that turn `previous` into `desired` under `parent`:
    /// removals first, then moves and creates in target order. Linear in the
    /// number of children.
    pub(crate) fn sync_children(
        &mut self,
        parent: NodeId,
        previous: &[NodeId],
        desired: &[NodeId],
    ) {
        let wanted: HashSet<NodeId> = desired.iter().copied().collect();
        let mut kept: Vec<NodeId> = Vec::with_capacity(desired.len());
        for &node in previous {
            if wanted.contains(&node) {
                kept.push(node);
            } else {
                self.ops.push(PatchOp::Remove { node, parent });
            }
        }

        // After `index` steps the host holds `desired[..index]` followed by
        // the kept nodes from `cursor` on that have not been moved yet.
        let reused: HashSet<NodeId> = kept.iter().copied().collect();
        let mut moved: HashSet<NodeId> = HashSet::default();
        let mut cursor = 0;
        let mut tail = kept.len();
        for (index, &node) in desired.iter().enumerate() {
            while cursor < kept.len() && moved.contains(&kept[cursor]) {
                cursor += 1;
            }
            if kept.get(cursor) == Some(&node) {
                cursor += 1;
                tail -= 1;
            } else if reused.contains(&node) {
                moved.insert(node);
                tail -= 1;
                self.ops.push(PatchOp::Move {
                    node,
                    parent,
                    index,
                });
            } else {
                self.ops.push(PatchOp::Create {
                    node,
                    parent,
                    index: (tail > 0).then_some(index),
                });
            }
        }
    }

    fn replace(&mut self, id: InstanceId, child: &Child) -> Result<InstanceId, RenderError> {
        let parent = self.tree.get(id).and_then(|instance| instance.parent);
        log::trace!("replacing {id:?}");
        self.remove(id);
        self.mount(child, parent)
    }

    /// Keyed matching first, then positional matching against unkeyed old
    /// children. Unclaimed old children are removed.
    fn reconcile_children(
        &mut self,
        id: InstanceId,
        children: &[Child],
    ) -> Result<(), RenderError> {
        let old_children = mem::take(&mut self.tree[id].children);
        let mut keyed: HashMap<Key, InstanceId> = HashMap::default();
        let mut old_keys: Vec<Option<Key>> = Vec::with_capacity(old_children.len());
        for &old in &old_children {
            let key = self.tree.get(old).and_then(|instance| instance.key().cloned());
            if let Some(key) = &key {
                keyed.entry(key.clone()).or_insert(old);
            }
            old_keys.push(key);
        }

        let mut retained: HashSet<InstanceId> = HashSet::default();
        let mut next_children = Vec::with_capacity(children.len());
        for (index, child) in children.iter().enumerate() {
            let claimed = child
                .key()
                .and_then(|key| keyed.remove(key))
                .or_else(|| match (old_children.get(index), old_keys.get(index)) {
                    (Some(&old), Some(None)) if !retained.contains(&old) => Some(old),
                    _ => None,
                });

            let result = match claimed {
                Some(old) => {
                    retained.insert(old);
                    self.update(old, child)
                }
                None => self.mount(child, Some(id)),
            };
            match result {
                Ok(child_id) => next_children.push(child_id),
                Err(err) => {
                    // Keep every live child reachable so a later teardown
                    // still finds it.
                    for old in old_children {
                        if self.tree.contains_key(old) && !next_children.contains(&old) {
                            next_children.push(old);
                        }
                    }
                    self.tree[id].children = next_children;
                    return Err(err);
                }
            }
        }

        for old in old_children {
            if !retained.contains(&old) {
                self.remove(old);
            }
        }
        self.tree[id].children = next_children;
        self.sync_host_children(id);
        Ok(())
    }

    fn sync_host_children(&mut self, id: InstanceId) {
        let Some(instance) = self.tree.get_mut(id) else {
            return;
        };
        let Some(parent) = instance.node else {
            return;
        };
        let previous = mem::take(&mut instance.attached);
        let children = instance.children.clone();
        let desired: Vec<NodeId> = children
            .iter()
            .filter_map(|&child| self.node_of(child))
            .collect();
        self.sync_children(parent, &previous, &desired);
        self.tree[id].attached = desired;
    }

    /// Renders component `id` and diffs the result against its single child.
    fn render_child(
        &mut self,
        id: InstanceId,
        component: Component,
        descriptor: &Descriptor,
    ) -> Result<(), RenderError> {
        let mut hooks = mem::take(&mut self.tree[id].hooks);
        let rendered = {
            let mut scope = RenderScope::new(id, component.name(), &mut hooks, self.runtime);
            component.render(&mut scope, descriptor.props())
        };
        self.tree[id].hooks = hooks;
        let child = Child::Element(rendered?);

        let child_id = match self.tree[id].children.first().copied() {
            Some(existing) => self.update(existing, &child)?,
            None => self.mount(&child, Some(id))?,
        };
        let node = self.node_of(child_id);
        let instance = &mut self.tree[id];
        instance.children = vec![child_id];
        instance.node = node;
        Ok(())
    }

    /// Drops a partially mounted subtree without queueing cleanups.
    fn forget(&mut self, id: InstanceId) {
        if let Some(instance) = self.tree.remove(id) {
            for child in instance.children {
                self.forget(child);
            }
        }
    }

    fn push_update(&mut self, node: NodeId, mutations: Vec<Mutation>) {
        if !mutations.is_empty() {
            self.ops.push(PatchOp::Update { node, mutations });
        }
    }
}
