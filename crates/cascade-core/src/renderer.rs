use std::sync::Arc;

use crate::collections::map::HashMap;
use crate::descriptor::{Child, Descriptor};
use crate::host::{HostTree, NodeId};
use crate::instance::{root_of, Instance, InstanceId, InstanceTree};
use crate::patch::{self, PatchOp};
use crate::reconcile::Reconciler;
use crate::runtime::{DefaultScheduler, Runtime, RuntimeHandle};
use crate::RenderError;

#[derive(Default)]
struct RootEntry {
    instance: Option<InstanceId>,
    /// Container children as of the last commit.
    attached: Vec<NodeId>,
    /// Set after a failed pass; the next `render` remounts from scratch.
    stale: bool,
}

/// Owns the instance tree for every container rendered into `host`.
pub struct Renderer<H: HostTree> {
    host: H,
    tree: InstanceTree,
    roots: HashMap<NodeId, RootEntry>,
    runtime: Runtime,
    last_patch: Vec<PatchOp>,
}

impl<H: HostTree> Renderer<H> {
    pub fn new(host: H) -> Self {
        Self::with_runtime(host, Runtime::new(Arc::new(DefaultScheduler)))
    }

    pub fn with_runtime(host: H, runtime: Runtime) -> Self {
        Self {
            host,
            tree: InstanceTree::with_key(),
            roots: HashMap::default(),
            runtime,
            last_patch: Vec::new(),
        }
    }

    /// Mounts `descriptor` into `container`, or diffs it against what was
    /// rendered there before. Queued effects run after the commit.
    pub fn render(
        &mut self,
        descriptor: Descriptor,
        container: NodeId,
    ) -> Result<(), RenderError> {
        let handle = self.runtime.handle();
        let mut entry = self.roots.remove(&container).unwrap_or_default();
        let child = Child::Element(descriptor);

        let mut reconciler = Reconciler::new(&mut self.tree, &mut self.host, &handle);
        if entry.stale {
            if let Some(previous) = entry.instance.take() {
                log::debug!("remounting container {container} after a failed pass");
                reconciler.remove(previous);
            }
        }
        let result = match entry.instance.filter(|&root| reconciler.contains(root)) {
            Some(root) => reconciler.update(root, &child),
            None => reconciler.mount(&child, None),
        };

        match result {
            Ok(root) => {
                let desired: Vec<NodeId> = reconciler.node_of(root).into_iter().collect();
                reconciler.sync_children(container, &entry.attached, &desired);
                let ops = reconciler.finish();
                entry.instance = Some(root);
                entry.attached = desired;
                entry.stale = false;
                self.roots.insert(container, entry);
                self.commit(ops);
                Ok(())
            }
            Err(err) => {
                entry.stale = true;
                self.roots.insert(container, entry);
                self.abort(&err);
                Err(err)
            }
        }
    }

    /// Re-renders every instance that requested an update since the last
    /// frame, in request order.
    ///
    /// Updates are grouped by root and each root commits on its own, so a
    /// component failing under one container leaves the others untouched. The
    /// failing root is marked stale and the first error is returned once every
    /// other root has been processed.
    pub fn process_frame(&mut self) -> Result<(), RenderError> {
        let pending = self.runtime.take_pending_updates();
        if pending.is_empty() {
            return Ok(());
        }

        let mut batches: Vec<(InstanceId, Vec<InstanceId>)> = Vec::new();
        for id in pending {
            if !self.tree.get(id).is_some_and(Instance::is_component) {
                log::trace!("dropping update for removed instance {id:?}");
                continue;
            }
            let root = root_of(&self.tree, id);
            match batches.iter_mut().find(|(batch_root, _)| *batch_root == root) {
                Some((_, ids)) => ids.push(id),
                None => batches.push((root, vec![id])),
            }
        }

        let mut frame_ops = Vec::new();
        let mut failure = None;
        for (root, ids) in batches {
            let container = self
                .roots
                .iter()
                .find(|(_, entry)| entry.instance == Some(root))
                .map(|(&container, _)| container);
            let Some(container) = container else {
                log::trace!("dropping updates under detached root {root:?}");
                continue;
            };
            match self.process_root(container, root, &ids) {
                Ok(ops) => frame_ops.extend(ops),
                Err(err) => {
                    failure.get_or_insert(err);
                }
            }
        }

        self.last_patch = frame_ops;
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Re-renders `ids`, all living under `root`, and commits the result into
    /// `container`. Returns the dispatched ops.
    fn process_root(
        &mut self,
        container: NodeId,
        root: InstanceId,
        ids: &[InstanceId],
    ) -> Result<Vec<PatchOp>, RenderError> {
        let Some(mut entry) = self.roots.remove(&container) else {
            return Ok(Vec::new());
        };
        if entry.stale {
            log::trace!("skipping updates under stale container {container}");
            self.roots.insert(container, entry);
            return Ok(Vec::new());
        }

        let handle = self.runtime.handle();
        let mut reconciler = Reconciler::new(&mut self.tree, &mut self.host, &handle);
        let mut root_changed = false;
        for &id in ids {
            // An earlier update in this batch may have removed it.
            if !reconciler.is_component(id) {
                continue;
            }
            if let Err(err) = reconciler.rerender(id) {
                entry.stale = true;
                self.roots.insert(container, entry);
                self.abort(&err);
                return Err(err);
            }
            root_changed |= reconciler.settle_ancestors(id).is_some();
        }

        if root_changed {
            let desired: Vec<NodeId> = reconciler.node_of(root).into_iter().collect();
            reconciler.sync_children(container, &entry.attached, &desired);
            entry.attached = desired;
        }
        let ops = reconciler.finish();
        self.roots.insert(container, entry);
        self.apply(&ops);
        Ok(ops)
    }

    /// Removes whatever was rendered into `container`. Cleanups of every
    /// removed effect run before this returns.
    pub fn unmount(&mut self, container: NodeId) -> bool {
        let Some(entry) = self.roots.remove(&container) else {
            return false;
        };
        let handle = self.runtime.handle();
        let mut reconciler = Reconciler::new(&mut self.tree, &mut self.host, &handle);
        if let Some(root) = entry.instance {
            reconciler.remove(root);
        }
        reconciler.sync_children(container, &entry.attached, &[]);
        let ops = reconciler.finish();
        self.commit(ops);
        true
    }

    pub fn should_render(&self) -> bool {
        self.runtime.needs_frame() || self.runtime.has_pending_updates()
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Ops dispatched by the most recent commit.
    pub fn last_patch(&self) -> &[PatchOp] {
        &self.last_patch
    }

    pub fn root(&self, container: NodeId) -> Option<InstanceId> {
        self.roots.get(&container).and_then(|entry| entry.instance)
    }

    pub fn instance_node(&self, id: InstanceId) -> Option<NodeId> {
        self.tree.get(id).and_then(|instance| instance.node)
    }

    pub fn instance_children(&self, id: InstanceId) -> &[InstanceId] {
        self.tree
            .get(id)
            .map_or(&[], |instance| instance.children.as_slice())
    }

    pub fn contains_instance(&self, id: InstanceId) -> bool {
        self.tree.contains_key(id)
    }

    pub fn instance_count(&self) -> usize {
        self.tree.len()
    }

    fn commit(&mut self, ops: Vec<PatchOp>) {
        self.apply(&ops);
        self.last_patch = ops;
    }

    fn apply(&mut self, ops: &[PatchOp]) {
        log::trace!("committing {} ops", ops.len());
        patch::dispatch(&mut self.host, ops);
        self.runtime.run_effects();
    }

    fn abort(&mut self, err: &RenderError) {
        let discarded = self.runtime.discard_effects();
        log::error!("render pass failed: {err}; discarded {discarded} queued effects");
        self.last_patch.clear();
        // Cleanups of instances removed during the pass still run.
        self.runtime.run_effects();
    }
}
