//! Per-instance hook storage and the API components use during render.
//!
//! Every component instance owns an ordered list of [`HookSlot`]s. A render
//! walks that list with a cursor: the n-th hook call on every render must be
//! of the same kind and value type as on the first render, otherwise the
//! render fails with [`RenderError::HookMismatch`].

use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::host::NodeId;
use crate::instance::InstanceId;
use crate::runtime::{EffectJob, RuntimeHandle};
use crate::RenderError;

pub(crate) type Cleanup = Box<dyn FnOnce()>;
pub(crate) type CleanupCell = Rc<RefCell<Option<Cleanup>>>;
pub(crate) type EffectFn = Box<dyn FnOnce(EffectScope) -> EffectResult>;

pub(crate) enum HookSlot {
    State(Box<dyn Any>),
    Effect(EffectSlot),
    Ref(Box<dyn Any>),
}

#[derive(Default)]
pub(crate) struct EffectSlot {
    deps: Option<Box<dyn Any>>,
    pub(crate) cleanup: CleanupCell,
}

/// Handle passed to an effect body.
#[derive(Clone, Copy, Debug, Default)]
pub struct EffectScope;

impl EffectScope {
    /// Registers the cleanup run before the effect runs again and when its
    /// instance is removed.
    pub fn on_cleanup(&self, cleanup: impl FnOnce() + 'static) -> EffectResult {
        EffectResult::new(cleanup)
    }
}

#[derive(Default)]
pub struct EffectResult {
    cleanup: Option<Cleanup>,
}

impl EffectResult {
    pub fn new(cleanup: impl FnOnce() + 'static) -> Self {
        Self {
            cleanup: Some(Box::new(cleanup)),
        }
    }

    pub fn none() -> Self {
        Self { cleanup: None }
    }

    pub(crate) fn into_cleanup(self) -> Option<Cleanup> {
        self.cleanup
    }
}

/// Writes a state slot and schedules its instance for re-render.
pub struct StateSetter<T> {
    value: Rc<RefCell<T>>,
    instance: InstanceId,
    runtime: RuntimeHandle,
}

impl<T: PartialEq + 'static> StateSetter<T> {
    /// Stores `value`. Equal values are ignored and schedule nothing.
    pub fn set(&self, value: T) {
        {
            let mut current = self.value.borrow_mut();
            if *current == value {
                log::trace!("state of {:?} unchanged; skipping update", self.instance);
                return;
            }
            *current = value;
        }
        self.runtime.request_update(self.instance);
    }

    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.value.borrow());
        self.set(next);
    }
}

impl<T: Clone> StateSetter<T> {
    /// Latest stored value, including writes made since the last render.
    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            value: Rc::clone(&self.value),
            instance: self.instance,
            runtime: self.runtime.clone(),
        }
    }
}

impl<T> PartialEq for StateSetter<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.value, &other.value)
    }
}

impl<T> fmt::Debug for StateSetter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSetter")
            .field("instance", &self.instance)
            .finish()
    }
}

/// Mutable cell that survives re-renders. Writing it never schedules a render.
pub struct MutableRef<T>(Rc<RefCell<T>>);

/// Ref the renderer points at a host node.
pub type NodeRef = MutableRef<Option<NodeId>>;

impl<T> MutableRef<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    pub fn set(&self, value: T) {
        *self.0.borrow_mut() = value;
    }

    pub fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.0.borrow_mut()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.0.borrow())
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: Clone> MutableRef<T> {
    pub fn current(&self) -> T {
        self.0.borrow().clone()
    }
}

impl<T> Clone for MutableRef<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: Default> Default for MutableRef<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> PartialEq for MutableRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T: fmt::Debug> fmt::Debug for MutableRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(value) => f.debug_tuple("MutableRef").field(&*value).finish(),
            Err(_) => f.write_str("MutableRef(<borrowed>)"),
        }
    }
}

/// Hook context for one component render.
pub struct RenderScope<'a> {
    instance: InstanceId,
    component: &'static str,
    slots: &'a mut Vec<HookSlot>,
    cursor: usize,
    runtime: &'a RuntimeHandle,
}

impl<'a> RenderScope<'a> {
    pub(crate) fn new(
        instance: InstanceId,
        component: &'static str,
        slots: &'a mut Vec<HookSlot>,
        runtime: &'a RuntimeHandle,
    ) -> Self {
        Self {
            instance,
            component,
            slots,
            cursor: 0,
            runtime,
        }
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    pub fn component_name(&self) -> &'static str {
        self.component
    }

    /// Local state. `init` runs on the first render only; later renders see
    /// the last value passed to the setter.
    pub fn use_state<T>(
        &mut self,
        init: impl FnOnce() -> T,
    ) -> Result<(T, StateSetter<T>), RenderError>
    where
        T: Clone + PartialEq + 'static,
    {
        let index = self.advance();
        if index == self.slots.len() {
            let setter = StateSetter {
                value: Rc::new(RefCell::new(init())),
                instance: self.instance,
                runtime: self.runtime.clone(),
            };
            self.slots.push(HookSlot::State(Box::new(setter)));
        }
        match &self.slots[index] {
            HookSlot::State(state) => state
                .downcast_ref::<StateSetter<T>>()
                .map(|setter| (setter.get(), setter.clone()))
                .ok_or_else(|| mismatch(self.component, index, "state")),
            _ => Err(mismatch(self.component, index, "state")),
        }
    }

    /// Effect that runs after every commit of this instance.
    pub fn use_effect<F>(&mut self, effect: F) -> Result<(), RenderError>
    where
        F: FnOnce(EffectScope) -> EffectResult + 'static,
    {
        self.register_effect::<(), F>(None, effect)
    }

    /// Effect that runs after the first commit and after every commit whose
    /// `deps` differ from the previous ones. Pass `()` to run once.
    pub fn use_effect_with<D, F>(&mut self, deps: D, effect: F) -> Result<(), RenderError>
    where
        D: PartialEq + 'static,
        F: FnOnce(EffectScope) -> EffectResult + 'static,
    {
        self.register_effect(Some(deps), effect)
    }

    /// Persistent mutable cell. `init` runs on the first render only.
    pub fn use_ref<T: 'static>(
        &mut self,
        init: impl FnOnce() -> T,
    ) -> Result<MutableRef<T>, RenderError> {
        let index = self.advance();
        if index == self.slots.len() {
            self.slots
                .push(HookSlot::Ref(Box::new(MutableRef::new(init()))));
        }
        match &self.slots[index] {
            HookSlot::Ref(cell) => cell
                .downcast_ref::<MutableRef<T>>()
                .cloned()
                .ok_or_else(|| mismatch(self.component, index, "ref")),
            _ => Err(mismatch(self.component, index, "ref")),
        }
    }

    /// Ref meant for the `ref` prop of a host element.
    pub fn use_node_ref(&mut self) -> Result<NodeRef, RenderError> {
        self.use_ref(|| None)
    }

    fn register_effect<D, F>(&mut self, deps: Option<D>, effect: F) -> Result<(), RenderError>
    where
        D: PartialEq + 'static,
        F: FnOnce(EffectScope) -> EffectResult + 'static,
    {
        let component = self.component;
        let index = self.advance();
        if index == self.slots.len() {
            self.slots.push(HookSlot::Effect(EffectSlot::default()));
        }
        let HookSlot::Effect(slot) = &mut self.slots[index] else {
            return Err(mismatch(component, index, "effect"));
        };
        if !deps_changed(slot.deps.as_deref(), deps.as_ref()) {
            return Ok(());
        }
        slot.deps = deps.map(|deps| Box::new(deps) as Box<dyn Any>);
        self.runtime.enqueue_effect(EffectJob::Run {
            effect: Box::new(effect),
            cleanup: Rc::clone(&slot.cleanup),
        });
        Ok(())
    }

    fn advance(&mut self) -> usize {
        let index = self.cursor;
        self.cursor += 1;
        index
    }
}

/// No deps always counts as changed, as does a first run or a deps value of
/// another type.
fn deps_changed<D: PartialEq + 'static>(previous: Option<&dyn Any>, next: Option<&D>) -> bool {
    match (previous, next) {
        (Some(previous), Some(next)) => previous.downcast_ref::<D>() != Some(next),
        _ => true,
    }
}

fn mismatch(component: &'static str, index: usize, expected: &'static str) -> RenderError {
    RenderError::HookMismatch {
        component,
        index,
        expected,
    }
}

/// Cleanup cells of every effect slot, in hook order.
pub(crate) fn effect_cleanups(slots: &[HookSlot]) -> impl Iterator<Item = &CleanupCell> {
    slots.iter().filter_map(|slot| match slot {
        HookSlot::Effect(effect) => Some(&effect.cleanup),
        _ => None,
    })
}
