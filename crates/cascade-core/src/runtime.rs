use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::collections::map::HashSet;
use crate::hooks::{CleanupCell, EffectFn, EffectScope};
use crate::instance::InstanceId;
use crate::platform::RuntimeScheduler;

/// Work queued during a render pass and run after its commit.
pub(crate) enum EffectJob {
    /// Runs the slot's previous cleanup, then the effect, and stores the new
    /// cleanup in the slot.
    Run {
        effect: EffectFn,
        cleanup: CleanupCell,
    },
    /// Runs the slot's cleanup of a removed instance.
    Cleanup(CleanupCell),
}

impl EffectJob {
    fn run(self) {
        match self {
            EffectJob::Run { effect, cleanup } => {
                let previous = cleanup.borrow_mut().take();
                if let Some(previous) = previous {
                    previous();
                }
                let next = effect(EffectScope).into_cleanup();
                *cleanup.borrow_mut() = next;
            }
            EffectJob::Cleanup(cleanup) => {
                let previous = cleanup.borrow_mut().take();
                if let Some(previous) = previous {
                    previous();
                }
            }
        }
    }
}

struct RuntimeInner {
    scheduler: Arc<dyn RuntimeScheduler>,
    needs_frame: Cell<bool>,
    pending: RefCell<HashSet<InstanceId>>,
    queue: RefCell<Vec<InstanceId>>, // request order
    effects: RefCell<VecDeque<EffectJob>>,
}

impl RuntimeInner {
    fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            scheduler,
            needs_frame: Cell::new(false),
            pending: RefCell::new(HashSet::default()),
            queue: RefCell::new(Vec::new()),
            effects: RefCell::new(VecDeque::new()),
        }
    }

    fn request_update(&self, instance: InstanceId) {
        if self.pending.borrow_mut().insert(instance) {
            self.queue.borrow_mut().push(instance);
        }
        if !self.needs_frame.replace(true) {
            log::trace!("scheduling frame for {instance:?}");
            self.scheduler.schedule_frame();
        }
    }

    fn take_pending_updates(&self) -> Vec<InstanceId> {
        self.pending.borrow_mut().clear();
        self.needs_frame.set(false);
        std::mem::take(&mut *self.queue.borrow_mut())
    }

    fn has_pending_updates(&self) -> bool {
        !self.queue.borrow().is_empty()
    }

    fn enqueue_effect(&self, job: EffectJob) {
        self.effects.borrow_mut().push_back(job);
    }

    fn run_effects(&self) {
        loop {
            // Borrow released before the job runs.
            let job = self.effects.borrow_mut().pop_front();
            let Some(job) = job else {
                break;
            };
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| job.run())) {
                log::error!("effect panicked: {}", panic_message(payload.as_ref()));
            }
        }
    }

    /// Drops queued effect runs. Cleanups of removed instances stay queued;
    /// those instances are gone either way.
    fn discard_effects(&self) -> usize {
        let mut effects = self.effects.borrow_mut();
        let before = effects.len();
        effects.retain(|job| matches!(job, EffectJob::Cleanup(_)));
        before - effects.len()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

/// Update queue and effect queue shared by a renderer and every setter it
/// hands out.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(scheduler)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle(Rc::downgrade(&self.inner))
    }

    /// True while at least one update waits for the next frame.
    pub fn needs_frame(&self) -> bool {
        self.inner.needs_frame.get()
    }

    pub fn has_pending_updates(&self) -> bool {
        self.inner.has_pending_updates()
    }

    /// Drains the update queue in request order, each instance at most once.
    pub(crate) fn take_pending_updates(&self) -> Vec<InstanceId> {
        self.inner.take_pending_updates()
    }

    pub(crate) fn run_effects(&self) {
        self.inner.run_effects();
    }

    pub(crate) fn discard_effects(&self) -> usize {
        self.inner.discard_effects()
    }

    pub(crate) fn enqueue_effect(&self, job: EffectJob) {
        self.inner.enqueue_effect(job);
    }
}

/// Weak reference to a [`Runtime`]. Every call is a no-op once the runtime
/// is gone.
#[derive(Clone)]
pub struct RuntimeHandle(Weak<RuntimeInner>);

impl RuntimeHandle {
    pub fn request_update(&self, instance: InstanceId) {
        if let Some(inner) = self.0.upgrade() {
            inner.request_update(instance);
        } else {
            log::debug!("update for {instance:?} dropped; runtime is gone");
        }
    }

    pub fn needs_frame(&self) -> bool {
        self.0
            .upgrade()
            .map(|inner| inner.needs_frame.get())
            .unwrap_or(false)
    }

    pub(crate) fn enqueue_effect(&self, job: EffectJob) {
        if let Some(inner) = self.0.upgrade() {
            inner.enqueue_effect(job);
        }
    }
}

#[derive(Default)]
pub struct DefaultScheduler;

impl RuntimeScheduler for DefaultScheduler {
    fn schedule_frame(&self) {}
}

#[cfg(test)]
#[derive(Default)]
pub struct TestScheduler {
    frames: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl TestScheduler {
    pub fn frames(&self) -> usize {
        self.frames.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl RuntimeScheduler for TestScheduler {
    fn schedule_frame(&self) {
        self.frames
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
