//! Standard frame scheduling backed by Rust's `std` library.
//!
//! Hosts that drive their own event loop construct a [`StdRuntime`], pass
//! [`StdRuntime::runtime`] to [`cascade_core::Renderer::with_runtime`] and call
//! `process_frame` whenever [`StdRuntime::take_frame_request`] reports a
//! pending frame, or from the registered frame waker.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use cascade_core::{Runtime, RuntimeHandle, RuntimeScheduler};

type FrameWaker = Arc<dyn Fn() + Send + Sync + 'static>;

/// Scheduler that records frame requests in an atomic flag.
pub struct StdScheduler {
    frame_requested: AtomicBool,
    frame_waker: RwLock<Option<FrameWaker>>,
}

impl StdScheduler {
    pub fn new() -> Self {
        Self {
            frame_requested: AtomicBool::new(false),
            frame_waker: RwLock::new(None),
        }
    }

    /// Returns whether a frame has been requested since the last call.
    pub fn take_frame_request(&self) -> bool {
        self.frame_requested.swap(false, Ordering::SeqCst)
    }

    /// Registers a waker that will be invoked whenever a new frame is scheduled.
    pub fn set_frame_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        *self
            .frame_waker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(waker));
    }

    /// Clears any registered frame waker.
    pub fn clear_frame_waker(&self) {
        *self
            .frame_waker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn wake(&self) {
        let waker = self
            .frame_waker
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl Default for StdScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdScheduler")
            .field(
                "frame_requested",
                &self.frame_requested.load(Ordering::SeqCst),
            )
            .finish()
    }
}

impl RuntimeScheduler for StdScheduler {
    fn schedule_frame(&self) {
        log::trace!("frame requested");
        self.frame_requested.store(true, Ordering::SeqCst);
        self.wake();
    }
}

/// Convenience container bundling the standard scheduler with a runtime.
#[derive(Clone)]
pub struct StdRuntime {
    scheduler: Arc<StdScheduler>,
    runtime: Runtime,
}

impl StdRuntime {
    pub fn new() -> Self {
        let scheduler = Arc::new(StdScheduler::default());
        let runtime = Runtime::new(scheduler.clone());
        Self { scheduler, runtime }
    }

    /// Returns a [`cascade_core::Runtime`] configured with the standard scheduler.
    pub fn runtime(&self) -> Runtime {
        self.runtime.clone()
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn scheduler(&self) -> Arc<StdScheduler> {
        Arc::clone(&self.scheduler)
    }

    /// Returns whether a frame was requested since the last poll.
    pub fn take_frame_request(&self) -> bool {
        self.scheduler.take_frame_request()
    }

    /// Registers a waker to be called when the runtime schedules a new frame.
    pub fn set_frame_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        self.scheduler.set_frame_waker(waker);
    }

    pub fn clear_frame_waker(&self) {
        self.scheduler.clear_frame_waker();
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

impl Default for StdRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use cascade_core::{
        element, Component, Descriptor, MemoryHost, Props, RenderError, RenderScope, Renderer,
        StateSetter,
    };

    use super::StdRuntime;

    #[derive(Default)]
    struct Probe {
        renders: Cell<u32>,
        setter: RefCell<Option<StateSetter<i32>>>,
    }

    fn counter(scope: &mut RenderScope<'_>, props: &Props) -> Result<Descriptor, RenderError> {
        let (count, set_count) = scope.use_state(|| 0)?;
        if let Some(probe) = props.object_ref::<Probe>("probe") {
            probe.renders.set(probe.renders.get() + 1);
            probe.setter.borrow_mut().replace(set_count);
        }
        Ok(element!("span", Props::new(), count))
    }

    const COUNTER: Component = Component::new("Counter", counter);

    #[test]
    fn std_runtime_requests_frame_and_rerenders_on_state_change() {
        let runtime = StdRuntime::new();
        let mut host = MemoryHost::new();
        let container = host.create_container();
        let mut renderer = Renderer::with_runtime(host, runtime.runtime());

        let probe = Rc::new(Probe::default());
        renderer
            .render(
                element!(COUNTER, Props::new().object("probe", probe.clone())),
                container,
            )
            .expect("initial render");
        assert_eq!(probe.renders.get(), 1);
        assert!(!runtime.take_frame_request());

        let setter = probe.setter.borrow().clone().expect("setter captured");
        setter.set(1);
        setter.set(2);

        assert!(
            runtime.take_frame_request(),
            "state.set should request a frame"
        );
        assert!(!runtime.take_frame_request(), "requests are coalesced");

        renderer.process_frame().expect("process frame");
        assert_eq!(probe.renders.get(), 2, "one re-render for both writes");
        assert_eq!(
            renderer.host().inner_markup(container),
            "<span>2</span>"
        );
    }

    #[test]
    fn frame_waker_fires_once_per_pending_frame() {
        let runtime = StdRuntime::new();
        let wakes = Arc::new(AtomicUsize::new(0));
        {
            let wakes = Arc::clone(&wakes);
            runtime.set_frame_waker(move || {
                wakes.fetch_add(1, Ordering::SeqCst);
            });
        }

        let mut host = MemoryHost::new();
        let container = host.create_container();
        let mut renderer = Renderer::with_runtime(host, runtime.runtime());
        let probe = Rc::new(Probe::default());
        renderer
            .render(
                element!(COUNTER, Props::new().object("probe", probe.clone())),
                container,
            )
            .expect("initial render");

        let setter = probe.setter.borrow().clone().expect("setter captured");
        setter.set(5);
        setter.set(6);
        assert_eq!(wakes.load(Ordering::SeqCst), 1);

        renderer.process_frame().expect("process frame");
        runtime.clear_frame_waker();
        setter.set(7);
        assert_eq!(wakes.load(Ordering::SeqCst), 1);
        assert!(runtime.take_frame_request());
    }
}
