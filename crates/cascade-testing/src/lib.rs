//! Testing utilities and harness for Cascade.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cascade_core::{
    Descriptor, MemoryHost, NodeId, PatchOp, RenderError, Renderer, Runtime, RuntimeScheduler,
};

/// Upper bound on frames [`TestHarness::pump`] processes before giving up.
pub const MAX_PUMPED_FRAMES: usize = 64;

/// Scheduler that counts frame requests instead of scheduling anything.
#[derive(Debug, Default)]
pub struct RecordingScheduler {
    requests: AtomicUsize,
}

impl RecordingScheduler {
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl RuntimeScheduler for RecordingScheduler {
    fn schedule_frame(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

/// A renderer over a [`MemoryHost`] with one container and a recording
/// scheduler.
pub struct TestHarness {
    renderer: Renderer<MemoryHost>,
    container: NodeId,
    scheduler: Arc<RecordingScheduler>,
}

impl TestHarness {
    pub fn new() -> Self {
        let scheduler = Arc::new(RecordingScheduler::default());
        let mut host = MemoryHost::new();
        let container = host.create_container();
        let renderer = Renderer::with_runtime(host, Runtime::new(scheduler.clone()));
        Self {
            renderer,
            container,
            scheduler,
        }
    }

    pub fn render(&mut self, descriptor: Descriptor) -> Result<(), RenderError> {
        self.renderer.render(descriptor, self.container)
    }

    pub fn process_frame(&mut self) -> Result<(), RenderError> {
        self.renderer.process_frame()
    }

    /// Processes frames until no update is pending. Returns how many frames
    /// did work.
    pub fn pump(&mut self) -> Result<usize, RenderError> {
        let mut frames = 0;
        while self.renderer.should_render() {
            if frames == MAX_PUMPED_FRAMES {
                log::warn!("still rendering after {MAX_PUMPED_FRAMES} frames; giving up");
                break;
            }
            self.renderer.process_frame()?;
            frames += 1;
        }
        Ok(frames)
    }

    pub fn unmount(&mut self) -> bool {
        self.renderer.unmount(self.container)
    }

    /// Frames requested from the scheduler so far.
    pub fn frame_requests(&self) -> usize {
        self.scheduler.requests()
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    /// Markup of everything rendered into the container.
    pub fn markup(&self) -> String {
        self.renderer.host().inner_markup(self.container)
    }

    pub fn dump_tree(&self) -> String {
        self.renderer.host().dump_tree(Some(self.container))
    }

    pub fn last_patch(&self) -> &[PatchOp] {
        self.renderer.last_patch()
    }

    pub fn host(&self) -> &MemoryHost {
        self.renderer.host()
    }

    pub fn renderer(&self) -> &Renderer<MemoryHost> {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer<MemoryHost> {
        &mut self.renderer
    }

    /// Node under the container whose `id` attribute equals `id`.
    pub fn find(&self, id: &str) -> Option<NodeId> {
        self.renderer
            .host()
            .find_by_attribute(self.container, "id", id)
    }

    /// Fires `event` on the node whose `id` attribute equals `id`. Returns how
    /// many listeners ran.
    pub fn dispatch(&self, id: &str, event: &str) -> usize {
        match self.find(id) {
            Some(node) => self.renderer.host().dispatch_event(node, event),
            None => {
                log::warn!("no node with id {id:?}");
                0
            }
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Routes `log` output through `env_logger`, honouring `RUST_LOG`. Safe to
/// call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
