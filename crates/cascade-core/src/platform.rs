//! Platform abstraction for frame scheduling.
//!
//! The renderer never waits for a frame itself. It asks the host to schedule
//! one through [`RuntimeScheduler`], and the host later calls
//! [`Renderer::process_frame`](crate::Renderer::process_frame) from its frame
//! callback.

/// Schedules frames for the runtime.
///
/// Called at most once per batch of updates: further requests made before the
/// frame is processed are coalesced. Implementations must be safe to share
/// across threads.
pub trait RuntimeScheduler: Send + Sync {
    /// Request that the host schedule a new frame.
    fn schedule_frame(&self);
}
