//! Host event sources
//!
//! The tracker never talks to a window directly. Everything it needs from the
//! surrounding event loop is expressed by the [`Host`] trait, and every
//! registration hands back an id that cancels it. Teardown is therefore
//! symmetric: whatever was registered can be unregistered, and a cancelled
//! registration never fires.
//!
//! Hosts are single-threaded. Callbacks are run from the host's event loop
//! with no host-internal borrow held, so a callback may freely register or
//! cancel other work on the same host.

use std::time::Duration;

use slotmap::new_key_type;

use crate::geometry::{Bounds, Viewport};
use crate::intersection::{IntersectionEntry, IntersectionOptions};

new_key_type! {
    /// Handle to a pending timeout
    pub struct TimerId;
    /// Handle to a pending animation frame request
    pub struct FrameId;
    /// Handle to a registered scroll listener
    pub struct ListenerId;
    /// Handle to a registered intersection observer
    pub struct ObserverId;
}

/// One-shot unit of work scheduled on the host
pub type Task = Box<dyn FnOnce()>;

/// Callback receiving one batch of intersection entries
pub type IntersectionCallback = Box<dyn Fn(&[IntersectionEntry])>;

/// The event loop and document a tracker is mounted into
pub trait Host {
    /// Current time on the host clock
    fn now(&self) -> Duration;

    /// Current size of the visible area
    fn viewport(&self) -> Viewport;

    /// Look up the element carrying `id` and return its viewport-relative
    /// bounding box, or `None` if it isn't mounted
    fn find_region(&self, id: &str) -> Option<Bounds>;

    /// Run `task` once after `delay`
    fn set_timeout(&self, delay: Duration, task: Task) -> TimerId;

    /// Cancel a pending timeout (no-op if it already ran)
    fn clear_timeout(&self, id: TimerId);

    /// Run `task` before the next rendered frame
    fn request_frame(&self, task: Task) -> FrameId;

    /// Cancel a pending frame request (no-op if it already ran)
    fn cancel_frame(&self, id: FrameId);

    /// Call `listener` on every scroll of the page
    fn add_scroll_listener(&self, listener: Box<dyn Fn()>) -> ListenerId;

    fn remove_scroll_listener(&self, id: ListenerId);

    /// Observe `targets` (element ids) for viewport intersection
    ///
    /// Batches are delivered from the host's rendering step, and the first
    /// batch after registration reports every mounted target.
    fn observe_intersections(
        &self,
        options: IntersectionOptions,
        targets: Vec<String>,
        callback: IntersectionCallback,
    ) -> ObserverId;

    /// Stop observing; no batch is delivered afterwards
    fn disconnect_observer(&self, id: ObserverId);
}
