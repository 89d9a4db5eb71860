//! Deterministic in-memory host
//!
//! [`VirtualHost`] plays the role of a browser window for a single page:
//!
//! - A virtual clock that only moves when [`VirtualHost::advance`] is called
//! - A page layout of regions at absolute offsets, each optionally mounting
//!   after a delay
//! - A scroll offset, with scroll listeners dispatched synchronously
//! - A rendering step ([`VirtualHost::render_frame`]) that runs animation
//!   frame callbacks and then the intersection observation step
//!
//! Callbacks are always invoked with no internal borrow held, so they may
//! call back into the host.
//!
//! # Example
//!
//! ```rust
//! use navspy_core::{Host, PageLayout, RegionLayout, Viewport, VirtualHost};
//!
//! let host = VirtualHost::new(PageLayout::new(
//!     Viewport::new(1280.0, 800.0),
//!     vec![RegionLayout::new("about", 0.0, 1000.0)],
//! ));
//!
//! host.scroll_to(200.0);
//! assert_eq!(host.find_region("about").map(|b| b.top()), Some(-200.0));
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::geometry::{Bounds, Viewport};
use crate::host::{
    FrameId, Host, IntersectionCallback, ListenerId, ObserverId, Task, TimerId,
};
use crate::intersection::{IntersectionEntry, IntersectionOptions, IntersectionTracker};

/// Placement of one region on the page
#[derive(Clone, Debug, PartialEq)]
pub struct RegionLayout {
    pub id: String,
    /// Absolute offset from the top of the document
    pub top: f32,
    pub height: f32,
    /// Host time at which the element appears (`None` = already mounted)
    pub mount_at: Option<Duration>,
}

impl RegionLayout {
    pub fn new(id: impl Into<String>, top: f32, height: f32) -> Self {
        Self {
            id: id.into(),
            top,
            height,
            mount_at: None,
        }
    }

    /// Mount this region only once the clock reaches `at`
    pub fn mounted_at(mut self, at: Duration) -> Self {
        self.mount_at = Some(at);
        self
    }

    fn is_mounted(&self, now: Duration) -> bool {
        self.mount_at.map_or(true, |at| at <= now)
    }
}

/// A page: viewport, document height and region placements
#[derive(Clone, Debug, PartialEq)]
pub struct PageLayout {
    pub viewport: Viewport,
    pub document_height: f32,
    pub regions: Vec<RegionLayout>,
}

impl PageLayout {
    /// Build a layout whose document ends at the lowest region
    pub fn new(viewport: Viewport, regions: Vec<RegionLayout>) -> Self {
        let document_height = regions
            .iter()
            .map(|r| r.top + r.height)
            .fold(viewport.height, f32::max);
        Self {
            viewport,
            document_height,
            regions,
        }
    }

    pub fn with_document_height(mut self, height: f32) -> Self {
        self.document_height = height;
        self
    }

    /// Largest valid scroll offset
    pub fn max_scroll(&self) -> f32 {
        (self.document_height - self.viewport.height).max(0.0)
    }
}

/// Counters for assertions and diagnostics
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HostStats {
    pub timers_fired: u64,
    pub frames_rendered: u64,
    pub frame_callbacks_run: u64,
    pub scroll_dispatches: u64,
    pub intersection_batches: u64,
    pub pending_timers: usize,
    pub pending_frames: usize,
    pub scroll_listeners: usize,
    pub observers: usize,
}

struct PendingTimer {
    due: Duration,
    seq: u64,
    task: Task,
}

struct PendingFrame {
    seq: u64,
    task: Task,
}

struct ScrollListener {
    seq: u64,
    listener: Rc<dyn Fn()>,
}

struct ObserverEntry {
    seq: u64,
    tracker: IntersectionTracker,
    callback: Rc<dyn Fn(&[IntersectionEntry])>,
}

struct HostInner {
    layout: PageLayout,
    scroll_y: f32,
    now: Duration,
    next_seq: u64,
    timers: SlotMap<TimerId, PendingTimer>,
    frames: SlotMap<FrameId, PendingFrame>,
    listeners: SlotMap<ListenerId, ScrollListener>,
    observers: SlotMap<ObserverId, ObserverEntry>,
    stats: HostStats,
}

impl HostInner {
    fn seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn region_bounds(&self, id: &str) -> Option<Bounds> {
        region_bounds(&self.layout, self.scroll_y, self.now, id)
    }
}

/// Viewport-relative bounds of a mounted region
fn region_bounds(layout: &PageLayout, scroll_y: f32, now: Duration, id: &str) -> Option<Bounds> {
    let region = layout
        .regions
        .iter()
        .find(|r| r.id == id && r.is_mounted(now))?;
    Some(Bounds::new(
        0.0,
        region.top - scroll_y,
        layout.viewport.width,
        region.height,
    ))
}

/// Single-page host with a virtual clock
pub struct VirtualHost {
    inner: RefCell<HostInner>,
    /// Guards against nested rendering steps started from a callback
    rendering: Cell<bool>,
}

impl VirtualHost {
    pub fn new(layout: PageLayout) -> Self {
        Self {
            inner: RefCell::new(HostInner {
                layout,
                scroll_y: 0.0,
                now: Duration::ZERO,
                next_seq: 0,
                timers: SlotMap::with_key(),
                frames: SlotMap::with_key(),
                listeners: SlotMap::with_key(),
                observers: SlotMap::with_key(),
                stats: HostStats::default(),
            }),
            rendering: Cell::new(false),
        }
    }

    pub fn scroll_y(&self) -> f32 {
        self.inner.borrow().scroll_y
    }

    pub fn layout(&self) -> PageLayout {
        self.inner.borrow().layout.clone()
    }

    pub fn stats(&self) -> HostStats {
        let inner = self.inner.borrow();
        HostStats {
            pending_timers: inner.timers.len(),
            pending_frames: inner.frames.len(),
            scroll_listeners: inner.listeners.len(),
            observers: inner.observers.len(),
            ..inner.stats
        }
    }

    /// Move the page to `y` (clamped to the scrollable range) and dispatch
    /// one scroll event
    pub fn scroll_to(&self, y: f32) {
        let listeners = {
            let mut inner = self.inner.borrow_mut();
            inner.scroll_y = y.clamp(0.0, inner.layout.max_scroll());
            inner.stats.scroll_dispatches += 1;

            let mut listeners: SmallVec<[(u64, Rc<dyn Fn()>); 4]> = inner
                .listeners
                .values()
                .map(|l| (l.seq, l.listener.clone()))
                .collect();
            listeners.sort_by_key(|(seq, _)| *seq);
            listeners
        };

        for (_, listener) in listeners {
            listener();
        }
    }

    /// Scroll and then render one frame
    pub fn scroll_and_render(&self, y: f32) {
        self.scroll_to(y);
        self.render_frame();
    }

    /// Change the viewport size; observed at the next rendering step
    pub fn resize(&self, viewport: Viewport) {
        let mut inner = self.inner.borrow_mut();
        inner.layout.viewport = viewport;
        let max = inner.layout.max_scroll();
        inner.scroll_y = inner.scroll_y.min(max);
    }

    /// Add a region to the page, replacing any region with the same id
    pub fn insert_region(&self, region: RegionLayout) {
        let mut inner = self.inner.borrow_mut();
        inner.layout.regions.retain(|r| r.id != region.id);
        let bottom = region.top + region.height;
        if bottom > inner.layout.document_height {
            inner.layout.document_height = bottom;
        }
        inner.layout.regions.push(region);
    }

    /// Move the clock forward, firing every timer that comes due on the way
    ///
    /// Timers fire in due order; timers due at the same instant fire in the
    /// order they were scheduled. A timer scheduled by a firing timer runs in
    /// the same call if it comes due before the end of the window.
    pub fn advance(&self, by: Duration) {
        let target = self.inner.borrow().now + by;

        loop {
            let next = {
                let mut inner = self.inner.borrow_mut();
                let due = inner
                    .timers
                    .iter()
                    .filter(|(_, t)| t.due <= target)
                    .min_by_key(|(_, t)| (t.due, t.seq))
                    .map(|(id, t)| (id, t.due));

                match due {
                    Some((id, due)) => {
                        inner.now = inner.now.max(due);
                        inner.stats.timers_fired += 1;
                        inner.timers.remove(id).map(|t| t.task)
                    }
                    None => None,
                }
            };

            match next {
                Some(task) => task(),
                None => break,
            }
        }

        self.inner.borrow_mut().now = target;
    }

    /// Run one rendering step
    ///
    /// Animation frame callbacks requested before the step started run first,
    /// in request order; callbacks requested while they run wait for the next
    /// step. Then every observer checks its targets and receives its batch.
    pub fn render_frame(&self) {
        if self.rendering.replace(true) {
            tracing::warn!("render_frame called re-entrantly, ignoring");
            return;
        }

        let frames = {
            let mut inner = self.inner.borrow_mut();
            inner.stats.frames_rendered += 1;

            let mut ids: Vec<(u64, FrameId)> =
                inner.frames.iter().map(|(id, f)| (f.seq, id)).collect();
            ids.sort_by_key(|(seq, _)| *seq);
            ids.into_iter()
                .map(|(_, id)| id)
                .collect::<Vec<_>>()
        };

        for id in frames {
            // A callback earlier in this step may have cancelled this one
            let task = self.inner.borrow_mut().frames.remove(id).map(|f| f.task);
            if let Some(task) = task {
                self.inner.borrow_mut().stats.frame_callbacks_run += 1;
                task();
            }
        }

        self.run_intersection_step();
        self.rendering.set(false);
    }

    fn run_intersection_step(&self) {
        let batches = {
            let mut guard = self.inner.borrow_mut();
            let inner = &mut *guard;
            let viewport = inner.layout.viewport;
            let now = inner.now;

            let mut order: Vec<(u64, ObserverId)> =
                inner.observers.iter().map(|(id, o)| (o.seq, id)).collect();
            order.sort_by_key(|(seq, _)| *seq);

            let mut batches = Vec::new();
            for (_, id) in order {
                // Split the borrow: the tracker is mutated while regions are read
                let HostInner {
                    observers,
                    layout,
                    scroll_y,
                    ..
                } = &mut *inner;
                let Some(observer) = observers.get_mut(id) else {
                    continue;
                };
                let (layout, scroll_y) = (&*layout, *scroll_y);
                let lookup = |target: &str| region_bounds(layout, scroll_y, now, target);
                let entries = observer.tracker.check(viewport, now, lookup);
                if !entries.is_empty() {
                    batches.push((id, observer.callback.clone(), entries));
                }
            }
            inner.stats.intersection_batches += batches.len() as u64;
            batches
        };

        for (id, callback, entries) in batches {
            // Skip observers disconnected by an earlier callback in this step
            if !self.inner.borrow().observers.contains_key(id) {
                continue;
            }
            callback(&entries);
        }
    }
}

impl Host for VirtualHost {
    fn now(&self) -> Duration {
        self.inner.borrow().now
    }

    fn viewport(&self) -> Viewport {
        self.inner.borrow().layout.viewport
    }

    fn find_region(&self, id: &str) -> Option<Bounds> {
        self.inner.borrow().region_bounds(id)
    }

    fn set_timeout(&self, delay: Duration, task: Task) -> TimerId {
        let mut inner = self.inner.borrow_mut();
        let due = inner.now + delay;
        let seq = inner.seq();
        inner.timers.insert(PendingTimer { due, seq, task })
    }

    fn clear_timeout(&self, id: TimerId) {
        self.inner.borrow_mut().timers.remove(id);
    }

    fn request_frame(&self, task: Task) -> FrameId {
        let mut inner = self.inner.borrow_mut();
        let seq = inner.seq();
        inner.frames.insert(PendingFrame { seq, task })
    }

    fn cancel_frame(&self, id: FrameId) {
        self.inner.borrow_mut().frames.remove(id);
    }

    fn add_scroll_listener(&self, listener: Box<dyn Fn()>) -> ListenerId {
        let mut inner = self.inner.borrow_mut();
        let seq = inner.seq();
        inner.listeners.insert(ScrollListener {
            seq,
            listener: Rc::from(listener),
        })
    }

    fn remove_scroll_listener(&self, id: ListenerId) {
        self.inner.borrow_mut().listeners.remove(id);
    }

    fn observe_intersections(
        &self,
        options: IntersectionOptions,
        targets: Vec<String>,
        callback: IntersectionCallback,
    ) -> ObserverId {
        let mut inner = self.inner.borrow_mut();
        let seq = inner.seq();
        inner.observers.insert(ObserverEntry {
            seq,
            tracker: IntersectionTracker::new(options, targets),
            callback: Rc::from(callback),
        })
    }

    fn disconnect_observer(&self, id: ObserverId) {
        self.inner.borrow_mut().observers.remove(id);
    }
}
