//! Active-section tracker
//!
//! Wires the registry, both evaluators and the reducer to a [`Host`]:
//!
//! 1. **Resolve**: look up every section; while some are missing, retry on a
//!    host timer until the retry budget is spent
//! 2. **Set up**: observe the resolved regions for intersection, listen for
//!    scroll, and run one proximity evaluation right away
//! 3. **Track**: intersection batches feed the visibility evaluator; scroll
//!    events book at most one proximity evaluation per animation frame
//! 4. **Unmount**: cancel the retry timer and pending frame, remove the
//!    listener, disconnect the observer, close the reducer
//!
//! Host callbacks only hold weak references to the tracker, so dropping the
//! tracker is enough to silence every callback that is still registered.
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use navspy_core::{PageLayout, RegionLayout, Viewport, VirtualHost};
//! use navspy_tracker::{ActiveSectionTracker, SectionList, TrackerConfig};
//!
//! let host = Rc::new(VirtualHost::new(PageLayout::new(
//!     Viewport::new(1280.0, 800.0),
//!     vec![
//!         RegionLayout::new("about", 0.0, 1000.0),
//!         RegionLayout::new("projects", 1000.0, 1000.0),
//!     ],
//! )));
//!
//! let sections = SectionList::new(["about", "projects"]).unwrap();
//! let tracker = ActiveSectionTracker::mount(&host, sections, TrackerConfig::default()).unwrap();
//!
//! host.scroll_and_render(1050.0);
//! assert_eq!(tracker.active().as_ref().map(|s| s.as_str()), Some("projects"));
//! ```

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use navspy_core::{
    FrameId, Host, IntersectionEntry, IntersectionOptions, ListenerId, ObserverId, ReadSignal,
    Subscription, TimerId,
};

use crate::config::TrackerConfig;
use crate::error::Result;
use crate::proximity::{self, FrameGate};
use crate::reducer::{Reducer, ReducerStats};
use crate::registry::{RegionHandle, RegionRegistry, RegistryStep, Resolution};
use crate::section::{SectionId, SectionList};
use crate::visibility;

/// Lifecycle phase of a tracker
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for sections to mount
    Resolving,
    /// Observing at least one resolved section
    Tracking,
    /// Nothing resolved; the active section stays `None`
    Idle,
    /// Torn down
    Unmounted,
}

/// Counters for tests and diagnostics
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrackerStats {
    pub resolution_attempts: u32,
    /// Scroll notifications received, including the initial evaluation
    pub scroll_events: u64,
    /// Scroll notifications absorbed by a pending frame
    pub coalesced_scrolls: u64,
    pub proximity_evaluations: u64,
    pub visibility_batches: u64,
    pub reducer: ReducerStats,
}

struct TrackerState {
    phase: Phase,
    registry: RegionRegistry,
    resolution: Option<Resolution>,
    gate: FrameGate,
    retry_timer: Option<TimerId>,
    pending_frame: Option<FrameId>,
    scroll_listener: Option<ListenerId>,
    observer: Option<ObserverId>,
    stats: TrackerStats,
}

struct Shared<H: Host + ?Sized> {
    host: Weak<H>,
    config: TrackerConfig,
    options: IntersectionOptions,
    reducer: Reducer,
    state: RefCell<TrackerState>,
}

impl<H: Host + ?Sized + 'static> Shared<H> {
    fn collect(this: &Rc<Self>) {
        let Some(host) = this.host.upgrade() else {
            return;
        };

        let step = {
            let mut state = this.state.borrow_mut();
            if state.phase != Phase::Resolving {
                return;
            }
            state.retry_timer = None;
            let step = state.registry.attempt(|id| host.find_region(id));
            state.stats.resolution_attempts = state.registry.attempts();
            step
        };

        match step {
            RegistryStep::Retry { .. } => {
                let weak = Rc::downgrade(this);
                let timer = host.set_timeout(
                    this.config.retry_interval(),
                    Box::new(move || {
                        if let Some(shared) = weak.upgrade() {
                            Shared::collect(&shared);
                        }
                    }),
                );
                this.state.borrow_mut().retry_timer = Some(timer);
            }
            RegistryStep::Resolved(resolution) => Shared::setup(this, &host, resolution),
        }
    }

    fn setup(this: &Rc<Self>, host: &Rc<H>, resolution: Resolution) {
        if resolution.handles.is_empty() {
            let mut state = this.state.borrow_mut();
            state.phase = Phase::Idle;
            state.resolution = Some(resolution);
            tracing::debug!("no sections resolved, navigation stays unhighlighted");
            return;
        }

        this.reducer
            .set_resolved(resolution.handles.iter().map(RegionHandle::id));
        let targets: Vec<String> = resolution
            .handles
            .iter()
            .map(|h| h.id().as_str().to_string())
            .collect();

        let weak = Rc::downgrade(this);
        let observer = host.observe_intersections(
            this.options.clone(),
            targets,
            Box::new(move |entries: &[IntersectionEntry]| {
                if let Some(shared) = weak.upgrade() {
                    shared.on_intersections(entries);
                }
            }),
        );

        let weak = Rc::downgrade(this);
        let listener = host.add_scroll_listener(Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                Shared::on_scroll(&shared);
            }
        }));

        {
            let mut state = this.state.borrow_mut();
            state.phase = Phase::Tracking;
            state.observer = Some(observer);
            state.scroll_listener = Some(listener);
            state.resolution = Some(resolution);
        }

        // Initial synchronous evaluation request
        Shared::on_scroll(this);
    }

    fn on_scroll(this: &Rc<Self>) {
        let Some(host) = this.host.upgrade() else {
            return;
        };

        {
            let mut state = this.state.borrow_mut();
            if state.phase != Phase::Tracking {
                return;
            }
            state.stats.scroll_events += 1;
            if !state.gate.try_begin() {
                state.stats.coalesced_scrolls = state.gate.coalesced();
                return;
            }
        }

        let weak = Rc::downgrade(this);
        let frame = host.request_frame(Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.on_frame();
            }
        }));
        this.state.borrow_mut().pending_frame = Some(frame);
    }

    fn on_frame(&self) {
        let Some(host) = self.host.upgrade() else {
            return;
        };

        let proposal = {
            let mut state = self.state.borrow_mut();
            state.pending_frame = None;
            state.gate.finish();
            if state.phase != Phase::Tracking {
                return;
            }

            state.registry.refresh(|id| host.find_region(id));
            state.stats.proximity_evaluations += 1;
            let viewport = host.viewport();
            tracing::trace!(scroll_events = state.stats.scroll_events, "proximity evaluation");
            proximity::select(state.registry.handles(), viewport, &self.config)
        };

        if let Some(proposal) = proposal {
            self.reducer.accept(proposal);
        }
    }

    fn on_intersections(&self, entries: &[IntersectionEntry]) {
        let proposal = {
            let mut state = self.state.borrow_mut();
            if state.phase != Phase::Tracking {
                return;
            }
            state.stats.visibility_batches += 1;
            for entry in entries {
                state.registry.record_ratio(&entry.target, entry.ratio);
            }
            visibility::select(entries)
        };

        if let Some(proposal) = proposal {
            self.reducer.accept(proposal);
        }
    }

    fn unmount(&self) {
        let (timer, frame, listener, observer) = {
            let mut state = self.state.borrow_mut();
            if state.phase == Phase::Unmounted {
                return;
            }
            state.phase = Phase::Unmounted;
            state.gate.finish();
            (
                state.retry_timer.take(),
                state.pending_frame.take(),
                state.scroll_listener.take(),
                state.observer.take(),
            )
        };

        self.reducer.close();

        if let Some(host) = self.host.upgrade() {
            if let Some(id) = timer {
                host.clear_timeout(id);
            }
            if let Some(id) = frame {
                host.cancel_frame(id);
            }
            if let Some(id) = listener {
                host.remove_scroll_listener(id);
            }
            if let Some(id) = observer {
                host.disconnect_observer(id);
            }
        }
        tracing::debug!("tracker unmounted");
    }
}

/// Tracks which section of a page is active while it scrolls
///
/// Dropping the tracker unmounts it.
pub struct ActiveSectionTracker<H: Host + ?Sized + 'static> {
    shared: Rc<Shared<H>>,
}

impl<H: Host + ?Sized + 'static> ActiveSectionTracker<H> {
    /// Mount a tracker on `host` and start resolving `sections`
    ///
    /// Fails only if `config` is invalid. Sections that never mount are not
    /// an error.
    pub fn mount(host: &Rc<H>, sections: SectionList, config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        let options = config.intersection_options()?;

        tracing::debug!(sections = sections.len(), "mounting active-section tracker");
        let shared = Rc::new(Shared {
            host: Rc::downgrade(host),
            options,
            reducer: Reducer::new(),
            state: RefCell::new(TrackerState {
                phase: Phase::Resolving,
                registry: RegionRegistry::new(sections, config.retry_limit),
                resolution: None,
                gate: FrameGate::new(),
                retry_timer: None,
                pending_frame: None,
                scroll_listener: None,
                observer: None,
                stats: TrackerStats::default(),
            }),
            config,
        });

        Shared::collect(&shared);
        Ok(Self { shared })
    }

    /// Currently active section, `None` until the first accepted proposal
    pub fn active(&self) -> Option<SectionId> {
        self.shared.reducer.active()
    }

    /// Read handle to the active section, for rendering layers
    pub fn signal(&self) -> ReadSignal<Option<SectionId>> {
        self.shared.reducer.reader()
    }

    /// Call `callback` every time the active section changes
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Option<SectionId>) + 'static,
    {
        self.shared.reducer.reader().subscribe(callback)
    }

    pub fn phase(&self) -> Phase {
        self.shared.state.borrow().phase
    }

    pub fn is_mounted(&self) -> bool {
        self.phase() != Phase::Unmounted
    }

    /// Outcome of resolution, once it has settled
    pub fn resolution(&self) -> Option<Resolution> {
        self.shared.state.borrow().resolution.clone()
    }

    /// Resolved handles with their latest geometry
    pub fn handles(&self) -> Vec<RegionHandle> {
        self.shared.state.borrow().registry.handles().to_vec()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.shared.config
    }

    pub fn stats(&self) -> TrackerStats {
        TrackerStats {
            reducer: self.shared.reducer.stats(),
            ..self.shared.state.borrow().stats
        }
    }

    /// Tear down: no callback reaches the tracker afterwards. Idempotent.
    pub fn unmount(&self) {
        self.shared.unmount();
    }
}

impl<H: Host + ?Sized + 'static> Drop for ActiveSectionTracker<H> {
    fn drop(&mut self) {
        self.shared.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use navspy_core::{PageLayout, RegionLayout, Viewport, VirtualHost};
    use std::cell::Cell;
    use std::time::Duration;

    fn host(regions: Vec<RegionLayout>) -> Rc<VirtualHost> {
        Rc::new(VirtualHost::new(PageLayout::new(
            Viewport::new(1000.0, 800.0),
            regions,
        )))
    }

    fn mount(host: &Rc<VirtualHost>, ids: &[&str]) -> ActiveSectionTracker<VirtualHost> {
        let sections = SectionList::new(ids.iter().copied()).unwrap();
        ActiveSectionTracker::mount(host, sections, TrackerConfig::default()).unwrap()
    }

    #[test]
    fn test_mount_resolves_and_tracks() {
        let host = host(vec![
            RegionLayout::new("about", 0.0, 1000.0),
            RegionLayout::new("projects", 1000.0, 1000.0),
        ]);
        let tracker = mount(&host, &["about", "projects"]);

        assert_eq!(tracker.phase(), Phase::Tracking);
        assert_eq!(tracker.active(), None);
        assert_eq!(host.stats().pending_frames, 1);

        host.render_frame();
        assert_eq!(tracker.active(), Some(SectionId::from("about")));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let host = host(vec![]);
        let config = TrackerConfig {
            thresholds: vec![2.0],
            ..Default::default()
        };
        let sections = SectionList::new(["about"]).unwrap();
        assert!(ActiveSectionTracker::mount(&host, sections, config).is_err());
    }

    #[test]
    fn test_late_mount_is_picked_up_by_retry() {
        let host = host(vec![
            RegionLayout::new("about", 0.0, 1000.0),
            RegionLayout::new("projects", 1000.0, 1000.0).mounted_at(Duration::from_millis(400)),
        ]);
        let tracker = mount(&host, &["about", "projects"]);
        assert_eq!(tracker.phase(), Phase::Resolving);

        host.advance(Duration::from_millis(450));
        assert_eq!(tracker.phase(), Phase::Tracking);
        // Lookups at 0, 150, 300, 450
        assert_eq!(tracker.stats().resolution_attempts, 4);
        assert!(tracker.resolution().unwrap().is_complete());
    }

    #[test]
    fn test_nothing_resolves_stays_idle() {
        let host = host(vec![]);
        let tracker = mount(&host, &["about", "projects"]);

        host.advance(Duration::from_secs(5));
        host.scroll_and_render(100.0);

        assert_eq!(tracker.phase(), Phase::Idle);
        assert_eq!(tracker.active(), None);
        assert_eq!(tracker.stats().resolution_attempts, 11);
        assert_eq!(host.stats().scroll_listeners, 0);
        assert_eq!(host.stats().observers, 0);
    }

    #[test]
    fn test_drop_unmounts() {
        let host = host(vec![RegionLayout::new("about", 0.0, 1000.0)]);
        let tracker = mount(&host, &["about"]);
        assert_eq!(host.stats().scroll_listeners, 1);

        drop(tracker);
        let stats = host.stats();
        assert_eq!(stats.scroll_listeners, 0);
        assert_eq!(stats.observers, 0);
        assert_eq!(stats.pending_frames, 0);
    }

    #[test]
    fn test_subscriber_sees_changes() {
        let host = host(vec![
            RegionLayout::new("about", 0.0, 1000.0),
            RegionLayout::new("projects", 1000.0, 1000.0),
        ]);
        let tracker = mount(&host, &["about", "projects"]);
        let changes = Rc::new(Cell::new(0));

        let changes_clone = changes.clone();
        let _sub = tracker.subscribe(move |_| changes_clone.set(changes_clone.get() + 1));

        host.render_frame();
        host.scroll_and_render(1050.0);
        host.render_frame();

        assert_eq!(changes.get(), 2);
        assert_eq!(tracker.active(), Some(SectionId::from("projects")));
    }

    #[test]
    fn test_unmount_is_idempotent() {
        let host = host(vec![RegionLayout::new("about", 0.0, 1000.0)]);
        let tracker = mount(&host, &["about"]);
        tracker.unmount();
        tracker.unmount();
        assert!(!tracker.is_mounted());
    }
}
