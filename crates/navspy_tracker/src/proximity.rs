//! Proximity evaluator
//!
//! Scroll fallback for the visibility evaluator. Proposes the section whose
//! top edge is closest to a reference line a fixed distance below the
//! navigation bar. It keeps the highlight fresh while a tall section scrolls
//! past without crossing any visibility threshold.
//!
//! Scroll events are coalesced per animation frame by [`FrameGate`]: the first
//! event of a frame books the evaluation, the rest are dropped, and the
//! evaluation reads whatever geometry is current when the frame runs.

use navspy_core::Viewport;

use crate::config::TrackerConfig;
use crate::reducer::{Proposal, SignalSource};
use crate::registry::RegionHandle;

/// Select the handle whose top edge is closest to the reference line
///
/// Ties go to the earlier section.
pub fn select(handles: &[RegionHandle], viewport: Viewport, config: &TrackerConfig) -> Option<Proposal> {
    let reference = config.reference_line(viewport);

    let mut best: Option<(&RegionHandle, f32)> = None;
    for handle in handles {
        let distance = (handle.bounds.top() - reference).abs();
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((handle, distance)),
        }
    }

    best.map(|(handle, distance)| Proposal {
        section: handle.section.id.clone(),
        confidence: 1.0 / (1.0 + distance),
        source: SignalSource::Proximity,
    })
}

/// At-most-one pending evaluation per frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameGate {
    in_flight: bool,
    coalesced: u64,
}

impl FrameGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the caller should schedule an evaluation
    pub fn try_begin(&mut self) -> bool {
        if self.in_flight {
            self.coalesced += 1;
            return false;
        }
        self.in_flight = true;
        true
    }

    /// Mark the scheduled evaluation as done
    pub fn finish(&mut self) {
        self.in_flight = false;
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Scroll events absorbed while an evaluation was pending
    pub fn coalesced(&self) -> u64 {
        self.coalesced
    }
}
