//! Viewport intersection observation
//!
//! [`IntersectionTracker`] computes intersection entries the way browsers
//! implement `IntersectionObserver`:
//!
//! - The root rectangle is the viewport expanded by the root margin
//! - A target intersects when it overlaps or touches the root rectangle
//! - The ratio is the visible fraction of the target's area
//! - An entry is produced only when the target's threshold bucket or its
//!   intersecting flag changed since the previous check; the first check
//!   after observing always produces one
//!
//! Hosts own the trackers and run [`IntersectionTracker::check`] from their
//! rendering step.

use std::time::Duration;

use smallvec::SmallVec;

use crate::error::{CoreError, Result};
use crate::geometry::{Bounds, RootMargin, Viewport};

/// Observer configuration
#[derive(Clone, Debug, PartialEq)]
pub struct IntersectionOptions {
    root_margin: RootMargin,
    /// Sorted ascending, deduplicated, each in `[0, 1]`
    thresholds: SmallVec<[f32; 8]>,
}

impl IntersectionOptions {
    /// Build options, validating and sorting the thresholds
    ///
    /// An empty threshold list means `[0.0]`.
    pub fn new(root_margin: RootMargin, thresholds: impl IntoIterator<Item = f32>) -> Result<Self> {
        let mut sorted: SmallVec<[f32; 8]> = SmallVec::new();
        for t in thresholds {
            if !(0.0..=1.0).contains(&t) {
                return Err(CoreError::ThresholdOutOfRange(t));
            }
            sorted.push(t);
        }
        if sorted.is_empty() {
            sorted.push(0.0);
        }
        sorted.sort_by(f32::total_cmp);
        sorted.dedup();

        Ok(Self {
            root_margin,
            thresholds: sorted,
        })
    }

    pub fn root_margin(&self) -> &RootMargin {
        &self.root_margin
    }

    pub fn thresholds(&self) -> &[f32] {
        &self.thresholds
    }

    /// The observed area for a given viewport
    pub fn root_bounds(&self, viewport: Viewport) -> Bounds {
        viewport.bounds().expand(&self.root_margin)
    }

    /// Index of the first threshold strictly greater than `ratio`
    fn threshold_index(&self, ratio: f32) -> i32 {
        self.thresholds.iter().take_while(|t| **t <= ratio).count() as i32
    }
}

impl Default for IntersectionOptions {
    fn default() -> Self {
        Self {
            root_margin: RootMargin::default(),
            thresholds: SmallVec::from_slice(&[0.0]),
        }
    }
}

/// One observation of one target
#[derive(Clone, Debug, PartialEq)]
pub struct IntersectionEntry {
    /// Element id of the target
    pub target: String,
    /// Host time of the observation
    pub time: Duration,
    /// Target bounding box
    pub bounds: Bounds,
    /// Observed area after margins
    pub root_bounds: Bounds,
    /// Visible part of the target (zero-sized when not intersecting)
    pub intersection: Bounds,
    /// Visible fraction of the target's area
    pub ratio: f32,
    pub is_intersecting: bool,
}

#[derive(Clone, Debug)]
struct Observed {
    target: String,
    /// `-1` until the first check
    previous_index: i32,
    previous_intersecting: bool,
}

/// Change-tracking state for one observer
#[derive(Clone, Debug)]
pub struct IntersectionTracker {
    options: IntersectionOptions,
    targets: Vec<Observed>,
}

impl IntersectionTracker {
    pub fn new(options: IntersectionOptions, targets: impl IntoIterator<Item = String>) -> Self {
        let mut tracker = Self {
            options,
            targets: Vec::new(),
        };
        for target in targets {
            tracker.observe(target);
        }
        tracker
    }

    /// Start observing a target; observing the same id twice is a no-op
    pub fn observe(&mut self, target: String) {
        if self.targets.iter().any(|o| o.target == target) {
            return;
        }
        self.targets.push(Observed {
            target,
            previous_index: -1,
            previous_intersecting: false,
        });
    }

    pub fn unobserve(&mut self, target: &str) {
        self.targets.retain(|o| o.target != target);
    }

    pub fn options(&self) -> &IntersectionOptions {
        &self.options
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Run one observation step and return the entries that changed
    ///
    /// Targets for which `lookup` returns `None` (not mounted) are skipped and
    /// keep their previous state.
    pub fn check<F>(&mut self, viewport: Viewport, time: Duration, lookup: F) -> Vec<IntersectionEntry>
    where
        F: Fn(&str) -> Option<Bounds>,
    {
        let root = self.options.root_bounds(viewport);
        let mut entries = Vec::new();

        for observed in &mut self.targets {
            let Some(bounds) = lookup(observed.target.as_str()) else {
                continue;
            };

            let overlap = bounds.intersection(&root);
            let is_intersecting = overlap.is_some();
            let intersection =
                overlap.unwrap_or_else(|| Bounds::new(bounds.x, bounds.y, 0.0, 0.0));

            let target_area = bounds.area();
            let ratio = if target_area > 0.0 {
                (intersection.area() / target_area).clamp(0.0, 1.0)
            } else if is_intersecting {
                1.0
            } else {
                0.0
            };

            let index = if is_intersecting {
                self.options.threshold_index(ratio)
            } else {
                0
            };

            if index == observed.previous_index && is_intersecting == observed.previous_intersecting {
                continue;
            }
            observed.previous_index = index;
            observed.previous_intersecting = is_intersecting;

            entries.push(IntersectionEntry {
                target: observed.target.clone(),
                time,
                bounds,
                root_bounds: root,
                intersection,
                ratio,
                is_intersecting,
            });
        }

        if !entries.is_empty() {
            tracing::trace!(count = entries.len(), "intersection entries");
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Length;

    fn nav_options() -> IntersectionOptions {
        IntersectionOptions::new(
            RootMargin::vertical(Length::Px(-64.0), Length::Percent(-55.0)),
            [0.1, 0.25, 0.5, 0.75, 0.9],
        )
        .unwrap()
    }

    #[test]
    fn test_options_validation() {
        assert!(IntersectionOptions::new(RootMargin::default(), [1.5]).is_err());
        assert!(IntersectionOptions::new(RootMargin::default(), [f32::NAN]).is_err());

        let opts = IntersectionOptions::new(RootMargin::default(), [0.5, 0.1, 0.5]).unwrap();
        assert_eq!(opts.thresholds(), &[0.1, 0.5]);

        let empty = IntersectionOptions::new(RootMargin::default(), []).unwrap();
        assert_eq!(empty.thresholds(), &[0.0]);
    }

    #[test]
    fn test_first_check_reports_every_mounted_target() {
        let mut tracker = IntersectionTracker::new(
            nav_options(),
            ["about".to_string(), "projects".to_string(), "ghost".to_string()],
        );
        let viewport = Viewport::new(1000.0, 800.0);

        let entries = tracker.check(viewport, Duration::ZERO, |id| match id {
            "about" => Some(Bounds::new(0.0, 0.0, 1000.0, 1000.0)),
            "projects" => Some(Bounds::new(0.0, 1000.0, 1000.0, 1000.0)),
            _ => None,
        });

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].target, "about");
        assert!(entries[0].is_intersecting);
        // Root spans 64..360 of an element 1000 tall
        assert!((entries[0].ratio - 0.296).abs() < 1e-4);
        assert_eq!(entries[1].target, "projects");
        assert!(!entries[1].is_intersecting);
        assert_eq!(entries[1].ratio, 0.0);
    }

    #[test]
    fn test_only_bucket_changes_are_reported() {
        let mut tracker = IntersectionTracker::new(nav_options(), ["hero".to_string()]);
        let viewport = Viewport::new(1000.0, 800.0);
        let at = |y: f32| move |_: &str| Some(Bounds::new(0.0, y, 1000.0, 200.0));

        // 64..264 fully visible inside 64..360
        assert_eq!(tracker.check(viewport, Duration::ZERO, at(64.0)).len(), 1);
        // Still fully visible
        assert!(tracker.check(viewport, Duration::ZERO, at(100.0)).is_empty());
        // 260..460 shows 100 of 200 rows: ratio 0.5 crosses into a new bucket
        let entries = tracker.check(viewport, Duration::ZERO, at(260.0));
        assert_eq!(entries.len(), 1);
        assert!((entries[0].ratio - 0.5).abs() < 1e-4);
        // Leaves entirely
        let entries = tracker.check(viewport, Duration::ZERO, at(500.0));
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].is_intersecting);
    }

    #[test]
    fn test_unobserve() {
        let mut tracker = IntersectionTracker::new(nav_options(), ["a".to_string()]);
        tracker.observe("a".to_string());
        assert_eq!(tracker.target_count(), 1);

        tracker.unobserve("a");
        let entries = tracker.check(Viewport::default(), Duration::ZERO, |_| {
            Some(Bounds::new(0.0, 0.0, 10.0, 10.0))
        });
        assert!(entries.is_empty());
    }
}
